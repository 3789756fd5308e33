//! HTTP API over the game service.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, instrument, warn};

use crate::bee::{Game, GameState, TestOutcome};
use crate::engine::TurnOutcome;
use crate::error::BeeError;
use crate::lifecycle::ResultRecorded;
use crate::queries::{GameInfo, PlaybackInfo, PlayerView, ScoringInfo};
use crate::service::GameService;
use crate::store::{GameStore, NewProblem};
use crate::types::{GameId, PlayerId, ProblemId};

const DEFAULT_RECENT_LIMIT: usize = 10;

// ── Request types ─────────────────────────────────────────────────────

/// Body of `POST /players`.
#[derive(Debug, Deserialize)]
pub struct CreatePlayerRequest {
    /// Display name.
    pub name: String,
    /// Set to create a bot player.
    #[serde(default)]
    pub bot_type: Option<String>,
}

/// Body of `POST /games`.
#[derive(Debug, Deserialize)]
pub struct StartGameRequest {
    /// The creating player, seated as player1.
    pub player_id: PlayerId,
}

/// Body of `POST /games/bots`.
#[derive(Debug, Deserialize)]
pub struct StartBotGameRequest {
    /// Bot type of player1.
    pub bot1: String,
    /// Bot type of player2.
    pub bot2: String,
    /// Problem to solve.
    pub problem_id: ProblemId,
}

/// Body of `POST /games/{id}/join`.
#[derive(Debug, Deserialize)]
pub struct JoinGameRequest {
    /// The joining player.
    pub player_id: PlayerId,
}

/// Body of `POST /games/{id}/problem`.
#[derive(Debug, Deserialize)]
pub struct SelectProblemRequest {
    /// A seated player.
    pub player_id: PlayerId,
    /// Problem to solve.
    pub problem_id: ProblemId,
}

/// Body of `POST /games/{id}/invite-bot`.
#[derive(Debug, Deserialize)]
pub struct InviteBotRequest {
    /// Bot type to seat as player2.
    pub bot_type: String,
}

/// Body of `POST /games/{id}/turn`.
#[derive(Debug, Deserialize)]
pub struct TurnRequest {
    /// The acting player.
    pub player_id: PlayerId,
    /// The typed command.
    pub input: String,
}

/// Body of `POST /games/{id}/result`.
#[derive(Debug, Deserialize)]
pub struct RecordResultRequest {
    /// One outcome per test case.
    pub results: Vec<TestOutcome>,
}

/// Query of the per-player views.
#[derive(Debug, Deserialize)]
pub struct PlayerQuery {
    /// The watching player.
    pub player_id: PlayerId,
}

/// Query of `GET /games`.
#[derive(Debug, Deserialize)]
pub struct RecentGamesQuery {
    /// Maximum number of games.
    pub limit: Option<usize>,
    /// Only games still accepting inputs.
    #[serde(default)]
    pub ongoing: bool,
}

/// One entry of `GET /games`.
#[derive(Debug, Serialize)]
pub struct GameSummary {
    /// Game id.
    pub id: GameId,
    /// The phase record.
    pub game: Game,
}

// ── Errors ────────────────────────────────────────────────────────────

/// A [`BeeError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub BeeError);

impl From<BeeError> for ApiError {
    fn from(e: BeeError) -> Self {
        Self(e)
    }
}

impl ApiError {
    /// Status code for the wrapped error.
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            BeeError::UnknownGame(_) | BeeError::UnknownPlayer(_) | BeeError::UnknownProblem(_) => {
                StatusCode::NOT_FOUND
            }
            BeeError::WrongPhase { .. }
            | BeeError::NotYourTurn(_)
            | BeeError::GameFull
            | BeeError::GameNotReady
            | BeeError::BotTypeTaken(_) => StatusCode::CONFLICT,
            BeeError::AccessDenied(_) | BeeError::NotPlaying(_) | BeeError::PlayerIsPlaying(_) => {
                StatusCode::FORBIDDEN
            }
            BeeError::Parse(_) | BeeError::NotABot(_) => StatusCode::BAD_REQUEST,
            BeeError::MissingRecord(_) | BeeError::InvariantViolation(_) | BeeError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "Request failed");
            "Internal server error".to_string()
        } else {
            warn!(error = %self.0, %status, "Request rejected");
            self.0.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ── Router ────────────────────────────────────────────────────────────

/// Builds the API router.
pub fn router<S: GameStore>(service: GameService<S>) -> Router {
    Router::new()
        .route("/players", post(create_player::<S>))
        .route("/problems", post(create_problem::<S>))
        .route("/games", get(recent_games::<S>).post(start_game::<S>))
        .route("/games/bots", post(start_bot_game::<S>))
        .route("/games/{id}", get(game_info::<S>))
        .route("/games/{id}/join", post(join_game::<S>))
        .route("/games/{id}/problem", post(select_problem::<S>))
        .route("/games/{id}/invite-bot", post(invite_bot::<S>))
        .route("/games/{id}/turn", post(take_turn::<S>))
        .route("/games/{id}/result", post(record_result::<S>))
        .route("/games/{id}/watch", get(watch::<S>))
        .route("/games/{id}/spectate", get(spectate::<S>))
        .route("/games/{id}/scoring", get(scoring::<S>))
        .route("/games/{id}/playback", get(playback::<S>))
        .with_state(service)
}

// ── Handlers ──────────────────────────────────────────────────────────

#[instrument(skip(service))]
async fn create_player<S: GameStore>(
    State(service): State<GameService<S>>,
    Json(req): Json<CreatePlayerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let player = service.create_player(&req.name, req.bot_type)?;
    Ok((StatusCode::CREATED, Json(player)))
}

#[instrument(skip(service, req))]
async fn create_problem<S: GameStore>(
    State(service): State<GameService<S>>,
    Json(req): Json<NewProblem>,
) -> Result<impl IntoResponse, ApiError> {
    let problem = service.create_problem(req)?;
    Ok((StatusCode::CREATED, Json(problem)))
}

#[instrument(skip(service))]
async fn recent_games<S: GameStore>(
    State(service): State<GameService<S>>,
    Query(query): Query<RecentGamesQuery>,
) -> ApiResult<Vec<GameSummary>> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    let games = if query.ongoing {
        service.ongoing_games(limit)?
    } else {
        service.recent_games(limit)?
    };
    Ok(Json(
        games
            .into_iter()
            .map(|(id, game)| GameSummary { id, game })
            .collect(),
    ))
}

#[instrument(skip(service))]
async fn start_game<S: GameStore>(
    State(service): State<GameService<S>>,
    Json(req): Json<StartGameRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let game_id = service.start_game(req.player_id)?;
    Ok((StatusCode::CREATED, Json(json!({ "gameId": game_id }))))
}

#[instrument(skip(service))]
async fn start_bot_game<S: GameStore>(
    State(service): State<GameService<S>>,
    Json(req): Json<StartBotGameRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let game_id = service.start_bot_game(&req.bot1, &req.bot2, req.problem_id)?;
    Ok((StatusCode::CREATED, Json(json!({ "gameId": game_id }))))
}

#[instrument(skip(service))]
async fn game_info<S: GameStore>(
    State(service): State<GameService<S>>,
    Path(id): Path<GameId>,
) -> ApiResult<GameInfo> {
    Ok(Json(service.game_info(id)?))
}

#[instrument(skip(service))]
async fn join_game<S: GameStore>(
    State(service): State<GameService<S>>,
    Path(id): Path<GameId>,
    Json(req): Json<JoinGameRequest>,
) -> ApiResult<Game> {
    Ok(Json(service.join_game(id, req.player_id)?))
}

#[instrument(skip(service))]
async fn select_problem<S: GameStore>(
    State(service): State<GameService<S>>,
    Path(id): Path<GameId>,
    Json(req): Json<SelectProblemRequest>,
) -> ApiResult<Game> {
    Ok(Json(service.select_problem(id, req.player_id, req.problem_id)?))
}

#[instrument(skip(service))]
async fn invite_bot<S: GameStore>(
    State(service): State<GameService<S>>,
    Path(id): Path<GameId>,
    Json(req): Json<InviteBotRequest>,
) -> ApiResult<Game> {
    Ok(Json(service.invite_bot(id, &req.bot_type)?))
}

#[instrument(skip(service, req), fields(player_id = req.player_id))]
async fn take_turn<S: GameStore>(
    State(service): State<GameService<S>>,
    Path(id): Path<GameId>,
    Json(req): Json<TurnRequest>,
) -> ApiResult<TurnOutcome> {
    Ok(Json(service.take_turn(id, req.player_id, &req.input)?))
}

#[instrument(skip(service, req), fields(cases = req.results.len()))]
async fn record_result<S: GameStore>(
    State(service): State<GameService<S>>,
    Path(id): Path<GameId>,
    Json(req): Json<RecordResultRequest>,
) -> ApiResult<ResultRecorded> {
    Ok(Json(service.record_result(id, &req.results)?))
}

#[instrument(skip(service))]
async fn watch<S: GameStore>(
    State(service): State<GameService<S>>,
    Path(id): Path<GameId>,
    Query(query): Query<PlayerQuery>,
) -> ApiResult<Option<PlayerView>> {
    Ok(Json(service.watch_game_while_playing(id, query.player_id)?))
}

#[instrument(skip(service))]
async fn spectate<S: GameStore>(
    State(service): State<GameService<S>>,
    Path(id): Path<GameId>,
    Query(query): Query<PlayerQuery>,
) -> ApiResult<Option<GameState>> {
    Ok(Json(service.spectate(id, query.player_id)?))
}

#[instrument(skip(service))]
async fn scoring<S: GameStore>(
    State(service): State<GameService<S>>,
    Path(id): Path<GameId>,
) -> ApiResult<ScoringInfo> {
    Ok(Json(service.info_for_scoring(id)?))
}

#[instrument(skip(service))]
async fn playback<S: GameStore>(
    State(service): State<GameService<S>>,
    Path(id): Path<GameId>,
) -> ApiResult<PlaybackInfo> {
    Ok(Json(service.info_for_playback(id)?))
}
