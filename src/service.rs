//! Service facade: one store transaction per call, follow-up tasks after
//! commit.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::bee::{Game, GameState, Side, TestOutcome};
use crate::bot::{self, BotTurn};
use crate::config::BeeConfig;
use crate::engine::{self, NextActor, TurnOutcome};
use crate::error::BeeError;
use crate::lifecycle::{self, ResultRecorded, Transitioned};
use crate::queries::{self, AuditReport, GameInfo, PlaybackInfo, PlayerView, ScoringInfo};
use crate::scheduler::{Scheduler, Task};
use crate::store::{GameStore, GameTxn, NewPlayer, NewProblem, Player, Problem};
use crate::types::{AnswerId, GameId, PlayerId, ProblemId};

/// Game operations over a store.
#[derive(Clone)]
pub struct GameService<S: GameStore> {
    store: S,
    config: Arc<BeeConfig>,
    scheduler: Scheduler,
}

impl<S: GameStore> GameService<S> {
    /// Creates a service.
    #[instrument(skip_all)]
    pub fn new(store: S, config: BeeConfig, scheduler: Scheduler) -> Self {
        info!(max_bot_v_bot = config.max_bot_v_bot(), "Game service ready");
        Self {
            store,
            config: Arc::new(config),
            scheduler,
        }
    }

    /// The engine configuration.
    pub fn config(&self) -> &BeeConfig {
        &self.config
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn transaction<T>(
        &self,
        f: impl FnOnce(&mut dyn GameTxn) -> Result<T, BeeError>,
    ) -> Result<T, BeeError> {
        self.store.transaction(f)
    }

    // ─────────────────────────────────────────────────────────────
    // Players and problems
    // ─────────────────────────────────────────────────────────────

    /// Creates a player. A player with a bot type is a bot.
    #[instrument(skip(self))]
    pub fn create_player(&self, name: &str, bot_type: Option<String>) -> Result<Player, BeeError> {
        self.transaction(|txn| {
            if let Some(bot_type) = &bot_type
                && txn.player_by_bot_type(bot_type)?.is_some()
            {
                return Err(BeeError::BotTypeTaken(bot_type.clone()));
            }
            let id = txn.insert_player(NewPlayer::new(name.to_string(), bot_type.clone()))?;
            info!(player_id = id, "Player created");
            Ok(Player::new(id, name.to_string(), bot_type))
        })
    }

    /// The bot player of a bot type, named after its configuration.
    #[instrument(skip(self))]
    pub fn get_or_create_bot_player(&self, bot_type: &str) -> Result<Player, BeeError> {
        let name = self.bot_name(bot_type);
        self.transaction(|txn| lifecycle::get_or_create_bot_player(txn, bot_type, &name))
    }

    /// Stores a problem.
    #[instrument(skip(self, problem))]
    pub fn create_problem(&self, problem: NewProblem) -> Result<Problem, BeeError> {
        self.transaction(|txn| {
            let id = txn.insert_problem(problem.clone())?;
            info!(problem_id = id, "Problem created");
            Ok(problem.into_problem(id))
        })
    }

    fn bot_name(&self, bot_type: &str) -> String {
        self.config
            .bot(bot_type)
            .map_or(bot_type, |b| b.display_name())
            .to_string()
    }

    // ─────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────

    /// Creates a game with `player_id` as player1.
    #[instrument(skip(self))]
    pub fn start_game(&self, player_id: PlayerId) -> Result<GameId, BeeError> {
        self.transaction(|txn| lifecycle::create_game(txn, player_id))
    }

    /// Seats a second player.
    #[instrument(skip(self))]
    pub fn join_game(&self, game_id: GameId, player_id: PlayerId) -> Result<Game, BeeError> {
        let transitioned =
            self.transaction(|txn| lifecycle::add_player_to_game(txn, game_id, player_id))?;
        Ok(self.dispatch_start(game_id, transitioned))
    }

    /// Selects the problem on behalf of a seated player.
    #[instrument(skip(self))]
    pub fn select_problem(
        &self,
        game_id: GameId,
        player_id: PlayerId,
        problem_id: ProblemId,
    ) -> Result<Game, BeeError> {
        let transitioned = self
            .transaction(|txn| lifecycle::select_problem(txn, game_id, player_id, problem_id))?;
        Ok(self.dispatch_start(game_id, transitioned))
    }

    /// Seats the bot player of `bot_type` as player2.
    #[instrument(skip(self))]
    pub fn invite_bot(&self, game_id: GameId, bot_type: &str) -> Result<Game, BeeError> {
        let name = self.bot_name(bot_type);
        let transitioned = self.transaction(|txn| {
            let bot = lifecycle::get_or_create_bot_player(txn, bot_type, &name)?;
            lifecycle::add_player_to_game(txn, game_id, *bot.id())
        })?;
        Ok(self.dispatch_start(game_id, transitioned))
    }

    /// Starts a game between two bots on a problem. The first bot moves
    /// first.
    #[instrument(skip(self))]
    pub fn start_bot_game(
        &self,
        bot1: &str,
        bot2: &str,
        problem_id: ProblemId,
    ) -> Result<GameId, BeeError> {
        let (name1, name2) = (self.bot_name(bot1), self.bot_name(bot2));
        let (game_id, transitioned) = self.transaction(|txn| {
            let first = lifecycle::get_or_create_bot_player(txn, bot1, &name1)?;
            let second = lifecycle::get_or_create_bot_player(txn, bot2, &name2)?;
            let game_id = lifecycle::create_game(txn, *first.id())?;
            lifecycle::select_problem(txn, game_id, *first.id(), problem_id)?;
            let transitioned = lifecycle::add_player_to_game(txn, game_id, *second.id())?;
            Ok((game_id, transitioned))
        })?;
        self.dispatch_start(game_id, transitioned);
        Ok(game_id)
    }

    /// Stores test results. Idempotent once the game is done.
    #[instrument(skip(self, results), fields(cases = results.len()))]
    pub fn record_result(
        &self,
        game_id: GameId,
        results: &[TestOutcome],
    ) -> Result<ResultRecorded, BeeError> {
        self.transaction(|txn| lifecycle::record_result(txn, game_id, results))
    }

    // ─────────────────────────────────────────────────────────────
    // Turns
    // ─────────────────────────────────────────────────────────────

    /// Applies a typed input from a player.
    #[instrument(skip(self, raw), fields(raw_len = raw.len()))]
    pub fn take_turn(
        &self,
        game_id: GameId,
        player_id: PlayerId,
        raw: &str,
    ) -> Result<TurnOutcome, BeeError> {
        let outcome = self
            .transaction(|txn| engine::handle_turn(txn, &self.config, game_id, player_id, raw))?;
        self.dispatch_turn(game_id, &outcome);
        Ok(outcome)
    }

    /// Plays one bot turn, deferring to the provider when needed.
    #[instrument(skip(self))]
    pub fn take_bot_turn(
        &self,
        game_id: GameId,
        player_id: PlayerId,
        must_answer: bool,
    ) -> Result<BotTurn, BeeError> {
        let turn = self.transaction(|txn| {
            bot::take_bot_turn(txn, &self.config, game_id, player_id, must_answer)
        })?;
        match &turn {
            BotTurn::Played(outcome) => self.dispatch_turn(game_id, outcome),
            BotTurn::AwaitingAnswer(args) => {
                debug!(game_id, player_id, "Asking bot");
                self.scheduler.schedule(Task::AskBot(args.clone()));
            }
        }
        Ok(turn)
    }

    /// Caches a bot answer for a prompt and code snippet.
    #[instrument(skip(self, prompt, answer))]
    pub fn record_answer(
        &self,
        bot_type: &str,
        prompt: &str,
        code_snippet: &str,
        answer: Option<String>,
    ) -> Result<AnswerId, BeeError> {
        self.transaction(|txn| {
            Ok(bot::record_answer(txn, bot_type, prompt, code_snippet, answer)?)
        })
    }

    fn dispatch_turn(&self, game_id: GameId, outcome: &TurnOutcome) {
        match outcome.next {
            NextActor::Bot(player_id) => self.scheduler.schedule(Task::BotTurn {
                game_id,
                player_id,
                must_answer: false,
            }),
            NextActor::InputDone => self.scheduler.schedule(Task::Score { game_id }),
            NextActor::Human(_) => {}
        }
    }

    /// Schedules the opening bot move of a game that just started.
    fn dispatch_start(&self, game_id: GameId, transitioned: Transitioned) -> Game {
        if let Some(started) = &transitioned.started {
            let first = started.player(Side::Player1);
            match self.transaction(|txn| Ok(txn.player(first)?)) {
                Ok(Some(player)) if player.is_bot() => self.scheduler.schedule(Task::BotTurn {
                    game_id,
                    player_id: first,
                    must_answer: false,
                }),
                Ok(_) => {}
                Err(e) => warn!(game_id, error = %e, "Cannot check first player"),
            }
        }
        transitioned.game
    }

    // ─────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────

    /// A game with its players and prompt.
    #[instrument(skip(self))]
    pub fn game_info(&self, game_id: GameId) -> Result<GameInfo, BeeError> {
        self.transaction(|txn| queries::game_info(txn, game_id))
    }

    /// What a seated player sees; `None` before the game starts.
    #[instrument(skip(self))]
    pub fn watch_game_while_playing(
        &self,
        game_id: GameId,
        player_id: PlayerId,
    ) -> Result<Option<PlayerView>, BeeError> {
        self.transaction(|txn| queries::watch_game_while_playing(txn, game_id, player_id))
    }

    /// The live state for a spectator.
    #[instrument(skip(self))]
    pub fn spectate(
        &self,
        game_id: GameId,
        player_id: PlayerId,
    ) -> Result<Option<GameState>, BeeError> {
        self.transaction(|txn| queries::spectate(txn, game_id, player_id))
    }

    /// Code and problem of a game awaiting its score.
    #[instrument(skip(self))]
    pub fn info_for_scoring(&self, game_id: GameId) -> Result<ScoringInfo, BeeError> {
        self.transaction(|txn| queries::info_for_scoring(txn, game_id))
    }

    /// Log, results and problem of a scored game.
    #[instrument(skip(self))]
    pub fn info_for_playback(&self, game_id: GameId) -> Result<PlaybackInfo, BeeError> {
        self.transaction(|txn| queries::info_for_playback(txn, game_id))
    }

    /// Most recent games, newest first.
    #[instrument(skip(self))]
    pub fn recent_games(&self, limit: usize) -> Result<Vec<(GameId, Game)>, BeeError> {
        self.transaction(|txn| queries::recent_games(txn, limit))
    }

    /// Recent games still accepting inputs.
    #[instrument(skip(self))]
    pub fn ongoing_games(&self, limit: usize) -> Result<Vec<(GameId, Game)>, BeeError> {
        self.transaction(|txn| queries::ongoing_games(txn, limit))
    }

    /// Checks a game's log against its snapshot.
    #[instrument(skip(self))]
    pub fn audit_game(&self, game_id: GameId) -> Result<AuditReport, BeeError> {
        self.transaction(|txn| queries::audit_game(txn, game_id))
    }
}
