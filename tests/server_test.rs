//! Tests for the HTTP API.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use codebee::{BeeConfig, GameService, MemoryStore, Scheduler, router};

fn app() -> Router {
    let (scheduler, _rx) = Scheduler::channel();
    router(GameService::new(
        MemoryStore::new(),
        BeeConfig::default(),
        scheduler,
    ))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

/// Creates two players, a problem and a started game. Returns
/// `(game_id, ann, bob)`.
async fn started(app: &Router) -> (i64, i64, i64) {
    let (status, ann) = send(app, "POST", "/players", Some(json!({ "name": "ann" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, bob) = send(app, "POST", "/players", Some(json!({ "name": "bob" }))).await;
    let (status, problem) = send(
        app,
        "POST",
        "/problems",
        Some(json!({
            "prompt": "Return a.",
            "testCases": [{ "args": 1, "expected": 1 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let ann = ann["id"].as_i64().expect("ann id");
    let bob = bob["id"].as_i64().expect("bob id");
    let problem = problem["id"].as_i64().expect("problem id");

    let (status, game) = send(app, "POST", "/games", Some(json!({ "player_id": ann }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let game_id = game["gameId"].as_i64().expect("game id");

    let uri = format!("/games/{}/join", game_id);
    let (status, _) = send(app, "POST", &uri, Some(json!({ "player_id": bob }))).await;
    assert_eq!(status, StatusCode::OK);

    let uri = format!("/games/{}/problem", game_id);
    let (status, game) = send(
        app,
        "POST",
        &uri,
        Some(json!({ "player_id": ann, "problem_id": problem })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(game["status"], "Inputting");

    (game_id, ann, bob)
}

#[tokio::test]
async fn test_turns_over_http() {
    let app = app();
    let (game_id, ann, bob) = started(&app).await;
    let uri = format!("/games/{}/turn", game_id);

    let (status, outcome) = send(&app, "POST", &uri, Some(json!({ "player_id": ann, "input": "r" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["state"]["code"], "r");
    assert_eq!(outcome["next"]["kind"], "Human");
    assert_eq!(outcome["next"]["playerId"], bob);

    let uri = format!("/games/{}/watch?player_id={}", game_id, bob);
    let (status, view) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["isCurrentPlayersTurn"], true);
    assert_eq!(view["lastPartnerInput"]["kind"], "Add");
}

#[tokio::test]
async fn test_error_status_mapping() {
    let app = app();
    let (game_id, ann, bob) = started(&app).await;
    let turn = format!("/games/{}/turn", game_id);

    let (status, body) = send(&app, "POST", &turn, Some(json!({ "player_id": bob, "input": "x" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().is_some());

    let (status, _) = send(&app, "POST", &turn, Some(json!({ "player_id": ann, "input": "xy" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", "/games/9999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/games/{}/spectate?player_id={}", game_id, ann);
    let (status, _) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let uri = format!("/games/{}/scoring", game_id);
    let (status, _) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_taken_bot_type_is_conflict() {
    let app = app();
    let body = json!({ "name": "gpt", "bot_type": "chatgpt" });
    let (status, _) = send(&app, "POST", "/players", Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, "POST", "/players", Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().is_some_and(|e| e.contains("chatgpt")));
}

#[tokio::test]
async fn test_scoring_flow_over_http() {
    let app = app();
    let (game_id, ann, _) = started(&app).await;

    let turn = format!("/games/{}/turn", game_id);
    let (status, outcome) = send(&app, "POST", &turn, Some(json!({ "player_id": ann, "input": "done" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["next"]["kind"], "InputDone");

    let (status, scoring) = send(&app, "GET", &format!("/games/{}/scoring", game_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(scoring["problem"]["prompt"], "Return a.");

    let result = format!("/games/{}/result", game_id);
    let body = json!({ "results": [{ "status": "Passed" }] });
    let (status, recorded) = send(&app, "POST", &result, Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(recorded["kind"], "Recorded");

    let (status, again) = send(&app, "POST", &result, Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["kind"], "AlreadyDone");

    let (status, playback) = send(&app, "GET", &format!("/games/{}/playback", game_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(playback["testResults"]["results"][0]["status"], "Passed");

    let (status, games) = send(&app, "GET", "/games?limit=5", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(games[0]["id"], game_id);
    assert_eq!(games[0]["game"]["status"], "Done");
}
