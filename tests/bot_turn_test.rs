//! Tests for bot turns, answer caching and the task worker.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use codebee::{
    AskBot, BeeConfig, BeeError, BotRoster, BotTurn, GameService, GameStatus, LlmError,
    MemoryStore, NewProblem, NextActor, ProblemId, Scheduler, SolutionExecutor, Task, TaskRunner,
    TestCase, TestOutcome, Worker,
};

const PROMPT: &str = "Return a doubled.";

/// Answers every prompt with the same text.
struct Scripted {
    answer: String,
    calls: AtomicUsize,
}

impl Scripted {
    fn new(answer: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: answer.to_string(),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl AskBot for Scripted {
    async fn ask(&self, _prompt: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer.clone())
    }
}

/// Fails every request.
struct Broken {
    calls: AtomicUsize,
}

#[async_trait]
impl AskBot for Broken {
    async fn ask(&self, _prompt: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(LlmError::request("provider unavailable"))
    }
}

/// Passes every test case.
struct AllPass;

#[async_trait]
impl SolutionExecutor for AllPass {
    async fn execute(&self, _code: &str, test_cases: &[TestCase]) -> Vec<TestOutcome> {
        vec![TestOutcome::Passed; test_cases.len()]
    }
}

fn config() -> BeeConfig {
    BeeConfig::default()
        .with_max_bot_v_bot(5)
        .with_bot_max_attempts(2)
        .with_bot_retry_backoff_ms(0)
}

fn setup(
    roster: BotRoster,
    executor: Option<Arc<dyn SolutionExecutor>>,
) -> (GameService<MemoryStore>, Worker<MemoryStore>, ProblemId) {
    let (scheduler, rx) = Scheduler::channel();
    let service = GameService::new(MemoryStore::new(), config(), scheduler);
    let problem = service
        .create_problem(NewProblem::new(
            None,
            PROMPT.to_string(),
            vec![
                TestCase {
                    args: serde_json::json!(1),
                    expected: serde_json::json!(2),
                },
                TestCase {
                    args: serde_json::json!(2),
                    expected: serde_json::json!(4),
                },
            ],
            true,
        ))
        .expect("problem");
    let worker = Worker::new(TaskRunner::new(service.clone(), roster, executor), rx);
    (service, worker, *problem.id())
}

#[tokio::test]
async fn test_bot_game_runs_to_input_done() {
    let first = Scripted::new("return a * 2;");
    let second = Scripted::new("return a * 2;");
    let mut roster = BotRoster::new();
    roster.insert("alpha", first.clone());
    roster.insert("beta", second.clone());

    let (service, mut worker, problem_id) = setup(roster, None);
    let game_id = service
        .start_bot_game("alpha", "beta", problem_id)
        .expect("bot game");

    worker.run_until_idle().await;

    let scoring = service.info_for_scoring(game_id).expect("input done");
    assert_eq!(scoring.code, "retur");
    assert_eq!(first.calls.load(Ordering::SeqCst), 1);
    assert_eq!(second.calls.load(Ordering::SeqCst), 1);

    let report = service.audit_game(game_id).expect("audit");
    assert!(report.violations.is_empty(), "{:?}", report.violations);
}

#[tokio::test]
async fn test_worker_scores_finished_games() {
    let mut roster = BotRoster::new();
    roster.insert("alpha", Scripted::new("return a * 2;"));

    let executor: Arc<dyn SolutionExecutor> = Arc::new(AllPass);
    let (service, mut worker, problem_id) = setup(roster, Some(executor));
    let game_id = service
        .start_bot_game("alpha", "alpha", problem_id)
        .expect("bot game");

    worker.run_until_idle().await;

    let info = service.game_info(game_id).expect("info");
    assert_eq!(info.game.status(), GameStatus::Done);
    let playback = service.info_for_playback(game_id).expect("playback");
    assert_eq!(playback.test_results.results().len(), 2);
    assert!(playback.test_results.results().iter().all(|r| r.is_passed()));
}

#[tokio::test]
async fn test_failing_provider_still_plays_a_space() {
    let broken = Arc::new(Broken {
        calls: AtomicUsize::new(0),
    });
    let mut roster = BotRoster::new();
    roster.insert("broken", broken.clone());

    let (service, mut worker, problem_id) = setup(roster, None);
    let ann = *service.create_player("ann", None).expect("ann").id();
    let game_id = service.start_game(ann).expect("game");
    service.select_problem(game_id, ann, problem_id).expect("select");
    service.invite_bot(game_id, "broken").expect("invite");

    let outcome = service.take_turn(game_id, ann, "r").expect("turn");
    assert!(matches!(outcome.next, NextActor::Bot(_)));

    worker.run_until_idle().await;

    assert_eq!(broken.calls.load(Ordering::SeqCst), 2);
    let view = service
        .watch_game_while_playing(game_id, ann)
        .expect("watch")
        .expect("started");
    assert!(view.is_current_players_turn);
    assert_eq!(
        view.last_partner_input,
        Some(codebee::Operation::Add { input: ' ' })
    );
}

#[tokio::test]
async fn test_delete_forces_a_fresh_answer() {
    let (service, _worker, problem_id) = setup(BotRoster::new(), None);
    let ann = *service.create_player("ann", None).expect("ann").id();
    let game_id = service.start_game(ann).expect("game");
    service.select_problem(game_id, ann, problem_id).expect("select");
    let game = service.invite_bot(game_id, "scripted").expect("invite");
    let bot = game.player2().expect("bot seated");

    service
        .record_answer("scripted", PROMPT, "", Some("return a;".to_string()))
        .expect("cache");

    service.take_turn(game_id, ann, "r").expect("r");
    let played = service.take_bot_turn(game_id, bot, false).expect("bot");
    match played {
        BotTurn::Played(outcome) => assert_eq!(outcome.state.code(), "re"),
        other => panic!("expected a move, got {:?}", other),
    }

    service.take_turn(game_id, ann, "clear").expect("clear");
    let deferred = service.take_bot_turn(game_id, bot, false).expect("bot");
    match deferred {
        BotTurn::AwaitingAnswer(args) => {
            assert_eq!(args.code_snippet, "r");
            assert_eq!(args.prompt, PROMPT);
        }
        other => panic!("expected an ask, got {:?}", other),
    }

    let forced = service.take_bot_turn(game_id, bot, true).expect("bot");
    match forced {
        BotTurn::Played(outcome) => assert_eq!(outcome.state.code(), "re"),
        other => panic!("expected a move, got {:?}", other),
    }
}

#[tokio::test]
async fn test_bot_turn_checks_seat_and_turn() {
    let (service, _worker, problem_id) = setup(BotRoster::new(), None);
    let ann = *service.create_player("ann", None).expect("ann").id();
    let bob = *service.create_player("bob", None).expect("bob").id();
    let game_id = service.start_game(ann).expect("game");
    service.select_problem(game_id, ann, problem_id).expect("select");
    let game = service.invite_bot(game_id, "scripted").expect("invite");
    let bot = game.player2().expect("bot seated");

    assert!(matches!(
        service.take_bot_turn(game_id, bot, false),
        Err(BeeError::NotYourTurn(_))
    ));
    assert!(matches!(
        service.take_bot_turn(game_id, ann, false),
        Err(BeeError::NotABot(_))
    ));
    assert!(matches!(
        service.take_bot_turn(game_id, bob, false),
        Err(BeeError::NotPlaying(_))
    ));
}

#[tokio::test]
async fn test_invited_bot_game_schedules_nothing_for_human_opener() {
    let (scheduler, mut rx) = Scheduler::channel();
    let service = GameService::new(MemoryStore::new(), config(), scheduler);
    let ann = *service.create_player("ann", None).expect("ann").id();
    let problem = service
        .create_problem(NewProblem::new(None, PROMPT.to_string(), Vec::new(), true))
        .expect("problem");
    let game_id = service.start_game(ann).expect("game");
    service.select_problem(game_id, ann, *problem.id()).expect("select");
    service.invite_bot(game_id, "scripted").expect("invite");
    assert!(rx.try_recv().is_err());

    let bot_game = service
        .start_bot_game("scripted", "scripted", *problem.id())
        .expect("bot game");
    match rx.try_recv() {
        Ok(Task::BotTurn {
            game_id,
            must_answer,
            ..
        }) => {
            assert_eq!(game_id, bot_game);
            assert!(!must_answer);
        }
        other => panic!("expected a bot turn, got {:?}", other),
    }
}

#[tokio::test]
async fn test_worker_stops_on_shutdown_while_service_lives() {
    let (service, worker, _) = setup(BotRoster::new(), None);
    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(worker.run(async {
        stopped.await.ok();
    }));

    stop.send(()).expect("worker listening");
    tokio::time::timeout(std::time::Duration::from_secs(5), handle)
        .await
        .expect("worker stopped")
        .expect("worker task");
    drop(service);
}
