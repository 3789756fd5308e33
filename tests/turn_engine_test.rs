//! Tests for turns and phases through the game service.

use codebee::{
    BeeConfig, BeeError, GameId, GameService, GameStatus, MemoryStore, NewProblem, NextActor,
    Operation, ParseError, PlayerId, ResultRecorded, Scheduler, Side, Task, TestOutcome,
    TurnOutcome,
};
use tokio::sync::mpsc::UnboundedReceiver;

struct Table {
    service: GameService<MemoryStore>,
    tasks: UnboundedReceiver<Task>,
    ann: PlayerId,
    bob: PlayerId,
    game_id: GameId,
}

/// Two humans seated at a started game; ann is player1.
fn started_game() -> Table {
    let (scheduler, tasks) = Scheduler::channel();
    let service = GameService::new(MemoryStore::new(), BeeConfig::default(), scheduler);

    let ann = *service.create_player("ann", None).expect("ann").id();
    let bob = *service.create_player("bob", None).expect("bob").id();
    let problem = service
        .create_problem(NewProblem::new(
            Some("Double".to_string()),
            "Return a doubled.".to_string(),
            Vec::new(),
            true,
        ))
        .expect("problem");

    let game_id = service.start_game(ann).expect("start");
    service.join_game(game_id, bob).expect("join");
    let game = service
        .select_problem(game_id, ann, *problem.id())
        .expect("select");
    assert_eq!(game.status(), GameStatus::Inputting);

    Table {
        service,
        tasks,
        ann,
        bob,
        game_id,
    }
}

fn play(table: &Table, player: PlayerId, raw: &str) -> TurnOutcome {
    table
        .service
        .take_turn(table.game_id, player, raw)
        .unwrap_or_else(|e| panic!("turn {:?} failed: {}", raw, e))
}

#[test]
fn test_players_alternate() {
    let table = started_game();
    let first = play(&table, table.ann, "r");
    assert_eq!(first.next, NextActor::Human(table.bob));

    let second = play(&table, table.bob, "e");
    assert_eq!(second.next, NextActor::Human(table.ann));
    assert_eq!(second.state.code(), "re");
}

#[test]
fn test_clear_removes_partner_input() {
    let table = started_game();
    play(&table, table.ann, "a");
    play(&table, table.bob, "b");
    let outcome = play(&table, table.ann, "clear 1");

    assert_eq!(outcome.operation, Operation::Delete { num_deleted: 1 });
    assert_eq!(outcome.state.code(), "a");
    assert!(*outcome.state.is_last_player_player1());
    assert_eq!(outcome.next, NextActor::Human(table.bob));
}

#[test]
fn test_out_of_turn_input_is_rejected_without_change() {
    let table = started_game();
    let result = table.service.take_turn(table.game_id, table.bob, "x");
    assert!(matches!(result, Err(BeeError::NotYourTurn(id)) if id == table.bob));

    let view = table
        .service
        .watch_game_while_playing(table.game_id, table.ann)
        .expect("watch")
        .expect("started");
    assert!(view.is_current_players_turn);
    assert_eq!(view.last_partner_input, None);
}

#[test]
fn test_skip_forfeits_opponent_turn() {
    let table = started_game();
    let outcome = play(&table, table.ann, "skip");

    assert_eq!(outcome.operation, Operation::Skip { num_skips: 1 });
    assert_eq!(outcome.skips_consumed, 1);
    assert_eq!(outcome.next, NextActor::Human(table.ann));
    assert_eq!(outcome.state.skips(Side::Player2), 0);
    assert_eq!(
        outcome.state.last_input(Side::Player2),
        Some(Operation::Skipped)
    );
}

#[test]
fn test_multi_skip_is_consumed_one_turn_at_a_time() {
    let table = started_game();
    let first = play(&table, table.ann, "skip 2");
    assert_eq!(first.skips_consumed, 1);
    assert_eq!(first.state.skips(Side::Player2), 1);

    let second = play(&table, table.ann, "a");
    assert_eq!(second.skips_consumed, 1);
    assert_eq!(second.next, NextActor::Human(table.ann));
    assert_eq!(second.state.skips(Side::Player2), 0);

    let third = play(&table, table.ann, "b");
    assert_eq!(third.skips_consumed, 0);
    assert_eq!(third.next, NextActor::Human(table.bob));
    assert_eq!(third.state.code(), "ab");
}

#[test]
fn test_delete_clamps_at_empty_buffer() {
    let table = started_game();
    play(&table, table.ann, "a");
    let outcome = play(&table, table.bob, "clear 5");
    assert_eq!(outcome.operation, Operation::Delete { num_deleted: 5 });
    assert_eq!(outcome.state.code(), "");
}

#[test]
fn test_clearline_removes_last_line() {
    let table = started_game();
    play(&table, table.ann, "a");
    play(&table, table.bob, "\\n");
    play(&table, table.ann, "b");
    let outcome = play(&table, table.bob, "clearline");
    assert_eq!(outcome.state.code(), "a");
}

#[test]
fn test_malformed_command_is_a_parse_error() {
    let table = started_game();
    let result = table.service.take_turn(table.game_id, table.ann, "xy");
    assert!(matches!(
        result,
        Err(BeeError::Parse(ParseError::MoreThanOneCharacter(_)))
    ));
}

#[test]
fn test_done_ends_inputting_and_schedules_scoring() {
    let mut table = started_game();
    play(&table, table.ann, "r");
    let outcome = play(&table, table.bob, "done");
    assert_eq!(outcome.next, NextActor::InputDone);
    assert!(*outcome.state.is_done());

    let info = table.service.game_info(table.game_id).expect("info");
    assert_eq!(info.game.status(), GameStatus::InputDone);
    assert_eq!(
        table.tasks.try_recv().ok(),
        Some(Task::Score {
            game_id: table.game_id
        })
    );

    let late = table.service.take_turn(table.game_id, table.ann, "x");
    assert!(matches!(
        late,
        Err(BeeError::WrongPhase {
            expected: GameStatus::Inputting,
            actual: GameStatus::InputDone,
        })
    ));
}

#[test]
fn test_scoring_is_idempotent() {
    let table = started_game();
    play(&table, table.ann, "done");

    let scoring = table.service.info_for_scoring(table.game_id).expect("scoring");
    assert_eq!(scoring.code, "");

    let results = vec![TestOutcome::Passed];
    let first = table
        .service
        .record_result(table.game_id, &results)
        .expect("first");
    assert!(matches!(first, ResultRecorded::Recorded(_)));

    let second = table
        .service
        .record_result(
            table.game_id,
            &[TestOutcome::ExecutionFailed {
                error: "late rerun".to_string(),
            }],
        )
        .expect("second");
    assert_eq!(second, ResultRecorded::AlreadyDone);

    let playback = table.service.info_for_playback(table.game_id).expect("playback");
    assert_eq!(playback.test_results.results(), &results);
    assert_eq!(playback.inputs.len(), 1);
}

#[test]
fn test_phases_never_move_backwards() {
    let table = started_game();
    let rejoin = table.service.join_game(table.game_id, table.bob);
    assert!(matches!(
        rejoin,
        Err(BeeError::WrongPhase {
            expected: GameStatus::NotStarted,
            actual: GameStatus::Inputting,
        })
    ));

    let early = table.service.record_result(table.game_id, &[]);
    assert!(matches!(early, Err(BeeError::WrongPhase { .. })));
}

#[test]
fn test_spectators_and_players_are_separated() {
    let table = started_game();
    let carol = *table
        .service
        .create_player("carol", None)
        .expect("carol")
        .id();
    play(&table, table.ann, "x");

    let state = table
        .service
        .spectate(table.game_id, carol)
        .expect("spectate")
        .expect("started");
    assert_eq!(state.code(), "x");

    assert!(matches!(
        table.service.spectate(table.game_id, table.ann),
        Err(BeeError::PlayerIsPlaying(_))
    ));
    assert!(matches!(
        table.service.watch_game_while_playing(table.game_id, carol),
        Err(BeeError::NotPlaying(_))
    ));
}

#[test]
fn test_audit_finds_log_consistent_with_snapshot() {
    let table = started_game();
    for (player, raw) in [
        (table.ann, "a"),
        (table.bob, "skip"),
        (table.bob, "b"),
        (table.ann, "clear"),
        (table.bob, "c"),
    ] {
        play(&table, player, raw);
    }

    let report = table.service.audit_game(table.game_id).expect("audit");
    assert!(report.violations.is_empty(), "{:?}", report.violations);
    assert_eq!(report.inputs, 6);
}
