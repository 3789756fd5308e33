//! Property tests over random command sequences.

use proptest::prelude::*;

use codebee::{
    BeeConfig, GameService, GameStore, MemoryStore, NewProblem, NextActor, Operation, Scheduler,
    Side, all_inputs,
};

fn command() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "[a-z(){};=+ ]",
        1 => Just("\\n".to_string()),
        1 => (1u32..4).prop_map(|n| format!("clear {}", n)),
        1 => Just("clear".to_string()),
        1 => (1u32..3).prop_map(|n| format!("skip {}", n)),
        1 => Just("clearline".to_string()),
    ]
}

/// Plays `commands` in a fresh game, each by whoever is due. Returns the
/// service, the game id and the expected buffer.
fn play_all(commands: &[String]) -> (GameService<MemoryStore>, i64, String) {
    let (scheduler, _rx) = Scheduler::channel();
    let service = GameService::new(
        MemoryStore::new(),
        BeeConfig::default().with_input_chunk_size(3),
        scheduler,
    );
    let ann = *service.create_player("ann", None).expect("ann").id();
    let bob = *service.create_player("bob", None).expect("bob").id();
    let problem = service
        .create_problem(NewProblem::new(None, "p".to_string(), Vec::new(), true))
        .expect("problem");
    let game_id = service.start_game(ann).expect("start");
    service.join_game(game_id, bob).expect("join");
    service
        .select_problem(game_id, ann, *problem.id())
        .expect("select");

    // Model of the buffer, in chars.
    let mut model: Vec<char> = Vec::new();
    let mut due = ann;
    for raw in commands {
        let outcome = service
            .take_turn(game_id, due, raw)
            .unwrap_or_else(|e| panic!("turn {:?} failed: {}", raw, e));
        match outcome.operation {
            Operation::Add { input } => model.push(input),
            Operation::Delete { num_deleted } => {
                let keep = model.len().saturating_sub(num_deleted as usize);
                model.truncate(keep);
            }
            _ => {}
        }
        due = match outcome.next {
            NextActor::Human(id) => id,
            other => panic!("unexpected next actor {:?}", other),
        };
    }
    (service, game_id, model.into_iter().collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_log_replays_to_snapshot(commands in prop::collection::vec(command(), 0..40)) {
        let (service, game_id, _) = play_all(&commands);
        let report = service.audit_game(game_id).expect("audit");
        prop_assert!(report.violations.is_empty(), "{:?}", report.violations);
    }

    #[test]
    fn prop_buffer_matches_model(commands in prop::collection::vec(command(), 0..40)) {
        let (service, game_id, model) = play_all(&commands);
        let state = service
            .spectate(game_id, -1)
            .expect("spectate")
            .expect("started");
        prop_assert_eq!(state.code(), &model);
    }

    #[test]
    fn prop_skips_are_conserved(commands in prop::collection::vec(command(), 0..40)) {
        let (service, game_id, _) = play_all(&commands);
        let inputs = service
            .store()
            .transaction(|txn| all_inputs(txn, game_id))
            .expect("inputs");
        let state = service
            .spectate(game_id, -1)
            .expect("spectate")
            .expect("started");

        for side in [Side::Player1, Side::Player2] {
            let imposed: u32 = inputs
                .iter()
                .filter(|i| i.side() == side.opponent())
                .map(|i| match i.operation {
                    Operation::Skip { num_skips } => num_skips,
                    _ => 0,
                })
                .sum();
            let consumed = inputs
                .iter()
                .filter(|i| i.side() == side && i.operation == Operation::Skipped)
                .count() as u32;
            prop_assert_eq!(imposed, consumed + state.skips(side));
        }
    }

    #[test]
    fn prop_turns_alternate(commands in prop::collection::vec(command(), 1..40)) {
        let (service, game_id, _) = play_all(&commands);
        let inputs = service
            .store()
            .transaction(|txn| all_inputs(txn, game_id))
            .expect("inputs");
        prop_assert_eq!(inputs[0].side(), Side::Player1);
        for pair in inputs.windows(2) {
            prop_assert_ne!(pair[0].side(), pair[1].side());
        }
    }
}
