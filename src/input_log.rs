//! Chunked, append-only input log.
//!
//! Each game's inputs are stored in ranked chunks. The log is never read on
//! the turn path except for its tail; it exists for replay and audit.

use tracing::{debug, instrument};

use crate::bee::{GameState, Input};
use crate::store::{GameTxn, InputChunk, StoreError};
use crate::types::GameId;

/// Appends an input to a game's log.
///
/// When the tail chunk already holds more than `chunk_size` inputs a new
/// chunk is started with the next rank.
#[instrument(skip(txn, input))]
pub fn append_input(
    txn: &mut dyn GameTxn,
    game_id: GameId,
    input: Input,
    chunk_size: usize,
) -> Result<(), StoreError> {
    match txn.last_input_chunk(game_id)? {
        None => {
            debug!("Starting first chunk");
            txn.insert_input_chunk(&InputChunk::new(game_id, 0, vec![input]))
        }
        Some(tail) if tail.inputs().len() > chunk_size => {
            let rank = tail.rank() + 1;
            debug!(rank, "Rotating to new chunk");
            txn.insert_input_chunk(&InputChunk::new(game_id, rank, vec![input]))
        }
        Some(mut tail) => {
            tail.push(input);
            txn.replace_input_chunk(&tail)
        }
    }
}

/// Every input of a game, oldest first.
#[instrument(skip(txn))]
pub fn all_inputs(txn: &mut dyn GameTxn, game_id: GameId) -> Result<Vec<Input>, StoreError> {
    let inputs: Vec<Input> = txn
        .input_chunks(game_id)?
        .into_iter()
        .flat_map(InputChunk::into_inputs)
        .collect();
    debug!(count = inputs.len(), "Loaded input log");
    Ok(inputs)
}

/// The most recent input of a game.
#[instrument(skip(txn))]
pub fn last_input(txn: &mut dyn GameTxn, game_id: GameId) -> Result<Option<Input>, StoreError> {
    Ok(txn
        .last_input_chunk(game_id)?
        .and_then(|chunk| chunk.inputs().last().copied()))
}

/// Replays a log into one state frame per input, starting from the
/// initial state.
#[instrument(skip(inputs), fields(count = inputs.len()))]
pub fn replay(inputs: &[Input]) -> Vec<GameState> {
    let mut frames = Vec::with_capacity(inputs.len() + 1);
    let mut state = GameState::new();
    frames.push(state.clone());
    for input in inputs {
        state = state.apply(input);
        frames.push(state.clone());
    }
    frames
}
