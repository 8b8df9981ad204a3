//! Outtake stage - drain the output queue into the turn result

use crate::state::{DialogueStore, Transition};
use crate::types::TurnOutput;

pub(crate) fn outtake(store: &mut DialogueStore) -> TurnOutput {
    let messages = store.state().output_queue.clone();
    store.dispatch(Transition::ClearOutputQueue);
    tracing::debug!(target: "colloquy::outtake", count = messages.len(), "turn output drained");
    TurnOutput { messages }
}
