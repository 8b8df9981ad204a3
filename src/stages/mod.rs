//! The five-stage turn pipeline
//!
//! Control flow per turn: Intake → Fill → Evaluate → Execute → Outtake, each
//! stage reading and writing the shared store through dispatched transitions.
//! Evaluate may loop after a successful trace inference.

mod evaluate;
mod execute;
mod fill;
mod intake;
mod outtake;

pub(crate) use evaluate::evaluate;
pub(crate) use execute::execute;
pub(crate) use fill::fill;
pub(crate) use intake::intake;
pub(crate) use outtake::outtake;

use thiserror::Error;

use crate::flow::FlowError;
use crate::types::CallbackError;

/// A turn-level pipeline failure. Validation failures are not errors; these
/// are broken declarations, failed user callbacks, or a failing persistence
/// layer.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error("callback `{context}` failed: {source}")]
    Callback {
        context: String,
        #[source]
        source: CallbackError,
    },

    #[error("state storage failed: {source}")]
    StateStorage {
        #[source]
        source: CallbackError,
    },
}

impl TurnError {
    pub(crate) fn callback(context: impl Into<String>, source: CallbackError) -> Self {
        Self::Callback {
            context: context.into(),
            source,
        }
    }
}
