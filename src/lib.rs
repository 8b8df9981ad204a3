//! # Colloquy
//!
//! A turn-based slot-filling dialogue engine.
//!
//! This crate contains:
//! - Slot / Ability / Trace declarations describing a conversation flow
//! - A centralized per-conversation state blob with pure, named transitions
//! - The five-stage turn pipeline: Intake, Fill, Evaluate, Execute, Outtake
//! - A persistence boundary for the state blob between turns
//!
//! This crate does NOT care about:
//! - How utterances are parsed into intents and entities
//! - What channel the conversation runs over
//! - How the integrator's own data is stored
//!
//! The host parses each user turn externally, hands the result to
//! [`DialogueEngine::run_turn`], and renders the returned messages. All
//! conversation memory lives in the [`state::DialogueState`] blob the host
//! persists between turns.

pub mod engine;
pub mod flow;
pub mod selectors;
mod stages;
pub mod state;
pub mod storage;
mod trace;
pub mod types;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::engine::{DialogueEngine, TurnError};
    pub use crate::flow::{Flow, FlowError};
    pub use crate::state::{DialogueState, DialogueStore, Transition};
    pub use crate::storage::{InMemoryStateStorage, StateStorage};
    pub use crate::types::{
        Ability, CallbackError, Entity, FillControl, IncomingSlotValue, MessageData, NextAbility,
        OutputKind, OutputMessage, Slot, SlotCommand, SlotId, Trace, TurnInput, TurnOutput,
        ValidateResult,
    };
}

// Re-export key types at crate root
pub use engine::{DialogueEngine, TurnError};
pub use flow::{Flow, FlowError};
pub use state::DialogueState;
pub use storage::{InMemoryStateStorage, StateStorage};
pub use types::{
    Ability, MessageData, NextAbility, Slot, SlotId, Trace, TurnInput, TurnOutput, ValidateResult,
};
