//! Declared configuration and turn I/O types
//!
//! This module contains the types an integrator hands to the engine:
//! - Slot / Ability / Trace: the immutable conversation flow declaration
//! - MessageData / TurnInput / TurnOutput: per-turn input and output
//! - FillControl: the command handle passed to `on_fill` callbacks

mod ability;
mod control;
mod message;
mod slot;
mod turn;

pub use ability::{Ability, NextAbility, NextAbilityFn, OnCompleteFn, Trace, TraceFn};
pub use control::{FillControl, SlotCommand};
pub use message::{Entity, MessageData, OutputKind, OutputMessage};
pub use slot::{OnFillFn, QueryFn, RetryFn, Slot, SlotId, ValidateFn, ValidateResult};
pub use turn::{IncomingSlotValue, TurnInput, TurnOutput};

/// Error type produced by integrator-supplied callbacks.
///
/// A callback failure aborts the current turn; the engine does not catch or
/// retry it (the host surfaces the turn-level failure).
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;
