//! Centralized per-conversation state
//!
//! `DialogueState` is the single mutable blob the engine operates on. It is
//! owned by the engine for the duration of one turn, mutated only through the
//! closed [`Transition`] set, and persisted by the host between turns.

mod store;
mod transition;

pub use store::DialogueStore;
pub use transition::{reduce, Transition};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{MessageData, OutputMessage, SlotId};

/// Activation record for one slot. A slot appears here once its enabled flag
/// has been determined (first prompt, fill, or explicit enable/disable).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotStatus {
    pub id: SlotId,
    pub is_enabled: bool,
    pub is_done: bool,
    /// Back-reference to the slot that requested this one as a confirmation
    #[serde(default)]
    pub requesting_slot: Option<String>,
}

impl SlotStatus {
    /// Create a fresh activation record
    pub fn new(id: SlotId, is_enabled: bool) -> Self {
        Self {
            id,
            is_enabled,
            is_done: false,
            requesting_slot: None,
        }
    }
}

/// One entry in the append-only fill-record log. Never mutated, only
/// appended; trace inference reads this history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillRecord {
    pub id: SlotId,
    pub value: Value,
    /// Turn index on which the value was recorded
    pub turn: u64,
    pub recorded_at: DateTime<Utc>,
}

/// Why a slot sits on the prompt stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptReason {
    /// An original query for the slot's value
    Query,
    /// A confirmation sub-dialogue layered on top of another slot
    Confirm,
}

/// One pending-question entry. Index 0 of the stack is the question currently
/// awaiting a reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptedSlot {
    pub id: SlotId,
    pub reason: PromptReason,
    /// Whether Execute has already issued the question
    pub prompted: bool,
    /// Failed-attempt count for this prompt
    pub turn_count: u32,
}

/// Completion record for one ability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityStatus {
    pub ability_name: String,
    pub is_completed: bool,
}

/// A pending `on_fill` invocation queued during Fill, drained by Execute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnFillEntry {
    pub id: SlotId,
    pub value: Value,
}

/// The canonical per-conversation state blob.
///
/// Created empty at conversation start, read by the host before each turn and
/// written back after. `filled_slots_on_turn` and `abilities_complete_on_turn`
/// are turn-scoped scratch, reset by Intake.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogueState {
    #[serde(default)]
    pub message_data: Option<MessageData>,
    #[serde(default)]
    pub slot_status: Vec<SlotStatus>,
    #[serde(default)]
    pub slot_records: Vec<FillRecord>,
    #[serde(default)]
    pub ability_status: Vec<AbilityStatus>,
    #[serde(default)]
    pub prompted_slot_stack: Vec<PromptedSlot>,
    #[serde(default)]
    pub focused_ability: Option<String>,
    #[serde(default)]
    pub default_ability: Option<String>,
    #[serde(default)]
    pub output_queue: Vec<OutputMessage>,
    #[serde(default)]
    pub filled_slots_on_turn: Vec<SlotId>,
    #[serde(default)]
    pub abilities_complete_on_turn: Vec<String>,
    #[serde(default)]
    pub run_on_fill_stack: Vec<OnFillEntry>,
    /// Monotonically increasing turn index, stamped onto fill records
    #[serde(default)]
    pub turn: u64,
}
