//! Per-turn input and output envelopes

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::message::{MessageData, OutputMessage};

/// A direct slot submission supplied programmatically, outside the normal
/// prompt flow. Enters the same Fill validation path as a prompted answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingSlotValue {
    pub slot_name: String,
    pub ability_name: String,
    pub value: Value,
}

impl IncomingSlotValue {
    /// Create a direct slot submission
    pub fn new(
        ability_name: impl Into<String>,
        slot_name: impl Into<String>,
        value: Value,
    ) -> Self {
        Self {
            slot_name: slot_name.into(),
            ability_name: ability_name.into(),
            value,
        }
    }
}

/// Everything the host supplies for one turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnInput {
    /// The parsed user utterance, if the turn carries one
    #[serde(default)]
    pub message: Option<MessageData>,
    /// Direct slot submissions to apply before resolving the prompted slot
    #[serde(default)]
    pub slot_values: Vec<IncomingSlotValue>,
}

impl TurnInput {
    /// A turn carrying a parsed user message
    pub fn message(message: MessageData) -> Self {
        Self {
            message: Some(message),
            slot_values: Vec::new(),
        }
    }

    /// Add a direct slot submission to the turn
    pub fn with_slot_value(mut self, value: IncomingSlotValue) -> Self {
        self.slot_values.push(value);
        self
    }
}

/// The ordered outbound messages produced by one turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnOutput {
    pub messages: Vec<OutputMessage>,
}

impl TurnOutput {
    /// Message texts in output order, dropping the cause tags
    pub fn texts(&self) -> Vec<&str> {
        self.messages.iter().map(|m| m.text.as_str()).collect()
    }
}
