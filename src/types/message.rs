//! Message types: parsed turn input and tagged output messages

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single entity extracted by the external language-understanding
/// component. An entity whose `name` matches the prompted slot supplies that
/// slot's value in place of the raw message text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Entity name (matched against slot names)
    pub name: String,
    /// Extracted value
    pub value: Value,
    /// Source text span, if the extractor provides one
    #[serde(default)]
    pub text: Option<String>,
}

impl Entity {
    /// Create a new entity
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
            text: None,
        }
    }
}

/// The parsed user turn as produced by the external NLU component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageData {
    /// Raw utterance text
    pub raw_text: String,
    /// Detected intent, if any
    #[serde(default)]
    pub intent: Option<String>,
    /// Extracted entities
    #[serde(default)]
    pub entities: Vec<Entity>,
}

impl MessageData {
    /// Create message data from raw text
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            intent: None,
            entities: Vec::new(),
        }
    }

    /// Set the detected intent
    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = Some(intent.into());
        self
    }

    /// Add an extracted entity
    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entities.push(entity);
        self
    }
}

/// Cause tag on an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    /// A slot's prompt question
    Prompt,
    /// A validation-failure / retry message
    Retry,
    /// A message returned by a slot's `on_fill`
    SlotFill,
    /// A message returned by an ability's `on_complete`
    AbilityComplete,
    /// A chained-ability introduction message
    NextAbility,
}

/// One outbound message produced during a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputMessage {
    /// Message text to render
    pub text: String,
    /// Why the message was produced
    pub kind: OutputKind,
}

impl OutputMessage {
    /// Create a new output message
    pub fn new(text: impl Into<String>, kind: OutputKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }
}
