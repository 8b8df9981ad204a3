//! Ability declaration types
//!
//! An Ability is a named unit of work: an ordered set of slots, optional
//! trace-inference declarations, a completion callback, and an optional
//! chaining resolver.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::state::{DialogueState, FillRecord};

use super::slot::Slot;
use super::CallbackError;

/// Result of an ability's `next_ability` resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct NextAbility {
    /// The ability to chain into
    pub ability_name: String,
    /// Optional introduction message, queued before the next prompt
    pub message: Option<String>,
}

impl NextAbility {
    /// Chain into an ability with no introduction message
    pub fn new(ability_name: impl Into<String>) -> Self {
        Self {
            ability_name: ability_name.into(),
            message: None,
        }
    }

    /// Attach an introduction message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Completion callback: receives the storage handle and the latest submitted
/// value for each of the ability's slots. An optional returned string becomes
/// the completion output message.
pub type OnCompleteFn<G> = Arc<
    dyn Fn(
            Arc<G>,
            HashMap<String, Value>,
        ) -> BoxFuture<'static, Result<Option<String>, CallbackError>>
        + Send
        + Sync,
>;

/// Chaining resolver: decides which ability (if any) follows a completed one,
/// given the storage handle and a snapshot of the engine state.
pub type NextAbilityFn<G> = Arc<
    dyn Fn(Arc<G>, DialogueState) -> BoxFuture<'static, Result<Option<NextAbility>, CallbackError>>
        + Send
        + Sync,
>;

/// History-inference callback: may fill a slot from prior fill records
/// without prompting. `None` falls through to prompting.
pub type TraceFn<G> = Arc<
    dyn Fn(Vec<FillRecord>, Arc<G>) -> BoxFuture<'static, Result<Option<Value>, CallbackError>>
        + Send
        + Sync,
>;

/// History-inference declaration for one slot.
pub struct Trace<G> {
    /// Name of the slot this trace can fill
    pub slot_name: String,
    pub(crate) get_value: Option<TraceFn<G>>,
}

impl<G: Send + Sync + 'static> Trace<G> {
    /// Declare a trace with no inference function (the slot is always
    /// prompted)
    pub fn new(slot_name: impl Into<String>) -> Self {
        Self {
            slot_name: slot_name.into(),
            get_value: None,
        }
    }

    /// Declare a trace with an inference function
    pub fn with_get_value<F, Fut>(slot_name: impl Into<String>, get_value: F) -> Self
    where
        F: Fn(Vec<FillRecord>, Arc<G>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Value>, CallbackError>> + Send + 'static,
    {
        Self {
            slot_name: slot_name.into(),
            get_value: Some(Arc::new(move |records, storage| {
                Box::pin(get_value(records, storage))
            })),
        }
    }

    /// Whether the trace carries an inference function
    pub fn can_infer(&self) -> bool {
        self.get_value.is_some()
    }
}

impl<G> PartialEq for Trace<G> {
    fn eq(&self, other: &Self) -> bool {
        self.slot_name == other.slot_name && self.get_value.is_some() == other.get_value.is_some()
    }
}

impl<G> fmt::Debug for Trace<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trace")
            .field("slot_name", &self.slot_name)
            .field("get_value", &self.get_value.is_some())
            .finish()
    }
}

/// A named unit of work composed of an ordered set of slots.
pub struct Ability<G> {
    /// Ability name, unique within the flow
    pub name: String,
    /// Ordered slot declarations
    pub slots: Vec<Slot<G>>,
    /// Trace-inference declarations; empty means no inference is declared
    pub traces: Vec<Trace<G>>,
    pub(crate) on_complete: OnCompleteFn<G>,
    pub(crate) next_ability: Option<NextAbilityFn<G>>,
}

impl<G: Send + Sync + 'static> Ability<G> {
    /// Create an ability with its slots and completion callback
    pub fn new<F, Fut>(name: impl Into<String>, slots: Vec<Slot<G>>, on_complete: F) -> Self
    where
        F: Fn(Arc<G>, HashMap<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<String>, CallbackError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            slots,
            traces: Vec::new(),
            on_complete: Arc::new(move |storage, submitted| Box::pin(on_complete(storage, submitted))),
            next_ability: None,
        }
    }

    /// Attach trace-inference declarations
    pub fn with_traces(mut self, traces: Vec<Trace<G>>) -> Self {
        self.traces = traces;
        self
    }

    /// Attach a chaining resolver
    pub fn with_next_ability<F, Fut>(mut self, next_ability: F) -> Self
    where
        F: Fn(Arc<G>, DialogueState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<NextAbility>, CallbackError>> + Send + 'static,
    {
        self.next_ability = Some(Arc::new(move |storage, state| {
            Box::pin(next_ability(storage, state))
        }));
        self
    }

    /// Look up a slot declaration by name
    pub fn slot(&self, slot_name: &str) -> Option<&Slot<G>> {
        self.slots.iter().find(|s| s.name == slot_name)
    }
}

impl<G> fmt::Debug for Ability<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ability")
            .field("name", &self.name)
            .field("slots", &self.slots)
            .field("traces", &self.traces)
            .field("next_ability", &self.next_ability.is_some())
            .finish()
    }
}
