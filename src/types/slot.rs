//! Slot declaration types
//!
//! A Slot is a single piece of information the engine collects: a required
//! prompt callback plus optional validate / retry / fill-effect capabilities.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::control::FillControl;
use super::message::MessageData;
use super::CallbackError;

/// Composite key identifying a slot within the flow.
///
/// `(ability_name, slot_name)` pairs are unique within a declared ability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotId {
    pub ability_name: String,
    pub slot_name: String,
}

impl SlotId {
    /// Create a new slot id
    pub fn new(ability_name: impl Into<String>, slot_name: impl Into<String>) -> Self {
        Self {
            ability_name: ability_name.into(),
            slot_name: slot_name.into(),
        }
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.ability_name, self.slot_name)
    }
}

/// Outcome of a slot's `validate` callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateResult {
    /// Whether the submitted value is acceptable
    pub is_valid: bool,
    /// Reason emitted as a retry message when invalid
    pub reason: Option<String>,
}

impl ValidateResult {
    /// A passing validation result
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            reason: None,
        }
    }

    /// A failing validation result with a retry reason
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            reason: Some(reason.into()),
        }
    }

    /// A failing validation result with no reason text
    pub fn invalid_silent() -> Self {
        Self {
            is_valid: false,
            reason: None,
        }
    }
}

/// Prompt-generation callback. Produces the question asked for this slot.
pub type QueryFn<G> =
    Arc<dyn Fn(Arc<G>) -> BoxFuture<'static, Result<String, CallbackError>> + Send + Sync>;

/// Validation callback over the submitted value and the turn's message data.
pub type ValidateFn = Arc<
    dyn Fn(Value, MessageData) -> BoxFuture<'static, Result<ValidateResult, CallbackError>>
        + Send
        + Sync,
>;

/// Retry-message callback, invoked with the rejected value and the slot's
/// failed-attempt count.
pub type RetryFn<G> = Arc<
    dyn Fn(Arc<G>, Value, u32) -> BoxFuture<'static, Result<String, CallbackError>> + Send + Sync,
>;

/// Fill side-effect callback, run at Execute time after the slot is filled.
/// An optional returned string becomes an additional output message. The
/// [`FillControl`] handle records follow-up slot commands.
pub type OnFillFn<G> = Arc<
    dyn Fn(Arc<G>, Value, FillControl) -> BoxFuture<'static, Result<Option<String>, CallbackError>>
        + Send
        + Sync,
>;

/// A single piece of information to collect within an ability.
///
/// Built variant-record style: `query` is always present, the remaining
/// capabilities are optional and attached via builder methods.
pub struct Slot<G> {
    /// Slot name, unique within its ability
    pub name: String,
    /// Whether the slot is enabled when first activated
    pub default_enabled: bool,
    /// Explicit ordering hint; lower values are asked first
    pub order: Option<i32>,
    pub(crate) query: QueryFn<G>,
    pub(crate) validate: Option<ValidateFn>,
    pub(crate) retry: Option<RetryFn<G>>,
    pub(crate) on_fill: Option<OnFillFn<G>>,
}

impl<G: Send + Sync + 'static> Slot<G> {
    /// Create a slot with its prompt callback
    pub fn new<F, Fut>(name: impl Into<String>, query: F) -> Self
    where
        F: Fn(Arc<G>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, CallbackError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            default_enabled: true,
            order: None,
            query: Arc::new(move |storage| Box::pin(query(storage))),
            validate: None,
            retry: None,
            on_fill: None,
        }
    }

    /// Attach a validation callback
    pub fn with_validate<F, Fut>(mut self, validate: F) -> Self
    where
        F: Fn(Value, MessageData) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ValidateResult, CallbackError>> + Send + 'static,
    {
        self.validate = Some(Arc::new(move |value, message| {
            Box::pin(validate(value, message))
        }));
        self
    }

    /// Attach a retry-message callback
    pub fn with_retry<F, Fut>(mut self, retry: F) -> Self
    where
        F: Fn(Arc<G>, Value, u32) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, CallbackError>> + Send + 'static,
    {
        self.retry = Some(Arc::new(move |storage, value, turn_count| {
            Box::pin(retry(storage, value, turn_count))
        }));
        self
    }

    /// Attach a fill side-effect callback
    pub fn with_on_fill<F, Fut>(mut self, on_fill: F) -> Self
    where
        F: Fn(Arc<G>, Value, FillControl) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<String>, CallbackError>> + Send + 'static,
    {
        self.on_fill = Some(Arc::new(move |storage, value, control| {
            Box::pin(on_fill(storage, value, control))
        }));
        self
    }

    /// Set an explicit ordering hint
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    /// Mark the slot as disabled until explicitly enabled or filled
    pub fn disabled_by_default(mut self) -> Self {
        self.default_enabled = false;
        self
    }

    /// Whether the slot declares a fill side-effect
    pub fn has_on_fill(&self) -> bool {
        self.on_fill.is_some()
    }
}

impl<G> fmt::Debug for Slot<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("name", &self.name)
            .field("default_enabled", &self.default_enabled)
            .field("order", &self.order)
            .field("validate", &self.validate.is_some())
            .field("retry", &self.retry.is_some())
            .field("on_fill", &self.on_fill.is_some())
            .finish()
    }
}
