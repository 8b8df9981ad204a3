//! State persistence boundary
//!
//! The engine is stateless between turns: the host reads the prior
//! [`DialogueState`] through this trait before a turn and the engine saves
//! the result after. Any backend works as long as the blob round-trips
//! through serde unchanged.

use async_trait::async_trait;

use crate::state::DialogueState;
use crate::types::CallbackError;

/// Persistence for the per-conversation state blob.
#[async_trait]
pub trait StateStorage: Send + Sync {
    /// Load the persisted state, `None` for a brand-new conversation.
    async fn read(&self) -> Result<Option<DialogueState>, CallbackError>;

    /// Persist the state produced by the turn.
    async fn save(&self, state: &DialogueState) -> Result<(), CallbackError>;
}

/// In-memory [`StateStorage`] for tests and single-process hosts.
#[derive(Debug, Default)]
pub struct InMemoryStateStorage {
    state: std::sync::RwLock<Option<DialogueState>>,
}

impl InMemoryStateStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with an existing state blob
    pub fn with_state(state: DialogueState) -> Self {
        Self {
            state: std::sync::RwLock::new(Some(state)),
        }
    }
}

#[async_trait]
impl StateStorage for InMemoryStateStorage {
    async fn read(&self) -> Result<Option<DialogueState>, CallbackError> {
        let guard = self.state.read().unwrap_or_else(|e| e.into_inner());
        Ok(guard.clone())
    }

    async fn save(&self, state: &DialogueState) -> Result<(), CallbackError> {
        let mut guard = self.state.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(state.clone());
        Ok(())
    }
}
