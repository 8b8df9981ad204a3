//! DialogueStore - dispatch surface over the state blob

use super::{reduce, DialogueState, Transition};

/// Holds the state blob for the duration of one turn and applies named
/// transitions. Synchronous and total: dispatch never fails for well-formed
/// transitions.
#[derive(Debug, Default)]
pub struct DialogueStore {
    state: DialogueState,
}

impl DialogueStore {
    /// Wrap an existing state blob (host-read, or default on first turn)
    pub fn new(state: DialogueState) -> Self {
        Self { state }
    }

    /// Apply one transition
    pub fn dispatch(&mut self, transition: Transition) {
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, transition);
    }

    /// Current state snapshot
    pub fn state(&self) -> &DialogueState {
        &self.state
    }

    /// Give the state blob back to the host for persistence
    pub fn into_state(self) -> DialogueState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_applies_transition() {
        let mut store = DialogueStore::default();
        store.dispatch(Transition::SetDefaultAbility("order".to_string()));

        assert_eq!(store.state().default_ability, Some("order".to_string()));
    }
}
