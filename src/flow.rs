//! Flow - the declared ability graph and its lookup helpers
//!
//! A `Flow` bundles the abilities an integrator declares once at engine
//! creation. Lookups that fail here indicate a broken declaration, not a
//! recoverable conversation condition, and surface as [`FlowError`].

use thiserror::Error;

use crate::types::{Ability, Slot, SlotId, Trace};

/// Fatal misconfiguration of the declared ability graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("ability `{0}` is not declared in the flow")]
    UnknownAbility(String),

    #[error("slot `{slot}` is not declared on ability `{ability}`")]
    UnknownSlot { ability: String, slot: String },

    #[error("ability `{ability}` declares traces but none matches slot `{slot}`")]
    MissingTrace { ability: String, slot: String },

    #[error("no confirmation was requested through slot `{slot}` on ability `{ability}`")]
    NoConfirmationRequested { ability: String, slot: String },
}

/// The immutable conversation-flow declaration.
#[derive(Debug)]
pub struct Flow<G> {
    abilities: Vec<Ability<G>>,
}

impl<G: Send + Sync + 'static> Flow<G> {
    /// Create a flow from declared abilities
    pub fn new(abilities: Vec<Ability<G>>) -> Self {
        Self { abilities }
    }

    /// All declared abilities, in declaration order
    pub fn abilities(&self) -> &[Ability<G>] {
        &self.abilities
    }

    /// Whether an ability with this name is declared
    pub fn has_ability(&self, name: &str) -> bool {
        self.abilities.iter().any(|a| a.name == name)
    }

    /// Look up an ability by name
    pub fn ability(&self, name: &str) -> Result<&Ability<G>, FlowError> {
        self.abilities
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| FlowError::UnknownAbility(name.to_string()))
    }

    /// Resolve a slot id against its declaring ability
    pub fn slot(&self, id: &SlotId) -> Result<&Slot<G>, FlowError> {
        let ability = self.ability(&id.ability_name)?;
        ability
            .slot(&id.slot_name)
            .ok_or_else(|| FlowError::UnknownSlot {
                ability: id.ability_name.clone(),
                slot: id.slot_name.clone(),
            })
    }

    /// Locate the trace declared for a slot.
    ///
    /// An ability with an empty trace list has no inference declared
    /// (`Ok(None)`); a non-empty list with no entry for the slot is a broken
    /// declaration.
    pub fn trace(&self, id: &SlotId) -> Result<Option<&Trace<G>>, FlowError> {
        let ability = self.ability(&id.ability_name)?;
        if ability.traces.is_empty() {
            return Ok(None);
        }
        ability
            .traces
            .iter()
            .find(|t| t.slot_name == id.slot_name)
            .map(Some)
            .ok_or_else(|| FlowError::MissingTrace {
                ability: id.ability_name.clone(),
                slot: id.slot_name.clone(),
            })
    }

    /// Total number of declared slots across all abilities. Bounds the
    /// evaluate loop.
    pub fn total_slot_count(&self) -> usize {
        self.abilities.iter().map(|a| a.slots.len()).sum()
    }
}
