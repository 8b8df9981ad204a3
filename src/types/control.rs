//! FillControl - command handle passed to `on_fill` callbacks
//!
//! State transitions stay pure, so user callbacks never touch the store
//! directly. `on_fill` records slot commands on this handle; the Execute
//! stage drains them and applies the matching transitions after the callback
//! returns.

use std::sync::{Arc, Mutex};

use serde_json::Value;

/// A slot command recorded by an `on_fill` callback.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotCommand {
    /// Fill another slot through the normal validation path.
    /// `ability_name` defaults to the filling slot's ability when `None`.
    FillSlot {
        slot_name: String,
        ability_name: Option<String>,
        value: Value,
    },
    /// Enable a slot in the filling slot's ability
    EnableSlot { slot_name: String },
    /// Disable a slot in the filling slot's ability
    DisableSlot { slot_name: String },
    /// Open a confirmation sub-dialogue: prompt `slot_name` to confirm the
    /// value just filled into the requesting slot
    RequireConfirmation { slot_name: String },
    /// Resolve a pending confirmation in favor of the requesting slot
    Accept,
    /// Resolve a pending confirmation against the requesting slot, reopening
    /// it for prompting
    Deny,
}

/// Command recorder handed to `on_fill` callbacks.
///
/// Cloneable; all clones share the same command list.
#[derive(Debug, Clone, Default)]
pub struct FillControl {
    commands: Arc<Mutex<Vec<SlotCommand>>>,
}

impl FillControl {
    /// Create an empty control handle
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill another slot with a value, entering the validation path
    pub fn fill_slot(
        &self,
        ability_name: impl Into<String>,
        slot_name: impl Into<String>,
        value: Value,
    ) {
        self.push(SlotCommand::FillSlot {
            slot_name: slot_name.into(),
            ability_name: Some(ability_name.into()),
            value,
        });
    }

    /// Fill a sibling slot (same ability) with a value
    pub fn fill_sibling_slot(&self, slot_name: impl Into<String>, value: Value) {
        self.push(SlotCommand::FillSlot {
            slot_name: slot_name.into(),
            ability_name: None,
            value,
        });
    }

    /// Enable a sibling slot
    pub fn enable_slot(&self, slot_name: impl Into<String>) {
        self.push(SlotCommand::EnableSlot {
            slot_name: slot_name.into(),
        });
    }

    /// Disable a sibling slot
    pub fn disable_slot(&self, slot_name: impl Into<String>) {
        self.push(SlotCommand::DisableSlot {
            slot_name: slot_name.into(),
        });
    }

    /// Request a confirmation sub-dialogue on a sibling slot
    pub fn require_confirmation(&self, slot_name: impl Into<String>) {
        self.push(SlotCommand::RequireConfirmation {
            slot_name: slot_name.into(),
        });
    }

    /// Accept the value the current confirmation slot is confirming
    pub fn accept(&self) {
        self.push(SlotCommand::Accept);
    }

    /// Deny the value the current confirmation slot is confirming
    pub fn deny(&self) {
        self.push(SlotCommand::Deny);
    }

    fn push(&self, command: SlotCommand) {
        self.lock().push(command);
    }

    /// Drain the recorded commands in the order they were issued
    pub(crate) fn take_commands(&self) -> Vec<SlotCommand> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SlotCommand>> {
        // Callbacks run sequentially; a poisoned lock can only come from a
        // panicked callback, which already aborted the turn.
        self.commands.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fill_control_records_commands_in_order() {
        let control = FillControl::new();
        control.fill_sibling_slot("other", json!("x"));
        control.require_confirmation("confirmOther");

        let commands = control.take_commands();
        assert_eq!(
            commands,
            vec![
                SlotCommand::FillSlot {
                    slot_name: "other".to_string(),
                    ability_name: None,
                    value: json!("x"),
                },
                SlotCommand::RequireConfirmation {
                    slot_name: "confirmOther".to_string(),
                },
            ]
        );
        assert!(control.take_commands().is_empty());
    }

    #[test]
    fn test_fill_control_clones_share_command_list() {
        let control = FillControl::new();
        let clone = control.clone();
        clone.accept();

        assert_eq!(control.take_commands(), vec![SlotCommand::Accept]);
    }
}
