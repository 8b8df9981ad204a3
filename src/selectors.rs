//! Pure read-only projections over the state blob
//!
//! Selectors never mutate; stages use them to interrogate state between
//! dispatches.

use crate::flow::FlowError;
use crate::state::{DialogueState, PromptedSlot, SlotStatus};
use crate::types::{MessageData, SlotId};

use serde_json::Value;

/// The prompt currently awaiting an answer, if any (stack top).
pub fn prompted_stack_top(state: &DialogueState) -> Option<&PromptedSlot> {
    state.prompted_slot_stack.first()
}

/// Whether the stack-top question has already been issued.
pub fn is_top_prompted(state: &DialogueState) -> bool {
    prompted_stack_top(state).is_some_and(|p| p.prompted)
}

/// Activation record for a slot, if it has been activated.
pub fn slot_status_for<'a>(state: &'a DialogueState, id: &SlotId) -> Option<&'a SlotStatus> {
    state.slot_status.iter().find(|s| &s.id == id)
}

/// Failed-attempt count for a prompted slot (0 when not on the stack).
pub fn slot_turn_count(state: &DialogueState, id: &SlotId) -> u32 {
    state
        .prompted_slot_stack
        .iter()
        .find(|p| &p.id == id)
        .map_or(0, |p| p.turn_count)
}

/// Resolve a confirmation slot back to the slot that requested it.
///
/// Asking for the originating slot when no confirmation was requested is a
/// broken flow, not a conversation condition.
pub fn requesting_slot_for(state: &DialogueState, id: &SlotId) -> Result<SlotId, FlowError> {
    let origin = slot_status_for(state, id)
        .and_then(|s| s.requesting_slot.clone())
        .ok_or_else(|| FlowError::NoConfirmationRequested {
            ability: id.ability_name.clone(),
            slot: id.slot_name.clone(),
        })?;
    Ok(SlotId::new(id.ability_name.clone(), origin))
}

/// Activated slots of an ability that are enabled but not yet done.
pub fn unfilled_enabled_slots<'a>(
    state: &'a DialogueState,
    ability_name: &str,
) -> Vec<&'a SlotStatus> {
    state
        .slot_status
        .iter()
        .filter(|s| s.id.ability_name == ability_name && s.is_enabled && !s.is_done)
        .collect()
}

/// Whether an ability has been recorded as completed.
pub fn is_ability_completed(state: &DialogueState, ability_name: &str) -> bool {
    state
        .ability_status
        .iter()
        .any(|a| a.ability_name == ability_name && a.is_completed)
}

/// Latest recorded value for a slot, if any.
pub fn latest_record_value<'a>(state: &'a DialogueState, id: &SlotId) -> Option<&'a Value> {
    state
        .slot_records
        .iter()
        .rev()
        .find(|r| &r.id == id)
        .map(|r| &r.value)
}

/// The turn's parsed message data, or an empty default when the turn carried
/// no message.
pub fn message_data(state: &DialogueState) -> MessageData {
    state.message_data.clone().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{reduce, FillRecord, PromptReason, Transition};
    use serde_json::json;

    fn slot(name: &str) -> SlotId {
        SlotId::new("order", name)
    }

    #[test]
    fn test_requesting_slot_lookup_errors_without_request() {
        let state = reduce(
            DialogueState::default(),
            Transition::SetSlotDone {
                id: slot("size"),
                done: true,
            },
        );

        assert!(matches!(
            requesting_slot_for(&state, &slot("size")),
            Err(FlowError::NoConfirmationRequested { .. })
        ));
    }

    #[test]
    fn test_requesting_slot_lookup_resolves_link() {
        let state = reduce(
            DialogueState::default(),
            Transition::RequestConfirmation {
                origin: slot("address"),
                confirming: slot("confirmAddress"),
            },
        );

        assert_eq!(
            requesting_slot_for(&state, &slot("confirmAddress")),
            Ok(slot("address"))
        );
    }

    #[test]
    fn test_unfilled_enabled_slots_excludes_done_and_disabled() {
        let mut state = DialogueState::default();
        for t in [
            Transition::SetSlotDone {
                id: slot("size"),
                done: true,
            },
            Transition::SetSlotEnabled {
                id: slot("topping"),
                enabled: false,
            },
            Transition::SetSlotEnabled {
                id: slot("address"),
                enabled: true,
            },
        ] {
            state = reduce(state, t);
        }

        let pending = unfilled_enabled_slots(&state, "order");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, slot("address"));
    }

    #[test]
    fn test_latest_record_value_picks_most_recent() {
        let mut state = DialogueState::default();
        for (turn, value) in [(1, json!("small")), (3, json!("large"))] {
            state = reduce(
                state,
                Transition::AddFillRecord(FillRecord {
                    id: slot("size"),
                    value,
                    turn,
                    recorded_at: chrono::Utc::now(),
                }),
            );
        }

        assert_eq!(latest_record_value(&state, &slot("size")), Some(&json!("large")));
    }

    #[test]
    fn test_slot_turn_count_defaults_to_zero() {
        let state = reduce(
            DialogueState::default(),
            Transition::PushPromptedSlot {
                id: slot("size"),
                reason: PromptReason::Query,
            },
        );

        assert_eq!(slot_turn_count(&state, &slot("size")), 0);
        assert_eq!(slot_turn_count(&state, &slot("topping")), 0);
    }
}
