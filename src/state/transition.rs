//! The closed set of named state transitions and the pure reducer
//!
//! Every mutation of [`DialogueState`] goes through [`reduce`]. Transitions
//! are total for well-formed payloads and perform no I/O; applying the same
//! transition to the same state always yields the same new state.

use serde::{Deserialize, Serialize};

use crate::types::{MessageData, OutputMessage, SlotId};

use super::{AbilityStatus, DialogueState, FillRecord, OnFillEntry, PromptReason, PromptedSlot, SlotStatus};

/// A named state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Transition {
    /// Start a new turn: reset turn-scoped scratch, bump the turn index
    BeginTurn,
    /// Record the parsed user turn
    SetMessageData(MessageData),
    /// Seed the fallback ability
    SetDefaultAbility(String),
    /// Change (or clear) the ability being pursued
    SetFocusedAbility(Option<String>),
    /// Activate a slot (no-op when already activated)
    AddSlotStatus(SlotStatus),
    SetSlotEnabled { id: SlotId, enabled: bool },
    SetSlotDone { id: SlotId, done: bool },
    /// Append to the fill-record log
    AddFillRecord(FillRecord),
    /// Mark a slot as filled during the current turn
    AddFilledSlotOnTurn(SlotId),
    /// Push a pending question onto the prompt stack (no-op when present)
    PushPromptedSlot { id: SlotId, reason: PromptReason },
    SetSlotPrompted { id: SlotId, prompted: bool },
    RemovePromptedSlot(SlotId),
    /// Bump the failed-attempt count for a prompted slot
    IncrementTurnCount(SlotId),
    /// Open a confirmation sub-dialogue: link `confirming` back to `origin`
    /// and push it onto the prompt stack
    RequestConfirmation { origin: SlotId, confirming: SlotId },
    /// Resolve a confirmation in favor of the originating slot
    AcceptConfirmation { confirming: SlotId },
    /// Resolve a confirmation against the originating slot, reopening it
    DenyConfirmation { origin: SlotId, confirming: SlotId },
    /// Record an ability completion (dedup on the turn-scoped list)
    AbilityCompleted(String),
    PushOnFill(OnFillEntry),
    RemoveOnFill(SlotId),
    AddMessage(OutputMessage),
    ClearOutputQueue,
}

/// Apply one transition, producing the next state.
pub fn reduce(mut state: DialogueState, transition: Transition) -> DialogueState {
    match transition {
        Transition::BeginTurn => {
            state.turn += 1;
            state.filled_slots_on_turn.clear();
            state.abilities_complete_on_turn.clear();
        }
        Transition::SetMessageData(data) => {
            state.message_data = Some(data);
        }
        Transition::SetDefaultAbility(name) => {
            state.default_ability = Some(name);
        }
        Transition::SetFocusedAbility(name) => {
            state.focused_ability = name;
        }
        Transition::AddSlotStatus(status) => {
            if !state.slot_status.iter().any(|s| s.id == status.id) {
                state.slot_status.push(status);
            }
        }
        Transition::SetSlotEnabled { id, enabled } => {
            match state.slot_status.iter_mut().find(|s| s.id == id) {
                Some(status) => status.is_enabled = enabled,
                None => state.slot_status.push(SlotStatus::new(id, enabled)),
            }
        }
        Transition::SetSlotDone { id, done } => {
            match state.slot_status.iter_mut().find(|s| s.id == id) {
                Some(status) => status.is_done = done,
                None => {
                    let mut status = SlotStatus::new(id, true);
                    status.is_done = done;
                    state.slot_status.push(status);
                }
            }
        }
        Transition::AddFillRecord(record) => {
            state.slot_records.push(record);
        }
        Transition::AddFilledSlotOnTurn(id) => {
            state.filled_slots_on_turn.push(id);
        }
        Transition::PushPromptedSlot { id, reason } => {
            if !state.prompted_slot_stack.iter().any(|p| p.id == id) {
                state.prompted_slot_stack.insert(
                    0,
                    PromptedSlot {
                        id,
                        reason,
                        prompted: false,
                        turn_count: 0,
                    },
                );
            }
        }
        Transition::SetSlotPrompted { id, prompted } => {
            if let Some(entry) = state.prompted_slot_stack.iter_mut().find(|p| p.id == id) {
                entry.prompted = prompted;
            }
        }
        Transition::RemovePromptedSlot(id) => {
            state.prompted_slot_stack.retain(|p| p.id != id);
        }
        Transition::IncrementTurnCount(id) => {
            if let Some(entry) = state.prompted_slot_stack.iter_mut().find(|p| p.id == id) {
                entry.turn_count += 1;
            }
        }
        Transition::RequestConfirmation { origin, confirming } => {
            match state.slot_status.iter_mut().find(|s| s.id == confirming) {
                Some(status) => {
                    status.is_done = false;
                    status.requesting_slot = Some(origin.slot_name.clone());
                }
                None => {
                    let mut status = SlotStatus::new(confirming.clone(), true);
                    status.requesting_slot = Some(origin.slot_name.clone());
                    state.slot_status.push(status);
                }
            }
            if !state.prompted_slot_stack.iter().any(|p| p.id == confirming) {
                state.prompted_slot_stack.insert(
                    0,
                    PromptedSlot {
                        id: confirming,
                        reason: PromptReason::Confirm,
                        prompted: false,
                        turn_count: 0,
                    },
                );
            }
        }
        Transition::AcceptConfirmation { confirming } => {
            if let Some(status) = state.slot_status.iter_mut().find(|s| s.id == confirming) {
                status.requesting_slot = None;
            }
        }
        Transition::DenyConfirmation { origin, confirming } => {
            if let Some(status) = state.slot_status.iter_mut().find(|s| s.id == confirming) {
                status.requesting_slot = None;
            }
            if let Some(status) = state.slot_status.iter_mut().find(|s| s.id == origin) {
                status.is_done = false;
            }
        }
        Transition::AbilityCompleted(name) => {
            if !state.abilities_complete_on_turn.contains(&name) {
                state.abilities_complete_on_turn.push(name.clone());
            }
            match state
                .ability_status
                .iter_mut()
                .find(|a| a.ability_name == name)
            {
                Some(status) => status.is_completed = true,
                None => state.ability_status.push(AbilityStatus {
                    ability_name: name,
                    is_completed: true,
                }),
            }
        }
        Transition::PushOnFill(entry) => {
            state.run_on_fill_stack.push(entry);
        }
        Transition::RemoveOnFill(id) => {
            if let Some(pos) = state.run_on_fill_stack.iter().position(|e| e.id == id) {
                state.run_on_fill_stack.remove(pos);
            }
        }
        Transition::AddMessage(message) => {
            state.output_queue.push(message);
        }
        Transition::ClearOutputQueue => {
            state.output_queue.clear();
        }
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OutputKind, OutputMessage};
    use serde_json::json;

    fn slot(name: &str) -> SlotId {
        SlotId::new("order", name)
    }

    fn apply(state: DialogueState, transitions: Vec<Transition>) -> DialogueState {
        transitions.into_iter().fold(state, reduce)
    }

    #[test]
    fn test_begin_turn_resets_scratch_and_bumps_turn() {
        let state = apply(
            DialogueState::default(),
            vec![
                Transition::AddFilledSlotOnTurn(slot("size")),
                Transition::AbilityCompleted("order".to_string()),
                Transition::BeginTurn,
            ],
        );

        assert_eq!(state.turn, 1);
        assert!(state.filled_slots_on_turn.is_empty());
        assert!(state.abilities_complete_on_turn.is_empty());
        // the conversation-scoped completion record survives
        assert!(state.ability_status[0].is_completed);
    }

    #[test]
    fn test_push_prompted_slot_is_idempotent_and_stacks_on_top() {
        let state = apply(
            DialogueState::default(),
            vec![
                Transition::PushPromptedSlot {
                    id: slot("size"),
                    reason: PromptReason::Query,
                },
                Transition::PushPromptedSlot {
                    id: slot("size"),
                    reason: PromptReason::Query,
                },
                Transition::PushPromptedSlot {
                    id: slot("topping"),
                    reason: PromptReason::Query,
                },
            ],
        );

        assert_eq!(state.prompted_slot_stack.len(), 2);
        assert_eq!(state.prompted_slot_stack[0].id, slot("topping"));
        assert_eq!(state.prompted_slot_stack[1].id, slot("size"));
    }

    #[test]
    fn test_set_slot_done_activates_missing_slot() {
        let state = reduce(
            DialogueState::default(),
            Transition::SetSlotDone {
                id: slot("size"),
                done: true,
            },
        );

        assert_eq!(state.slot_status.len(), 1);
        assert!(state.slot_status[0].is_enabled);
        assert!(state.slot_status[0].is_done);
    }

    #[test]
    fn test_ability_completed_dedupes_turn_list() {
        let state = apply(
            DialogueState::default(),
            vec![
                Transition::AbilityCompleted("order".to_string()),
                Transition::AbilityCompleted("order".to_string()),
            ],
        );

        assert_eq!(state.abilities_complete_on_turn, vec!["order".to_string()]);
        assert_eq!(state.ability_status.len(), 1);
    }

    #[test]
    fn test_request_confirmation_links_and_prompts_confirming_slot() {
        let state = reduce(
            DialogueState::default(),
            Transition::RequestConfirmation {
                origin: slot("address"),
                confirming: slot("confirmAddress"),
            },
        );

        let status = &state.slot_status[0];
        assert_eq!(status.id, slot("confirmAddress"));
        assert_eq!(status.requesting_slot, Some("address".to_string()));
        assert_eq!(state.prompted_slot_stack[0].reason, PromptReason::Confirm);
    }

    #[test]
    fn test_deny_confirmation_reopens_origin_and_clears_link() {
        let state = apply(
            DialogueState::default(),
            vec![
                Transition::SetSlotDone {
                    id: slot("address"),
                    done: true,
                },
                Transition::RequestConfirmation {
                    origin: slot("address"),
                    confirming: slot("confirmAddress"),
                },
                Transition::DenyConfirmation {
                    origin: slot("address"),
                    confirming: slot("confirmAddress"),
                },
            ],
        );

        let origin = state
            .slot_status
            .iter()
            .find(|s| s.id == slot("address"))
            .unwrap();
        assert!(!origin.is_done);
        let confirming = state
            .slot_status
            .iter()
            .find(|s| s.id == slot("confirmAddress"))
            .unwrap();
        assert_eq!(confirming.requesting_slot, None);
    }

    #[test]
    fn test_fill_record_log_is_append_only() {
        let record = FillRecord {
            id: slot("size"),
            value: json!("large"),
            turn: 1,
            recorded_at: chrono::Utc::now(),
        };
        let state = apply(
            DialogueState::default(),
            vec![
                Transition::AddFillRecord(record.clone()),
                Transition::AddFillRecord(FillRecord {
                    value: json!("small"),
                    turn: 2,
                    ..record.clone()
                }),
            ],
        );

        assert_eq!(state.slot_records.len(), 2);
        assert_eq!(state.slot_records[0].value, json!("large"));
    }

    #[test]
    fn test_output_queue_roundtrip() {
        let state = apply(
            DialogueState::default(),
            vec![
                Transition::AddMessage(OutputMessage::new("What size?", OutputKind::Prompt)),
                Transition::ClearOutputQueue,
            ],
        );

        assert!(state.output_queue.is_empty());
    }
}
