//! Evaluate stage - the ability/slot completion state machine
//!
//! Decides the next action for the turn: chain a completed ability, record
//! new completions, leave a pending prompt alone, or select the next slot of
//! the focused ability, offering it to trace inference before queueing a
//! prompt. Re-evaluation after an inference fill runs as a bounded loop:
//! every iteration that continues has filled one previously-unfilled slot.

use std::sync::Arc;

use crate::flow::{Flow, FlowError};
use crate::selectors;
use crate::state::{DialogueState, DialogueStore, PromptReason, Transition};
use crate::trace;
use crate::types::{NextAbility, OutputKind, OutputMessage, SlotId};

use super::fill::{fulfill_slot, FillSource};
use super::TurnError;

pub(crate) async fn evaluate<G: Send + Sync + 'static>(
    store: &mut DialogueStore,
    flow: &Flow<G>,
    storage: &Arc<G>,
) -> Result<(), TurnError> {
    // Each pass that loops has consumed one previously-unfilled slot, so the
    // declared slot count bounds the iterations; the cap guards against a
    // trace that lies about making progress.
    let max_passes = flow.total_slot_count() + 1;

    for _ in 0..max_passes {
        // 1. Abilities already marked complete: chain or hand off to Execute.
        if let Some(completed) = store.state().abilities_complete_on_turn.first().cloned() {
            tracing::debug!(target: "colloquy::evaluate", ability = %completed, "resolving pending completion");
            if let Some(next) = resolve_next_ability(store, flow, storage, &completed).await? {
                if !selectors::is_ability_completed(store.state(), &next.ability_name) {
                    store.dispatch(Transition::SetFocusedAbility(Some(
                        next.ability_name.clone(),
                    )));
                    match find_next_slot(store.state(), flow)? {
                        Some(slot_id) => {
                            queue_chain_message(store, &next);
                            tracing::debug!(target: "colloquy::evaluate", slot = %slot_id, "prompting first slot of chained ability");
                            store.dispatch(Transition::PushPromptedSlot {
                                id: slot_id,
                                reason: PromptReason::Query,
                            });
                            return Ok(());
                        }
                        None => {
                            store.dispatch(Transition::SetFocusedAbility(None));
                            return Ok(());
                        }
                    }
                }
            }
            // No chain target: clear focus, Execute runs on_complete.
            store.dispatch(Transition::SetFocusedAbility(None));
            return Ok(());
        }

        // 2. Slots filled this turn: detect fresh completions.
        if !store.state().filled_slots_on_turn.is_empty() {
            let completed_now = completed_by_turn_fills(store.state(), flow);
            if let Some(first) = completed_now.first().cloned() {
                tracing::info!(target: "colloquy::evaluate", abilities = ?completed_now, "abilities completed");
                for name in &completed_now {
                    store.dispatch(Transition::AbilityCompleted(name.clone()));
                }

                if let Some(next) = resolve_next_ability(store, flow, storage, &first).await? {
                    if !selectors::is_ability_completed(store.state(), &next.ability_name) {
                        store.dispatch(Transition::SetFocusedAbility(Some(
                            next.ability_name.clone(),
                        )));
                        match find_next_slot(store.state(), flow)? {
                            Some(slot_id) => {
                                queue_chain_message(store, &next);
                                if try_infer_and_fill(store, flow, storage, &slot_id).await? {
                                    // Inference filled the slot; re-evaluate.
                                    continue;
                                }
                                store.dispatch(Transition::PushPromptedSlot {
                                    id: slot_id,
                                    reason: PromptReason::Query,
                                });
                                return Ok(());
                            }
                            None => {
                                store.dispatch(Transition::SetFocusedAbility(None));
                                return Ok(());
                            }
                        }
                    }
                }
                store.dispatch(Transition::SetFocusedAbility(None));
                return Ok(());
            }
        }

        // 3. A pending question: Execute issues it (or waits on its answer).
        if !store.state().prompted_slot_stack.is_empty() {
            return Ok(());
        }

        // 4. Nothing focused: fall back to the default ability.
        if store.state().focused_ability.is_none() {
            let Some(default) = store.state().default_ability.clone() else {
                return Ok(());
            };
            tracing::debug!(target: "colloquy::evaluate", ability = %default, "focusing default ability");
            store.dispatch(Transition::SetFocusedAbility(Some(default)));
        }

        // 5. Select the next slot of the focused ability.
        let Some(slot_id) = find_next_slot(store.state(), flow)? else {
            return Ok(());
        };

        // 6. Offer the slot to trace inference before prompting.
        if try_infer_and_fill(store, flow, storage, &slot_id).await? {
            continue;
        }
        tracing::debug!(target: "colloquy::evaluate", slot = %slot_id, "queueing prompt");
        store.dispatch(Transition::PushPromptedSlot {
            id: slot_id,
            reason: PromptReason::Query,
        });
        return Ok(());
    }

    tracing::warn!(target: "colloquy::evaluate", "evaluate pass cap reached; ending turn");
    Ok(())
}

/// Find the next promptable slot of the focused ability: slots never
/// activated (and enabled by default) plus activated-but-unfilled enabled
/// ones, ordered by explicit hint then declaration position.
fn find_next_slot<G: Send + Sync + 'static>(
    state: &DialogueState,
    flow: &Flow<G>,
) -> Result<Option<SlotId>, FlowError> {
    let Some(focused) = state.focused_ability.as_deref() else {
        return Ok(None);
    };
    let ability = flow.ability(focused)?;

    let mut candidates: Vec<(i32, usize, &str)> = Vec::new();
    for (position, slot) in ability.slots.iter().enumerate() {
        let id = SlotId::new(focused, &slot.name);
        let promptable = match selectors::slot_status_for(state, &id) {
            None => slot.default_enabled,
            Some(status) => status.is_enabled && !status.is_done,
        };
        if promptable {
            candidates.push((slot.order.unwrap_or(i32::MAX), position, &slot.name));
        }
    }
    candidates.sort();

    Ok(candidates
        .first()
        .map(|(_, _, name)| SlotId::new(focused, *name)))
}

/// Abilities completed by this turn's fills: every declared slot activated
/// and every enabled one done.
fn completed_by_turn_fills<G: Send + Sync + 'static>(
    state: &DialogueState,
    flow: &Flow<G>,
) -> Vec<String> {
    let mut completed = Vec::new();
    for id in &state.filled_slots_on_turn {
        if completed.contains(&id.ability_name) {
            continue;
        }
        if is_ability_complete(state, flow, &id.ability_name) {
            completed.push(id.ability_name.clone());
        }
    }
    completed
}

/// Completion test: every declared slot activated, every enabled one done.
pub(crate) fn is_ability_complete<G: Send + Sync + 'static>(
    state: &DialogueState,
    flow: &Flow<G>,
    ability_name: &str,
) -> bool {
    let Ok(ability) = flow.ability(ability_name) else {
        return false;
    };

    let every_slot_activated = ability.slots.iter().all(|slot| {
        selectors::slot_status_for(state, &SlotId::new(ability_name, &slot.name)).is_some()
    });
    if !every_slot_activated {
        return false;
    }

    state
        .slot_status
        .iter()
        .filter(|s| s.id.ability_name == ability_name && s.is_enabled)
        .all(|s| s.is_done)
}

async fn resolve_next_ability<G: Send + Sync + 'static>(
    store: &DialogueStore,
    flow: &Flow<G>,
    storage: &Arc<G>,
    completed_ability: &str,
) -> Result<Option<NextAbility>, TurnError> {
    let ability = flow.ability(completed_ability)?;
    let Some(next_fn) = &ability.next_ability else {
        return Ok(None);
    };
    (next_fn)(storage.clone(), store.state().clone())
        .await
        .map_err(|e| TurnError::callback(format!("next_ability for `{completed_ability}`"), e))
}

/// Queue a chaining introduction message, at most once per turn.
fn queue_chain_message(store: &mut DialogueStore, next: &NextAbility) {
    let Some(text) = &next.message else { return };
    let message = OutputMessage::new(text.clone(), OutputKind::NextAbility);
    if store.state().output_queue.contains(&message) {
        return;
    }
    store.dispatch(Transition::AddMessage(message));
}

/// Run trace inference for a slot; a non-null inferred value goes through the
/// normal fill path (including validation).
async fn try_infer_and_fill<G: Send + Sync + 'static>(
    store: &mut DialogueStore,
    flow: &Flow<G>,
    storage: &Arc<G>,
    id: &SlotId,
) -> Result<bool, TurnError> {
    let records = store.state().slot_records.clone();
    let Some(value) = trace::infer_value(flow, id, records, storage).await? else {
        return Ok(false);
    };
    fulfill_slot(store, flow, storage, id.clone(), value, FillSource::Inferred).await
}
