//! Execute stage - run the side effects the turn has queued up
//!
//! Three phases, in order: drain the `on_fill` stack (applying any slot
//! commands the callbacks recorded), run `on_complete` for abilities that
//! finished with nothing left in focus, then issue the prompt at the top of
//! the stack if it has not been asked yet.

use std::collections::HashMap;

use std::sync::Arc;

use crate::flow::Flow;
use crate::selectors;
use crate::state::{DialogueStore, PromptReason, SlotStatus, Transition};
use crate::types::{FillControl, OutputKind, OutputMessage, SlotCommand, SlotId};

use super::fill::{fulfill_slot, FillSource};
use super::TurnError;

pub(crate) async fn execute<G: Send + Sync + 'static>(
    store: &mut DialogueStore,
    flow: &Flow<G>,
    storage: &Arc<G>,
) -> Result<(), TurnError> {
    drain_on_fill(store, flow, storage).await?;
    run_on_complete(store, flow, storage).await?;
    issue_prompt(store, flow, storage).await?;
    Ok(())
}

/// Run every queued `on_fill` callback. Commands a callback records may fill
/// further slots, whose own `on_fill` entries land back on the stack and are
/// drained in the same pass.
async fn drain_on_fill<G: Send + Sync + 'static>(
    store: &mut DialogueStore,
    flow: &Flow<G>,
    storage: &Arc<G>,
) -> Result<(), TurnError> {
    while let Some(entry) = store.state().run_on_fill_stack.first().cloned() {
        store.dispatch(Transition::RemoveOnFill(entry.id.clone()));
        let slot = flow.slot(&entry.id)?;
        let Some(on_fill) = slot.on_fill.clone() else {
            continue;
        };

        tracing::debug!(target: "colloquy::execute", slot = %entry.id, "running on_fill");
        let control = FillControl::new();
        let message = (on_fill)(storage.clone(), entry.value.clone(), control.clone())
            .await
            .map_err(|e| TurnError::callback(format!("on_fill for {}", entry.id), e))?;
        if let Some(text) = message {
            store.dispatch(Transition::AddMessage(OutputMessage::new(
                text,
                OutputKind::SlotFill,
            )));
        }

        apply_commands(store, flow, storage, &entry.id, control.take_commands()).await?;
    }
    Ok(())
}

/// Apply the slot commands one `on_fill` callback recorded, in issue order.
/// Sibling commands resolve against the filling slot's ability.
async fn apply_commands<G: Send + Sync + 'static>(
    store: &mut DialogueStore,
    flow: &Flow<G>,
    storage: &Arc<G>,
    origin: &SlotId,
    commands: Vec<SlotCommand>,
) -> Result<(), TurnError> {
    for command in commands {
        match command {
            SlotCommand::FillSlot {
                slot_name,
                ability_name,
                value,
            } => {
                let ability = ability_name.unwrap_or_else(|| origin.ability_name.clone());
                let id = SlotId::new(ability, slot_name);
                fulfill_slot(store, flow, storage, id, value, FillSource::Submitted).await?;
            }
            SlotCommand::EnableSlot { slot_name } => {
                store.dispatch(Transition::SetSlotEnabled {
                    id: SlotId::new(&origin.ability_name, slot_name),
                    enabled: true,
                });
            }
            SlotCommand::DisableSlot { slot_name } => {
                let id = SlotId::new(&origin.ability_name, slot_name);
                store.dispatch(Transition::SetSlotEnabled {
                    id: id.clone(),
                    enabled: false,
                });
                // A disabled slot's pending question is withdrawn.
                store.dispatch(Transition::RemovePromptedSlot(id));
            }
            SlotCommand::RequireConfirmation { slot_name } => {
                store.dispatch(Transition::RequestConfirmation {
                    origin: origin.clone(),
                    confirming: SlotId::new(&origin.ability_name, slot_name),
                });
            }
            SlotCommand::Accept => {
                // `origin` is the confirmation slot; resolving just clears
                // the link, the confirmed slot stays done.
                selectors::requesting_slot_for(store.state(), origin)?;
                store.dispatch(Transition::AcceptConfirmation {
                    confirming: origin.clone(),
                });
            }
            SlotCommand::Deny => {
                let requesting = selectors::requesting_slot_for(store.state(), origin)?;
                store.dispatch(Transition::DenyConfirmation {
                    origin: requesting.clone(),
                    confirming: origin.clone(),
                });
                // Reopened slot goes straight back to prompting.
                store.dispatch(Transition::PushPromptedSlot {
                    id: requesting,
                    reason: PromptReason::Query,
                });
            }
        }
    }
    Ok(())
}

/// Run `on_complete` for abilities that finished this turn, once nothing is
/// left in focus. A chained ability holding focus defers completion output to
/// the turn the chain resolves.
async fn run_on_complete<G: Send + Sync + 'static>(
    store: &mut DialogueStore,
    flow: &Flow<G>,
    storage: &Arc<G>,
) -> Result<(), TurnError> {
    if store.state().abilities_complete_on_turn.is_empty()
        || store.state().focused_ability.is_some()
    {
        return Ok(());
    }

    for name in store.state().abilities_complete_on_turn.clone() {
        // An on_fill command (a deny, a disabled slot re-enabled) may have
        // reopened the ability since Evaluate recorded the completion.
        if !super::evaluate::is_ability_complete(store.state(), flow, &name) {
            tracing::debug!(target: "colloquy::execute", ability = %name, "completion reopened; skipping on_complete");
            continue;
        }
        let ability = flow.ability(&name)?;
        let mut submitted: HashMap<String, serde_json::Value> = HashMap::new();
        for slot in &ability.slots {
            let id = SlotId::new(&name, &slot.name);
            if let Some(value) = selectors::latest_record_value(store.state(), &id) {
                submitted.insert(slot.name.clone(), value.clone());
            }
        }

        tracing::info!(target: "colloquy::execute", ability = %name, "running on_complete");
        let message = (ability.on_complete)(storage.clone(), submitted)
            .await
            .map_err(|e| TurnError::callback(format!("on_complete for `{name}`"), e))?;
        if let Some(text) = message {
            store.dispatch(Transition::AddMessage(OutputMessage::new(
                text,
                OutputKind::AbilityComplete,
            )));
        }
    }
    Ok(())
}

/// Issue the stack-top question if it has not been asked yet.
async fn issue_prompt<G: Send + Sync + 'static>(
    store: &mut DialogueStore,
    flow: &Flow<G>,
    storage: &Arc<G>,
) -> Result<(), TurnError> {
    let Some(top) = selectors::prompted_stack_top(store.state()).cloned() else {
        return Ok(());
    };
    if top.prompted {
        return Ok(());
    }

    let slot = flow.slot(&top.id)?;
    if selectors::slot_status_for(store.state(), &top.id).is_none() {
        store.dispatch(Transition::AddSlotStatus(SlotStatus::new(
            top.id.clone(),
            slot.default_enabled,
        )));
    }

    let text = (slot.query)(storage.clone())
        .await
        .map_err(|e| TurnError::callback(format!("query for {}", top.id), e))?;
    tracing::debug!(target: "colloquy::execute", slot = %top.id, "issuing prompt");
    store.dispatch(Transition::AddMessage(OutputMessage::new(
        text,
        OutputKind::Prompt,
    )));
    store.dispatch(Transition::SetSlotPrompted {
        id: top.id,
        prompted: true,
    });
    Ok(())
}
