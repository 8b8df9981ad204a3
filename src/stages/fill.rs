//! Fill stage - resolve submitted values against slots
//!
//! Resolves direct submissions first, then the slot at the top of the prompt
//! stack. `fulfill_slot` is the single fill path: trace inference and
//! `on_fill` slot commands route through it too, so every fill is validated
//! the same way.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::flow::Flow;
use crate::selectors;
use crate::state::{DialogueStore, FillRecord, OnFillEntry, SlotStatus, Transition};
use crate::types::{OutputKind, OutputMessage, SlotId, TurnInput};

use super::TurnError;

/// Where a fill value came from; inferred values fail quietly while submitted
/// values produce retry messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FillSource {
    Submitted,
    Inferred,
}

pub(crate) async fn fill<G: Send + Sync + 'static>(
    store: &mut DialogueStore,
    flow: &Flow<G>,
    storage: &Arc<G>,
    input: &TurnInput,
) -> Result<(), TurnError> {
    for submission in &input.slot_values {
        let id = SlotId::new(&submission.ability_name, &submission.slot_name);
        fulfill_slot(
            store,
            flow,
            storage,
            id,
            submission.value.clone(),
            FillSource::Submitted,
        )
        .await?;
    }

    let Some(top) = selectors::prompted_stack_top(store.state()).cloned() else {
        return Ok(());
    };
    // Only a question that was actually asked can be answered.
    if !top.prompted {
        return Ok(());
    }
    let Some(message) = &input.message else {
        return Ok(());
    };

    // An entity named after the prompted slot overrides the raw text.
    let value = message
        .entities
        .iter()
        .find(|e| e.name == top.id.slot_name)
        .map(|e| e.value.clone())
        .unwrap_or_else(|| Value::String(message.raw_text.clone()));

    fulfill_slot(store, flow, storage, top.id, value, FillSource::Submitted).await?;
    Ok(())
}

/// Attempt to fill one slot with a value.
///
/// Returns `Ok(true)` when the slot was filled, `Ok(false)` when validation
/// rejected the value (retry messaging queued for submitted values, silent
/// discard for inferred ones).
pub(crate) async fn fulfill_slot<G: Send + Sync + 'static>(
    store: &mut DialogueStore,
    flow: &Flow<G>,
    storage: &Arc<G>,
    id: SlotId,
    value: Value,
    source: FillSource,
) -> Result<bool, TurnError> {
    let slot = flow.slot(&id)?;

    if let Some(validate) = &slot.validate {
        let message = selectors::message_data(store.state());
        let result = (validate)(value.clone(), message)
            .await
            .map_err(|e| TurnError::callback(format!("validate for {id}"), e))?;

        if !result.is_valid {
            if source == FillSource::Inferred {
                tracing::warn!(
                    target: "colloquy::fill",
                    slot = %id,
                    "discarding inferred value that failed validation"
                );
                return Ok(false);
            }

            tracing::debug!(target: "colloquy::fill", slot = %id, "submitted value rejected");
            if let Some(reason) = &result.reason {
                store.dispatch(Transition::AddMessage(OutputMessage::new(
                    reason.clone(),
                    OutputKind::Retry,
                )));
            }
            store.dispatch(Transition::IncrementTurnCount(id.clone()));
            let turn_count = selectors::slot_turn_count(store.state(), &id);

            if let Some(retry) = &slot.retry {
                let text = (retry)(storage.clone(), value, turn_count)
                    .await
                    .map_err(|e| TurnError::callback(format!("retry for {id}"), e))?;
                store.dispatch(Transition::AddMessage(OutputMessage::new(
                    text,
                    OutputKind::Retry,
                )));
            } else if result.reason.is_none() {
                // No reason and no retry handler: re-issue the slot's own
                // prompt so the turn is never silent.
                let text = (slot.query)(storage.clone())
                    .await
                    .map_err(|e| TurnError::callback(format!("query for {id}"), e))?;
                store.dispatch(Transition::AddMessage(OutputMessage::new(
                    text,
                    OutputKind::Retry,
                )));
            }
            return Ok(false);
        }
    }

    if selectors::slot_status_for(store.state(), &id).is_none() {
        store.dispatch(Transition::AddSlotStatus(SlotStatus::new(
            id.clone(),
            slot.default_enabled,
        )));
    }
    let turn = store.state().turn;
    store.dispatch(Transition::AddFillRecord(FillRecord {
        id: id.clone(),
        value: value.clone(),
        turn,
        recorded_at: Utc::now(),
    }));
    store.dispatch(Transition::SetSlotDone {
        id: id.clone(),
        done: true,
    });
    store.dispatch(Transition::AddFilledSlotOnTurn(id.clone()));
    store.dispatch(Transition::RemovePromptedSlot(id.clone()));
    if slot.has_on_fill() {
        store.dispatch(Transition::PushOnFill(OnFillEntry {
            id: id.clone(),
            value,
        }));
    }
    tracing::debug!(target: "colloquy::fill", slot = %id, "slot filled");
    Ok(true)
}
