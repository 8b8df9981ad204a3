//! Trace resolver - history-based slot inference
//!
//! Locates the trace declared for a slot and runs its `get_value` against the
//! append-only fill-record log, giving the integrator a chance to fill the
//! slot without prompting.

use std::sync::Arc;

use serde_json::Value;

use crate::flow::Flow;
use crate::stages::TurnError;
use crate::state::FillRecord;
use crate::types::SlotId;

/// Run a slot's inference function, if one is declared.
///
/// `Ok(None)` means the slot cannot be inferred and must be prompted. Lookup
/// failures (unknown ability, declared traces missing the slot) are fatal.
pub(crate) async fn infer_value<G: Send + Sync + 'static>(
    flow: &Flow<G>,
    id: &SlotId,
    records: Vec<FillRecord>,
    storage: &Arc<G>,
) -> Result<Option<Value>, TurnError> {
    let Some(trace) = flow.trace(id)? else {
        return Ok(None);
    };
    let Some(get_value) = &trace.get_value else {
        return Ok(None);
    };

    let inferred = (get_value)(records, storage.clone())
        .await
        .map_err(|e| TurnError::callback(format!("get_value for {id}"), e))?;
    if inferred.is_some() {
        tracing::debug!(target: "colloquy::trace", slot = %id, "slot value inferred from history");
    }
    Ok(inferred)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Ability, Trace};
    use serde_json::json;

    fn record(slot_name: &str, value: Value) -> FillRecord {
        FillRecord {
            id: SlotId::new("order", slot_name),
            value,
            turn: 1,
            recorded_at: chrono::Utc::now(),
        }
    }

    fn flow_with_trace() -> Flow<()> {
        let traces = vec![
            Trace::new("size"),
            Trace::with_get_value("sameAsLast", |records, _storage| async move {
                Ok(records.last().map(|r| r.value.clone()))
            }),
        ];
        Flow::new(vec![Ability::new(
            "order",
            Vec::new(),
            |_storage, _submitted| async { Ok(None) },
        )
        .with_traces(traces)])
    }

    #[tokio::test]
    async fn test_infer_value_runs_declared_get_value() {
        let flow = flow_with_trace();
        let records = vec![record("size", json!("large"))];

        let inferred = infer_value(
            &flow,
            &SlotId::new("order", "sameAsLast"),
            records,
            &Arc::new(()),
        )
        .await
        .unwrap();

        assert_eq!(inferred, Some(json!("large")));
    }

    #[tokio::test]
    async fn test_infer_value_is_none_without_get_value() {
        let flow = flow_with_trace();

        let inferred = infer_value(&flow, &SlotId::new("order", "size"), Vec::new(), &Arc::new(()))
            .await
            .unwrap();

        assert_eq!(inferred, None);
    }

    #[tokio::test]
    async fn test_infer_value_fails_on_unknown_ability() {
        let flow = flow_with_trace();

        let result = infer_value(
            &flow,
            &SlotId::new("missing", "size"),
            Vec::new(),
            &Arc::new(()),
        )
        .await;

        assert!(matches!(result, Err(TurnError::Flow(_))));
    }
}
