//! DialogueEngine - the per-turn entry point
//!
//! One engine serves one declared flow. `run_turn` loads the persisted state
//! blob, runs the five-stage pipeline over it, saves the result, and returns
//! the turn's outbound messages. The engine itself holds no conversation
//! state; concurrent conversations share one engine with distinct
//! [`StateStorage`] handles.

use std::sync::Arc;

use crate::flow::Flow;
use crate::stages;
pub use crate::stages::TurnError;
use crate::state::DialogueStore;
use crate::storage::StateStorage;
use crate::types::{TurnInput, TurnOutput};

/// The turn-based slot-filling engine.
///
/// `G` is the integrator's own storage handle, passed through to every
/// declared callback.
pub struct DialogueEngine<G> {
    flow: Flow<G>,
    default_ability: String,
    storage: Arc<G>,
}

impl<G: Send + Sync + 'static> DialogueEngine<G> {
    /// Create an engine over a declared flow.
    ///
    /// `default_ability` is pursued when no intent or pending work selects
    /// one; it is seeded into the state blob on the first turn.
    pub fn new(flow: Flow<G>, default_ability: impl Into<String>, storage: Arc<G>) -> Self {
        Self {
            flow,
            default_ability: default_ability.into(),
            storage,
        }
    }

    /// The declared flow this engine serves
    pub fn flow(&self) -> &Flow<G> {
        &self.flow
    }

    /// The integrator storage handle shared with callbacks
    pub fn storage(&self) -> &Arc<G> {
        &self.storage
    }

    /// Run one full turn: Intake, Fill, Evaluate, Execute, Outtake.
    ///
    /// Reads the prior state from `state_storage` (defaulting to a fresh
    /// conversation) and persists the post-turn state before returning.
    pub async fn run_turn(
        &self,
        state_storage: &dyn StateStorage,
        input: TurnInput,
    ) -> Result<TurnOutput, TurnError> {
        let state = state_storage
            .read()
            .await
            .map_err(|source| TurnError::StateStorage { source })?
            .unwrap_or_default();
        let mut store = DialogueStore::new(state);

        stages::intake(&mut store, &self.flow, &input, &self.default_ability);
        stages::fill(&mut store, &self.flow, &self.storage, &input).await?;
        stages::evaluate(&mut store, &self.flow, &self.storage).await?;
        stages::execute(&mut store, &self.flow, &self.storage).await?;
        let output = stages::outtake(&mut store);

        let state = store.into_state();
        state_storage
            .save(&state)
            .await
            .map_err(|source| TurnError::StateStorage { source })?;
        tracing::debug!(
            target: "colloquy::engine",
            turn = state.turn,
            messages = output.messages.len(),
            "turn complete"
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStateStorage;
    use crate::types::{
        Ability, IncomingSlotValue, MessageData, NextAbility, OutputKind, Slot, Trace,
        ValidateResult,
    };
    use serde_json::json;
    use std::sync::Mutex;

    fn text_slot(name: &str, prompt: &str) -> Slot<ConvoState> {
        let prompt = prompt.to_string();
        Slot::new(name, move |_storage| {
            let prompt = prompt.clone();
            async move { Ok(prompt) }
        })
    }

    #[derive(Debug, Default)]
    struct ConvoState {
        submitted: Mutex<Vec<String>>,
    }

    impl ConvoState {
        fn record(&self, value: impl Into<String>) {
            self.submitted
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(value.into());
        }

        fn recorded(&self) -> Vec<String> {
            self.submitted
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone()
        }
    }

    async fn say(
        engine: &DialogueEngine<ConvoState>,
        storage: &InMemoryStateStorage,
        text: &str,
        intent: &str,
    ) -> Vec<String> {
        let input = TurnInput::message(MessageData::new(text).with_intent(intent));
        engine
            .run_turn(storage, input)
            .await
            .unwrap()
            .texts()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn magic_word_flow() -> Flow<ConvoState> {
        let animal = text_slot("animalName", "Please name an animal... if you want.");

        let strict = text_slot("magicWordStrict", "Please say 'wolf'... not negotiable.")
            .with_validate(|value, _message| async move {
                if value == json!("wolf") {
                    Ok(ValidateResult::valid())
                } else {
                    Ok(ValidateResult::invalid("Please follow directions."))
                }
            });

        let strict2 = text_slot("magicWordStrict2", "Please say 'wolf' one more time.")
            .with_validate(|value, _message| async move {
                if value == json!("wolf") {
                    Ok(ValidateResult::valid())
                } else {
                    Ok(ValidateResult::invalid("Please follow directions."))
                }
            })
            .with_retry(|_storage, _value, _turn_count| async {
                Ok("You must say 'wolf' a second time".to_string())
            })
            .with_on_fill(|_storage, _value, _control| async {
                Ok(Some(
                    "Submitted to async API! Thank you for saying wolf wolf!".to_string(),
                ))
            });

        Flow::new(vec![Ability::new(
            "magicWord",
            vec![animal, strict, strict2],
            |storage: Arc<ConvoState>, submitted| async move {
                let text = format!(
                    "You said: '{}', '{}', '{}'!",
                    submitted["animalName"].as_str().unwrap(),
                    submitted["magicWordStrict"].as_str().unwrap(),
                    submitted["magicWordStrict2"].as_str().unwrap(),
                );
                for name in ["animalName", "magicWordStrict", "magicWordStrict2"] {
                    storage.record(submitted[name].as_str().unwrap());
                }
                Ok(Some(text))
            },
        )])
    }

    #[tokio::test]
    async fn test_validated_slots_retry_until_the_ability_completes() {
        let convo = Arc::new(ConvoState::default());
        let engine = DialogueEngine::new(magic_word_flow(), "magicWord", convo.clone());
        let storage = InMemoryStateStorage::new();

        assert_eq!(
            say(&engine, &storage, "hello", "magicWord").await,
            vec!["Please name an animal... if you want."]
        );
        assert_eq!(
            say(&engine, &storage, "hippo", "magicWord").await,
            vec!["Please say 'wolf'... not negotiable."]
        );
        // rejection with a reason and no retry handler
        assert_eq!(
            say(&engine, &storage, "hippo", "magicWord").await,
            vec!["Please follow directions."]
        );
        assert_eq!(
            say(&engine, &storage, "wolf", "magicWord").await,
            vec!["Please say 'wolf' one more time."]
        );
        // rejection with both a reason and a retry handler
        assert_eq!(
            say(&engine, &storage, "hippo", "magicWord").await,
            vec![
                "Please follow directions.",
                "You must say 'wolf' a second time"
            ]
        );
        // fill side effect precedes the completion message
        assert_eq!(
            say(&engine, &storage, "wolf", "magicWord").await,
            vec![
                "Submitted to async API! Thank you for saying wolf wolf!",
                "You said: 'hippo', 'wolf', 'wolf'!"
            ]
        );
        assert_eq!(convo.recorded(), vec!["hippo", "wolf", "wolf"]);
    }

    fn chained_flow() -> Flow<ConvoState> {
        let order = Ability::new(
            "order",
            vec![text_slot("size", "What size?")],
            |_storage, _submitted| async { Ok(None) },
        )
        .with_next_ability(|_storage, _state| async {
            Ok(Some(
                NextAbility::new("checkout").with_message("Moving to checkout."),
            ))
        });

        let traces = vec![
            Trace::with_get_value("size", |records, _storage| async move {
                Ok(records
                    .iter()
                    .rev()
                    .find(|r| r.id.slot_name == "size")
                    .map(|r| r.value.clone()))
            }),
            Trace::new("address"),
        ];
        let checkout = Ability::new(
            "checkout",
            vec![
                text_slot("size", "Confirm the size?"),
                text_slot("address", "Where should it go?"),
            ],
            |_storage, _submitted| async { Ok(Some("Checked out.".to_string())) },
        )
        .with_traces(traces);

        Flow::new(vec![order, checkout])
    }

    #[tokio::test]
    async fn test_chaining_introduces_then_prompts_with_inference_applied() {
        let engine = DialogueEngine::new(chained_flow(), "order", Arc::new(ConvoState::default()));
        let storage = InMemoryStateStorage::new();

        assert_eq!(say(&engine, &storage, "hi", "").await, vec!["What size?"]);

        // completing `order` chains into `checkout`; its size slot is
        // inferred from history so the address prompt follows the
        // introduction message directly
        let output = engine
            .run_turn(&storage, TurnInput::message(MessageData::new("large")))
            .await
            .unwrap();
        assert_eq!(
            output.texts(),
            vec!["Moving to checkout.", "Where should it go?"]
        );
        assert_eq!(output.messages[0].kind, OutputKind::NextAbility);
        assert_eq!(output.messages[1].kind, OutputKind::Prompt);

        let state = storage.read().await.unwrap().unwrap();
        assert_eq!(
            crate::selectors::latest_record_value(
                &state,
                &crate::types::SlotId::new("checkout", "size")
            ),
            Some(&json!("large"))
        );

        // answering the last slot completes the chained ability
        assert_eq!(
            say(&engine, &storage, "12 Main St", "").await,
            vec!["Checked out."]
        );
    }

    #[tokio::test]
    async fn test_direct_submission_completes_without_a_message() {
        let flow = Flow::new(vec![Ability::new(
            "order",
            vec![text_slot("size", "What size?")],
            |_storage, _submitted| async { Ok(Some("Order placed.".to_string())) },
        )]);
        let engine = DialogueEngine::new(flow, "order", Arc::new(ConvoState::default()));
        let storage = InMemoryStateStorage::new();

        let input = TurnInput::default()
            .with_slot_value(IncomingSlotValue::new("order", "size", json!("large")));
        let output = engine.run_turn(&storage, input).await.unwrap();

        assert_eq!(output.texts(), vec!["Order placed."]);
    }

    #[tokio::test]
    async fn test_submission_against_undeclared_slot_fails_the_turn() {
        let engine = DialogueEngine::new(
            magic_word_flow(),
            "magicWord",
            Arc::new(ConvoState::default()),
        );
        let storage = InMemoryStateStorage::new();

        let input = TurnInput::default()
            .with_slot_value(IncomingSlotValue::new("magicWord", "nope", json!(1)));
        let result = engine.run_turn(&storage, input).await;

        assert!(matches!(result, Err(TurnError::Flow(_))));
    }

    fn confirmation_flow() -> Flow<ConvoState> {
        let address = text_slot("address", "Where should it go?").with_on_fill(
            |_storage, _value, control| async move {
                control.require_confirmation("confirmAddress");
                Ok(None)
            },
        );
        let confirm = text_slot("confirmAddress", "Is that address right?")
            .disabled_by_default()
            .with_on_fill(|_storage, value, control| async move {
                if value == json!("yes") {
                    control.accept();
                } else {
                    control.deny();
                }
                Ok(None)
            });
        Flow::new(vec![Ability::new(
            "delivery",
            vec![address, confirm],
            |_storage, submitted| async move {
                Ok(Some(format!(
                    "Delivering to {}.",
                    submitted["address"].as_str().unwrap()
                )))
            },
        )])
    }

    #[tokio::test]
    async fn test_confirmation_accept_completes_the_ability() {
        let engine =
            DialogueEngine::new(confirmation_flow(), "delivery", Arc::new(ConvoState::default()));
        let storage = InMemoryStateStorage::new();

        assert_eq!(
            say(&engine, &storage, "hi", "").await,
            vec!["Where should it go?"]
        );
        assert_eq!(
            say(&engine, &storage, "12 Main St", "").await,
            vec!["Is that address right?"]
        );
        assert_eq!(
            say(&engine, &storage, "yes", "").await,
            vec!["Delivering to 12 Main St."]
        );
    }

    #[tokio::test]
    async fn test_confirmation_deny_reopens_and_reprompts() {
        let engine =
            DialogueEngine::new(confirmation_flow(), "delivery", Arc::new(ConvoState::default()));
        let storage = InMemoryStateStorage::new();

        say(&engine, &storage, "hi", "").await;
        say(&engine, &storage, "12 Main St", "").await;

        // the denial reopens the address and asks again; no completion runs
        assert_eq!(
            say(&engine, &storage, "no", "").await,
            vec!["Where should it go?"]
        );
        assert_eq!(
            say(&engine, &storage, "14 Side St", "").await,
            vec!["Is that address right?"]
        );
        assert_eq!(
            say(&engine, &storage, "yes", "").await,
            vec!["Delivering to 14 Side St."]
        );
    }

    #[tokio::test]
    async fn test_state_persists_across_engine_instances() {
        let storage = InMemoryStateStorage::new();
        {
            let engine = DialogueEngine::new(
                magic_word_flow(),
                "magicWord",
                Arc::new(ConvoState::default()),
            );
            say(&engine, &storage, "hello", "magicWord").await;
        }

        // a fresh engine resumes from the persisted blob mid-ability
        let engine = DialogueEngine::new(
            magic_word_flow(),
            "magicWord",
            Arc::new(ConvoState::default()),
        );
        assert_eq!(
            say(&engine, &storage, "hippo", "magicWord").await,
            vec!["Please say 'wolf'... not negotiable."]
        );
    }

    #[tokio::test]
    async fn test_turn_without_input_reissues_nothing() {
        let engine = DialogueEngine::new(
            magic_word_flow(),
            "magicWord",
            Arc::new(ConvoState::default()),
        );
        let storage = InMemoryStateStorage::new();

        say(&engine, &storage, "hello", "magicWord").await;

        // an already-issued question is not repeated on an empty turn
        let output = engine.run_turn(&storage, TurnInput::default()).await.unwrap();
        assert!(output.messages.is_empty());
    }
}
