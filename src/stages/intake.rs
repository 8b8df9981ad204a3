//! Intake stage - ingest the parsed turn into state
//!
//! Places raw input into state for Fill to consume; no validation happens
//! here. Also seeds the default ability and routes an ability-naming intent
//! to focus when nothing is being pursued yet.

use crate::flow::Flow;
use crate::state::{DialogueStore, Transition};
use crate::types::TurnInput;

pub(crate) fn intake<G: Send + Sync + 'static>(
    store: &mut DialogueStore,
    flow: &Flow<G>,
    input: &TurnInput,
    default_ability: &str,
) {
    store.dispatch(Transition::BeginTurn);

    if let Some(message) = &input.message {
        store.dispatch(Transition::SetMessageData(message.clone()));
    }

    if store.state().default_ability.is_none() {
        store.dispatch(Transition::SetDefaultAbility(default_ability.to_string()));
    }

    // An intent naming a declared ability focuses it, but never steals focus
    // from an ability already in progress.
    if store.state().focused_ability.is_none() {
        let intent_ability = input
            .message
            .as_ref()
            .and_then(|m| m.intent.as_deref())
            .filter(|intent| flow.has_ability(intent));
        if let Some(name) = intent_ability {
            tracing::debug!(target: "colloquy::intake", ability = %name, "focusing ability from intent");
            store.dispatch(Transition::SetFocusedAbility(Some(name.to_string())));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Ability, MessageData};

    fn flow() -> Flow<()> {
        Flow::new(vec![Ability::new(
            "order",
            Vec::new(),
            |_storage, _submitted| async { Ok(None) },
        )])
    }

    #[test]
    fn test_intake_seeds_default_ability_once() {
        let mut store = DialogueStore::default();
        intake(&mut store, &flow(), &TurnInput::default(), "order");
        assert_eq!(store.state().default_ability, Some("order".to_string()));

        // a changed engine default does not overwrite persisted state
        intake(&mut store, &flow(), &TurnInput::default(), "other");
        assert_eq!(store.state().default_ability, Some("order".to_string()));
    }

    #[test]
    fn test_intake_focuses_declared_intent() {
        let mut store = DialogueStore::default();
        let input = TurnInput::message(MessageData::new("hi").with_intent("order"));
        intake(&mut store, &flow(), &input, "order");

        assert_eq!(store.state().focused_ability, Some("order".to_string()));
        assert_eq!(store.state().turn, 1);
    }

    #[test]
    fn test_intake_ignores_unknown_intent() {
        let mut store = DialogueStore::default();
        let input = TurnInput::message(MessageData::new("hi").with_intent("weather"));
        intake(&mut store, &flow(), &input, "order");

        assert_eq!(store.state().focused_ability, None);
    }
}
