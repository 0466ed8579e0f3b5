use super::*;

fn itinerary(id: &str) -> Itinerary {
    Itinerary {
        id: id.into(),
        ..Itinerary::default()
    }
}

#[test]
fn assistant_tail_replaces_last_assistant_turn_only() {
    let mut session = Session::default();
    session.push_turn(Turn::user("hi"));
    session.set_assistant_tail("working");
    session.set_assistant_tail("done");
    assert_eq!(session.transcript(), &[Turn::user("hi"), Turn::assistant("done")]);
    assert!(!session.has_adjacent_assistant_turns());

    session.push_turn(Turn::user("again"));
    session.set_assistant_tail("reply");
    assert_eq!(session.transcript().len(), 4);
}

#[test]
fn adjacent_assistant_turns_are_detected() {
    let mut session = Session::default();
    session.push_turn(Turn::assistant("a"));
    session.push_turn(Turn::assistant("b"));
    assert!(session.has_adjacent_assistant_turns());
}

#[test]
fn empty_incoming_keeps_existing_itineraries() {
    let mut session = Session::default();
    session.merge_itineraries(Vec::new(), || vec![itinerary("fallback")]);
    assert_eq!(session.itineraries()[0].id, "fallback");

    session.merge_itineraries(vec![itinerary("x")], Vec::new);
    assert_eq!(session.itineraries(), &[itinerary("x")]);

    session.merge_itineraries(Vec::new(), || vec![itinerary("fallback")]);
    assert_eq!(session.itineraries(), &[itinerary("x")]);
}

#[test]
fn closing_wizard_without_preferences_reverts_phase() {
    let mut session = Session::default();
    session.open_wizard("Plan a trip".into());
    assert_eq!(session.phase(), Phase::CollectingPreferences);
    assert_eq!(session.close_wizard().as_deref(), Some("Plan a trip"));
    assert_eq!(session.phase(), Phase::AwaitingFirstMessage);
    assert!(session.pending_query().is_none());
}
