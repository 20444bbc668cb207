//! Lifecycle Flow Tests
//!
//! End-to-end flows through [`MatchEngine`]: a batch suggestion accepted and
//! completed, a live request handed off to another assistant, and the event
//! trail each flow leaves behind. The handoff flow runs on the SQLite store.

use staffline_match_engine::prelude::*;

fn assistant(id: &str, load: u32) -> AssistantProfile {
    AssistantProfile::new(id)
        .with_skills(["email", "calendar"])
        .with_industries(["healthcare"])
        .with_timezone("America/New_York")
        .with_rate(30.0)
        .with_capacity(Hours::whole(40), Hours::whole(load))
        .vetted()
}

fn requirements(hours: f64) -> MatchRequirements {
    MatchRequirements::builder()
        .required_skills(["email"])
        .preferred_skills(["calendar"])
        .industry("healthcare")
        .timezone("America/New_York")
        .budget(35.0)
        .hours_per_week(hours)
        .build()
        .unwrap()
}

async fn load_of(engine: &MatchEngine, id: &str) -> Hours {
    engine
        .store()
        .get(&AssistantId::from(id))
        .await
        .unwrap()
        .unwrap()
        .current_load
}

#[tokio::test]
async fn test_suggestion_flow_reserves_only_on_accept() {
    let engine = MatchEngine::in_memory(EngineConfig::default()).unwrap();
    engine.register_assistant(assistant("va-1", 10)).await.unwrap();
    engine.register_assistant(assistant("va-2", 30)).await.unwrap();
    let mut events = engine.events().subscribe();

    let suggestions = engine
        .suggest_matches("client-7", &requirements(8.0), None)
        .await
        .unwrap();
    assert_eq!(suggestions.len(), 2);
    // Load is not a ranking factor; both score the same and the tie falls to id
    assert_eq!(suggestions[0].assistant_id, Some(AssistantId::from("va-1")));
    assert_eq!(load_of(&engine, "va-1").await, Hours::whole(10));

    let chosen = suggestions[0].assignment_id;
    let manager = engine.manager();
    manager.mark_reviewed(&chosen).await.unwrap();
    let accepted = match manager.accept_suggestion(&chosen).await.unwrap() {
        AcceptOutcome::Accepted(assignment) => assignment,
        other => panic!("unexpected {:?}", other),
    };
    assert_eq!(accepted.status, AssignmentStatus::Suggestion(SuggestionStatus::Accepted));
    assert_eq!(load_of(&engine, "va-1").await, Hours::whole(18));

    manager.expire(&suggestions[1].assignment_id).await.unwrap();
    manager.complete(&chosen).await.unwrap();
    assert_eq!(load_of(&engine, "va-1").await, Hours::whole(10));

    let trail: Vec<_> = engine
        .events()
        .history_for(chosen)
        .await
        .into_iter()
        .map(|e| (e.old_status, e.new_status))
        .collect();
    assert_eq!(
        trail,
        [
            (None, "suggested".to_string()),
            (Some("suggested".to_string()), "reviewed".to_string()),
            (Some("reviewed".to_string()), "accepted".to_string()),
            (Some("accepted".to_string()), "completed".to_string()),
        ]
    );

    let first = events.recv().await.unwrap();
    assert_eq!(first.kind, EventKind::Suggestion);
    assert_eq!(first.requester_id, "client-7");
}

#[tokio::test]
async fn test_rejected_suggestion_cannot_be_accepted() {
    let engine = MatchEngine::in_memory(EngineConfig::default()).unwrap();
    engine.register_assistant(assistant("va-1", 0)).await.unwrap();
    let id = engine
        .suggest_matches("client-7", &requirements(8.0), Some(1))
        .await
        .unwrap()[0]
        .assignment_id;

    let manager = engine.manager();
    manager.mark_reviewed(&id).await.unwrap();
    manager.reject_suggestion(&id).await.unwrap();

    let err = manager.accept_suggestion(&id).await.unwrap_err();
    assert!(matches!(err, MatchEngineError::InvalidTransition { entity: "suggestion", .. }));
    assert_eq!(load_of(&engine, "va-1").await, Hours::ZERO);
}

#[tokio::test]
async fn test_live_handoff_on_sqlite() {
    let config = EngineConfig {
        database: DatabaseConfig {
            url: Some("sqlite::memory:".to_string()),
        },
        ..Default::default()
    };
    let engine = MatchEngine::with_sqlite(config).await.unwrap();
    engine.register_assistant(assistant("va-1", 0)).await.unwrap();
    engine.register_assistant(assistant("va-2", 5)).await.unwrap();

    let live = match engine.open_live_request("chat-3", Hours::whole(6), 1).await.unwrap() {
        LiveRequestOutcome::Routed(assignment) => assignment,
        other => panic!("unexpected {:?}", other),
    };
    assert_eq!(live.assistant_id, Some(AssistantId::from("va-1")));
    assert_eq!(load_of(&engine, "va-1").await, Hours::whole(6));

    let manager = engine.manager();
    let handoff = manager
        .request_handoff(&live.assignment_id, AssistantId::from("va-2"), Some("shift ended".into()))
        .await
        .unwrap();
    match manager.accept_handoff(&handoff.handoff_id).await.unwrap() {
        HandoffOutcome::Accepted(h) => assert!(h.unreleased.is_none()),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(load_of(&engine, "va-1").await, Hours::ZERO);
    assert_eq!(load_of(&engine, "va-2").await, Hours::whole(11));

    manager.complete_handoff(&handoff.handoff_id).await.unwrap();
    manager.complete(&live.assignment_id).await.unwrap();
    assert_eq!(load_of(&engine, "va-2").await, Hours::whole(5));

    let handoff_events: Vec<_> = engine
        .events()
        .history_for(live.assignment_id)
        .await
        .into_iter()
        .filter(|e| e.kind == EventKind::Handoff)
        .map(|e| e.new_status)
        .collect();
    assert_eq!(handoff_events, ["pending", "accepted", "completed"]);

    let stats = engine.stats().await.unwrap();
    assert_eq!(stats.committed_hours, Hours::whole(5));
    assert_eq!(stats.outstanding_reservations, 0);
    assert_eq!(stats.assignments.completed, 1);
}

#[tokio::test]
async fn test_handoff_to_self_rejected() {
    let engine = MatchEngine::in_memory(EngineConfig::default()).unwrap();
    engine.register_assistant(assistant("va-1", 0)).await.unwrap();
    let live = match engine.open_live_request("chat-3", Hours::whole(2), 0).await.unwrap() {
        LiveRequestOutcome::Routed(assignment) => assignment,
        other => panic!("unexpected {:?}", other),
    };

    assert!(matches!(
        engine
            .manager()
            .request_handoff(&live.assignment_id, AssistantId::from("va-1"), None)
            .await,
        Err(MatchEngineError::Validation(_))
    ));
}
