//! QA tests for the end-to-end decision pipeline.
//!
//! These run against `MockClient`, so they are deterministic and make no
//! network calls. Run with: `cargo test -p frontier-core --test qa_pipeline`

use frontier_core::decision::{
    DecisionService, DetectorConfig, GenerateOutcome, StoryContext,
};
use frontier_core::error::DecisionError;
use frontier_core::testing::{decision_payload, MockClient, MockReply};
use std::time::{Duration, SystemTime};

fn eager_detector() -> DetectorConfig {
    DetectorConfig {
        cooldown: Duration::from_millis(0),
        relevance_threshold: 0.5,
    }
}

fn context() -> StoryContext {
    StoryContext {
        campaign_name: "Dust & Silver".to_string(),
        location: "SALOON".to_string(),
        recent_narrative: vec!["A stranger pushes through the doors.".to_string()],
        force_decision: false,
    }
}

// =============================================================================
// TEST 1: Full generate -> present -> record flow
// =============================================================================

#[tokio::test]
async fn test_full_decision_flow() {
    let client = MockClient::new();
    client.queue_text(decision_payload(
        "The stranger offers you a job. Take it?",
        &[("accept", "Shake his hand"), ("decline", "Turn him down")],
    ));

    let mut service =
        DecisionService::new(client.clone()).with_detector_config(eager_detector());
    service.note_beat(0.8);

    let outcome = service.generate_decision(&context()).await.unwrap();
    let GenerateOutcome::Generated(validated) = outcome else {
        panic!("expected a generated decision");
    };

    assert_eq!(client.calls(), 1);
    assert!(validated.warnings.is_empty());
    let decision = &validated.decision;
    assert_eq!(decision.options.len(), 2);

    // Player-facing mapping preserves count, order, and identifiers.
    let player = service.to_player_decision(decision);
    assert_eq!(player.choices.len(), 2);
    assert_eq!(player.choices[0].id, "accept");
    assert_eq!(player.choices[1].id, "decline");
    assert_eq!(player.choices[0].label, "Shake his hand");

    // Record the player's choice.
    service
        .record_decision(
            &decision.decision_id,
            "accept",
            "You took the job",
            "Now on the Marshal's bad side",
            vec!["outlaw".to_string()],
        )
        .unwrap();

    assert_eq!(service.history().len(), 1);
    let entry = &service.history().entries()[0];
    assert_eq!(entry.decision_id, decision.decision_id);
    assert_eq!(entry.selected_option_id, "accept");

    // Double-recording is rejected.
    assert!(service
        .record_decision(&decision.decision_id, "accept", "again", "again", vec![])
        .is_err());
}

// =============================================================================
// TEST 2: Detector gates generation
// =============================================================================

#[tokio::test]
async fn test_no_decision_without_relevance() {
    let client = MockClient::new();
    let mut service =
        DecisionService::new(client.clone()).with_detector_config(eager_detector());

    let outcome = service.generate_decision(&context()).await.unwrap();
    assert!(matches!(outcome, GenerateOutcome::NotReady));
    assert_eq!(client.calls(), 0, "detector said no; no network call");
}

#[tokio::test]
async fn test_override_forces_generation() {
    let client = MockClient::new();
    client.queue_text(decision_payload("Forced moment", &[("go", "Go")]));

    let mut service =
        DecisionService::new(client.clone()).with_detector_config(DetectorConfig {
            cooldown: Duration::from_secs(3600),
            relevance_threshold: 100.0,
        });

    let mut ctx = context();
    ctx.force_decision = true;
    let outcome = service.generate_decision(&ctx).await.unwrap();
    assert!(matches!(outcome, GenerateOutcome::Generated(_)));
    assert_eq!(client.calls(), 1);
}

// =============================================================================
// TEST 3: Rate limiting fails fast with zero network calls
// =============================================================================

#[tokio::test]
async fn test_rate_limit_exhausted_fails_fast() {
    let client = MockClient::new();
    let reset_at = SystemTime::now() + Duration::from_secs(60);
    client.set_rate_limit(Some(0), Some(reset_at));

    let mut service =
        DecisionService::new(client.clone()).with_detector_config(eager_detector());
    service.note_beat(1.0);

    let err = service.generate_decision(&context()).await.unwrap_err();
    match err {
        DecisionError::RateLimited { reset_at: reported } => {
            assert_eq!(reported, Some(reset_at));
        }
        other => panic!("expected RateLimited, got {other}"),
    }
    assert_eq!(client.calls(), 0, "quota exhausted; no network call");
}

// =============================================================================
// TEST 4: Single-flight generation
// =============================================================================

#[tokio::test]
async fn test_second_generation_reports_busy() {
    let client = MockClient::new();
    client.queue(MockReply::Hang);

    let mut service =
        DecisionService::new(client.clone()).with_detector_config(eager_detector());
    service.note_beat(1.0);

    // Start a generation and abandon it mid-flight.
    let ctx = context();
    let first = tokio::time::timeout(Duration::from_millis(10), service.generate_decision(&ctx));
    assert!(first.await.is_err(), "scripted hang should outlive the poll");
    assert_eq!(client.calls(), 1);

    // The session is busy until the abandonment is acknowledged.
    let second = service.generate_decision(&ctx).await.unwrap();
    assert!(matches!(second, GenerateOutcome::Busy));
    assert_eq!(client.calls(), 1, "busy result must not issue a second call");

    // Cancelling returns the detector to idle and nothing was recorded.
    service.cancel();
    assert!(service.history().is_empty());
    client.queue_text(decision_payload("Back on track", &[("ok", "Carry on")]));
    let third = service.generate_decision(&ctx).await.unwrap();
    assert!(matches!(third, GenerateOutcome::Generated(_)));
}

// =============================================================================
// TEST 5: Deadline on the generation call
// =============================================================================

#[tokio::test]
async fn test_generation_deadline() {
    let client = MockClient::new();
    client.queue(MockReply::Hang);

    let mut service = DecisionService::new(client.clone())
        .with_detector_config(eager_detector())
        .with_request_timeout(Duration::from_millis(20));
    service.note_beat(1.0);

    let err = service.generate_decision(&context()).await.unwrap_err();
    assert!(matches!(err, DecisionError::Timeout(_)));

    // A timed-out cycle leaves the session usable.
    client.queue_text(decision_payload("Try again", &[("ok", "Carry on")]));
    let outcome = service.generate_decision(&context()).await.unwrap();
    assert!(matches!(outcome, GenerateOutcome::Generated(_)));
}

// =============================================================================
// TEST 6: Typed failures for bad model output
// =============================================================================

#[tokio::test]
async fn test_malformed_reply_is_parsing_error() {
    let client = MockClient::new();
    client.queue_text("The model rambled and produced no JSON at all.");

    let mut service =
        DecisionService::new(client.clone()).with_detector_config(eager_detector());
    service.note_beat(1.0);

    let err = service.generate_decision(&context()).await.unwrap_err();
    assert!(matches!(err, DecisionError::Parsing(_)));

    // Signals stay armed; the next cycle can succeed without new beats.
    client.queue_text(decision_payload("Recovered", &[("ok", "Carry on")]));
    let outcome = service.generate_decision(&context()).await.unwrap();
    assert!(matches!(outcome, GenerateOutcome::Generated(_)));
}

#[tokio::test]
async fn test_missing_prompt_is_validation_error() {
    let client = MockClient::new();
    client.queue_text(r#"{"options": []}"#.to_string());

    let mut service =
        DecisionService::new(client.clone()).with_detector_config(eager_detector());
    service.note_beat(1.0);

    let err = service.generate_decision(&context()).await.unwrap_err();
    match err {
        DecisionError::Validation(reason) => assert!(reason.contains("missing prompt")),
        other => panic!("expected Validation, got {other}"),
    }
}

#[tokio::test]
async fn test_transport_error_is_request_error() {
    let client = MockClient::new();
    client.queue(MockReply::Error("connection reset".to_string()));

    let mut service =
        DecisionService::new(client.clone()).with_detector_config(eager_detector());
    service.note_beat(1.0);

    let err = service.generate_decision(&context()).await.unwrap_err();
    assert!(matches!(err, DecisionError::Request(_)));
    assert!(err.is_transport());
}

// =============================================================================
// TEST 7: Envelope-shaped replies are accepted
// =============================================================================

#[tokio::test]
async fn test_envelope_reply_accepted() {
    let inner = decision_payload("Inside the envelope", &[("ok", "Carry on")]);
    let envelope = serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content": inner}}]
    })
    .to_string();

    let client = MockClient::new();
    client.queue_text(envelope);

    let mut service =
        DecisionService::new(client.clone()).with_detector_config(eager_detector());
    service.note_beat(1.0);

    let outcome = service.generate_decision(&context()).await.unwrap();
    let GenerateOutcome::Generated(validated) = outcome else {
        panic!("expected a generated decision");
    };
    assert_eq!(validated.decision.prompt, "Inside the envelope");
}
