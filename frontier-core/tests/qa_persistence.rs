//! QA tests for save/load and version migration against real files.
//!
//! Run with: `cargo test -p frontier-core --test qa_persistence`

use chrono::Utc;
use frontier_core::combat::{CombatState, TurnOwner};
use frontier_core::decision::DecisionHistoryEntry;
use frontier_core::persist::{load_from_str, PersistError, SavedStory};

fn sample_entry(decision_id: &str, tags: &[&str]) -> DecisionHistoryEntry {
    DecisionHistoryEntry {
        decision_id: decision_id.to_string(),
        selected_option_id: "ride".to_string(),
        narrative: "You rode out before sunrise.".to_string(),
        impact_description: "The posse lost your trail.".to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        relevance_score: 0.7,
        timestamp: Utc::now(),
    }
}

// =============================================================================
// TEST 1: Save and load round trip through the filesystem
// =============================================================================

#[tokio::test]
async fn test_save_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("story.json");

    let story = SavedStory::new(
        "Dust & Silver",
        "DRY GULCH",
        vec![
            sample_entry("d-1", &["outlaw"]),
            sample_entry("d-2", &["gold", "saloon"]),
        ],
        CombatState {
            active: true,
            opponent: Some("the Creek Gang".to_string()),
            turn: TurnOwner::Opponent,
        },
    );

    story.save_json(&path).await.unwrap();
    let loaded = SavedStory::load_json(&path).await.unwrap();

    assert!(loaded.migration_notes.is_empty());
    let loaded = loaded.story;
    assert_eq!(loaded.campaign_name, "Dust & Silver");
    assert_eq!(loaded.location, "DRY GULCH");
    assert_eq!(loaded.history.len(), 2);
    assert_eq!(loaded.history[0].decision_id, "d-1");
    assert_eq!(loaded.history[1].tags, vec!["gold", "saloon"]);
    assert!(loaded.combat.active);
    assert_eq!(loaded.combat.opponent.as_deref(), Some("the Creek Gang"));
    assert_eq!(loaded.combat.turn, TurnOwner::Opponent);
}

// =============================================================================
// TEST 2: History order survives persistence
// =============================================================================

#[tokio::test]
async fn test_history_order_preserved() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("story.json");

    let entries: Vec<DecisionHistoryEntry> = (0..6)
        .map(|i| sample_entry(&format!("d-{i}"), &[]))
        .collect();
    let story = SavedStory::new("Ordered", "MESA", entries, CombatState::default());

    story.save_json(&path).await.unwrap();
    let loaded = SavedStory::load_json(&path).await.unwrap().story;

    let ids: Vec<&str> = loaded.history.iter().map(|e| e.decision_id.as_str()).collect();
    assert_eq!(ids, vec!["d-0", "d-1", "d-2", "d-3", "d-4", "d-5"]);
}

// =============================================================================
// TEST 3: Legacy version-1 files load through migration
// =============================================================================

#[tokio::test]
async fn test_v1_file_migrates_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("old-save.json");

    let legacy = serde_json::json!({
        "version": 1,
        "savedAt": "2025-11-02T09:30:00Z",
        "campaignName": "Old Trail",
        "location": "FORT",
        "history": [],
        "combatActive": true,
        "combatOpponent": "a claim jumper",
        "currentTurn": {"round": 2, "initiative": 14}
    });
    tokio::fs::write(&path, serde_json::to_string_pretty(&legacy).unwrap())
        .await
        .unwrap();

    let loaded = SavedStory::load_json(&path).await.unwrap();

    // The ambiguous turn object is surfaced, not silently swallowed.
    assert_eq!(loaded.migration_notes.len(), 1);
    assert!(loaded.migration_notes[0].contains("currentTurn"));

    let story = loaded.story;
    assert_eq!(story.campaign_name, "Old Trail");
    assert_eq!(story.location, "FORT");
    assert!(story.combat.active);
    assert_eq!(story.combat.opponent.as_deref(), Some("a claim jumper"));
    assert_eq!(story.combat.turn, TurnOwner::Player);

    // Re-saving writes the current format; the next load needs no notes.
    story.save_json(&path).await.unwrap();
    let reloaded = SavedStory::load_json(&path).await.unwrap();
    assert!(reloaded.migration_notes.is_empty());
    assert_eq!(reloaded.story.combat.turn, TurnOwner::Player);
}

// =============================================================================
// TEST 4: Bad files produce typed errors
// =============================================================================

#[tokio::test]
async fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist.json");

    let err = SavedStory::load_json(&path).await.unwrap_err();
    assert!(matches!(err, PersistError::Io(_)));
}

#[test]
fn test_corrupt_json_is_json_error() {
    let err = load_from_str("{not json").unwrap_err();
    assert!(matches!(err, PersistError::Json(_)));
}

#[test]
fn test_future_version_is_rejected() {
    let err = load_from_str(r#"{"version": 7, "campaignName": "Future"}"#).unwrap_err();
    match err {
        PersistError::VersionMismatch { expected, found } => {
            assert_eq!(expected, 2);
            assert_eq!(found, 7);
        }
        other => panic!("expected VersionMismatch, got {other}"),
    }
}
