//! Save/load for story state.
//!
//! Saves are versioned JSON. Version 2 is the current format and stores
//! the canonical [`CombatState`]. Version 1 files, written by the legacy
//! client, stored combat as loose camelCase fields with a free-form
//! `currentTurn` value; loading one migrates it and reports what the
//! migration had to decide, so nothing is silently papered over.

use crate::combat::{CombatState, TurnOwner};
use crate::decision::DecisionHistoryEntry;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::fs;

/// Current save file version.
const SAVE_VERSION: u32 = 2;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected} or earlier, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// A saved story with all state needed to resume play.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedStory {
    /// Save format version for compatibility checking.
    pub version: u32,

    /// When the save was created (RFC 3339).
    pub saved_at: String,

    pub campaign_name: String,

    /// Current location token.
    pub location: String,

    /// The decision history entry sequence, as plain data.
    pub history: Vec<DecisionHistoryEntry>,

    pub combat: CombatState,
}

impl SavedStory {
    pub fn new(
        campaign_name: impl Into<String>,
        location: impl Into<String>,
        history: Vec<DecisionHistoryEntry>,
        combat: CombatState,
    ) -> Self {
        Self {
            version: SAVE_VERSION,
            saved_at: Utc::now().to_rfc3339(),
            campaign_name: campaign_name.into(),
            location: location.into(),
            history,
            combat,
        }
    }

    /// Save to a JSON file.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Load from a JSON file, migrating older versions.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<LoadedStory, PersistError> {
        let content = fs::read_to_string(path).await?;
        load_from_str(&content)
    }
}

/// A loaded story plus any notes the version migration produced.
#[derive(Debug, Clone)]
pub struct LoadedStory {
    pub story: SavedStory,
    /// Human-readable notes about migration decisions (empty for
    /// current-version saves).
    pub migration_notes: Vec<String>,
}

/// Parse a save from its JSON text, migrating older versions.
pub fn load_from_str(content: &str) -> Result<LoadedStory, PersistError> {
    let value: serde_json::Value = serde_json::from_str(content)?;
    let version = value
        .get("version")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32;

    match version {
        1 => {
            let v1: SavedStoryV1 = serde_json::from_value(value)?;
            Ok(migrate_v1(v1))
        }
        SAVE_VERSION => {
            let story: SavedStory = serde_json::from_value(value)?;
            Ok(LoadedStory {
                story,
                migration_notes: Vec::new(),
            })
        }
        found => Err(PersistError::VersionMismatch {
            expected: SAVE_VERSION,
            found,
        }),
    }
}

// ============================================================================
// Version 1 migration
// ============================================================================

/// The legacy save shape: camelCase, combat as loose fields, and a
/// `currentTurn` that may be a plain string or a structured object.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SavedStoryV1 {
    #[allow(dead_code)]
    version: u32,
    saved_at: String,
    campaign_name: String,
    location: String,
    history: Vec<DecisionHistoryEntry>,
    combat_active: bool,
    combat_opponent: Option<String>,
    current_turn: serde_json::Value,
}

impl Default for SavedStoryV1 {
    fn default() -> Self {
        Self {
            version: 1,
            saved_at: String::new(),
            campaign_name: String::new(),
            location: String::new(),
            history: Vec::new(),
            combat_active: false,
            combat_opponent: None,
            current_turn: serde_json::Value::Null,
        }
    }
}

fn migrate_v1(v1: SavedStoryV1) -> LoadedStory {
    let mut notes = Vec::new();

    let turn = match parse_legacy_turn(&v1.current_turn) {
        Ok(turn) => turn,
        Err(reason) => {
            notes.push(format!(
                "currentTurn {reason}; defaulted to the player turn"
            ));
            TurnOwner::Player
        }
    };

    let story = SavedStory {
        version: SAVE_VERSION,
        saved_at: if v1.saved_at.is_empty() {
            Utc::now().to_rfc3339()
        } else {
            v1.saved_at
        },
        campaign_name: v1.campaign_name,
        location: v1.location,
        history: v1.history,
        combat: CombatState {
            active: v1.combat_active,
            opponent: v1.combat_opponent,
            turn,
        },
    };

    LoadedStory {
        story,
        migration_notes: notes,
    }
}

/// Interpret a legacy `currentTurn` value. Strings map directly; objects
/// are accepted when they carry a recognizable side under a known key.
/// Anything else is an error the caller must surface, not swallow.
fn parse_legacy_turn(value: &serde_json::Value) -> Result<TurnOwner, String> {
    match value {
        serde_json::Value::Null => Ok(TurnOwner::Player),
        serde_json::Value::String(s) => parse_turn_name(s)
            .ok_or_else(|| format!("names unknown side '{s}'")),
        serde_json::Value::Object(map) => {
            for key in ["side", "role", "name"] {
                if let Some(serde_json::Value::String(s)) = map.get(key) {
                    return parse_turn_name(s)
                        .ok_or_else(|| format!("object names unknown side '{s}'"));
                }
            }
            Err("is an object without a recognizable side".to_string())
        }
        other => Err(format!("has unexpected type ({other})")),
    }
}

fn parse_turn_name(name: &str) -> Option<TurnOwner> {
    match name.to_lowercase().as_str() {
        "player" => Some(TurnOwner::Player),
        "opponent" | "enemy" => Some(TurnOwner::Opponent),
        _ => None,
    }
}
