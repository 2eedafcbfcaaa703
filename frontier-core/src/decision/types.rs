//! Canonical and raw decision data model.
//!
//! Canonical types (`Decision`, `DecisionOption`, `DecisionHistoryEntry`)
//! are produced only by the validator and treated as immutable afterwards.
//! Raw types are the untrusted, all-optional shapes that exist between
//! extraction and validation; they never cross the validator boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One selectable action within a decision point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionOption {
    /// Unique within the owning decision.
    pub id: String,

    /// Display text; never empty after validation.
    pub text: String,

    /// Model's self-rated plausibility, clamped to [0, 1].
    pub confidence: f32,

    /// Short tag strings characterizing the option.
    pub traits: Vec<String>,

    /// Free-text outcome sketches, in model order.
    pub potential_outcomes: Vec<String>,

    /// Free-text impact summary.
    pub impact: Option<String>,
}

/// A validated decision point to surface to the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Unique per generation.
    pub decision_id: String,

    /// Prompt shown to the player; never empty after validation.
    pub prompt: String,

    /// At least one option, in model order.
    pub options: Vec<DecisionOption>,

    /// How pertinent this decision is to current context, in [0, 1].
    /// Independent of option confidence; the two scales are never mixed.
    pub relevance_score: f32,

    pub metadata: DecisionMetadata,
}

/// Descriptive metadata attached to a decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionMetadata {
    pub narrative_impact: Option<String>,
    pub theme_alignment: Option<String>,
    pub pacing: Pacing,
    pub importance: Importance,
}

/// Story pacing the decision implies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pacing {
    Slow,
    #[default]
    Medium,
    Fast,
}

/// How much the decision matters to the story.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Minor,
    #[default]
    Moderate,
    Significant,
    Critical,
}

/// A past decision and its chosen outcome. Append-only; owned exclusively
/// by the history manager and never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionHistoryEntry {
    pub decision_id: String,
    pub selected_option_id: String,
    pub timestamp: DateTime<Utc>,
    /// What happened as a result of the choice.
    pub narrative: String,
    pub impact_description: String,
    pub tags: Vec<String>,
    /// Relevance the decision carried, kept for future weighting.
    pub relevance_score: f32,
}

// ============================================================================
// Raw (untrusted) shapes
// ============================================================================

/// Untrusted decision shape straight out of the model. All fields are
/// optional; strings may be missing or blank.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawPlayerDecision {
    pub decision_id: Option<String>,
    pub prompt: Option<String>,
    pub options: Option<Vec<RawDecisionOption>>,
    pub relevance_score: Option<f32>,
    pub metadata: Option<RawDecisionMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawDecisionOption {
    pub id: Option<String>,
    pub text: Option<String>,
    pub confidence: Option<f32>,
    pub traits: Option<Vec<String>>,
    pub potential_outcomes: Option<Vec<String>>,
    pub impact: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawDecisionMetadata {
    pub narrative_impact: Option<String>,
    pub theme_alignment: Option<String>,
    pub pacing: Option<String>,
    pub importance: Option<String>,
}

/// Untrusted update fields, for responses that carry the side channel as
/// JSON rather than tagged lines.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawNarrativeUpdate {
    pub location_change: Option<String>,
    pub acquired_items: Option<Vec<String>>,
    pub removed_items: Option<Vec<String>>,
    pub combat_triggered: Option<bool>,
    pub opponent: Option<String>,
    pub suggested_actions: Option<Vec<String>>,
}
