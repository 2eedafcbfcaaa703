//! Validation and normalization of raw decision payloads.
//!
//! This is the only place canonical [`Decision`] values are created. The
//! model is treated as a noisy collaborator: out-of-range numbers are
//! clamped and unknown enum spellings fall back to defaults, but
//! structurally missing required text fails the decision.

use super::types::{
    Decision, DecisionMetadata, DecisionOption, Importance, Pacing, RawDecisionMetadata,
    RawDecisionOption, RawNarrativeUpdate, RawPlayerDecision,
};
use crate::error::DecisionError;
use crate::update::NarrativeUpdate;
use uuid::Uuid;

/// A canonical decision plus any normalization warnings attached along
/// the way (dropped options, defaulted enum values).
#[derive(Debug, Clone)]
pub struct ValidatedDecision {
    pub decision: Decision,
    pub warnings: Vec<String>,
}

/// Validate a raw decision into the canonical form.
///
/// Rules apply in order and the first hard failure wins: a missing prompt,
/// then missing options, then all options being invalid.
pub fn validate(raw: RawPlayerDecision) -> Result<ValidatedDecision, DecisionError> {
    let mut warnings = Vec::new();

    let prompt = raw
        .prompt
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| DecisionError::Validation("missing prompt".to_string()))?
        .to_string();

    let raw_options = raw
        .options
        .filter(|o| !o.is_empty())
        .ok_or_else(|| DecisionError::Validation("no options".to_string()))?;

    let mut options = Vec::with_capacity(raw_options.len());
    let mut seen_ids = Vec::new();
    for (index, raw_option) in raw_options.into_iter().enumerate() {
        match normalize_option(raw_option, index, &mut seen_ids, &mut warnings) {
            Some(option) => options.push(option),
            None => warnings.push(format!("dropped option {} with empty text", index + 1)),
        }
    }

    if options.is_empty() {
        return Err(DecisionError::Validation("all options invalid".to_string()));
    }

    let decision_id = raw
        .decision_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let relevance_score = clamp_unit(raw.relevance_score.unwrap_or(0.5));
    let metadata = normalize_metadata(raw.metadata.unwrap_or_default(), &mut warnings);

    Ok(ValidatedDecision {
        decision: Decision {
            decision_id,
            prompt,
            options,
            relevance_score,
            metadata,
        },
        warnings,
    })
}

/// Normalize raw update fields carried as JSON. Never fails; defaults
/// fill every gap and blank strings are discarded.
pub fn validate_update(raw: RawNarrativeUpdate) -> NarrativeUpdate {
    let opponent = raw
        .opponent
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty());

    NarrativeUpdate {
        location_change: raw
            .location_change
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty()),
        acquired_items: clean_items(raw.acquired_items),
        removed_items: clean_items(raw.removed_items),
        // An opponent descriptor alone is still a combat signal.
        combat_triggered: raw.combat_triggered.unwrap_or(false) || opponent.is_some(),
        opponent,
        suggested_actions: clean_items(raw.suggested_actions),
    }
}

fn normalize_option(
    raw: RawDecisionOption,
    index: usize,
    seen_ids: &mut Vec<String>,
    warnings: &mut Vec<String>,
) -> Option<DecisionOption> {
    let text = raw
        .text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())?
        .to_string();

    let mut id = raw
        .id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| format!("opt-{}", index + 1));

    if seen_ids.contains(&id) {
        let unique = format!("{}-{}", id, index + 1);
        warnings.push(format!("duplicate option id '{id}' renamed to '{unique}'"));
        id = unique;
    }
    seen_ids.push(id.clone());

    Some(DecisionOption {
        id,
        text,
        confidence: clamp_unit(raw.confidence.unwrap_or(0.5)),
        traits: raw.traits.unwrap_or_default(),
        potential_outcomes: raw.potential_outcomes.unwrap_or_default(),
        impact: raw.impact.filter(|i| !i.trim().is_empty()),
    })
}

fn normalize_metadata(raw: RawDecisionMetadata, warnings: &mut Vec<String>) -> DecisionMetadata {
    let importance = match raw.importance.as_deref() {
        None => Importance::default(),
        Some(value) => match value.to_lowercase().as_str() {
            "minor" => Importance::Minor,
            "moderate" => Importance::Moderate,
            "significant" => Importance::Significant,
            "critical" => Importance::Critical,
            other => {
                warnings.push(format!("unrecognized importance '{other}', using moderate"));
                Importance::Moderate
            }
        },
    };

    let pacing = match raw.pacing.as_deref() {
        None => Pacing::default(),
        Some(value) => match value.to_lowercase().as_str() {
            "slow" => Pacing::Slow,
            "medium" => Pacing::Medium,
            "fast" => Pacing::Fast,
            other => {
                warnings.push(format!("unrecognized pacing '{other}', using medium"));
                Pacing::Medium
            }
        },
    };

    DecisionMetadata {
        narrative_impact: raw.narrative_impact.filter(|v| !v.trim().is_empty()),
        theme_alignment: raw.theme_alignment.filter(|v| !v.trim().is_empty()),
        pacing,
        importance,
    }
}

fn clean_items(items: Option<Vec<String>>) -> Vec<String> {
    items
        .unwrap_or_default()
        .into_iter()
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
        .collect()
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        return 0.5;
    }
    value.clamp(0.0, 1.0)
}
