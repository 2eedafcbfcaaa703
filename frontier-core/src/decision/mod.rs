//! The narrative decision pipeline.
//!
//! Turns free-form model output into validated decision points, decides
//! when to surface them, and keeps the append-only record of choices.

mod detector;
mod history;
mod parser;
mod service;
mod types;
mod validate;

pub use detector::{beat_relevance, DecisionDetector, DetectorConfig, DetectorState};
pub use history::DecisionHistory;
pub use parser::{parse_decision_payload, parse_decision_response};
pub use service::{
    DecisionClient, DecisionService, GenerateOutcome, GenerationConfig, OpenAiDecisionClient,
    PlayerChoice, PlayerDecision, StoryContext,
};
pub use types::{
    Decision, DecisionHistoryEntry, DecisionMetadata, DecisionOption, Importance, Pacing,
    RawDecisionMetadata, RawDecisionOption, RawNarrativeUpdate, RawPlayerDecision,
};
pub use validate::{validate, validate_update, ValidatedDecision};
