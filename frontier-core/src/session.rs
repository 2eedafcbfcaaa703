//! StorySession - the primary public API for the narrative pipeline.
//!
//! Wraps the decision service, field extraction, combat tracking, and
//! persistence into a single interface driven by one game session.

use crate::combat::CombatState;
use crate::decision::{
    beat_relevance, DecisionHistory, DecisionService, DetectorConfig, GenerateOutcome,
    GenerationConfig, OpenAiDecisionClient, PlayerDecision, StoryContext,
};
use crate::error::DecisionError;
use crate::persist::{PersistError, SavedStory};
use crate::update::{
    extract_fields, strip_metadata_logged, CleanupLog, NarrativeUpdate, TagError,
};
use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Maximum recent story beats kept for prompt context.
const MAX_RECENT_BEATS: usize = 12;

/// Errors from StorySession operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("decision error: {0}")]
    Decision(#[from] DecisionError),

    #[error("persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("No API key configured - set OPENAI_API_KEY environment variable")]
    NoApiKey,
}

/// Configuration for creating a new story session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Campaign name.
    pub campaign_name: String,

    /// Starting location token.
    pub starting_location: String,

    /// Model to use for generation.
    pub model: Option<String>,

    /// Maximum tokens for generated decisions.
    pub max_tokens: usize,

    /// Temperature for generation.
    pub temperature: Option<f32>,

    /// Minimum interval between decision points.
    pub cooldown: Duration,

    /// Accumulated relevance required before a decision is offered.
    pub relevance_threshold: f32,

    /// Deadline for a single generation call.
    pub request_timeout: Duration,
}

impl SessionConfig {
    /// Create a new session config with campaign name.
    pub fn new(campaign_name: impl Into<String>) -> Self {
        let detector = DetectorConfig::default();
        Self {
            campaign_name: campaign_name.into(),
            starting_location: "The Silver Dollar Saloon".to_string(),
            model: None,
            max_tokens: 1024,
            temperature: Some(0.8),
            cooldown: detector.cooldown,
            relevance_threshold: detector.relevance_threshold,
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Set the starting location.
    pub fn with_starting_location(mut self, location: impl Into<String>) -> Self {
        self.starting_location = location.into();
        self
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set max tokens for responses.
    pub fn with_max_tokens(mut self, tokens: usize) -> Self {
        self.max_tokens = tokens;
        self
    }

    /// Set temperature for generation.
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    /// Set the decision cooldown.
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Set the relevance threshold.
    pub fn with_relevance_threshold(mut self, threshold: f32) -> Self {
        self.relevance_threshold = threshold;
        self
    }

    /// Set the generation deadline.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Result of feeding one narration through the extractor.
#[derive(Debug, Clone)]
pub struct NarrativeOutcome {
    /// Story prose with metadata lines stripped, ready for display.
    pub prose: String,

    /// The extracted game-state deltas.
    pub update: NarrativeUpdate,

    /// Per-field extraction failures. One bad field never voids the rest.
    pub issues: Vec<TagError>,
}

/// A narrative game session.
///
/// Requires `OPENAI_API_KEY` to be set.
pub struct StorySession {
    service: DecisionService<OpenAiDecisionClient>,
    campaign_name: String,
    location: String,
    combat: CombatState,
    recent_beats: VecDeque<String>,
    cleanup: CleanupLog,
    migration_notes: Vec<String>,
}

impl StorySession {
    /// Create a new session with the given configuration.
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        let client = openai::OpenAi::from_env().map_err(|_| SessionError::NoApiKey)?;
        Ok(Self::build(config, client, DecisionHistory::new(), None))
    }

    /// Load a saved session from a file.
    ///
    /// Version migration notes, if any, are available through
    /// [`migration_notes`](Self::migration_notes) afterwards.
    pub async fn load(
        path: impl AsRef<Path>,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let client = openai::OpenAi::from_env().map_err(|_| SessionError::NoApiKey)?;
        let loaded = SavedStory::load_json(path).await?;

        let mut config = config;
        config.campaign_name = loaded.story.campaign_name.clone();

        let mut session = Self::build(
            config,
            client,
            DecisionHistory::from_entries(loaded.story.history),
            Some(loaded.story.location),
        );
        session.combat = loaded.story.combat;
        session.migration_notes = loaded.migration_notes;
        Ok(session)
    }

    fn build(
        config: SessionConfig,
        client: openai::OpenAi,
        history: DecisionHistory,
        location: Option<String>,
    ) -> Self {
        let client = OpenAiDecisionClient::new(client).with_config(GenerationConfig {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        });

        let service = DecisionService::new(client)
            .with_detector_config(DetectorConfig {
                cooldown: config.cooldown,
                relevance_threshold: config.relevance_threshold,
            })
            .with_request_timeout(config.request_timeout)
            .with_history(history);

        Self {
            service,
            campaign_name: config.campaign_name,
            location: location.unwrap_or(config.starting_location),
            combat: CombatState::default(),
            recent_beats: VecDeque::new(),
            cleanup: CleanupLog::new(),
            migration_notes: Vec::new(),
        }
    }

    /// Save the current session to a file.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        SavedStory::new(
            self.campaign_name.clone(),
            self.location.clone(),
            self.service.history().entries().to_vec(),
            self.combat.clone(),
        )
        .save_json(path)
        .await?;
        Ok(())
    }

    /// Feed one narration from the model through the pipeline.
    ///
    /// Extracts tagged fields, applies location/combat changes, feeds the
    /// beat's relevance to the decision detector, and returns clean prose
    /// for display alongside the update and any per-field issues.
    pub fn apply_narrative(&mut self, text: &str) -> NarrativeOutcome {
        let extraction = extract_fields(text);
        let prose = strip_metadata_logged(text, &mut self.cleanup);

        if let Some(location) = &extraction.update.location_change {
            self.location = location.clone();
        }
        if let Some(combat) = CombatState::from_update(&extraction.update) {
            self.combat = combat;
        }

        let relevance = beat_relevance(&extraction.update, self.service.history());
        self.service.note_beat(relevance);
        self.push_beat(&prose);

        NarrativeOutcome {
            prose,
            update: extraction.update,
            issues: extraction.errors,
        }
    }

    /// Combat ended in the narration; clear the canonical state.
    pub fn end_combat(&mut self) {
        self.combat.end();
    }

    /// Whether a decision point is warranted right now. Side-effect-free.
    pub fn decision_point_available(&self, force: bool) -> bool {
        self.service.detect_decision_point(&self.context(force))
    }

    /// Request the next decision point, if the detector allows one.
    pub async fn next_decision(&mut self, force: bool) -> Result<GenerateOutcome, SessionError> {
        let context = self.context(force);
        Ok(self.service.generate_decision(&context).await?)
    }

    /// Abandon an outstanding generation.
    pub fn cancel_generation(&mut self) {
        self.service.cancel();
    }

    /// Player-facing rendition of a decision.
    pub fn choices_for(&self, decision: &crate::decision::Decision) -> PlayerDecision {
        self.service.to_player_decision(decision)
    }

    /// Record the player's choice for a generated decision.
    pub fn record_choice(
        &mut self,
        decision_id: &str,
        selected_option_id: &str,
        narrative: impl Into<String>,
        impact_description: impl Into<String>,
        tags: Vec<String>,
    ) -> Result<(), SessionError> {
        self.service
            .record_decision(decision_id, selected_option_id, narrative, impact_description, tags)?;
        Ok(())
    }

    fn context(&self, force: bool) -> StoryContext {
        StoryContext {
            campaign_name: self.campaign_name.clone(),
            location: self.location.clone(),
            recent_narrative: self.recent_beats.iter().cloned().collect(),
            force_decision: force,
        }
    }

    fn push_beat(&mut self, prose: &str) {
        let trimmed = prose.trim();
        if trimmed.is_empty() {
            return;
        }
        self.recent_beats.push_back(trimmed.to_string());
        while self.recent_beats.len() > MAX_RECENT_BEATS {
            self.recent_beats.pop_front();
        }
    }

    /// Get the campaign name.
    pub fn campaign_name(&self) -> &str {
        &self.campaign_name
    }

    /// Get the current location token.
    pub fn current_location(&self) -> &str {
        &self.location
    }

    /// Check if the session is in combat.
    pub fn in_combat(&self) -> bool {
        self.combat.active
    }

    pub fn combat(&self) -> &CombatState {
        &self.combat
    }

    /// The decision history, chronological.
    pub fn history(&self) -> &DecisionHistory {
        self.service.history()
    }

    /// The metadata lines stripped from prose so far, for debugging.
    pub fn cleanup_log(&self) -> &CleanupLog {
        &self.cleanup
    }

    /// Notes produced when loading an older save format.
    pub fn migration_notes(&self) -> &[String] {
        &self.migration_notes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_builder() {
        let config = SessionConfig::new("Dust & Silver")
            .with_starting_location("DRY GULCH")
            .with_max_tokens(2048)
            .with_relevance_threshold(0.5);

        assert_eq!(config.campaign_name, "Dust & Silver");
        assert_eq!(config.starting_location, "DRY GULCH");
        assert_eq!(config.max_tokens, 2048);
        assert_eq!(config.relevance_threshold, 0.5);
    }

    #[test]
    fn test_config_defaults() {
        let config = SessionConfig::new("Test");
        assert_eq!(config.starting_location, "The Silver Dollar Saloon");
        assert!(config.model.is_none());
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_recent_beats_window_is_bounded() {
        let mut session = StorySession::build(
            SessionConfig::new("Window"),
            openai::OpenAi::new("test-key"),
            DecisionHistory::new(),
            None,
        );

        for i in 0..MAX_RECENT_BEATS + 3 {
            session.apply_narrative(&format!("Beat number {i}."));
        }

        assert_eq!(session.recent_beats.len(), MAX_RECENT_BEATS);
        // Oldest beats fall off the front; newest stays at the back.
        assert_eq!(session.recent_beats.front().unwrap(), "Beat number 3.");
        assert_eq!(
            session.recent_beats.back().unwrap(),
            &format!("Beat number {}.", MAX_RECENT_BEATS + 2)
        );
    }
}
