//! Decision service: orchestrates detection, generation, validation, and
//! history recording for a single game session.
//!
//! Generation is strictly single-flight: while a call is outstanding the
//! detector sits in `Requested` and a second attempt reports `Busy`
//! rather than queueing or cancelling the first. Failures are typed and
//! never retried here; retrying a non-deterministic generator is a caller
//! decision.

use super::detector::{DecisionDetector, DetectorConfig, DetectorState};
use super::history::DecisionHistory;
use super::parser::parse_decision_response;
use super::types::{Decision, DecisionHistoryEntry};
use super::validate::{validate, ValidatedDecision};
use crate::error::DecisionError;
use crate::prompt::build_decision_prompt;
use async_trait::async_trait;
use chrono::Utc;
use std::time::{Duration, Instant, SystemTime};
use tokio::time::timeout;

/// Default deadline for a single generation call.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Narrative context a generation call is grounded in.
#[derive(Debug, Clone, Default)]
pub struct StoryContext {
    pub campaign_name: String,
    pub location: String,
    /// Recent story beats, oldest first.
    pub recent_narrative: Vec<String>,
    /// Explicit override: certain story events force a decision
    /// regardless of cooldown or accumulated relevance.
    pub force_decision: bool,
}

/// The AI-client contract the service depends on. Implemented by
/// [`OpenAiDecisionClient`] for real traffic and by the test `MockClient`.
#[async_trait]
pub trait DecisionClient: Send + Sync {
    /// Issue a generation request and return the raw response body.
    async fn generate(&self, prompt: &str) -> Result<String, openai::Error>;

    /// Requests remaining in the current rate-limit window, if known.
    fn rate_limit_remaining(&self) -> Option<u32>;

    /// When the quota resets, if known.
    fn rate_limit_reset_at(&self) -> Option<SystemTime>;
}

/// Generation parameters forwarded to the chat client.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Model override (client default when `None`).
    pub model: Option<String>,

    /// Maximum tokens for responses.
    pub max_tokens: usize,

    /// Temperature for generation.
    pub temperature: Option<f32>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: 1024,
            temperature: Some(0.8),
        }
    }
}

/// [`DecisionClient`] backed by the chat completions client.
pub struct OpenAiDecisionClient {
    client: openai::OpenAi,
    config: GenerationConfig,
}

impl OpenAiDecisionClient {
    pub fn new(client: openai::OpenAi) -> Self {
        Self {
            client,
            config: GenerationConfig::default(),
        }
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }
}

#[async_trait]
impl DecisionClient for OpenAiDecisionClient {
    async fn generate(&self, prompt: &str) -> Result<String, openai::Error> {
        let mut request = openai::Request::new(vec![openai::Message::user(prompt)])
            .with_max_tokens(self.config.max_tokens);

        if let Some(ref model) = self.config.model {
            request = request.with_model(model);
        }
        if let Some(temperature) = self.config.temperature {
            request = request.with_temperature(temperature);
        }

        let response = self.client.complete(request).await?;
        Ok(response.text())
    }

    fn rate_limit_remaining(&self) -> Option<u32> {
        self.client.rate_limit_remaining()
    }

    fn rate_limit_reset_at(&self) -> Option<SystemTime> {
        self.client.rate_limit_reset_at()
    }
}

/// Outcome of a generation attempt that did not error.
#[derive(Debug)]
pub enum GenerateOutcome {
    /// A validated decision, plus any normalization warnings.
    Generated(ValidatedDecision),

    /// The detector declined; no network call was made.
    NotReady,

    /// A generation is already in flight for this session.
    Busy,
}

/// Player-facing rendition of a decision: ordering and identifiers match
/// the canonical decision exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerDecision {
    pub decision_id: String,
    pub prompt: String,
    pub choices: Vec<PlayerChoice>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerChoice {
    pub id: String,
    pub label: String,
}

/// Orchestrator for the decision pipeline of one game session.
pub struct DecisionService<C> {
    client: C,
    detector: DecisionDetector,
    history: DecisionHistory,
    /// Generated decisions awaiting a recorded player choice.
    pending: Vec<Decision>,
    request_timeout: Duration,
}

impl<C: DecisionClient> DecisionService<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            detector: DecisionDetector::default(),
            history: DecisionHistory::new(),
            pending: Vec::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_detector_config(mut self, config: DetectorConfig) -> Self {
        self.detector = DecisionDetector::new(config);
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Restore history from a loaded save.
    pub fn with_history(mut self, history: DecisionHistory) -> Self {
        self.history = history;
        self
    }

    pub fn history(&self) -> &DecisionHistory {
        &self.history
    }

    pub fn detector(&self) -> &DecisionDetector {
        &self.detector
    }

    /// Decisions generated but not yet recorded.
    pub fn pending(&self) -> &[Decision] {
        &self.pending
    }

    /// Feed a story beat's relevance into the detector.
    pub fn note_beat(&mut self, relevance: f32) {
        self.detector.record_beat(relevance);
    }

    /// Side-effect-free check: would `generate_decision` proceed now?
    pub fn detect_decision_point(&self, context: &StoryContext) -> bool {
        self.detector
            .should_generate(Instant::now(), context.force_decision)
    }

    /// Generate a decision for the current context.
    ///
    /// Fails fast with [`DecisionError::RateLimited`] when the client's
    /// quota is exhausted, before any network call. The call is bounded by
    /// the configured deadline. Parse and validation failures surface as
    /// typed errors and leave the detector's signals armed.
    pub async fn generate_decision(
        &mut self,
        context: &StoryContext,
    ) -> Result<GenerateOutcome, DecisionError> {
        if self.detector.state() == DetectorState::Requested {
            return Ok(GenerateOutcome::Busy);
        }
        if !self.detector.evaluate(Instant::now(), context.force_decision) {
            return Ok(GenerateOutcome::NotReady);
        }

        if self.client.rate_limit_remaining() == Some(0) {
            return Err(DecisionError::RateLimited {
                reset_at: self.client.rate_limit_reset_at(),
            });
        }

        let prompt = build_decision_prompt(context, &self.history);

        self.detector.mark_requested();
        let outcome = timeout(self.request_timeout, self.client.generate(&prompt)).await;

        let result = match outcome {
            Err(_) => Err(DecisionError::Timeout(self.request_timeout)),
            Ok(Err(e)) => Err(DecisionError::Request(e)),
            Ok(Ok(body)) => parse_decision_response(&body).and_then(validate),
        };

        self.detector.complete(Instant::now(), result.is_ok());

        let validated = result?;
        self.pending.push(validated.decision.clone());
        Ok(GenerateOutcome::Generated(validated))
    }

    /// Abandon an outstanding generation (e.g. the caller navigated
    /// away). The detector returns to `Idle`; nothing is recorded.
    pub fn cancel(&mut self) {
        if self.detector.state() == DetectorState::Requested {
            self.detector.complete(Instant::now(), false);
        }
    }

    /// Map a canonical decision to the player-facing option list. Pure;
    /// preserves option count, order, and identifiers exactly.
    pub fn to_player_decision(&self, decision: &Decision) -> PlayerDecision {
        PlayerDecision {
            decision_id: decision.decision_id.clone(),
            prompt: decision.prompt.clone(),
            choices: decision
                .options
                .iter()
                .map(|option| PlayerChoice {
                    id: option.id.clone(),
                    label: option.text.clone(),
                })
                .collect(),
        }
    }

    /// Record the player's choice for a previously generated decision.
    ///
    /// Fails if the decision id is unknown or already recorded, or if the
    /// selected option does not belong to it.
    pub fn record_decision(
        &mut self,
        decision_id: &str,
        selected_option_id: &str,
        narrative: impl Into<String>,
        impact_description: impl Into<String>,
        tags: Vec<String>,
    ) -> Result<(), DecisionError> {
        let index = self
            .pending
            .iter()
            .position(|d| d.decision_id == decision_id)
            .ok_or_else(|| {
                DecisionError::Validation(format!(
                    "decision '{decision_id}' is unknown or already recorded"
                ))
            })?;

        if !self.pending[index]
            .options
            .iter()
            .any(|o| o.id == selected_option_id)
        {
            return Err(DecisionError::Validation(format!(
                "option '{selected_option_id}' is not part of decision '{decision_id}'"
            )));
        }

        let decision = self.pending.remove(index);
        self.history.record(DecisionHistoryEntry {
            decision_id: decision.decision_id,
            selected_option_id: selected_option_id.to_string(),
            timestamp: Utc::now(),
            narrative: narrative.into(),
            impact_description: impact_description.into(),
            tags,
            relevance_score: decision.relevance_score,
        });
        Ok(())
    }
}
