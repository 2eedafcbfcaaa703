//! Decision-point detection: when to offer the player a choice.
//!
//! The detector is a small state machine (`Idle -> Eligible -> Requested
//! -> Idle`) driven by three signals: a cooldown since the last generated
//! decision, relevance accumulated from story beats, and an explicit
//! override for story events that force a decision. While `Requested`, no
//! second generation may start (single-flight per session).

use super::history::DecisionHistory;
use crate::update::NarrativeUpdate;
use std::time::{Duration, Instant};

/// Tuning for decision-point detection.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Minimum interval between decisions. Enforced even when accumulated
    /// relevance is high; only an explicit override bypasses it.
    pub cooldown: Duration,

    /// Accumulated beat relevance required before a decision is offered.
    pub relevance_threshold: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(120),
            relevance_threshold: 1.0,
        }
    }
}

/// Detector lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    Idle,
    Eligible,
    Requested,
}

/// Decides when a new decision point should be generated.
#[derive(Debug, Clone)]
pub struct DecisionDetector {
    config: DetectorConfig,
    state: DetectorState,
    last_decision_at: Option<Instant>,
    accumulated_relevance: f32,
}

impl DecisionDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            state: DetectorState::Idle,
            last_decision_at: None,
            accumulated_relevance: 0.0,
        }
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    pub fn accumulated_relevance(&self) -> f32 {
        self.accumulated_relevance
    }

    /// Accumulate relevance from a story beat. Each beat contributes a
    /// clamped [0, 1] share.
    pub fn record_beat(&mut self, relevance: f32) {
        self.accumulated_relevance += relevance.clamp(0.0, 1.0);
    }

    /// Side-effect-free check: would a generation be warranted now?
    ///
    /// Override takes precedence over cooldown; accumulated relevance
    /// never does. While a request is in flight this is always false.
    pub fn should_generate(&self, now: Instant, force: bool) -> bool {
        if self.state == DetectorState::Requested {
            return false;
        }
        if force {
            return true;
        }
        self.cooldown_expired(now) && self.accumulated_relevance >= self.config.relevance_threshold
    }

    /// Like [`should_generate`], but also performs the `Idle -> Eligible`
    /// transition when the cooldown has expired or an override fired.
    ///
    /// [`should_generate`]: Self::should_generate
    pub fn evaluate(&mut self, now: Instant, force: bool) -> bool {
        if self.state == DetectorState::Requested {
            return false;
        }
        if force || self.cooldown_expired(now) {
            self.state = DetectorState::Eligible;
        } else {
            self.state = DetectorState::Idle;
        }
        self.should_generate(now, force)
    }

    /// The service is issuing a generation call.
    pub fn mark_requested(&mut self) {
        self.state = DetectorState::Requested;
    }

    /// The in-flight call finished (success or terminal failure). Only a
    /// produced decision restarts the cooldown and drains accumulation;
    /// a failed cycle leaves the signals armed for the next attempt.
    pub fn complete(&mut self, now: Instant, produced: bool) {
        self.state = DetectorState::Idle;
        if produced {
            self.last_decision_at = Some(now);
            self.accumulated_relevance = 0.0;
        }
    }

    fn cooldown_expired(&self, now: Instant) -> bool {
        match self.last_decision_at {
            None => true,
            Some(at) => now.duration_since(at) >= self.config.cooldown,
        }
    }
}

impl Default for DecisionDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

/// Score a narrative update as a story beat, weighting in how strongly it
/// echoes recently chosen decision tags. Pure function of its inputs.
pub fn beat_relevance(update: &NarrativeUpdate, history: &DecisionHistory) -> f32 {
    let mut score: f32 = 0.0;

    if update.combat_triggered {
        score += 0.6;
    }
    if update.location_change.is_some() {
        score += 0.4;
    }
    let item_count = update.acquired_items.len() + update.removed_items.len();
    score += 0.1 * item_count.min(3) as f32;

    if let Some(location) = &update.location_change {
        score += history.recent_tag_weight(std::slice::from_ref(location));
    }

    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::types::DecisionHistoryEntry;
    use chrono::Utc;

    fn quick_config() -> DetectorConfig {
        DetectorConfig {
            cooldown: Duration::from_secs(10),
            relevance_threshold: 1.0,
        }
    }

    #[test]
    fn test_fresh_detector_waits_for_relevance() {
        let detector = DecisionDetector::new(quick_config());
        // No cooldown pending, but no accumulated relevance either.
        assert!(!detector.should_generate(Instant::now(), false));
    }

    #[test]
    fn test_threshold_crossing_generates() {
        let mut detector = DecisionDetector::new(quick_config());
        detector.record_beat(0.6);
        assert!(!detector.should_generate(Instant::now(), false));
        detector.record_beat(0.6);
        assert!(detector.should_generate(Instant::now(), false));
    }

    #[test]
    fn test_cooldown_blocks_high_relevance() {
        let mut detector = DecisionDetector::new(quick_config());
        let start = Instant::now();

        detector.mark_requested();
        detector.complete(start, true);

        detector.record_beat(1.0);
        detector.record_beat(1.0);
        assert!(!detector.should_generate(start + Duration::from_secs(5), false));
        assert!(detector.should_generate(start + Duration::from_secs(10), false));
    }

    #[test]
    fn test_override_beats_cooldown() {
        let mut detector = DecisionDetector::new(quick_config());
        let start = Instant::now();

        detector.mark_requested();
        detector.complete(start, true);

        assert!(detector.should_generate(start + Duration::from_secs(1), true));
    }

    #[test]
    fn test_single_flight_while_requested() {
        let mut detector = DecisionDetector::new(quick_config());
        detector.record_beat(1.0);
        detector.mark_requested();

        assert_eq!(detector.state(), DetectorState::Requested);
        assert!(!detector.should_generate(Instant::now(), false));
        assert!(!detector.should_generate(Instant::now(), true));
        assert!(!detector.evaluate(Instant::now(), true));
    }

    #[test]
    fn test_failed_cycle_keeps_signals_armed() {
        let mut detector = DecisionDetector::new(quick_config());
        let start = Instant::now();

        detector.record_beat(1.0);
        detector.mark_requested();
        detector.complete(start, false);

        assert_eq!(detector.state(), DetectorState::Idle);
        assert!(detector.should_generate(start, false));
        assert_eq!(detector.accumulated_relevance(), 1.0);
    }

    #[test]
    fn test_evaluate_transitions_to_eligible() {
        let mut detector = DecisionDetector::new(quick_config());
        detector.evaluate(Instant::now(), false);
        assert_eq!(detector.state(), DetectorState::Eligible);
    }

    #[test]
    fn test_beat_relevance_scoring() {
        let history = DecisionHistory::new();

        let quiet = NarrativeUpdate::default();
        assert_eq!(beat_relevance(&quiet, &history), 0.0);

        let mut combat = NarrativeUpdate::default();
        combat.combat_triggered = true;
        combat.location_change = Some("CANYON".to_string());
        assert_eq!(beat_relevance(&combat, &history), 1.0);
    }

    #[test]
    fn test_beat_relevance_weights_history_tags() {
        let mut history = DecisionHistory::new();
        history.record(DecisionHistoryEntry {
            decision_id: "d-1".to_string(),
            selected_option_id: "opt-1".to_string(),
            timestamp: Utc::now(),
            narrative: "Rode into the canyon".to_string(),
            impact_description: "Shortcut taken".to_string(),
            tags: vec!["CANYON".to_string()],
            relevance_score: 0.8,
        });

        let mut update = NarrativeUpdate::default();
        update.location_change = Some("CANYON".to_string());

        let plain = NarrativeUpdate {
            location_change: Some("MESA".to_string()),
            ..Default::default()
        };

        assert!(beat_relevance(&update, &history) > beat_relevance(&plain, &history));
    }
}
