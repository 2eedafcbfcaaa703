//! Generation-prompt construction for decision points.
//!
//! Base instructions live in a template file; the current story context
//! and recent decision history are appended so the model keeps continuity
//! with choices the player already made.

use crate::decision::{DecisionHistory, StoryContext};

/// How many history entries to surface for continuity.
const HISTORY_WINDOW: usize = 5;

/// Build the full generation prompt for a decision request.
pub fn build_decision_prompt(context: &StoryContext, history: &DecisionHistory) -> String {
    let mut prompt = String::new();

    prompt.push_str(include_str!("prompts/decision.txt"));

    prompt.push_str("\n\n## Campaign: ");
    prompt.push_str(&context.campaign_name);
    prompt.push('\n');

    prompt.push_str("\n## Current Situation\n");
    prompt.push_str(&format!("Location: {}\n", context.location));

    if !context.recent_narrative.is_empty() {
        prompt.push_str("\n## Recent Story Beats\n");
        for beat in &context.recent_narrative {
            prompt.push_str(&format!("- {beat}\n"));
        }
    }

    let entries = history.entries();
    if !entries.is_empty() {
        prompt.push_str("\n## Past Decisions\n");
        let start = entries.len().saturating_sub(HISTORY_WINDOW);
        for entry in &entries[start..] {
            prompt.push_str(&format!(
                "- Chose '{}': {} ({})\n",
                entry.selected_option_id, entry.narrative, entry.impact_description
            ));
        }
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::DecisionHistoryEntry;
    use chrono::Utc;

    #[test]
    fn test_prompt_contains_context() {
        let context = StoryContext {
            campaign_name: "Dust & Silver".to_string(),
            location: "SALOON".to_string(),
            recent_narrative: vec!["The barkeep slides you a note.".to_string()],
            force_decision: false,
        };

        let prompt = build_decision_prompt(&context, &DecisionHistory::new());
        assert!(prompt.contains("Dust & Silver"));
        assert!(prompt.contains("Location: SALOON"));
        assert!(prompt.contains("barkeep slides you a note"));
        assert!(!prompt.contains("Past Decisions"));
    }

    #[test]
    fn test_prompt_includes_recent_history() {
        let mut history = DecisionHistory::new();
        history.record(DecisionHistoryEntry {
            decision_id: "d-1".to_string(),
            selected_option_id: "ride-on".to_string(),
            timestamp: Utc::now(),
            narrative: "Left the wounded stranger behind".to_string(),
            impact_description: "The town remembers".to_string(),
            tags: vec![],
            relevance_score: 0.6,
        });

        let prompt = build_decision_prompt(&StoryContext::default(), &history);
        assert!(prompt.contains("Past Decisions"));
        assert!(prompt.contains("ride-on"));
        assert!(prompt.contains("wounded stranger"));
    }
}
