//! Narrative decision engine for an AI-driven frontier adventure.
//!
//! This crate provides:
//! - Tolerant extraction of game-state deltas from model prose
//! - Parsing and validation of model-generated decision points
//! - Timing/relevance heuristics for when to surface decisions
//! - An append-only history of player choices, with persistence
//!
//! # Quick Start
//!
//! ```ignore
//! use frontier_core::{SessionConfig, StorySession};
//! use frontier_core::decision::GenerateOutcome;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = StorySession::new(SessionConfig::new("Dust & Silver"))?;
//!
//!     let outcome = session.apply_narrative(
//!         "LOCATION: SALOON\nA stranger pushes through the doors.",
//!     );
//!     println!("{}", outcome.prose);
//!
//!     if let GenerateOutcome::Generated(validated) = session.next_decision(false).await? {
//!         let player = session.choices_for(&validated.decision);
//!         println!("{}", player.prompt);
//!     }
//!     Ok(())
//! }
//! ```

pub mod combat;
pub mod decision;
pub mod error;
pub mod persist;
pub mod prompt;
pub mod session;
pub mod testing;
pub mod update;

// Primary public API
pub use combat::{CombatState, TurnOwner};
pub use decision::{
    Decision, DecisionHistory, DecisionHistoryEntry, DecisionOption, DecisionService,
    GenerateOutcome, PlayerDecision, StoryContext,
};
pub use error::DecisionError;
pub use session::{NarrativeOutcome, SessionConfig, SessionError, StorySession};
pub use testing::MockClient;
pub use update::{extract_fields, strip_metadata, CleanupLog, NarrativeUpdate};
