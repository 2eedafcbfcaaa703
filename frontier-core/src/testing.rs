//! Testing utilities for the decision pipeline.
//!
//! Provides `MockClient`, a scripted [`DecisionClient`] for deterministic
//! tests without API calls, plus a helper for building well-formed
//! decision payloads.

use crate::decision::DecisionClient;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

/// A scripted reply from the mock client.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this body.
    Text(String),

    /// Fail with a transport error carrying this message.
    Error(String),

    /// Never resolve. Used to exercise timeouts and single-flight.
    Hang,
}

#[derive(Debug, Default)]
struct MockState {
    replies: Vec<MockReply>,
    next: usize,
    calls: usize,
    rate_limit_remaining: Option<u32>,
    rate_limit_reset_at: Option<SystemTime>,
}

/// A mock AI client that returns scripted replies in order.
///
/// Clones share state, so a test can keep one handle for inspection while
/// the service owns another.
#[derive(Debug, Clone, Default)]
pub struct MockClient {
    state: Arc<Mutex<MockState>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted(replies: Vec<MockReply>) -> Self {
        let client = Self::new();
        for reply in replies {
            client.queue(reply);
        }
        client
    }

    /// Add a reply to the queue.
    pub fn queue(&self, reply: MockReply) {
        self.state.lock().unwrap().replies.push(reply);
    }

    pub fn queue_text(&self, body: impl Into<String>) {
        self.queue(MockReply::Text(body.into()));
    }

    /// Number of generation calls made so far.
    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }

    /// Set the rate-limit state the client reports.
    pub fn set_rate_limit(&self, remaining: Option<u32>, reset_at: Option<SystemTime>) {
        let mut state = self.state.lock().unwrap();
        state.rate_limit_remaining = remaining;
        state.rate_limit_reset_at = reset_at;
    }
}

#[async_trait]
impl DecisionClient for MockClient {
    async fn generate(&self, _prompt: &str) -> Result<String, openai::Error> {
        let reply = {
            let mut state = self.state.lock().unwrap();
            state.calls += 1;
            let reply = state.replies.get(state.next).cloned();
            state.next += 1;
            reply
        };

        match reply {
            Some(MockReply::Text(body)) => Ok(body),
            Some(MockReply::Error(message)) => Err(openai::Error::Network(message)),
            Some(MockReply::Hang) => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            None => Err(openai::Error::Network(
                "mock client has no more scripted replies".to_string(),
            )),
        }
    }

    fn rate_limit_remaining(&self) -> Option<u32> {
        self.state.lock().unwrap().rate_limit_remaining
    }

    fn rate_limit_reset_at(&self) -> Option<SystemTime> {
        self.state.lock().unwrap().rate_limit_reset_at
    }
}

/// Build a well-formed decision payload for tests: a prompt plus
/// `(id, text)` option pairs.
pub fn decision_payload(prompt: &str, options: &[(&str, &str)]) -> String {
    let options: Vec<serde_json::Value> = options
        .iter()
        .map(|(id, text)| serde_json::json!({"id": id, "text": text}))
        .collect();

    serde_json::json!({
        "prompt": prompt,
        "options": options,
    })
    .to_string()
}
