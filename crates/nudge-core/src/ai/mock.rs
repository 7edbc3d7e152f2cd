//! Mock backend for testing
//!
//! Returns scripted responses in order, then falls back to canned responses
//! chosen from the prompt content. Every prompt it receives is recorded so
//! tests can assert on what was asked.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Error, Result};

use super::AIBackend;

/// A queued mock outcome
#[derive(Debug, Clone)]
enum Scripted {
    Text(String),
    Failure(String),
}

/// Mock AI backend for testing
///
/// Clones share the same script and prompt log.
#[derive(Clone, Default)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    script: Arc<Mutex<VecDeque<Scripted>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            ..Default::default()
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self::default()
    }

    /// Queue responses returned verbatim, in order
    pub fn with_responses<I, S>(self, responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for r in responses {
            self.push_response(r);
        }
        self
    }

    /// Queue one raw response
    pub fn push_response(&self, text: impl Into<String>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Scripted::Text(text.into()));
        }
    }

    /// Queue one failed call
    pub fn push_failure(&self, message: impl Into<String>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Scripted::Failure(message.into()));
        }
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Number of generate calls made
    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or_default()
    }

    /// Create a new instance with a different model (no-op for mock)
    pub fn with_model(&self, _model: &str) -> Self {
        self.clone()
    }

    fn canned(prompt: &str) -> String {
        let lower = prompt.to_lowercase();
        if lower.contains("reflection questions") {
            r#"Here are your questions:
["Will you still use this in three months?", "Is there something you already own that does the job?", "What else could this money go toward?"]"#
                .to_string()
        } else if lower.contains("\"verdict\"") {
            r#"{"verdict": "neutral", "suggestion": "Wait a week and buy it only if you still want it."}"#
                .to_string()
        } else {
            "You kept most of your spending on essentials this month. Trimming one or two \
             impulse buys would add up quickly. Keep going, small choices compound."
                .to_string()
        }
    }
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .map_err(|_| Error::Ai("Mock prompt log poisoned".into()))?
            .push(prompt.to_string());

        let next = self
            .script
            .lock()
            .map_err(|_| Error::Ai("Mock script poisoned".into()))?
            .pop_front();

        match next {
            Some(Scripted::Text(text)) => Ok(text),
            Some(Scripted::Failure(message)) => Err(Error::Ai(message)),
            None => Ok(Self::canned(prompt)),
        }
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_responses_in_order() {
        let mock = MockBackend::new().with_responses(["one", "two"]);
        mock.push_failure("boom");

        assert_eq!(mock.generate("a").await.unwrap(), "one");
        assert_eq!(mock.generate("b").await.unwrap(), "two");
        assert!(matches!(mock.generate("c").await, Err(Error::Ai(_))));
        assert_eq!(mock.prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_clones_share_script() {
        let mock = MockBackend::new();
        let clone = mock.clone();
        mock.push_response("shared");
        assert_eq!(clone.generate("x").await.unwrap(), "shared");
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unhealthy() {
        assert!(!MockBackend::unhealthy().health_check().await);
    }
}
