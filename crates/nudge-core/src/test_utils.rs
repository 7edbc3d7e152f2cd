//! Test utilities for nudge-core
//!
//! This module provides testing infrastructure including a mock Ollama server
//! that answers the coach prompts with deterministic responses, for
//! development and integration tests.

use axum::{
    extract::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::sync::oneshot;

/// Items containing this marker get a response with no usable JSON
pub const MALFORMED_MARKER: &str = "[malformed]";

/// Mock Ollama server for testing and development
pub struct MockOllamaServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockOllamaServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let app = Router::new()
            .route("/api/tags", get(handle_tags))
            .route("/api/generate", post(handle_generate));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockOllamaServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Ollama tags endpoint response (health check)
async fn handle_tags() -> Json<TagsResponse> {
    Json(TagsResponse {
        models: vec![ModelInfo {
            name: "llama3.2:latest".to_string(),
            modified_at: "2026-01-01T00:00:00Z".to_string(),
            size: 2_000_000_000,
        }],
    })
}

/// Ollama generate endpoint
async fn handle_generate(Json(request): Json<GenerateRequest>) -> Json<GenerateResponse> {
    let item = field_from_prompt(&request.prompt, "- Item: ").unwrap_or_default();

    // Patterns match the prompt files in prompts/*.md
    let response = if item.contains(MALFORMED_MARKER) {
        "Sorry, I can't help with that right now.".to_string()
    } else if request.prompt.contains("reflection questions") {
        questions_mock(&item)
    } else if request.prompt.contains(r#"{"verdict":"#) {
        verdict_mock(&request.prompt)
    } else if request.prompt.contains("Month: ") {
        let month = field_from_prompt(&request.prompt, "Month: ").unwrap_or_default();
        format!(
            "In {} you kept a close eye on your spending. Try setting a weekly limit for \
             discretionary purchases next month. Every pause adds up!",
            month
        )
    } else {
        "I'm not sure what you're asking.".to_string()
    };

    Json(GenerateResponse {
        model: request.model,
        response,
        done: true,
    })
}

/// Three questions wrapped in chatty prose, the way real models answer
fn questions_mock(item: &str) -> String {
    let questions = [
        format!("Do you need {} right now, or do you just want it?", item),
        "What would happen if you waited two weeks before buying?".to_string(),
        "Is there something you already own that does the same job?".to_string(),
    ];
    format!(
        "Here are your questions:\n```json\n{}\n```\nGood luck!",
        serde_json::to_string(&questions).unwrap()
    )
}

/// Verdict from simple keyword rules on the prompt
fn verdict_mock(prompt: &str) -> String {
    let amount: f64 = field_from_prompt(prompt, "- Amount: $")
        .and_then(|a| a.parse().ok())
        .unwrap_or(0.0);
    let category = field_from_prompt(prompt, "- Category: ").unwrap_or_default();
    let lower = prompt.to_lowercase();

    let (verdict, suggestion) = if category == "Bills" || category == "Groceries" {
        ("positive", "This is an essential expense. Go ahead.")
    } else if lower.contains("impulse") || amount > 500.0 {
        ("negative", "Sleep on it and revisit next week.")
    } else {
        ("neutral", "Reasonable, but compare prices first.")
    };

    format!(
        r#"{{"verdict": "{}", "suggestion": "{}"}}"#,
        verdict, suggestion
    )
}

/// Text after `prefix` up to the end of its line
fn field_from_prompt(prompt: &str, prefix: &str) -> Option<String> {
    let start = prompt.find(prefix)? + prefix.len();
    let rest = &prompt[start..];
    let end = rest.find('\n').unwrap_or(rest.len());
    Some(rest[..end].trim().to_string())
}

// Request/Response types for the mock server

#[derive(Debug, Serialize)]
struct TagsResponse {
    models: Vec<ModelInfo>,
}

#[derive(Debug, Serialize)]
struct ModelInfo {
    name: String,
    modified_at: String,
    size: u64,
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    #[allow(dead_code)]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct GenerateResponse {
    model: String,
    response: String,
    done: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AIBackend, AIClient, FinancialCoach, OllamaBackend, PlannedPurchase};
    use crate::models::{Category, Verdict};
    use crate::prompts::PromptLibrary;

    fn coach(server: &MockOllamaServer) -> FinancialCoach {
        FinancialCoach::with_prompts(
            AIClient::ollama(&server.url(), "test-model"),
            PromptLibrary::embedded_only(),
        )
    }

    fn planned(item: &str, amount: f64, category: Category) -> PlannedPurchase {
        PlannedPurchase {
            item: item.into(),
            amount,
            category,
        }
    }

    #[tokio::test]
    async fn test_mock_server_health_check() {
        let server = MockOllamaServer::start().await;
        let client = OllamaBackend::new(&server.url(), "test-model");

        assert!(client.health_check().await);
    }

    #[tokio::test]
    async fn test_mock_server_questions() {
        let server = MockOllamaServer::start().await;
        let questions = coach(&server)
            .reflection_questions(&planned("a new bike", 300.0, Category::Shopping))
            .await
            .unwrap();

        assert!(questions.as_slice()[0].contains("a new bike"));
    }

    #[tokio::test]
    async fn test_mock_server_verdicts() {
        let server = MockOllamaServer::start().await;
        let c = coach(&server);

        let v = c
            .verdict(&planned("electricity", 80.0, Category::Bills), &[])
            .await
            .unwrap();
        assert_eq!(v.verdict, Verdict::Positive);

        let v = c
            .verdict(&planned("designer jacket", 900.0, Category::Shopping), &[])
            .await
            .unwrap();
        assert_eq!(v.verdict, Verdict::Negative);
        assert!(v.suggestion.is_some());

        let v = c
            .verdict(&planned("concert ticket", 60.0, Category::Miscellaneous), &[])
            .await
            .unwrap();
        assert_eq!(v.verdict, Verdict::Neutral);
    }

    #[tokio::test]
    async fn test_mock_server_malformed_response() {
        let server = MockOllamaServer::start().await;
        let err = coach(&server)
            .reflection_questions(&planned("gadget [malformed]", 20.0, Category::Shopping))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::InvalidData(_)));
    }

    #[test]
    fn test_field_from_prompt() {
        let prompt = "x\n- Item: bike \n- Amount: $12.50\n";
        assert_eq!(field_from_prompt(prompt, "- Item: ").as_deref(), Some("bike"));
        assert_eq!(field_from_prompt(prompt, "- Amount: $").as_deref(), Some("12.50"));
        assert!(field_from_prompt(prompt, "Month: ").is_none());
    }
}
