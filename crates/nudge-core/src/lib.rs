//! Nudge Core Library
//!
//! Shared functionality for the nudge purchase-reflection tool:
//! - Database access and migrations (purchases, accounts, sessions)
//! - Account authentication and session tracking
//! - Pluggable AI backends (Gemini, Ollama, OpenAI-compatible)
//! - Prompt library for customizable AI prompts
//! - The three-step decision workflow (plan, reflect, decide)
//! - Savings aggregation, monthly reports and investment projections

pub mod aggregation;
pub mod ai;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod projection;
pub mod prompts;
pub mod reports;
pub mod workflow;

/// Test utilities including mock Ollama server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use aggregation::{
    group_by_month, group_by_month_in, summarize_month, total_saved, DashboardSummary, MonthGroup,
    MonthKey, MonthlyAggregate,
};
pub use ai::{
    AIBackend, AIClient, FinancialCoach, GeminiBackend, MockBackend, OllamaBackend,
    OpenAICompatibleBackend, PlannedPurchase, Reflection, ReflectionQuestions, VerdictAssessment,
};
pub use auth::{Accounts, LocalAuth, SessionProvider};
pub use config::{AiConfig, Config};
pub use db::{Database, PurchaseQuery, PurchaseStore, SortOrder};
pub use error::{Error, Result};
pub use models::{Category, NewPurchase, PurchaseRecord, Session, User, Verdict};
pub use projection::{project, InvestmentStrategy, Projection, ProjectionPoint};
pub use prompts::{Prompt, PromptId, PromptInfo, PromptLibrary};
pub use reports::{MonthlyInsight, MonthlyReport, MonthlyReportGenerator};
pub use workflow::{DecisionWorkflow, WorkflowRegistry, WorkflowState, WorkflowStep};
