//! AI request and response types
//!
//! These types are backend-agnostic and used across all AI implementations.

use serde::{Deserialize, Serialize};

use crate::models::{Category, Verdict};

/// The planned side of a purchase, as captured in step one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedPurchase {
    pub item: String,
    pub amount: f64,
    pub category: Category,
}

/// A reflection question paired with the user's answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reflection {
    pub question: String,
    pub answer: String,
}

/// Exactly three reflection questions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReflectionQuestions(pub [String; 3]);

impl ReflectionQuestions {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0.into()
    }
}

/// A validated verdict response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictAssessment {
    pub verdict: Verdict,
    /// Short, firm suggestion; the model may omit it
    pub suggestion: Option<String>,
}

/// Bracket shape to look for in raw model output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    /// `[ ... ]`
    Array,
    /// `{ ... }`
    Object,
}

impl JsonShape {
    pub(crate) fn delimiters(&self) -> (char, char) {
        match self {
            Self::Array => ('[', ']'),
            Self::Object => ('{', '}'),
        }
    }
}

/// Which coaching response a raw text is expected to contain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Questions,
    Verdict,
}

/// A shape-checked coaching response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CoachResponse {
    Questions { questions: ReflectionQuestions },
    Verdict(VerdictAssessment),
}
