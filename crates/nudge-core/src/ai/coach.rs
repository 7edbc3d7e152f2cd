//! Financial coach: the three prompts the app sends to a model
//!
//! Each call renders a prompt, makes exactly one `generate` request and
//! shape-checks the result. Nothing is retried here; callers decide what a
//! failure means for their flow.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use crate::aggregation::MonthlyAggregate;
use crate::error::{Error, Result};
use crate::prompts::{PromptId, PromptLibrary};

use super::parsing::parse_response;
use super::types::{
    CoachResponse, PlannedPurchase, Reflection, ReflectionQuestions, ResponseKind,
    VerdictAssessment,
};
use super::{AIBackend, AIClient};

/// AI-backed coaching calls
#[derive(Clone)]
pub struct FinancialCoach {
    client: AIClient,
    prompts: Arc<RwLock<PromptLibrary>>,
}

impl FinancialCoach {
    /// Create a coach using the default prompt library (with user overrides)
    pub fn new(client: AIClient) -> Self {
        Self::with_prompts(client, PromptLibrary::new())
    }

    /// Create a coach with a specific prompt library
    pub fn with_prompts(client: AIClient, prompts: PromptLibrary) -> Self {
        Self {
            client,
            prompts: Arc::new(RwLock::new(prompts)),
        }
    }

    /// The underlying client
    pub fn client(&self) -> &AIClient {
        &self.client
    }

    fn render(&self, id: PromptId, vars: &HashMap<&str, String>) -> Result<String> {
        let mut prompts = self
            .prompts
            .write()
            .map_err(|_| Error::InvalidData("Failed to acquire prompt library lock".into()))?;
        let template = prompts.get(id)?;
        Ok(template.render(vars))
    }

    async fn ask(&self, id: PromptId, vars: &HashMap<&str, String>) -> Result<String> {
        let prompt = self.render(id, vars)?;
        debug!(prompt = id.as_str(), model = self.client.model(), "Sending prompt");

        let raw = self.client.generate(&prompt).await?;
        debug!(prompt = id.as_str(), "Raw AI output: {}", raw);
        Ok(raw)
    }

    /// Ask for exactly three reflection questions about a planned purchase
    pub async fn reflection_questions(
        &self,
        planned: &PlannedPurchase,
    ) -> Result<ReflectionQuestions> {
        let vars = planned_vars(planned);
        let raw = self.ask(PromptId::ReflectionQuestions, &vars).await?;
        match parse_response(&raw, ResponseKind::Questions)? {
            CoachResponse::Questions { questions } => Ok(questions),
            CoachResponse::Verdict(_) => Err(unexpected_kind(ResponseKind::Questions)),
        }
    }

    /// Ask for a verdict given the user's answers
    pub async fn verdict(
        &self,
        planned: &PlannedPurchase,
        reflections: &[Reflection],
    ) -> Result<VerdictAssessment> {
        let mut vars = planned_vars(planned);
        vars.insert("reflections", format_reflections(reflections));

        let raw = self.ask(PromptId::PurchaseVerdict, &vars).await?;
        let assessment = match parse_response(&raw, ResponseKind::Verdict)? {
            CoachResponse::Verdict(assessment) => assessment,
            CoachResponse::Questions { .. } => return Err(unexpected_kind(ResponseKind::Verdict)),
        };
        info!(verdict = %assessment.verdict, item = %planned.item, "Verdict received");
        Ok(assessment)
    }

    /// Ask for a short narrative about one month of decisions
    pub async fn monthly_insight(&self, aggregate: &MonthlyAggregate) -> Result<String> {
        let categories = aggregate
            .categories
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let mut vars: HashMap<&str, String> = HashMap::new();
        vars.insert("month", aggregate.month.label());
        vars.insert("total_spent", format!("{:.2}", aggregate.total_spent));
        vars.insert("avoidable_spend", format!("{:.2}", aggregate.avoidable_spend));
        vars.insert("record_count", aggregate.record_count.to_string());
        vars.insert("positive_count", aggregate.positive_count.to_string());
        vars.insert("neutral_count", aggregate.neutral_count.to_string());
        vars.insert("negative_count", aggregate.negative_count.to_string());
        vars.insert("categories", categories);

        let raw = self.ask(PromptId::MonthlyInsight, &vars).await?;
        let text = raw.trim();
        if text.is_empty() {
            return Err(Error::Ai("Empty monthly insight".into()));
        }
        Ok(text.to_string())
    }
}

fn unexpected_kind(expected: ResponseKind) -> Error {
    Error::InvalidData(format!("Expected a {:?} response", expected))
}

fn planned_vars(planned: &PlannedPurchase) -> HashMap<&'static str, String> {
    let mut vars = HashMap::new();
    vars.insert("item", planned.item.clone());
    vars.insert("amount", format!("{:.2}", planned.amount));
    vars.insert("category", planned.category.as_str().to_string());
    vars
}

fn format_reflections(reflections: &[Reflection]) -> String {
    reflections
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. Q: {}\n   A: {}", i + 1, r.question, r.answer))
        .collect::<Vec<_>>()
        .join("\n")
}
