//! Purchase decision workflow
//!
//! Three steps, forward only:
//!
//! 1. `CollectingInput` - item, amount and category are entered
//! 2. `AnsweringQuestions` - the user answers three AI-generated questions
//! 3. `ReviewingVerdict` - the AI verdict is shown and the real outcome recorded
//!
//! A busy flag overlays every step while an AI call is outstanding; no input
//! is accepted until it settles. AI transitions are split into `begin_*`
//! (validate and mark busy) and `complete_*` (apply the result) so the
//! workflow need not be borrowed across the network call. Tickets carry the
//! generation they were issued in: after `reset()` a late completion is
//! dropped instead of touching the fresh state.
//!
//! Nothing reaches storage until `finalize_and_save`, which writes one
//! record and then resets. A failed save keeps step 3 intact so it can be
//! retried as-is.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::ai::{
    FinancialCoach, PlannedPurchase, Reflection, ReflectionQuestions, VerdictAssessment,
};
use crate::auth::SessionProvider;
use crate::db::PurchaseStore;
use crate::error::{Error, Result};
use crate::models::{Category, NewPurchase, Verdict};

const MISSING_INPUT: &str = "Please enter item, amount, and category.";
const MISSING_ANSWERS: &str = "Please provide an answer for all three questions.";
const MISSING_OUTCOME: &str = "Please enter your final outcome and amount.";

/// Current step of the workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    #[default]
    CollectingInput,
    AnsweringQuestions,
    ReviewingVerdict,
}

impl WorkflowStep {
    /// 1, 2 or 3
    pub fn number(&self) -> u8 {
        match self {
            Self::CollectingInput => 1,
            Self::AnsweringQuestions => 2,
            Self::ReviewingVerdict => 3,
        }
    }
}

/// Keep digits and the first decimal point of free-text amount input
pub fn sanitize_amount(input: &str) -> String {
    let mut seen_point = false;
    input
        .chars()
        .filter(|c| match c {
            '0'..='9' => true,
            '.' if !seen_point => {
                seen_point = true;
                true
            }
            _ => false,
        })
        .collect()
}

/// Parse a sanitized amount; None when empty or not a number
pub fn parse_amount(input: &str) -> Option<f64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

/// Transient state of one decision
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub step: WorkflowStep,
    pub item: String,
    /// Sanitized free text
    pub amount: String,
    pub category: Option<Category>,
    /// Planned side as captured when questions were generated
    pub planned: Option<PlannedPurchase>,
    /// Empty, or exactly three
    pub questions: Vec<String>,
    /// Co-indexed with `questions`
    pub answers: Vec<String>,
    pub verdict: Option<Verdict>,
    pub suggestion: Option<String>,
    pub final_label: String,
    /// Sanitized free text
    pub final_amount: String,
    pub busy: bool,
}

/// Issued by `begin_questions`; hand back to `complete_questions`
#[derive(Debug, Clone)]
pub struct QuestionsTicket {
    generation: u64,
    pub planned: PlannedPurchase,
}

/// Issued by `begin_verdict`; hand back to `complete_verdict`
#[derive(Debug, Clone)]
pub struct VerdictTicket {
    generation: u64,
    pub planned: PlannedPurchase,
    pub reflections: Vec<Reflection>,
}

/// The three-step purchase decision flow
#[derive(Debug, Clone, Default)]
pub struct DecisionWorkflow {
    state: WorkflowState,
    generation: u64,
}

impl DecisionWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn step(&self) -> WorkflowStep {
        self.state.step
    }

    pub fn is_busy(&self) -> bool {
        self.state.busy
    }

    /// Incremented on every reset
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Discard all state; outstanding tickets become stale
    pub fn reset(&mut self) {
        self.state = WorkflowState::default();
        self.generation += 1;
        debug!(generation = self.generation, "Decision workflow reset");
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.state.busy {
            Err(Error::Busy)
        } else {
            Ok(())
        }
    }

    fn ensure_step(&self, step: WorkflowStep, what: &str) -> Result<()> {
        if self.state.step != step {
            return Err(Error::Validation(format!(
                "{} is only possible at step {} (currently at step {})",
                what,
                step.number(),
                self.state.step.number()
            )));
        }
        Ok(())
    }

    // ---- Step 1 input ----

    pub fn set_item(&mut self, item: &str) -> Result<()> {
        self.ensure_idle()?;
        self.ensure_step(WorkflowStep::CollectingInput, "Changing the item")?;
        self.state.item = item.to_string();
        Ok(())
    }

    /// Set the planned amount; non-numeric characters are dropped
    pub fn set_amount(&mut self, amount: &str) -> Result<()> {
        self.ensure_idle()?;
        self.ensure_step(WorkflowStep::CollectingInput, "Changing the amount")?;
        self.state.amount = sanitize_amount(amount);
        Ok(())
    }

    pub fn set_category(&mut self, category: Category) -> Result<()> {
        self.ensure_idle()?;
        self.ensure_step(WorkflowStep::CollectingInput, "Changing the category")?;
        self.state.category = Some(category);
        Ok(())
    }

    // ---- Step 1 -> 2 ----

    /// Validate step-one input and mark the workflow busy
    pub fn begin_questions(&mut self) -> Result<QuestionsTicket> {
        self.ensure_idle()?;
        self.ensure_step(WorkflowStep::CollectingInput, "Requesting questions")?;

        let item = self.state.item.trim();
        let amount = parse_amount(&self.state.amount);
        let (amount, category) = match (item.is_empty(), amount, self.state.category) {
            (false, Some(amount), Some(category)) => (amount, category),
            _ => return Err(Error::Validation(MISSING_INPUT.into())),
        };

        let planned = PlannedPurchase {
            item: item.to_string(),
            amount,
            category,
        };
        self.state.busy = true;
        debug!(item = %planned.item, amount = planned.amount, "Requesting reflection questions");

        Ok(QuestionsTicket {
            generation: self.generation,
            planned,
        })
    }

    /// Apply the outcome of a questions request
    ///
    /// A stale ticket (issued before a reset) is ignored and returns Ok.
    pub fn complete_questions(
        &mut self,
        ticket: QuestionsTicket,
        outcome: Result<ReflectionQuestions>,
    ) -> Result<()> {
        if ticket.generation != self.generation {
            debug!("Ignoring questions for an abandoned decision");
            return Ok(());
        }
        self.state.busy = false;

        match outcome {
            Ok(questions) => {
                self.state.questions = questions.into_vec();
                self.state.answers = vec![String::new(); 3];
                self.state.planned = Some(ticket.planned);
                self.state.step = WorkflowStep::AnsweringQuestions;
                info!("Decision advanced to step 2");
                Ok(())
            }
            Err(e) => {
                warn!("Failed to generate questions: {}", e);
                Err(e)
            }
        }
    }

    /// Run the whole 1 -> 2 transition against a coach
    pub async fn request_questions(&mut self, coach: &FinancialCoach) -> Result<()> {
        let ticket = self.begin_questions()?;
        let outcome = coach.reflection_questions(&ticket.planned).await;
        self.complete_questions(ticket, outcome)
    }

    // ---- Step 2 input ----

    pub fn set_answer(&mut self, index: usize, answer: &str) -> Result<()> {
        self.ensure_idle()?;
        self.ensure_step(WorkflowStep::AnsweringQuestions, "Answering questions")?;
        let slot = self
            .state
            .answers
            .get_mut(index)
            .ok_or_else(|| Error::Validation(format!("No question number {}", index + 1)))?;
        *slot = answer.to_string();
        Ok(())
    }

    /// Replace all answers at once (missing entries become empty)
    pub fn set_answers(&mut self, answers: &[String]) -> Result<()> {
        self.ensure_idle()?;
        self.ensure_step(WorkflowStep::AnsweringQuestions, "Answering questions")?;
        if answers.len() > self.state.questions.len() {
            return Err(Error::Validation(format!(
                "Expected at most {} answers, got {}",
                self.state.questions.len(),
                answers.len()
            )));
        }
        for (i, slot) in self.state.answers.iter_mut().enumerate() {
            *slot = answers.get(i).cloned().unwrap_or_default();
        }
        Ok(())
    }

    // ---- Step 2 -> 3 ----

    /// Validate answers and mark the workflow busy
    pub fn begin_verdict(&mut self) -> Result<VerdictTicket> {
        self.ensure_idle()?;
        self.ensure_step(WorkflowStep::AnsweringQuestions, "Requesting a verdict")?;

        if self.state.answers.len() != 3 || self.state.answers.iter().any(|a| a.trim().is_empty()) {
            return Err(Error::Validation(MISSING_ANSWERS.into()));
        }
        let planned = self
            .state
            .planned
            .clone()
            .ok_or_else(|| Error::Validation(MISSING_INPUT.into()))?;

        let reflections = self
            .state
            .questions
            .iter()
            .zip(&self.state.answers)
            .map(|(q, a)| Reflection {
                question: q.clone(),
                answer: a.trim().to_string(),
            })
            .collect();

        self.state.busy = true;
        debug!(item = %planned.item, "Requesting verdict");

        Ok(VerdictTicket {
            generation: self.generation,
            planned,
            reflections,
        })
    }

    /// Apply the outcome of a verdict request
    ///
    /// A stale ticket (issued before a reset) is ignored and returns Ok.
    pub fn complete_verdict(
        &mut self,
        ticket: VerdictTicket,
        outcome: Result<VerdictAssessment>,
    ) -> Result<()> {
        if ticket.generation != self.generation {
            debug!("Ignoring verdict for an abandoned decision");
            return Ok(());
        }
        self.state.busy = false;

        match outcome {
            Ok(assessment) => {
                self.state.verdict = Some(assessment.verdict);
                self.state.suggestion = assessment.suggestion;
                self.state.step = WorkflowStep::ReviewingVerdict;
                info!(verdict = %assessment.verdict, "Decision advanced to step 3");
                Ok(())
            }
            Err(e) => {
                warn!("Failed to generate verdict: {}", e);
                Err(e)
            }
        }
    }

    /// Run the whole 2 -> 3 transition against a coach
    pub async fn request_verdict(&mut self, coach: &FinancialCoach) -> Result<()> {
        let ticket = self.begin_verdict()?;
        let outcome = coach.verdict(&ticket.planned, &ticket.reflections).await;
        self.complete_verdict(ticket, outcome)
    }

    // ---- Step 3 input ----

    pub fn set_final_label(&mut self, label: &str) -> Result<()> {
        self.ensure_idle()?;
        self.ensure_step(WorkflowStep::ReviewingVerdict, "Recording the outcome")?;
        self.state.final_label = label.to_string();
        Ok(())
    }

    /// Set the amount actually spent; non-numeric characters are dropped
    pub fn set_final_amount(&mut self, amount: &str) -> Result<()> {
        self.ensure_idle()?;
        self.ensure_step(WorkflowStep::ReviewingVerdict, "Recording the outcome")?;
        self.state.final_amount = sanitize_amount(amount);
        Ok(())
    }

    // ---- Step 3 -> done ----

    /// Build the record that `finalize_and_save` would insert
    fn build_purchase(&self, session: &dyn SessionProvider) -> Result<NewPurchase> {
        self.ensure_step(WorkflowStep::ReviewingVerdict, "Saving")?;

        let final_label = self.state.final_label.trim();
        let final_amount = parse_amount(&self.state.final_amount);
        let (final_amount, verdict, planned) =
            match (final_label.is_empty(), final_amount, self.state.verdict, &self.state.planned) {
                (false, Some(amount), Some(verdict), Some(planned)) => (amount, verdict, planned),
                _ => return Err(Error::Validation(MISSING_OUTCOME.into())),
            };

        let user_id = session
            .current_user_id()
            .ok_or_else(|| Error::Auth("You must be signed in to save a decision".into()))?;

        Ok(NewPurchase {
            user_id,
            item: planned.item.clone(),
            amount: planned.amount,
            category: planned.category,
            verdict,
            final_label: final_label.to_string(),
            final_amount,
        })
    }

    /// Persist the decision and reset
    ///
    /// Exactly one insert is attempted, and only when every precondition
    /// holds. On failure the state is left untouched so the identical
    /// insert can be retried.
    pub fn finalize_and_save(
        &mut self,
        store: &dyn PurchaseStore,
        session: &dyn SessionProvider,
    ) -> Result<i64> {
        self.ensure_idle()?;
        let purchase = self.build_purchase(session)?;

        match store.insert_purchase(&purchase) {
            Ok(id) => {
                info!(
                    id,
                    user_id = purchase.user_id,
                    verdict = %purchase.verdict,
                    "Decision saved"
                );
                self.reset();
                Ok(id)
            }
            Err(e) => {
                warn!("Save failed, decision kept for retry: {}", e);
                Err(match e {
                    Error::Persistence(msg) => Error::Persistence(msg),
                    other => Error::Persistence(other.to_string()),
                })
            }
        }
    }
}

/// One decision workflow per signed-in user
#[derive(Debug, Default)]
pub struct WorkflowRegistry {
    workflows: Mutex<HashMap<i64, DecisionWorkflow>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against the user's workflow, creating it if needed
    ///
    /// The lock is held only for the duration of `f`; never await inside it.
    pub fn with<R>(&self, user_id: i64, f: impl FnOnce(&mut DecisionWorkflow) -> R) -> R {
        let mut workflows = self.workflows.lock().unwrap_or_else(|e| e.into_inner());
        f(workflows.entry(user_id).or_default())
    }

    /// Snapshot of the user's workflow state
    pub fn snapshot(&self, user_id: i64) -> WorkflowState {
        self.with(user_id, |wf| wf.state().clone())
    }

    /// Abandon the user's workflow
    ///
    /// The entry is kept so its generation keeps counting up and tickets
    /// issued before the reset stay stale.
    pub fn reset(&self, user_id: i64) {
        self.with(user_id, DecisionWorkflow::reset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AIClient, MockBackend};
    use crate::db::PurchaseQuery;
    use crate::models::{PurchaseRecord, Session};
    use crate::prompts::PromptLibrary;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store that fails the first `failures` inserts and records the rest
    #[derive(Default)]
    struct FlakyStore {
        failures: AtomicUsize,
        attempts: Mutex<Vec<NewPurchase>>,
    }

    impl FlakyStore {
        fn failing(n: usize) -> Self {
            Self {
                failures: AtomicUsize::new(n),
                ..Default::default()
            }
        }

        fn attempts(&self) -> Vec<NewPurchase> {
            self.attempts.lock().unwrap().clone()
        }
    }

    impl PurchaseStore for FlakyStore {
        fn insert_purchase(&self, purchase: &NewPurchase) -> Result<i64> {
            let mut attempts = self.attempts.lock().unwrap();
            attempts.push(purchase.clone());
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(Error::Persistence("network unreachable".into()));
            }
            Ok(attempts.len() as i64)
        }

        fn query_purchases(&self, _query: &PurchaseQuery) -> Result<Vec<PurchaseRecord>> {
            Ok(Vec::new())
        }
    }

    fn session() -> Session {
        Session {
            user_id: 7,
            email: "sam@example.com".into(),
            token: "t".into(),
        }
    }

    fn coach(mock: &MockBackend) -> FinancialCoach {
        FinancialCoach::with_prompts(AIClient::Mock(mock.clone()), PromptLibrary::embedded_only())
    }

    fn filled_step_one() -> DecisionWorkflow {
        let mut wf = DecisionWorkflow::new();
        wf.set_item("Espresso machine").unwrap();
        wf.set_amount("$349.99").unwrap();
        wf.set_category(Category::Shopping).unwrap();
        wf
    }

    async fn at_step_three(mock: &MockBackend) -> DecisionWorkflow {
        let c = coach(mock);
        let mut wf = filled_step_one();
        wf.request_questions(&c).await.unwrap();
        wf.set_answers(&["a".to_string(), "b".to_string(), "c".to_string()]).unwrap();
        wf.request_verdict(&c).await.unwrap();
        wf
    }

    #[test]
    fn test_sanitize_amount() {
        assert_eq!(sanitize_amount("$1,234.56"), "1234.56");
        assert_eq!(sanitize_amount("12.3.4"), "12.34");
        assert_eq!(sanitize_amount("abc"), "");
        assert_eq!(parse_amount("12.5"), Some(12.5));
        assert_eq!(parse_amount("."), None);
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("7."), Some(7.0));
    }

    #[test]
    fn test_begin_questions_requires_all_inputs() {
        let mut wf = DecisionWorkflow::new();
        assert!(matches!(wf.begin_questions(), Err(Error::Validation(_))));

        wf.set_item("Lamp").unwrap();
        wf.set_amount("40").unwrap();
        assert!(matches!(wf.begin_questions(), Err(Error::Validation(_))));

        wf.set_category(Category::Shopping).unwrap();
        wf.set_item("   ").unwrap();
        assert!(matches!(wf.begin_questions(), Err(Error::Validation(_))));

        wf.set_item("Lamp").unwrap();
        wf.set_amount("abc").unwrap();
        assert_eq!(wf.state().amount, "");
        assert!(matches!(wf.begin_questions(), Err(Error::Validation(_))));

        assert!(!wf.is_busy());
        assert_eq!(wf.step(), WorkflowStep::CollectingInput);
    }

    #[tokio::test]
    async fn test_validation_failure_makes_no_ai_call() {
        let mock = MockBackend::new();
        let mut wf = DecisionWorkflow::new();
        wf.set_item("Lamp").unwrap();
        assert!(wf.request_questions(&coach(&mock)).await.is_err());
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_questions_advance_to_step_two() {
        let mock = MockBackend::new()
            .with_responses([r#"Sure: ["Need?", "Alternatives?", "Budget impact?"]"#]);
        let mut wf = filled_step_one();

        wf.request_questions(&coach(&mock)).await.unwrap();

        let state = wf.state();
        assert_eq!(state.step, WorkflowStep::AnsweringQuestions);
        assert_eq!(state.questions, vec!["Need?", "Alternatives?", "Budget impact?"]);
        assert_eq!(state.answers, vec!["", "", ""]);
        assert!(!state.busy);
        let planned = state.planned.as_ref().unwrap();
        assert_eq!(planned.amount, 349.99);
        assert_eq!(planned.item, "Espresso machine");
    }

    #[tokio::test]
    async fn test_numeric_questions_rejected() {
        let mock = MockBackend::new().with_responses(["here you go: [1,2,3]"]);
        let mut wf = filled_step_one();

        let err = wf.request_questions(&coach(&mock)).await.unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
        assert_eq!(wf.step(), WorkflowStep::CollectingInput);
        assert!(wf.state().questions.is_empty());
        assert!(!wf.is_busy());
    }

    #[tokio::test]
    async fn test_ai_failure_keeps_step_one() {
        let mock = MockBackend::new();
        mock.push_failure("503 from upstream");
        let mut wf = filled_step_one();

        let err = wf.request_questions(&coach(&mock)).await.unwrap_err();
        assert!(err.is_ai_failure());
        assert_eq!(wf.step(), WorkflowStep::CollectingInput);
        assert!(!wf.is_busy());

        // Retrying is allowed and succeeds with the canned response
        wf.request_questions(&coach(&mock)).await.unwrap();
        assert_eq!(wf.step(), WorkflowStep::AnsweringQuestions);
        assert_eq!(mock.call_count(), 2);
    }

    #[test]
    fn test_busy_blocks_input_and_transitions() {
        let mut wf = filled_step_one();
        let ticket = wf.begin_questions().unwrap();
        assert!(wf.is_busy());

        let before = wf.state().clone();
        assert!(matches!(wf.set_item("Other"), Err(Error::Busy)));
        assert!(matches!(wf.set_amount("1"), Err(Error::Busy)));
        assert!(matches!(wf.set_category(Category::Bills), Err(Error::Busy)));
        assert!(matches!(wf.begin_questions(), Err(Error::Busy)));
        assert_eq!(wf.state(), &before);

        let questions = ReflectionQuestions(["a".into(), "b".into(), "c".into()]);
        wf.complete_questions(ticket, Ok(questions)).unwrap();
        assert!(!wf.is_busy());
        assert_eq!(wf.step(), WorkflowStep::AnsweringQuestions);
    }

    #[test]
    fn test_stale_ticket_ignored_after_reset() {
        let mut wf = filled_step_one();
        let ticket = wf.begin_questions().unwrap();

        wf.reset();
        assert!(!wf.is_busy());
        wf.set_item("Something new").unwrap();

        let questions = ReflectionQuestions(["a".into(), "b".into(), "c".into()]);
        wf.complete_questions(ticket, Ok(questions)).unwrap();

        assert_eq!(wf.step(), WorkflowStep::CollectingInput);
        assert!(wf.state().questions.is_empty());
        assert_eq!(wf.state().item, "Something new");
    }

    #[tokio::test]
    async fn test_verdict_requires_all_answers() {
        let mock = MockBackend::new();
        let c = coach(&mock);
        let mut wf = filled_step_one();
        wf.request_questions(&c).await.unwrap();

        wf.set_answer(0, "yes").unwrap();
        wf.set_answer(1, "   ").unwrap();
        wf.set_answer(2, "no").unwrap();
        let err = wf.request_verdict(&c).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(mock.call_count(), 1);

        assert!(wf.set_answer(3, "out of range").is_err());
    }

    #[tokio::test]
    async fn test_unknown_verdict_rejected() {
        let mock = MockBackend::new();
        let c = coach(&mock);
        let mut wf = filled_step_one();
        wf.request_questions(&c).await.unwrap();
        wf.set_answers(&["a".to_string(), "b".to_string(), "c".to_string()]).unwrap();

        mock.push_response(r#"{"verdict":"maybe","suggestion":"..."}"#);
        let err = wf.request_verdict(&c).await.unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
        assert_eq!(wf.step(), WorkflowStep::AnsweringQuestions);
        assert!(wf.state().verdict.is_none());
        assert!(!wf.is_busy());
        // Answers survive the failure
        assert_eq!(wf.state().answers, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_verdict_advances_to_step_three() {
        let mock = MockBackend::new();
        let wf = at_step_three(&mock).await;
        assert_eq!(wf.step(), WorkflowStep::ReviewingVerdict);
        assert_eq!(wf.state().verdict, Some(Verdict::Neutral));
        assert!(wf.state().suggestion.is_some());

        let verdict_prompt = &mock.prompts()[1];
        assert!(verdict_prompt.contains("A: a"));
        assert!(verdict_prompt.contains("A: c"));
    }

    #[tokio::test]
    async fn test_missing_final_amount_blocks_insert() {
        let mock = MockBackend::new();
        let mut wf = at_step_three(&mock).await;
        let store = FlakyStore::default();

        wf.set_final_label("Bought a cheaper one").unwrap();
        let err = wf.finalize_and_save(&store, &session()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(store.attempts().is_empty());
        assert_eq!(wf.step(), WorkflowStep::ReviewingVerdict);
    }

    #[tokio::test]
    async fn test_save_requires_session() {
        let mock = MockBackend::new();
        let mut wf = at_step_three(&mock).await;
        let store = FlakyStore::default();

        wf.set_final_label("Skipped").unwrap();
        wf.set_final_amount("0").unwrap();
        let no_session: Option<Session> = None;
        let err = wf.finalize_and_save(&store, &no_session).unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
        assert!(store.attempts().is_empty());
    }

    #[tokio::test]
    async fn test_save_success_resets() {
        let mock = MockBackend::new();
        let mut wf = at_step_three(&mock).await;
        let store = FlakyStore::default();
        let generation = wf.generation();

        wf.set_final_label("Bought a refurbished one").unwrap();
        wf.set_final_amount("199.00").unwrap();
        let id = wf.finalize_and_save(&store, &session()).unwrap();
        assert_eq!(id, 1);

        let saved = &store.attempts()[0];
        assert_eq!(saved.user_id, 7);
        assert_eq!(saved.item, "Espresso machine");
        assert_eq!(saved.amount, 349.99);
        assert_eq!(saved.category, Category::Shopping);
        assert_eq!(saved.verdict, Verdict::Neutral);
        assert_eq!(saved.final_label, "Bought a refurbished one");
        assert_eq!(saved.final_amount, 199.0);

        assert_eq!(wf.state(), &WorkflowState::default());
        assert_eq!(wf.generation(), generation + 1);
    }

    #[tokio::test]
    async fn test_failed_save_can_be_retried_identically() {
        let mock = MockBackend::new();
        let mut wf = at_step_three(&mock).await;
        let store = FlakyStore::failing(1);

        wf.set_final_label("Skipped it").unwrap();
        wf.set_final_amount("0").unwrap();

        let err = wf.finalize_and_save(&store, &session()).unwrap_err();
        assert!(err.is_retryable_save());
        assert_eq!(wf.step(), WorkflowStep::ReviewingVerdict);
        assert!(!wf.is_busy());

        wf.finalize_and_save(&store, &session()).unwrap();
        let attempts = store.attempts();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0], attempts[1]);
        assert_eq!(wf.step(), WorkflowStep::CollectingInput);
    }

    #[test]
    fn test_inputs_locked_to_their_step() {
        let mut wf = DecisionWorkflow::new();
        assert!(wf.set_answer(0, "x").is_err());
        assert!(wf.set_final_label("x").is_err());
        assert!(wf.begin_verdict().is_err());
        assert!(matches!(
            wf.finalize_and_save(&FlakyStore::default(), &session()),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_registry_isolates_users() {
        let registry = WorkflowRegistry::new();
        registry.with(1, |wf| wf.set_item("Bike")).unwrap();
        registry.with(2, |wf| wf.set_item("Tent")).unwrap();

        assert_eq!(registry.snapshot(1).item, "Bike");
        assert_eq!(registry.snapshot(2).item, "Tent");

        registry.reset(1);
        assert_eq!(registry.snapshot(1).item, "");
        assert_eq!(registry.snapshot(2).item, "Tent");

    }

    #[test]
    fn test_registry_reset_makes_tickets_stale() {
        let registry = WorkflowRegistry::new();
        let ticket = registry
            .with(1, |wf| {
                wf.set_item("Bike")?;
                wf.set_amount("120")?;
                wf.set_category(Category::Travel)?;
                wf.begin_questions()
            })
            .unwrap();

        registry.reset(1);
        let questions = ReflectionQuestions(["a".into(), "b".into(), "c".into()]);
        registry
            .with(1, |wf| wf.complete_questions(ticket, Ok(questions)))
            .unwrap();

        let state = registry.snapshot(1);
        assert_eq!(state.step, WorkflowStep::CollectingInput);
        assert!(state.questions.is_empty());
        assert!(!state.busy);
    }
}
