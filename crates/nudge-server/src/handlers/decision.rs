//! Decision workflow handlers
//!
//! Each signed-in user has one in-progress decision held in the registry.
//! AI transitions release the registry lock while the model is working; a
//! second request in that window gets 409 from the busy flag. If the client
//! goes away before the model answers, the transition fails as abandoned and
//! the workflow is left idle at its previous step.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use nudge_core::models::{Category, PurchaseRecord, Session};
use nudge_core::workflow::{DecisionWorkflow, WorkflowRegistry, WorkflowState};
use nudge_core::Error;

use crate::{AppError, AppState};

/// Amount as typed (`"$1,200"`) or as a JSON number
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Text(String),
    Number(f64),
}

impl AmountInput {
    fn as_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => n.to_string(),
        }
    }
}

/// Step-one fields; omitted fields are left unchanged
#[derive(Debug, Deserialize)]
pub struct UpdateInputRequest {
    pub item: Option<String>,
    pub amount: Option<AmountInput>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAnswersRequest {
    pub answers: Vec<String>,
}

/// Step-three fields; omitted fields are left unchanged
#[derive(Debug, Deserialize)]
pub struct UpdateOutcomeRequest {
    pub final_label: Option<String>,
    pub final_amount: Option<AmountInput>,
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub id: i64,
    /// Money kept compared with the plan
    pub saved: f64,
    pub record: Option<PurchaseRecord>,
}

const ABANDONED: &str = "Request abandoned before the AI responded";

/// Fails an outstanding AI transition if dropped before `settle`
///
/// Axum drops the handler future when the client disconnects, so code after
/// the coach's `.await` may never run.
struct PendingCall<'a, F: FnOnce(&mut DecisionWorkflow)> {
    workflows: &'a WorkflowRegistry,
    user_id: i64,
    on_abandon: Option<F>,
}

impl<'a, F: FnOnce(&mut DecisionWorkflow)> PendingCall<'a, F> {
    fn new(workflows: &'a WorkflowRegistry, user_id: i64, on_abandon: F) -> Self {
        Self {
            workflows,
            user_id,
            on_abandon: Some(on_abandon),
        }
    }

    fn settle(mut self) {
        self.on_abandon = None;
    }
}

impl<F: FnOnce(&mut DecisionWorkflow)> Drop for PendingCall<'_, F> {
    fn drop(&mut self) {
        if let Some(abandon) = self.on_abandon.take() {
            warn!(user_id = self.user_id, "Client left while waiting on the AI");
            self.workflows.with(self.user_id, abandon);
        }
    }
}

/// GET /api/decision - Current state of the caller's decision
pub async fn get_decision(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Json<WorkflowState> {
    Json(state.workflows.snapshot(session.user_id))
}

/// DELETE /api/decision - Abandon the decision; nothing is stored
pub async fn reset_decision(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Json<WorkflowState> {
    state.workflows.reset(session.user_id);
    info!(user_id = session.user_id, "Decision abandoned");
    Json(state.workflows.snapshot(session.user_id))
}

/// PUT /api/decision/input - Item, amount and category
pub async fn update_input(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Json(body): Json<UpdateInputRequest>,
) -> Result<Json<WorkflowState>, AppError> {
    let category = body
        .category
        .as_deref()
        .map(|c| c.parse::<Category>())
        .transpose()
        .map_err(|e| AppError::bad_request(&e))?;

    let snapshot = state.workflows.with(session.user_id, |wf| {
        if let Some(item) = &body.item {
            wf.set_item(item)?;
        }
        if let Some(amount) = &body.amount {
            wf.set_amount(&amount.as_text())?;
        }
        if let Some(category) = category {
            wf.set_category(category)?;
        }
        Ok::<_, nudge_core::Error>(wf.state().clone())
    })?;

    Ok(Json(snapshot))
}

/// POST /api/decision/questions - Ask the coach for three reflection questions
pub async fn request_questions(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Result<Json<WorkflowState>, AppError> {
    let coach = state.coach()?;
    let ticket = state
        .workflows
        .with(session.user_id, |wf| wf.begin_questions())?;

    let pending = PendingCall::new(&state.workflows, session.user_id, {
        let ticket = ticket.clone();
        move |wf: &mut DecisionWorkflow| {
            let _ = wf.complete_questions(ticket, Err(Error::Ai(ABANDONED.into())));
        }
    });
    let outcome = coach.reflection_questions(&ticket.planned).await;
    pending.settle();

    state
        .workflows
        .with(session.user_id, |wf| wf.complete_questions(ticket, outcome))?;
    Ok(Json(state.workflows.snapshot(session.user_id)))
}

/// PUT /api/decision/answers - Answers to the three questions, in order
pub async fn update_answers(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Json(body): Json<UpdateAnswersRequest>,
) -> Result<Json<WorkflowState>, AppError> {
    let snapshot = state.workflows.with(session.user_id, |wf| {
        wf.set_answers(&body.answers)?;
        Ok::<_, nudge_core::Error>(wf.state().clone())
    })?;
    Ok(Json(snapshot))
}

/// POST /api/decision/verdict - Ask the coach for a verdict
pub async fn request_verdict(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Result<Json<WorkflowState>, AppError> {
    let coach = state.coach()?;
    let ticket = state
        .workflows
        .with(session.user_id, |wf| wf.begin_verdict())?;

    let pending = PendingCall::new(&state.workflows, session.user_id, {
        let ticket = ticket.clone();
        move |wf: &mut DecisionWorkflow| {
            let _ = wf.complete_verdict(ticket, Err(Error::Ai(ABANDONED.into())));
        }
    });
    let outcome = coach.verdict(&ticket.planned, &ticket.reflections).await;
    pending.settle();

    state
        .workflows
        .with(session.user_id, |wf| wf.complete_verdict(ticket, outcome))?;
    Ok(Json(state.workflows.snapshot(session.user_id)))
}

/// PUT /api/decision/outcome - What the user actually did
pub async fn update_outcome(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Json(body): Json<UpdateOutcomeRequest>,
) -> Result<Json<WorkflowState>, AppError> {
    let snapshot = state.workflows.with(session.user_id, |wf| {
        if let Some(label) = &body.final_label {
            wf.set_final_label(label)?;
        }
        if let Some(amount) = &body.final_amount {
            wf.set_final_amount(&amount.as_text())?;
        }
        Ok::<_, nudge_core::Error>(wf.state().clone())
    })?;
    Ok(Json(snapshot))
}

/// POST /api/decision/save - Store the decision and start over
///
/// On 503 the decision is kept as-is and the same request can be retried.
pub async fn save_decision(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Result<(StatusCode, Json<SaveResponse>), AppError> {
    let id = state
        .workflows
        .with(session.user_id, |wf| wf.finalize_and_save(&state.db, &session))?;

    let record = state.db.get_purchase(id)?;
    let saved = record.as_ref().map(PurchaseRecord::saved).unwrap_or_default();

    Ok((StatusCode::CREATED, Json(SaveResponse { id, saved, record })))
}
