//! Nudge Web Server
//!
//! Axum-based REST API for the Nudge purchase coach.
//!
//! Security features:
//! - Bearer-token sessions for every route except sign-up and sign-in
//! - Restrictive CORS policy
//! - Input validation (pagination limits, month and category parsing)
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{debug, error, info, warn};

use nudge_core::ai::{AIBackend, FinancialCoach};
use nudge_core::auth::Accounts;
use nudge_core::db::Database;
use nudge_core::workflow::WorkflowRegistry;

mod handlers;

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Authorization header carrying the session token
const AUTHORIZATION_HEADER: &str = "authorization";

/// Server configuration
#[derive(Clone, Debug, Default)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

impl ServerConfig {
    /// Read `NUDGE_ALLOWED_ORIGINS` (comma separated)
    pub fn from_env() -> Self {
        let allowed_origins = std::env::var("NUDGE_ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Self { allowed_origins }
    }
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    /// Stateless; each request carries its own bearer token
    pub auth: Accounts,
    /// None when no AI backend is configured; reports then fall back
    pub coach: Option<FinancialCoach>,
    /// In-progress decisions, one per signed-in user
    pub workflows: WorkflowRegistry,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(db: Database, coach: Option<FinancialCoach>, config: ServerConfig) -> Self {
        Self {
            auth: Accounts::new(db.clone()),
            db,
            coach,
            workflows: WorkflowRegistry::new(),
            config,
        }
    }

    /// The coach, or a 503 explaining that AI is not set up
    pub(crate) fn coach(&self) -> Result<&FinancialCoach, AppError> {
        self.coach
            .as_ref()
            .ok_or_else(|| AppError::unavailable("AI backend not configured"))
    }
}

/// Authentication middleware - resolves the bearer token to a session
///
/// On success the `Session` is inserted into request extensions for handlers
/// to pick up with `Extension<Session>`.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    if let Some(token) = token {
        match state.auth.authenticate(&token) {
            Ok(Some(session)) => {
                debug!(
                    user_id = session.user_id,
                    path = %request.uri().path(),
                    "Authenticated request"
                );
                request.extensions_mut().insert(session);
                return next.run(request).await;
            }
            Ok(None) => {
                warn!(path = %request.uri().path(), "Unknown or expired session token");
            }
            Err(e) => {
                error!(error = %e, "Session lookup failed");
                return AppError::from(e).into_response();
            }
        }
    }

    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "Authentication required"
        })),
    )
        .into_response()
}

/// Create the application router
pub fn create_router(db: Database, coach: Option<FinancialCoach>, config: ServerConfig) -> Router {
    if let Some(coach) = &coach {
        info!(
            "AI backend configured: {} ({}, model: {})",
            coach.client().backend_name(),
            coach.client().host(),
            coach.client().model()
        );
    } else {
        info!("ℹ️  AI backend not configured (set GEMINI_API_KEY or AI_BACKEND to enable AI features)");
    }

    create_router_with_state(Arc::new(AppState::new(db, coach, config)))
}

/// Create the router around existing state (for testing)
pub fn create_router_with_state(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/auth/signup", post(handlers::sign_up))
        .route("/auth/login", post(handlers::sign_in))
        .route("/invest/strategies", get(handlers::list_strategies));

    let protected_routes = Router::new()
        // Auth
        .route("/auth/logout", post(handlers::sign_out))
        .route("/me", get(handlers::get_me))
        // Decision workflow
        .route(
            "/decision",
            get(handlers::get_decision).delete(handlers::reset_decision),
        )
        .route("/decision/input", put(handlers::update_input))
        .route("/decision/questions", post(handlers::request_questions))
        .route("/decision/answers", put(handlers::update_answers))
        .route("/decision/verdict", post(handlers::request_verdict))
        .route("/decision/outcome", put(handlers::update_outcome))
        .route("/decision/save", post(handlers::save_decision))
        // History
        .route("/purchases", get(handlers::list_purchases))
        .route("/dashboard", get(handlers::get_dashboard))
        // Reports
        .route("/reports/monthly", get(handlers::get_monthly_reports))
        // Savings projection
        .route("/invest", get(handlers::get_projection))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_routes = public_routes.merge(protected_routes);

    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];

    // Build CORS layer
    let cors = if state.config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("1; mode=block"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
        ))
}

/// Start the server
pub async fn serve(
    db: Database,
    coach: Option<FinancialCoach>,
    host: &str,
    port: u16,
    config: ServerConfig,
) -> anyhow::Result<()> {
    check_ai_connection(coach.as_ref()).await;

    let app = create_router(db, coach, config)
        .into_make_service_with_connect_info::<std::net::SocketAddr>();
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Check and log AI backend connection status
async fn check_ai_connection(coach: Option<&FinancialCoach>) {
    let Some(coach) = coach else {
        return;
    };
    let client = coach.client();
    if client.health_check().await {
        info!("✅ AI backend connected: {} (model: {})", client.host(), client.model());
    } else {
        warn!(
            "⚠️  AI backend configured but not responding: {} (model: {})",
            client.host(),
            client.model()
        );
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unavailable(msg: &str) -> Self {
        Self::with_status(StatusCode::SERVICE_UNAVAILABLE, msg)
    }

    fn with_status(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

/// Status and client-facing message for a core error
///
/// None means the error is internal and gets the generic 500.
fn classify(err: &nudge_core::Error) -> Option<(StatusCode, String)> {
    use nudge_core::Error;

    let mapped = match err {
        Error::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        Error::Auth(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
        Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
        Error::Busy => (StatusCode::CONFLICT, err.to_string()),
        Error::Ai(_) | Error::InvalidData(_) => (StatusCode::BAD_GATEWAY, err.to_string()),
        Error::Http(_) => (
            StatusCode::BAD_GATEWAY,
            "AI service could not be reached".to_string(),
        ),
        Error::Persistence(_) | Error::Pool(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Could not save right now, please try again".to_string(),
        ),
        _ => return None,
    };
    Some(mapped)
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        let mapped = err.downcast_ref::<nudge_core::Error>().and_then(classify);

        match mapped {
            Some((status, message)) => {
                if status.is_server_error() || status == StatusCode::BAD_GATEWAY {
                    warn!(error = %err, %status, "Request failed");
                }
                Self {
                    status,
                    message,
                    internal: None,
                }
            }
            None => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                // Return generic message to client
                message: "An internal error occurred".to_string(),
                // Keep full error for logging
                internal: Some(err),
            },
        }
    }
}
