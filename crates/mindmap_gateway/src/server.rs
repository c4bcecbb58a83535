use crate::types::{
    CheckUnlockResponse, DebugCounts, RecapAnalyzerRequest, RecapAnalyzerResponse,
    RecapPrepareResponse,
};
use axum::{
    extract::{FromRequestParts, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use mindmap_core::{InsightError, UnlockNotifier};
use mindmap_insight::{
    AnalyzeOutcome, BadgeEvaluator, CompletionParams, LlmClient, PrepareOutcome, RecapPipeline,
};
use mindmap_store::SqliteStore;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Shared state for the insight HTTP surface.
///
/// Every request is stateless: handlers re-derive everything from the store,
/// so the state is just the wired-up collaborators.
#[derive(Clone)]
pub struct AppState {
    evaluator: Arc<BadgeEvaluator>,
    pipeline: Arc<RecapPipeline>,
}

impl AppState {
    pub fn new(
        store: SqliteStore,
        llm: Arc<dyn LlmClient>,
        params: CompletionParams,
        notifier: UnlockNotifier,
    ) -> Self {
        Self {
            evaluator: Arc::new(BadgeEvaluator::new(store.clone(), notifier)),
            pipeline: Arc::new(RecapPipeline::new(store, llm, params)),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/badges/check-unlock", post(check_unlock))
        .route("/recap/recap", post(recap_prepare))
        .route("/recap/recap-analyzer", post(recap_analyze))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("insight gateway listening on {addr}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

// ============================================================================
// Session identity
// ============================================================================

/// The caller's identity, taken from the `x-user-uid` session header.
pub struct SessionUser(pub String);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for SessionUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get("x-user-uid")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|uid| !uid.is_empty())
            .map(|uid| SessionUser(uid.to_string()))
            .ok_or_else(|| {
                ApiError(InsightError::Validation(
                    "missing x-user-uid session header".to_string(),
                ))
            })
    }
}

// ============================================================================
// Error mapping
// ============================================================================

pub struct ApiError(pub InsightError);

impl From<InsightError> for ApiError {
    fn from(e: InsightError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InsightError::Validation(_) => StatusCode::BAD_REQUEST,
            InsightError::Llm(_) => StatusCode::BAD_GATEWAY,
            InsightError::LlmParse { .. }
            | InsightError::Store { .. }
            | InsightError::StatsTimeout
            | InsightError::Crypto(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = match &self.0 {
            // Hand the caller the raw and cleaned model text for diagnosis.
            InsightError::LlmParse { raw, cleaned, .. } => serde_json::json!({
                "error": self.0.to_string(),
                "raw": raw,
                "cleaned": cleaned,
            }),
            _ => serde_json::json!({ "error": self.0.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Route handlers
// ============================================================================

async fn health() -> &'static str {
    "ok"
}

/// POST /badges/check-unlock -- run the full badge evaluation for the
/// session user.
async fn check_unlock(
    State(state): State<AppState>,
    session: SessionUser,
) -> Result<Json<CheckUnlockResponse>, ApiError> {
    let outcome = state.evaluator.evaluate(&session.0).await?;
    Ok(Json(CheckUnlockResponse {
        success: true,
        debug: DebugCounts {
            total_badges: outcome.total_badges,
            already_unlocked: outcome.already_unlocked,
            evaluated: outcome.evaluated,
        },
        newly_unlocked: outcome.newly_unlocked,
        stats: outcome.stats,
    }))
}

/// POST /recap/recap -- phase 1: find the window, return the existing recap
/// or the gathered summaries.
async fn recap_prepare(
    State(state): State<AppState>,
    session: SessionUser,
) -> Result<Json<RecapPrepareResponse>, ApiError> {
    let response = match state.pipeline.prepare(&session.0).await? {
        PrepareOutcome::Existing { recap, range } => RecapPrepareResponse {
            existing_recap: true,
            date_range: range.into(),
            recap_data: Some(recap),
            analysis_data: None,
            has_entries: None,
        },
        PrepareOutcome::Ready { range, analysis } => RecapPrepareResponse {
            existing_recap: false,
            date_range: range.into(),
            recap_data: None,
            analysis_data: Some(analysis),
            has_entries: Some(true),
        },
        PrepareOutcome::NoEntries { range } => RecapPrepareResponse {
            existing_recap: false,
            date_range: range.into(),
            recap_data: None,
            analysis_data: None,
            has_entries: Some(false),
        },
    };
    Ok(Json(response))
}

/// POST /recap/recap-analyzer -- phase 2: synthesize and persist the recap.
async fn recap_analyze(
    State(state): State<AppState>,
    Json(request): Json<RecapAnalyzerRequest>,
) -> Result<Json<RecapAnalyzerResponse>, ApiError> {
    if request.user_uid.trim().is_empty() {
        return Err(ApiError(InsightError::Validation(
            "user_uid is required".to_string(),
        )));
    }
    let range = request.date_range.into_range();
    if range.start > range.end {
        return Err(ApiError(InsightError::Validation(
            "date_range start must not be after end".to_string(),
        )));
    }

    let outcome = state
        .pipeline
        .analyze(&request.user_uid, request.data.as_deref(), range)
        .await?;
    let response = match outcome {
        AnalyzeOutcome::NoEntries => RecapAnalyzerResponse::no_entries(),
        AnalyzeOutcome::AlreadyExists(recap) => RecapAnalyzerResponse::skipped(recap),
        AnalyzeOutcome::Created { recap, analysis } => {
            RecapAnalyzerResponse::created(recap, analysis, request.date_range)
        }
    };
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_endpoint() {
        let result = health().await;
        assert_eq!(result, "ok");
    }

    #[test]
    fn validation_maps_to_400() {
        let response =
            ApiError(InsightError::Validation("missing field".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn llm_errors_map_to_502() {
        let response = ApiError(InsightError::Llm("upstream down".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn timeouts_map_to_500() {
        let response = ApiError(InsightError::StatsTimeout).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
