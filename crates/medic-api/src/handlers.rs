//! REST API handlers.
//!
//! Each handler goes through the shared `CheckRunner` and returns JSON
//! responses in a `{ success, data, error }` envelope.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use tracing::{info, warn};

use medic_core::{CheckData, CheckError, HealthState, Priority, RegisteredCheck};
use medic_state::CheckTracker;

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

fn check_error_status(err: &CheckError) -> StatusCode {
    match err {
        CheckError::NotFound(_) => StatusCode::NOT_FOUND,
        CheckError::InvalidData { .. } => StatusCode::BAD_REQUEST,
        CheckError::Execution { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        CheckError::DuplicateCheck(_) | CheckError::Locale(_) | CheckError::State(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn check_error_response(err: &CheckError) -> axum::response::Response {
    error_response(&err.to_string(), check_error_status(err)).into_response()
}

/// A check's definition, tracker, and derived health.
#[derive(Debug, Serialize)]
pub struct CheckView {
    pub identifier: String,
    pub priority: Priority,
    pub scheduled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perform_every_secs: Option<u64>,
    pub max_retries: u32,
    pub retry_after_secs: u64,
    pub health: HealthState,
    /// Present once the check has run at least once as a scheduled check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracker: Option<CheckTracker>,
}

fn check_view(state: &ApiState, registered: &RegisteredCheck) -> Result<CheckView, CheckError> {
    let definition = registered.definition();
    let tracker = state.runner.store().get(registered.identifier())?;
    let health = match &tracker {
        Some(t) if definition.is_scheduled() => definition.health_state(t.blips),
        _ => HealthState::Healthy,
    };

    Ok(CheckView {
        identifier: definition.identifier().to_string(),
        priority: definition.priority(),
        scheduled: definition.is_scheduled(),
        perform_every_secs: definition.perform_every().map(|d| d.as_secs()),
        max_retries: definition.max_retries(),
        retry_after_secs: definition.retry_after().as_secs(),
        health,
        tracker,
    })
}

// ── Problems ───────────────────────────────────────────────────

/// GET /api/v1/problems
pub async fn list_problems(State(state): State<ApiState>) -> impl IntoResponse {
    match medic_core::collect_problems(&state.runner).await {
        Ok(problems) => ApiResponse::ok(problems).into_response(),
        Err(e) => check_error_response(&e),
    }
}

// ── Checks ─────────────────────────────────────────────────────

/// GET /api/v1/checks
pub async fn list_checks(State(state): State<ApiState>) -> impl IntoResponse {
    let views: Result<Vec<_>, _> = state
        .runner
        .registry()
        .all()
        .map(|registered| check_view(&state, registered))
        .collect();

    match views {
        Ok(views) => ApiResponse::ok(views).into_response(),
        Err(e) => check_error_response(&e),
    }
}

/// GET /api/v1/checks/{identifier}
pub async fn get_check(
    State(state): State<ApiState>,
    Path(identifier): Path<String>,
) -> impl IntoResponse {
    let view = state
        .runner
        .registry()
        .lookup(&identifier)
        .and_then(|registered| check_view(&state, registered));

    match view {
        Ok(view) => ApiResponse::ok(view).into_response(),
        Err(e) => check_error_response(&e),
    }
}

/// POST /api/v1/checks/{identifier}/run
///
/// The body, if any, must be a JSON object of scalar values; it is layered
/// over the check's configured data.
pub async fn run_check(
    State(state): State<ApiState>,
    Path(identifier): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    let data = match parse_data(&body) {
        Ok(data) => data,
        Err(e) => return check_error_response(&e),
    };

    match state.runner.invoke(&identifier, &data).await {
        Ok(problems) => {
            info!(%identifier, problems = problems.len(), "problem check run on demand");
            ApiResponse::ok(problems).into_response()
        }
        Err(e) => {
            warn!(%identifier, error = %e, "on-demand problem check failed");
            check_error_response(&e)
        }
    }
}

fn parse_data(body: &[u8]) -> Result<CheckData, CheckError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(CheckData::new());
    }
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| CheckError::InvalidData {
            key: String::new(),
            reason: e.to_string(),
        })?;
    CheckData::try_from(value)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use medic_core::{
        Catalog, Check, CheckConfig, CheckContext, CheckFuture, CheckRegistry, CheckRunner,
    };
    use medic_state::TrackerStore;

    use super::*;

    struct TwitterLogin;

    impl Check for TwitterLogin {
        fn name(&self) -> &'static str {
            "TwitterLogin"
        }

        fn config(&self) -> CheckConfig {
            CheckConfig::default()
                .priority(Priority::High)
                .perform_every(Duration::from_secs(3600))
                .max_retries(1)
        }

        fn translation_key(&self) -> &str {
            "problem_check.twitter_login"
        }

        fn call<'a>(&'a self, ctx: &'a CheckContext<'a>) -> CheckFuture<'a> {
            Box::pin(async move {
                match ctx.data().text("status")? {
                    "down" => Ok(ctx.problem()),
                    "error" => anyhow::bail!("provider timed out"),
                    _ => Ok(ctx.no_problem()),
                }
            })
        }
    }

    fn test_state() -> ApiState {
        let mut registry = CheckRegistry::new();
        registry
            .register_with(
                TwitterLogin,
                &Default::default(),
                CheckData::new().with("status", "up"),
            )
            .unwrap();

        let mut catalog = Catalog::empty();
        catalog.insert("problem_check.twitter_login", "Twitter login is failing.");

        let runner = CheckRunner::new(
            Arc::new(registry),
            TrackerStore::open_in_memory().unwrap(),
            Arc::new(catalog),
        );
        ApiState {
            runner: Arc::new(runner),
        }
    }

    async fn run(state: &ApiState, body: &str) -> StatusCode {
        run_check(
            State(state.clone()),
            Path("twitter_login".to_string()),
            Bytes::from(body.to_string()),
        )
        .await
        .into_response()
        .status()
    }

    #[tokio::test]
    async fn list_problems_empty() {
        let resp = list_problems(State(test_state())).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn list_checks_ok() {
        let resp = list_checks(State(test_state())).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn get_unknown_check_is_404() {
        let resp = get_check(State(test_state()), Path("facebook_login".to_string()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn run_without_body_uses_defaults() {
        let state = test_state();
        assert_eq!(run(&state, "").await, StatusCode::OK);

        let tracker = state.runner.store().get("twitter_login").unwrap().unwrap();
        assert_eq!(tracker.blips, 0);
    }

    #[tokio::test]
    async fn run_with_problem_marks_tracker() {
        let state = test_state();
        assert_eq!(run(&state, r#"{"status": "down"}"#).await, StatusCode::OK);

        let registered = state.runner.registry().lookup("twitter_login").unwrap();
        let view = check_view(&state, registered).unwrap();
        assert_eq!(view.health, HealthState::Broken);
        assert_eq!(view.tracker.unwrap().blips, 1);
    }

    #[tokio::test]
    async fn run_with_error_is_422_and_recorded() {
        let state = test_state();
        assert_eq!(
            run(&state, r#"{"status": "error"}"#).await,
            StatusCode::UNPROCESSABLE_ENTITY
        );
        let tracker = state.runner.store().get("twitter_login").unwrap().unwrap();
        assert_eq!(tracker.blips, 1);
    }

    #[tokio::test]
    async fn run_with_bad_data_is_400() {
        let state = test_state();
        assert_eq!(run(&state, "not json").await, StatusCode::BAD_REQUEST);
        assert_eq!(run(&state, r#"{"status": ["a"]}"#).await, StatusCode::BAD_REQUEST);
        assert_eq!(run(&state, r#"{"status": 5}"#).await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rejected_data_does_not_touch_tracker() {
        let state = test_state();
        assert_eq!(run(&state, r#"{"status": 5}"#).await, StatusCode::BAD_REQUEST);

        assert!(state.runner.store().get("twitter_login").unwrap().is_none());
        let problems = medic_core::collect_problems(&state.runner).await.unwrap();
        assert!(problems.is_empty());
    }

    #[tokio::test]
    async fn run_unknown_check_is_404() {
        let resp = run_check(
            State(test_state()),
            Path("facebook_login".to_string()),
            Bytes::new(),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
