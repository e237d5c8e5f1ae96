//! medic-api — REST API for Medic.
//!
//! Exposes the current problem list and lets operators inspect or run
//! individual problem checks.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/v1/problems` | Current problems (realtime + broken scheduled checks) |
//! | GET | `/api/v1/checks` | All checks with definition, tracker, and health |
//! | GET | `/api/v1/checks/{identifier}` | One check |
//! | POST | `/api/v1/checks/{identifier}/run` | Run a check now (optional JSON data body) |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use medic_core::CheckRunner;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub runner: Arc<CheckRunner>,
}

/// Build the complete API router.
pub fn build_router(runner: Arc<CheckRunner>) -> Router {
    let api_state = ApiState { runner };

    let api_routes = Router::new()
        .route("/problems", get(handlers::list_problems))
        .route("/checks", get(handlers::list_checks))
        .route("/checks/{identifier}", get(handlers::get_check))
        .route("/checks/{identifier}/run", post(handlers::run_check))
        .with_state(api_state);

    Router::new().nest("/api/v1", api_routes)
}
