pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;
use crate::survey::handlers;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/reference", get(handlers::handle_reference))
        // Survey API
        .route("/api/v1/surveys", post(handlers::handle_create_survey))
        .route(
            "/api/v1/surveys/:id",
            get(handlers::handle_get_survey).delete(handlers::handle_delete_survey),
        )
        .route("/api/v1/surveys/:id/start", post(handlers::handle_start))
        .route("/api/v1/surveys/:id/intake", post(handlers::handle_intake))
        .route("/api/v1/surveys/:id/answers", post(handlers::handle_answer))
        .route("/api/v1/surveys/:id/back", post(handlers::handle_back))
        .route("/api/v1/surveys/:id/reset", post(handlers::handle_reset))
        .with_state(state)
}
