pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::interview::handlers;
use crate::interview::media::MAX_MEDIA_BYTES;
use crate::state::AppState;

/// Multipart framing on top of the media payload itself.
const MEDIA_BODY_OVERHEAD: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Interviews
        .route(
            "/api/v1/interviews",
            post(handlers::handle_create_interview).get(handlers::handle_list_interviews),
        )
        .route(
            "/api/v1/interviews/:id",
            get(handlers::handle_get_interview).delete(handlers::handle_delete_interview),
        )
        .route(
            "/api/v1/interviews/:id/questions",
            get(handlers::handle_list_questions),
        )
        .route(
            "/api/v1/interviews/:id/results",
            get(handlers::handle_get_results),
        )
        .route(
            "/api/v1/interviews/:id/report",
            get(handlers::handle_get_report),
        )
        .route(
            "/api/v1/interviews/:id/session",
            get(handlers::handle_get_session),
        )
        // Questions & answers
        .route(
            "/api/v1/questions/:id/follow-ups",
            post(handlers::handle_request_follow_up),
        )
        .route("/api/v1/answers", post(handlers::handle_submit_answer))
        .route(
            "/api/v1/answers/media",
            post(handlers::handle_upload_media)
                .layer(DefaultBodyLimit::max(MAX_MEDIA_BYTES + MEDIA_BODY_OVERHEAD)),
        )
        .with_state(state)
}
