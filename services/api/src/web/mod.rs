pub mod applications;
pub mod auth;
pub mod middleware;
pub mod requests;
pub mod rest;
pub mod sessions;
pub mod state;
pub mod token;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use state::AppState;

/// Builds the API router: public auth endpoints plus the bearer-token
/// protected surface. The binary layers CORS and Swagger UI on top; tests
/// drive this router directly.
pub fn router(app_state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/api/auth/signup", post(auth::signup_handler))
        .route("/api/auth/login", post(auth::login_handler));

    let protected_routes = Router::new()
        .route("/api/auth/profile", get(auth::profile_handler))
        .route("/api/auth/all-users", get(auth::all_users_handler))
        .route("/api/tutor/apply-tutor", post(applications::apply_tutor_handler))
        .route(
            "/api/tutor/approve-tutor/{user_id}",
            post(applications::approve_tutor_handler),
        )
        .route(
            "/api/tutor/deny-tutor/{user_id}",
            post(applications::deny_tutor_handler),
        )
        .route(
            "/api/tutor/pending-applications",
            get(applications::pending_applications_handler),
        )
        .route(
            "/api/tutor/application-status",
            get(applications::application_status_handler),
        )
        .route(
            "/api/tutor/available-tutors",
            get(applications::available_tutors_handler),
        )
        .route("/api/tutor/create-request", post(requests::create_request_handler))
        .route("/api/tutor/requests", get(requests::open_requests_handler))
        .route("/api/tutor/my-requests", get(requests::my_requests_handler))
        .route("/api/tutor/accept-request", post(requests::accept_request_handler))
        .route("/api/tutor/sessions", get(sessions::tutor_sessions_handler))
        .route("/api/tutor/student-sessions", get(sessions::student_sessions_handler))
        .route("/api/tutor/complete-session", post(sessions::complete_session_handler))
        .route("/api/tutor/stats", get(sessions::stats_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(app_state)
}
