//! services/api/src/web/requests.rs
//!
//! Request-queue endpoints: students open requests, approved tutors browse
//! the queue in their subjects and accept. Accepting is atomic with session
//! creation, so two tutors can never both win the same request.

use axum::{
    extract::State,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::notifier::Notification;
use crate::web::middleware::{current_user, require_approved_tutor, require_student, AuthUser};
use crate::web::rest::{RequestResponse, SessionRefResponse};
use crate::web::state::AppState;
use tutoring_core::domain::{MeetingReference, NewRequest, Priority};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequestBody {
    pub subject: String,
    #[serde(default)]
    pub description: String,
    pub priority: Option<String>,
    pub requested_time: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcceptRequestBody {
    pub request_id: Uuid,
}

#[derive(Serialize, ToSchema)]
pub struct RequestCreatedResponse {
    pub success: bool,
    pub request: RequestResponse,
}

#[derive(Serialize, ToSchema)]
pub struct RequestListResponse {
    pub success: bool,
    pub requests: Vec<RequestResponse>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestAcceptedResponse {
    pub success: bool,
    pub session_ref: SessionRefResponse,
    pub tutor_email: String,
}

//=========================================================================================
// Meeting reference generation
//=========================================================================================

/// A random 9-digit meeting id plus a 6-character password, standing in for
/// a real video-conferencing booking.
fn generate_meeting_reference(base_url: &str) -> MeetingReference {
    let mut rng = rand::thread_rng();
    let meeting_id = rng.gen_range(100_000_000u64..1_000_000_000).to_string();
    let password: String = (&mut rng)
        .sample_iter(Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    let link = format!("{}/{}?pwd={}", base_url.trim_end_matches('/'), meeting_id, password);
    MeetingReference {
        meeting_id,
        password,
        link,
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/tutor/create-request - A student opens a tutoring request.
#[utoipa::path(
    post,
    path = "/api/tutor/create-request",
    request_body = CreateRequestBody,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Request created", body = RequestCreatedResponse),
        (status = 400, description = "Missing subject or duration"),
        (status = 403, description = "Caller is not a student")
    )
)]
pub async fn create_request_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    let student = current_user(&state, &auth).await?;
    require_student(&student)?;

    if body.subject.trim().is_empty() || body.requested_time.trim().is_empty() {
        return Err(ApiError::Validation("Subject and duration required".to_string()));
    }

    let priority = match body.priority.as_deref() {
        None | Some("") => Priority::Medium,
        Some(p) => Priority::parse(p)
            .ok_or_else(|| ApiError::Validation(format!("Invalid priority '{}'", p)))?,
    };

    let request = state
        .db
        .create_request(NewRequest {
            student_id: student.id,
            subject: body.subject.trim().to_string(),
            description: body.description,
            priority,
            requested_duration: body.requested_time.trim().to_string(),
        })
        .await?;

    state.notifier.notify(Notification::RequestCreated {
        student,
        request: request.clone(),
    });

    Ok((
        axum::http::StatusCode::CREATED,
        Json(RequestCreatedResponse {
            success: true,
            request: RequestResponse::from(&request),
        }),
    ))
}

/// GET /api/tutor/requests - The open queue, filtered to the tutor's
/// subjects, newest first.
#[utoipa::path(
    get,
    path = "/api/tutor/requests",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Open requests in the tutor's subjects", body = RequestListResponse),
        (status = 403, description = "Caller is not an approved tutor")
    )
)]
pub async fn open_requests_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let tutor = current_user(&state, &auth).await?;
    require_approved_tutor(&tutor)?;

    let requests = state.db.list_open_requests(&tutor.profile.subjects).await?;

    Ok(Json(RequestListResponse {
        success: true,
        requests: requests.iter().map(RequestResponse::from).collect(),
    }))
}

/// GET /api/tutor/my-requests - All of the student's own requests.
#[utoipa::path(
    get,
    path = "/api/tutor/my-requests",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The student's requests", body = RequestListResponse),
        (status = 403, description = "Caller is not a student")
    )
)]
pub async fn my_requests_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let student = current_user(&state, &auth).await?;
    require_student(&student)?;

    let requests = state.db.list_requests_by_student(student.id).await?;

    Ok(Json(RequestListResponse {
        success: true,
        requests: requests.iter().map(RequestResponse::from).collect(),
    }))
}

/// POST /api/tutor/accept-request - An approved tutor claims a pending
/// request; the paired session is created in the same transaction.
#[utoipa::path(
    post,
    path = "/api/tutor/accept-request",
    request_body = AcceptRequestBody,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Request accepted, session scheduled", body = RequestAcceptedResponse),
        (status = 403, description = "Caller is not an approved tutor"),
        (status = 404, description = "Request missing or already accepted")
    )
)]
pub async fn accept_request_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<AcceptRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    let tutor = current_user(&state, &auth).await?;
    require_approved_tutor(&tutor)?;

    let meeting = generate_meeting_reference(&state.config.meeting_base_url);
    // Placeholder scheduling policy: 24 hours out, no availability
    // negotiation.
    let scheduled_time = Utc::now() + Duration::hours(24);

    let (request, session) = state
        .db
        .accept_request(body.request_id, tutor.id, meeting, scheduled_time)
        .await?;

    let student = state.db.get_user_by_id(request.student_id).await?;
    state.notifier.notify(Notification::RequestAccepted {
        student,
        tutor: tutor.clone(),
        session: session.clone(),
    });

    Ok(Json(RequestAcceptedResponse {
        success: true,
        session_ref: SessionRefResponse::from(&session),
        tutor_email: tutor.email,
    }))
}
