//! services/api/src/web/rest.rs
//!
//! Shared wire-format projections for the REST API and the master definition
//! for the OpenAPI specification. Projections never include credential
//! fields.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use tutoring_core::domain::{Session, TutoringRequest, User};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::signup_handler,
        crate::web::auth::login_handler,
        crate::web::auth::profile_handler,
        crate::web::auth::all_users_handler,
        crate::web::applications::apply_tutor_handler,
        crate::web::applications::approve_tutor_handler,
        crate::web::applications::deny_tutor_handler,
        crate::web::applications::pending_applications_handler,
        crate::web::applications::application_status_handler,
        crate::web::applications::available_tutors_handler,
        crate::web::requests::create_request_handler,
        crate::web::requests::open_requests_handler,
        crate::web::requests::my_requests_handler,
        crate::web::requests::accept_request_handler,
        crate::web::sessions::tutor_sessions_handler,
        crate::web::sessions::student_sessions_handler,
        crate::web::sessions::complete_session_handler,
        crate::web::sessions::stats_handler,
    ),
    components(
        schemas(UserResponse, ApplicationResponse, RequestResponse, SessionResponse, SessionRefResponse, TutorSummaryResponse)
    ),
    tags(
        (name = "Tutoring API", description = "Tutoring marketplace: accounts, tutor onboarding, requests, and sessions.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Projections
//=========================================================================================

/// The public projection of a user record.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub user_type: String,
    pub grade: Option<String>,
    pub interests: Vec<String>,
    pub application_status: String,
    pub subjects: Vec<String>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            user_type: user.role.as_str().to_string(),
            grade: user.grade.clone(),
            interests: user.interests.clone(),
            application_status: user.application.status.as_str().to_string(),
            subjects: user.profile.subjects.clone(),
        }
    }
}

/// A user's tutor-application sub-record with its profile snapshot.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationResponse {
    pub status: String,
    pub applied_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub denied_at: Option<DateTime<Utc>>,
    pub denial_reason: Option<String>,
    pub subjects: Vec<String>,
    pub bio: Option<String>,
    pub availability: Option<String>,
}

impl From<&User> for ApplicationResponse {
    fn from(user: &User) -> Self {
        Self {
            status: user.application.status.as_str().to_string(),
            applied_at: user.application.applied_at,
            approved_at: user.application.approved_at,
            denied_at: user.application.denied_at,
            denial_reason: user.application.denial_reason.clone(),
            subjects: user.profile.subjects.clone(),
            bio: user.profile.bio.clone(),
            availability: user.profile.availability.clone(),
        }
    }
}

/// An approved tutor as shown on the student-facing browse page.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TutorSummaryResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub subjects: Vec<String>,
    pub bio: Option<String>,
    pub availability: Option<String>,
}

impl From<&User> for TutorSummaryResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            subjects: user.profile.subjects.clone(),
            bio: user.profile.bio.clone(),
            availability: user.profile.availability.clone(),
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestResponse {
    pub id: Uuid,
    pub student_id: Uuid,
    pub subject: String,
    pub description: String,
    pub priority: String,
    pub requested_time: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub tutor_id: Option<Uuid>,
}

impl From<&TutoringRequest> for RequestResponse {
    fn from(request: &TutoringRequest) -> Self {
        Self {
            id: request.id,
            student_id: request.student_id,
            subject: request.subject.clone(),
            description: request.description.clone(),
            priority: request.priority.as_str().to_string(),
            requested_time: request.requested_duration.clone(),
            status: request.status.as_str().to_string(),
            created_at: request.created_at,
            accepted_at: request.accepted_at,
            tutor_id: request.tutor_id,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id: Uuid,
    pub request_id: Uuid,
    pub tutor_id: Uuid,
    pub student_id: Uuid,
    pub subject: String,
    pub scheduled_time: DateTime<Utc>,
    pub status: String,
    pub meeting_id: String,
    pub meeting_password: String,
    pub meeting_link: String,
    pub hours_spent: Option<f64>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Session> for SessionResponse {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id,
            request_id: session.request_id,
            tutor_id: session.tutor_id,
            student_id: session.student_id,
            subject: session.subject.clone(),
            scheduled_time: session.scheduled_time,
            status: session.status.as_str().to_string(),
            meeting_id: session.meeting.meeting_id.clone(),
            meeting_password: session.meeting.password.clone(),
            meeting_link: session.meeting.link.clone(),
            hours_spent: session.hours_spent,
            completed_at: session.completed_at,
        }
    }
}

/// The meeting reference returned to the accepting tutor.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionRefResponse {
    pub session_id: Uuid,
    pub meeting_id: String,
    pub meeting_password: String,
    pub meeting_link: String,
    pub scheduled_time: DateTime<Utc>,
}

impl From<&Session> for SessionRefResponse {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.id,
            meeting_id: session.meeting.meeting_id.clone(),
            meeting_password: session.meeting.password.clone(),
            meeting_link: session.meeting.link.clone(),
            scheduled_time: session.scheduled_time,
        }
    }
}
