//! crates/tutoring_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of the concrete database and mail implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    MeetingReference, NewRequest, NewUser, Session, StudentStats, TutorProfile, TutorStats,
    TutoringRequest, User, UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Database Port
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Account directory ---

    /// Creates a user record. Fails with `Conflict` if the email is already
    /// on file. A `tutor_profile` on the input attaches a pending application
    /// but the stored role is still student.
    async fn create_user(&self, new_user: NewUser) -> PortResult<User>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    /// Every account, for the admin directory view.
    async fn list_all_users(&self) -> PortResult<Vec<User>>;

    // --- Application workflow ---

    /// Moves the caller's application to pending with the given snapshot.
    /// Fails with `Conflict` if an application is already pending or already
    /// approved. A denied applicant may re-apply.
    async fn submit_application(&self, user_id: Uuid, profile: TutorProfile) -> PortResult<User>;

    /// pending -> approved; also flips the user's role to tutor. Fails with
    /// `Conflict` unless the application is currently pending.
    async fn approve_application(&self, user_id: Uuid) -> PortResult<User>;

    /// pending -> denied, recording the optional reason. Role stays student.
    async fn deny_application(&self, user_id: Uuid, reason: Option<&str>) -> PortResult<User>;

    async fn list_pending_applications(&self) -> PortResult<Vec<User>>;

    /// Approved tutors with their profile snapshots, for the student-facing
    /// browse view.
    async fn list_approved_tutors(&self) -> PortResult<Vec<User>>;

    // --- Request queue ---

    async fn create_request(&self, new_request: NewRequest) -> PortResult<TutoringRequest>;

    /// All pending requests whose subject is in `subjects`, newest first.
    async fn list_open_requests(&self, subjects: &[String]) -> PortResult<Vec<TutoringRequest>>;

    async fn list_requests_by_student(&self, student_id: Uuid)
        -> PortResult<Vec<TutoringRequest>>;

    /// Atomically accepts a pending request and creates its paired session in
    /// one transaction. The status check and transition are a single
    /// conditional update, so of two concurrent callers at most one wins; the
    /// loser gets `NotFound` (the request is no longer available to them).
    async fn accept_request(
        &self,
        request_id: Uuid,
        tutor_id: Uuid,
        meeting: MeetingReference,
        scheduled_time: DateTime<Utc>,
    ) -> PortResult<(TutoringRequest, Session)>;

    // --- Session ledger ---

    /// All of a tutor's sessions, any status; the caller filters.
    async fn list_sessions_for_tutor(&self, tutor_id: Uuid) -> PortResult<Vec<Session>>;

    async fn list_sessions_for_student(&self, student_id: Uuid) -> PortResult<Vec<Session>>;

    /// scheduled -> completed, logging the hours and mirroring the terminal
    /// state onto the paired request. Fails with `NotFound` for an unknown
    /// session, `Unauthorized` if the caller is not the session's tutor, and
    /// `Conflict` if the session is already completed (hours are never
    /// double-counted).
    async fn complete_session(
        &self,
        session_id: Uuid,
        tutor_id: Uuid,
        hours_spent: f64,
    ) -> PortResult<Session>;

    // --- Aggregates ---

    async fn tutor_stats(&self, tutor_id: Uuid) -> PortResult<TutorStats>;

    async fn student_stats(&self, student_id: Uuid) -> PortResult<StudentStats>;
}

//=========================================================================================
// Mail Port
//=========================================================================================

/// A rendered outbound email.
#[derive(Debug, Clone)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait MailService: Send + Sync {
    /// Delivers one email. Best-effort; callers decide whether to retry.
    async fn send(&self, mail: &Email) -> PortResult<()>;
}
