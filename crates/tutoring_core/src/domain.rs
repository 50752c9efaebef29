//! crates/tutoring_core/src/domain.rs
//!
//! Defines the pure, core data structures for the tutoring marketplace.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

//=========================================================================================
// Enumerated States
//=========================================================================================

/// The role a user holds. Transitions only student -> tutor, and only via an
/// approved application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Student,
    Tutor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Tutor => "tutor",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "student" => Some(Role::Student),
            "tutor" => Some(Role::Tutor),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Where a user's tutor application stands.
///
/// pending -> approved | denied; a denied applicant may re-apply
/// (denied -> pending).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationStatus {
    NotApplied,
    Pending,
    Approved,
    Denied,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::NotApplied => "not_applied",
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Denied => "denied",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "not_applied" => Some(ApplicationStatus::NotApplied),
            "pending" => Some(ApplicationStatus::Pending),
            "approved" => Some(ApplicationStatus::Approved),
            "denied" => Some(ApplicationStatus::Denied),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

/// Lifecycle of a tutoring request. pending -> accepted -> completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    Accepted,
    Completed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "accepted" => Some(RequestStatus::Accepted),
            "completed" => Some(RequestStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Scheduled,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(SessionStatus::Scheduled),
            "completed" => Some(SessionStatus::Completed),
            _ => None,
        }
    }
}

//=========================================================================================
// Users and Applications
//=========================================================================================

/// The subject/bio/availability snapshot a tutor applicant provides.
#[derive(Debug, Clone, Default)]
pub struct TutorProfile {
    pub subjects: Vec<String>,
    pub bio: Option<String>,
    pub availability: Option<String>,
}

/// The tutor-application sub-record embedded on a user.
#[derive(Debug, Clone)]
pub struct TutorApplication {
    pub status: ApplicationStatus,
    pub applied_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub denied_at: Option<DateTime<Utc>>,
    pub denial_reason: Option<String>,
}

impl Default for TutorApplication {
    fn default() -> Self {
        Self {
            status: ApplicationStatus::NotApplied,
            applied_at: None,
            approved_at: None,
            denied_at: None,
            denial_reason: None,
        }
    }
}

/// A user of the marketplace. The root aggregate: applications are embedded,
/// requests and sessions reference users by id.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub grade: Option<String>,
    pub interests: Vec<String>,
    pub application: TutorApplication,
    pub profile: TutorProfile,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// A tutor may only work the queue once their application is approved.
    pub fn is_approved_tutor(&self) -> bool {
        self.role == Role::Tutor && self.application.status == ApplicationStatus::Approved
    }
}

// Only used internally for login - contains sensitive data.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

/// Everything needed to create a user record. If `tutor_profile` is set the
/// account is still stored with role student, but with a pending application
/// attached.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub grade: Option<String>,
    pub interests: Vec<String>,
    pub tutor_profile: Option<TutorProfile>,
}

//=========================================================================================
// Requests and Sessions
//=========================================================================================

/// A student's open ask for help in a subject, awaiting a tutor.
#[derive(Debug, Clone)]
pub struct TutoringRequest {
    pub id: Uuid,
    pub student_id: Uuid,
    pub subject: String,
    pub description: String,
    pub priority: Priority,
    pub requested_duration: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub tutor_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewRequest {
    pub student_id: Uuid,
    pub subject: String,
    pub description: String,
    pub priority: Priority,
    pub requested_duration: String,
}

/// A generated identifier/link standing in for a real video-conferencing
/// booking.
#[derive(Debug, Clone)]
pub struct MeetingReference {
    pub meeting_id: String,
    pub password: String,
    pub link: String,
}

/// A scheduled or completed meeting created from an accepted request.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub request_id: Uuid,
    pub tutor_id: Uuid,
    pub student_id: Uuid,
    pub subject: String,
    pub scheduled_time: DateTime<Utc>,
    pub status: SessionStatus,
    pub meeting: MeetingReference,
    pub hours_spent: Option<f64>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Aggregates
//=========================================================================================

#[derive(Debug, Clone)]
pub struct TutorStats {
    pub sessions_completed: i64,
    pub total_hours: f64,
    /// Placeholder until a real rating system exists.
    pub rating: f64,
}

#[derive(Debug, Clone)]
pub struct StudentStats {
    pub requests_made: i64,
    pub sessions_completed: i64,
    pub hours_learned: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_round_trip() {
        for status in [
            ApplicationStatus::NotApplied,
            ApplicationStatus::Pending,
            ApplicationStatus::Approved,
            ApplicationStatus::Denied,
        ] {
            assert_eq!(ApplicationStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RequestStatus::parse("accepted"), Some(RequestStatus::Accepted));
        assert_eq!(Role::parse("superuser"), None);
    }

    #[test]
    fn approved_tutor_requires_both_role_and_status() {
        let mut user = User {
            id: Uuid::new_v4(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            role: Role::Student,
            grade: None,
            interests: vec![],
            application: TutorApplication {
                status: ApplicationStatus::Pending,
                applied_at: Some(Utc::now()),
                ..Default::default()
            },
            profile: TutorProfile::default(),
            created_at: Utc::now(),
        };
        assert!(!user.is_approved_tutor());

        user.role = Role::Tutor;
        user.application.status = ApplicationStatus::Approved;
        assert!(user.is_approved_tutor());
    }
}
