//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete
//! implementation of the `DatabaseService` port from the `core` crate. It
//! handles all interactions with the PostgreSQL database using `sqlx`.
//!
//! The state-machine transitions (accept a request, complete a session,
//! decide an application) are all single conditional UPDATEs, so concurrent
//! callers cannot both win the same transition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use tutoring_core::domain::{
    ApplicationStatus, MeetingReference, NewRequest, NewUser, Priority, RequestStatus, Role,
    Session, SessionStatus, StudentStats, TutorApplication, TutorProfile, TutorStats,
    TutoringRequest, User, UserCredentials,
};
use tutoring_core::ports::{DatabaseService, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Postgres error code for unique-constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION)
    )
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    role: String,
    grade: Option<String>,
    interests: Vec<String>,
    application_status: String,
    applied_at: Option<DateTime<Utc>>,
    approved_at: Option<DateTime<Utc>>,
    denied_at: Option<DateTime<Utc>>,
    denial_reason: Option<String>,
    subjects: Vec<String>,
    bio: Option<String>,
    availability: Option<String>,
    created_at: DateTime<Utc>,
}

/// The user columns every user query selects.
const USER_COLUMNS: &str = "id, first_name, last_name, email, role, grade, interests, \
     application_status, applied_at, approved_at, denied_at, denial_reason, \
     subjects, bio, availability, created_at";

impl UserRecord {
    fn to_domain(self) -> PortResult<User> {
        let role = Role::parse(&self.role)
            .ok_or_else(|| PortError::Unexpected(format!("bad role '{}'", self.role)))?;
        let status = ApplicationStatus::parse(&self.application_status).ok_or_else(|| {
            PortError::Unexpected(format!("bad application status '{}'", self.application_status))
        })?;
        Ok(User {
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            role,
            grade: self.grade,
            interests: self.interests,
            application: TutorApplication {
                status,
                applied_at: self.applied_at,
                approved_at: self.approved_at,
                denied_at: self.denied_at,
                denial_reason: self.denial_reason,
            },
            profile: TutorProfile {
                subjects: self.subjects,
                bio: self.bio,
                availability: self.availability,
            },
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct RequestRecord {
    id: Uuid,
    student_id: Uuid,
    subject: String,
    description: String,
    priority: String,
    requested_duration: String,
    status: String,
    created_at: DateTime<Utc>,
    accepted_at: Option<DateTime<Utc>>,
    tutor_id: Option<Uuid>,
}

const REQUEST_COLUMNS: &str = "id, student_id, subject, description, priority, \
     requested_duration, status, created_at, accepted_at, tutor_id";

impl RequestRecord {
    fn to_domain(self) -> PortResult<TutoringRequest> {
        let priority = Priority::parse(&self.priority)
            .ok_or_else(|| PortError::Unexpected(format!("bad priority '{}'", self.priority)))?;
        let status = RequestStatus::parse(&self.status)
            .ok_or_else(|| PortError::Unexpected(format!("bad request status '{}'", self.status)))?;
        Ok(TutoringRequest {
            id: self.id,
            student_id: self.student_id,
            subject: self.subject,
            description: self.description,
            priority,
            requested_duration: self.requested_duration,
            status,
            created_at: self.created_at,
            accepted_at: self.accepted_at,
            tutor_id: self.tutor_id,
        })
    }
}

#[derive(FromRow)]
struct SessionRecord {
    id: Uuid,
    request_id: Uuid,
    tutor_id: Uuid,
    student_id: Uuid,
    subject: String,
    scheduled_time: DateTime<Utc>,
    status: String,
    meeting_id: String,
    meeting_password: String,
    meeting_link: String,
    hours_spent: Option<f64>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

const SESSION_COLUMNS: &str = "id, request_id, tutor_id, student_id, subject, scheduled_time, \
     status, meeting_id, meeting_password, meeting_link, hours_spent, completed_at, created_at";

impl SessionRecord {
    fn to_domain(self) -> PortResult<Session> {
        let status = SessionStatus::parse(&self.status)
            .ok_or_else(|| PortError::Unexpected(format!("bad session status '{}'", self.status)))?;
        Ok(Session {
            id: self.id,
            request_id: self.request_id,
            tutor_id: self.tutor_id,
            student_id: self.student_id,
            subject: self.subject,
            scheduled_time: self.scheduled_time,
            status,
            meeting: MeetingReference {
                meeting_id: self.meeting_id,
                password: self.meeting_password,
                link: self.meeting_link,
            },
            hours_spent: self.hours_spent,
            completed_at: self.completed_at,
            created_at: self.created_at,
        })
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        let profile = new_user.tutor_profile.clone();
        let applying = profile.is_some();
        let profile = profile.unwrap_or_default();
        let applied_at = applying.then(Utc::now);

        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users \
             (id, first_name, last_name, email, password_hash, role, grade, interests, \
              application_status, applied_at, subjects, bio, availability) \
             VALUES ($1, $2, $3, $4, $5, 'student', $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.grade)
        .bind(&new_user.interests)
        .bind(if applying { "pending" } else { "not_applied" })
        .bind(applied_at)
        .bind(&profile.subjects)
        .bind(&profile.bio)
        .bind(&profile.availability)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                PortError::Conflict("Email already registered".to_string())
            } else {
                unexpected(e)
            }
        })?;

        record.to_domain()
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;

        record.to_domain()
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let row = sqlx::query_as::<_, (Uuid, String, String)>(
            "SELECT id, email, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("No account for {}", email)))?;

        Ok(UserCredentials {
            user_id: row.0,
            email: row.1,
            hashed_password: row.2,
        })
    }

    async fn list_all_users(&self) -> PortResult<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn submit_application(&self, user_id: Uuid, profile: TutorProfile) -> PortResult<User> {
        // A denied applicant may re-apply; pending and approved may not.
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "UPDATE users SET \
               application_status = 'pending', applied_at = $2, \
               denied_at = NULL, denial_reason = NULL, \
               subjects = CASE WHEN cardinality($3::text[]) > 0 THEN $3 ELSE subjects END, \
               bio = COALESCE($4, bio), \
               availability = COALESCE($5, availability) \
             WHERE id = $1 AND application_status IN ('not_applied', 'denied') \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(Utc::now())
        .bind(&profile.subjects)
        .bind(&profile.bio)
        .bind(&profile.availability)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        match record {
            Some(record) => record.to_domain(),
            None => {
                // Either the user does not exist or the transition is illegal.
                let user = self.get_user_by_id(user_id).await?;
                match user.application.status {
                    ApplicationStatus::Pending => {
                        Err(PortError::Conflict("Application already pending".to_string()))
                    }
                    _ => Err(PortError::Conflict("Already an approved tutor".to_string())),
                }
            }
        }
    }

    async fn approve_application(&self, user_id: Uuid) -> PortResult<User> {
        // Approval preserves the profile snapshot captured at application time.
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "UPDATE users SET \
               role = 'tutor', application_status = 'approved', approved_at = $2 \
             WHERE id = $1 AND application_status = 'pending' \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        match record {
            Some(record) => record.to_domain(),
            None => {
                self.get_user_by_id(user_id).await?;
                Err(PortError::Conflict("Application is not pending".to_string()))
            }
        }
    }

    async fn deny_application(&self, user_id: Uuid, reason: Option<&str>) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "UPDATE users SET \
               application_status = 'denied', denied_at = $2, denial_reason = $3 \
             WHERE id = $1 AND application_status = 'pending' \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(Utc::now())
        .bind(reason)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        match record {
            Some(record) => record.to_domain(),
            None => {
                self.get_user_by_id(user_id).await?;
                Err(PortError::Conflict("Application is not pending".to_string()))
            }
        }
    }

    async fn list_pending_applications(&self) -> PortResult<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE application_status = 'pending' ORDER BY applied_at ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn list_approved_tutors(&self) -> PortResult<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE role = 'tutor' AND application_status = 'approved' \
             ORDER BY last_name ASC, first_name ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn create_request(&self, new_request: NewRequest) -> PortResult<TutoringRequest> {
        let record = sqlx::query_as::<_, RequestRecord>(&format!(
            "INSERT INTO requests \
             (id, student_id, subject, description, priority, requested_duration, status) \
             VALUES ($1, $2, $3, $4, $5, $6, 'pending') \
             RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(new_request.student_id)
        .bind(&new_request.subject)
        .bind(&new_request.description)
        .bind(new_request.priority.as_str())
        .bind(&new_request.requested_duration)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        record.to_domain()
    }

    async fn list_open_requests(&self, subjects: &[String]) -> PortResult<Vec<TutoringRequest>> {
        let records = sqlx::query_as::<_, RequestRecord>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM requests \
             WHERE status = 'pending' AND subject = ANY($1) \
             ORDER BY created_at DESC"
        ))
        .bind(subjects)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn list_requests_by_student(
        &self,
        student_id: Uuid,
    ) -> PortResult<Vec<TutoringRequest>> {
        let records = sqlx::query_as::<_, RequestRecord>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM requests \
             WHERE student_id = $1 ORDER BY created_at DESC"
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn accept_request(
        &self,
        request_id: Uuid,
        tutor_id: Uuid,
        meeting: MeetingReference,
        scheduled_time: DateTime<Utc>,
    ) -> PortResult<(TutoringRequest, Session)> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        // The accept transition is a conditional update: of two concurrent
        // tutors, exactly one sees the row while it is still pending.
        let request = sqlx::query_as::<_, RequestRecord>(&format!(
            "UPDATE requests SET status = 'accepted', accepted_at = $2, tutor_id = $3 \
             WHERE id = $1 AND status = 'pending' \
             RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(request_id)
        .bind(Utc::now())
        .bind(tutor_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| {
            PortError::NotFound("Request is no longer available".to_string())
        })?
        .to_domain()?;

        let session = sqlx::query_as::<_, SessionRecord>(&format!(
            "INSERT INTO sessions \
             (id, request_id, tutor_id, student_id, subject, scheduled_time, status, \
              meeting_id, meeting_password, meeting_link) \
             VALUES ($1, $2, $3, $4, $5, $6, 'scheduled', $7, $8, $9) \
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(request.id)
        .bind(tutor_id)
        .bind(request.student_id)
        .bind(&request.subject)
        .bind(scheduled_time)
        .bind(&meeting.meeting_id)
        .bind(&meeting.password)
        .bind(&meeting.link)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?
        .to_domain()?;

        tx.commit().await.map_err(unexpected)?;

        Ok((request, session))
    }

    async fn list_sessions_for_tutor(&self, tutor_id: Uuid) -> PortResult<Vec<Session>> {
        let records = sqlx::query_as::<_, SessionRecord>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions \
             WHERE tutor_id = $1 ORDER BY scheduled_time DESC"
        ))
        .bind(tutor_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn list_sessions_for_student(&self, student_id: Uuid) -> PortResult<Vec<Session>> {
        let records = sqlx::query_as::<_, SessionRecord>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions \
             WHERE student_id = $1 ORDER BY scheduled_time DESC"
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn complete_session(
        &self,
        session_id: Uuid,
        tutor_id: Uuid,
        hours_spent: f64,
    ) -> PortResult<Session> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let owner = sqlx::query_as::<_, (Uuid,)>(
            "SELECT tutor_id FROM sessions WHERE id = $1",
        )
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Session {} not found", session_id)))?;

        if owner.0 != tutor_id {
            return Err(PortError::Unauthorized);
        }

        // Conditional on 'scheduled' so a second completion call can never
        // double-count hours.
        let session = sqlx::query_as::<_, SessionRecord>(&format!(
            "UPDATE sessions SET status = 'completed', hours_spent = $2, completed_at = $3 \
             WHERE id = $1 AND status = 'scheduled' \
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(session_id)
        .bind(hours_spent)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::Conflict("Session already completed".to_string()))?
        .to_domain()?;

        // "Request completed" and "session completed" are the same terminal
        // event; mirror it onto the paired request.
        sqlx::query("UPDATE requests SET status = 'completed' WHERE id = $1")
            .bind(session.request_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;

        Ok(session)
    }

    async fn tutor_stats(&self, tutor_id: Uuid) -> PortResult<TutorStats> {
        let row = sqlx::query_as::<_, (i64, f64)>(
            "SELECT COUNT(*), COALESCE(SUM(hours_spent), 0)::float8 \
             FROM sessions WHERE tutor_id = $1 AND status = 'completed'",
        )
        .bind(tutor_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(TutorStats {
            sessions_completed: row.0,
            total_hours: row.1,
            rating: 5.0,
        })
    }

    async fn student_stats(&self, student_id: Uuid) -> PortResult<StudentStats> {
        let requests = sqlx::query_as::<_, (i64,)>(
            "SELECT COUNT(*) FROM requests WHERE student_id = $1",
        )
        .bind(student_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        let sessions = sqlx::query_as::<_, (i64, f64)>(
            "SELECT COUNT(*), COALESCE(SUM(hours_spent), 0)::float8 \
             FROM sessions WHERE student_id = $1 AND status = 'completed'",
        )
        .bind(student_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(StudentStats {
            requests_made: requests.0,
            sessions_completed: sessions.0,
            hours_learned: sessions.1,
        })
    }
}
