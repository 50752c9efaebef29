//! Shared test harness: in-memory implementations of the core ports and a
//! router factory, so the full HTTP surface can be exercised without a real
//! database or mail relay.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use tokio::sync::Notify;
use tower::ServiceExt;
use tracing::Level;
use uuid::Uuid;

use api_lib::config::Config;
use api_lib::notifier::spawn_notifier;
use api_lib::web::state::AppState;
use api_lib::web::token::{encode_token, TokenClaims};
use api_lib::web;
use tutoring_core::domain::{
    ApplicationStatus, MeetingReference, NewRequest, NewUser, RequestStatus, Role, Session,
    SessionStatus, StudentStats, TutorApplication, TutorProfile, TutorStats, TutoringRequest,
    User, UserCredentials,
};
use tutoring_core::ports::{DatabaseService, Email, MailService, PortError, PortResult};

pub const TEST_SECRET: &str = "integration-test-secret";

//=========================================================================================
// In-memory database
//=========================================================================================

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    // email -> password hash
    passwords: HashMap<String, String>,
    requests: Vec<TutoringRequest>,
    sessions: Vec<Session>,
}

#[derive(Default)]
pub struct MemoryDb {
    inner: Mutex<Inner>,
}

impl MemoryDb {
    pub fn user_count(&self) -> usize {
        self.inner.lock().unwrap().users.len()
    }

    pub fn session_count(&self) -> usize {
        self.inner.lock().unwrap().sessions.len()
    }

    pub fn user_by_email(&self, email: &str) -> Option<User> {
        let inner = self.inner.lock().unwrap();
        inner.users.iter().find(|u| u.email == email).cloned()
    }

    /// Test-only backdoor: flip an existing account to admin.
    pub fn promote_admin(&self, email: &str) {
        let mut inner = self.inner.lock().unwrap();
        let user = inner
            .users
            .iter_mut()
            .find(|u| u.email == email)
            .expect("no such user to promote");
        user.role = Role::Admin;
    }
}

#[async_trait]
impl DatabaseService for MemoryDb {
    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        let mut inner = self.inner.lock().unwrap();
        if inner.users.iter().any(|u| u.email == new_user.email) {
            return Err(PortError::Conflict("Email already registered".to_string()));
        }

        let applying = new_user.tutor_profile.is_some();
        let user = User {
            id: Uuid::new_v4(),
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            email: new_user.email.clone(),
            role: Role::Student,
            grade: new_user.grade,
            interests: new_user.interests,
            application: TutorApplication {
                status: if applying {
                    ApplicationStatus::Pending
                } else {
                    ApplicationStatus::NotApplied
                },
                applied_at: applying.then(Utc::now),
                ..Default::default()
            },
            profile: new_user.tutor_profile.unwrap_or_default(),
            created_at: Utc::now(),
        };
        inner.passwords.insert(new_user.email, new_user.password_hash);
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let inner = self.inner.lock().unwrap();
        inner
            .users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let inner = self.inner.lock().unwrap();
        let user = inner
            .users
            .iter()
            .find(|u| u.email == email)
            .ok_or_else(|| PortError::NotFound(format!("No account for {}", email)))?;
        Ok(UserCredentials {
            user_id: user.id,
            email: user.email.clone(),
            hashed_password: inner.passwords[email].clone(),
        })
    }

    async fn list_all_users(&self) -> PortResult<Vec<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.clone())
    }

    async fn submit_application(&self, user_id: Uuid, profile: TutorProfile) -> PortResult<User> {
        let mut inner = self.inner.lock().unwrap();
        let user = inner
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;

        match user.application.status {
            ApplicationStatus::Pending => {
                return Err(PortError::Conflict("Application already pending".to_string()))
            }
            ApplicationStatus::Approved => {
                return Err(PortError::Conflict("Already an approved tutor".to_string()))
            }
            ApplicationStatus::NotApplied | ApplicationStatus::Denied => {}
        }

        user.application = TutorApplication {
            status: ApplicationStatus::Pending,
            applied_at: Some(Utc::now()),
            ..Default::default()
        };
        if !profile.subjects.is_empty() {
            user.profile.subjects = profile.subjects;
        }
        user.profile.bio = profile.bio.or(user.profile.bio.take());
        user.profile.availability = profile.availability.or(user.profile.availability.take());
        Ok(user.clone())
    }

    async fn approve_application(&self, user_id: Uuid) -> PortResult<User> {
        let mut inner = self.inner.lock().unwrap();
        let user = inner
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        if user.application.status != ApplicationStatus::Pending {
            return Err(PortError::Conflict("Application is not pending".to_string()));
        }
        user.application.status = ApplicationStatus::Approved;
        user.application.approved_at = Some(Utc::now());
        user.role = Role::Tutor;
        Ok(user.clone())
    }

    async fn deny_application(&self, user_id: Uuid, reason: Option<&str>) -> PortResult<User> {
        let mut inner = self.inner.lock().unwrap();
        let user = inner
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        if user.application.status != ApplicationStatus::Pending {
            return Err(PortError::Conflict("Application is not pending".to_string()));
        }
        user.application.status = ApplicationStatus::Denied;
        user.application.denied_at = Some(Utc::now());
        user.application.denial_reason = reason.map(str::to_string);
        Ok(user.clone())
    }

    async fn list_pending_applications(&self) -> PortResult<Vec<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .users
            .iter()
            .filter(|u| u.application.status == ApplicationStatus::Pending)
            .cloned()
            .collect())
    }

    async fn list_approved_tutors(&self) -> PortResult<Vec<User>> {
        let inner = self.inner.lock().unwrap();
        let mut tutors: Vec<User> = inner
            .users
            .iter()
            .filter(|u| u.is_approved_tutor())
            .cloned()
            .collect();
        tutors.sort_by(|a, b| {
            a.last_name
                .cmp(&b.last_name)
                .then_with(|| a.first_name.cmp(&b.first_name))
        });
        Ok(tutors)
    }

    async fn create_request(&self, new_request: NewRequest) -> PortResult<TutoringRequest> {
        let mut inner = self.inner.lock().unwrap();
        let request = TutoringRequest {
            id: Uuid::new_v4(),
            student_id: new_request.student_id,
            subject: new_request.subject,
            description: new_request.description,
            priority: new_request.priority,
            requested_duration: new_request.requested_duration,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
            accepted_at: None,
            tutor_id: None,
        };
        inner.requests.push(request.clone());
        Ok(request)
    }

    async fn list_open_requests(&self, subjects: &[String]) -> PortResult<Vec<TutoringRequest>> {
        let inner = self.inner.lock().unwrap();
        let mut matches: Vec<TutoringRequest> = inner
            .requests
            .iter()
            .filter(|r| r.status == RequestStatus::Pending && subjects.contains(&r.subject))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matches)
    }

    async fn list_requests_by_student(
        &self,
        student_id: Uuid,
    ) -> PortResult<Vec<TutoringRequest>> {
        let inner = self.inner.lock().unwrap();
        let mut matches: Vec<TutoringRequest> = inner
            .requests
            .iter()
            .filter(|r| r.student_id == student_id)
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matches)
    }

    async fn accept_request(
        &self,
        request_id: Uuid,
        tutor_id: Uuid,
        meeting: MeetingReference,
        scheduled_time: DateTime<Utc>,
    ) -> PortResult<(TutoringRequest, Session)> {
        // The mutex makes the check-and-transition atomic, mirroring the
        // conditional UPDATE in the Postgres adapter.
        let mut inner = self.inner.lock().unwrap();
        let request = inner
            .requests
            .iter_mut()
            .find(|r| r.id == request_id && r.status == RequestStatus::Pending)
            .ok_or_else(|| PortError::NotFound("Request is no longer available".to_string()))?;

        request.status = RequestStatus::Accepted;
        request.accepted_at = Some(Utc::now());
        request.tutor_id = Some(tutor_id);
        let request = request.clone();

        let session = Session {
            id: Uuid::new_v4(),
            request_id: request.id,
            tutor_id,
            student_id: request.student_id,
            subject: request.subject.clone(),
            scheduled_time,
            status: SessionStatus::Scheduled,
            meeting,
            hours_spent: None,
            completed_at: None,
            created_at: Utc::now(),
        };
        inner.sessions.push(session.clone());
        Ok((request, session))
    }

    async fn list_sessions_for_tutor(&self, tutor_id: Uuid) -> PortResult<Vec<Session>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .sessions
            .iter()
            .filter(|s| s.tutor_id == tutor_id)
            .cloned()
            .collect())
    }

    async fn list_sessions_for_student(&self, student_id: Uuid) -> PortResult<Vec<Session>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .sessions
            .iter()
            .filter(|s| s.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn complete_session(
        &self,
        session_id: Uuid,
        tutor_id: Uuid,
        hours_spent: f64,
    ) -> PortResult<Session> {
        let mut inner = self.inner.lock().unwrap();
        let session = inner
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| PortError::NotFound(format!("Session {} not found", session_id)))?;
        if session.tutor_id != tutor_id {
            return Err(PortError::Unauthorized);
        }
        if session.status == SessionStatus::Completed {
            return Err(PortError::Conflict("Session already completed".to_string()));
        }
        session.status = SessionStatus::Completed;
        session.hours_spent = Some(hours_spent);
        session.completed_at = Some(Utc::now());
        let session = session.clone();

        if let Some(request) = inner.requests.iter_mut().find(|r| r.id == session.request_id) {
            request.status = RequestStatus::Completed;
        }
        Ok(session)
    }

    async fn tutor_stats(&self, tutor_id: Uuid) -> PortResult<TutorStats> {
        let inner = self.inner.lock().unwrap();
        let completed: Vec<&Session> = inner
            .sessions
            .iter()
            .filter(|s| s.tutor_id == tutor_id && s.status == SessionStatus::Completed)
            .collect();
        Ok(TutorStats {
            sessions_completed: completed.len() as i64,
            total_hours: completed.iter().filter_map(|s| s.hours_spent).sum(),
            rating: 5.0,
        })
    }

    async fn student_stats(&self, student_id: Uuid) -> PortResult<StudentStats> {
        let inner = self.inner.lock().unwrap();
        let completed: Vec<&Session> = inner
            .sessions
            .iter()
            .filter(|s| s.student_id == student_id && s.status == SessionStatus::Completed)
            .collect();
        Ok(StudentStats {
            requests_made: inner
                .requests
                .iter()
                .filter(|r| r.student_id == student_id)
                .count() as i64,
            sessions_completed: completed.len() as i64,
            hours_learned: completed.iter().filter_map(|s| s.hours_spent).sum(),
        })
    }
}

//=========================================================================================
// Recording mail service
//=========================================================================================

#[derive(Default)]
pub struct RecordingMail {
    pub sent: Mutex<Vec<Email>>,
    /// Signalled after each delivery so tests can await mail instead of
    /// sleeping.
    pub delivered: Notify,
}

#[async_trait]
impl MailService for RecordingMail {
    async fn send(&self, mail: &Email) -> PortResult<()> {
        self.sent.lock().unwrap().push(mail.clone());
        self.delivered.notify_waiters();
        Ok(())
    }
}

//=========================================================================================
// App factory and request helpers
//=========================================================================================

pub struct TestApp {
    pub router: Router,
    pub db: Arc<MemoryDb>,
    pub mail: Arc<RecordingMail>,
}

pub fn spawn_app() -> TestApp {
    let config = Arc::new(Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: String::new(),
        log_level: Level::INFO,
        jwt_secret: TEST_SECRET.to_string(),
        admin_email: "admin@example.com".to_string(),
        mail_endpoint: None,
        mail_from: "no-reply@test".to_string(),
        meeting_base_url: "https://meet.test".to_string(),
    });

    let db = Arc::new(MemoryDb::default());
    let mail = Arc::new(RecordingMail::default());
    let (notifier, _worker) = spawn_notifier(mail.clone(), config.admin_email.clone());

    let state = Arc::new(AppState {
        db: db.clone(),
        config,
        notifier,
    });

    TestApp {
        router: web::router(state),
        db,
        mail,
    }
}

impl TestApp {
    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::post(path).header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        read_json(response).await
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::get(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = builder.body(Body::empty()).unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        read_json(response).await
    }

    /// Mints a token directly, bypassing login, for accounts reshaped via
    /// test backdoors.
    pub fn token_for(&self, email: &str) -> String {
        let user = self.db.user_by_email(email).expect("unknown test user");
        let claims = TokenClaims::new(user.id, user.email.clone());
        encode_token(TEST_SECRET.as_bytes(), &claims).unwrap()
    }
}

pub async fn read_json(response: Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}
