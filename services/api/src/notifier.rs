//! services/api/src/notifier.rs
//!
//! Outbound notifications. State transitions emit `Notification` events into
//! an in-process channel; a spawned worker renders them into emails and
//! delivers them through the `MailService` port with a small retry/backoff.
//! Delivery is best-effort and at-most-once from the caller's point of view:
//! the HTTP response never waits on the mail relay, and terminal failures are
//! logged, not requeued.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, warn};

use tutoring_core::domain::{Session, TutoringRequest, User};
use tutoring_core::ports::{Email, MailService};

/// How many delivery attempts before a message is dropped.
const MAX_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

//=========================================================================================
// Events
//=========================================================================================

/// One event per notifying state transition in the lifecycle.
#[derive(Debug, Clone)]
pub enum Notification {
    TutorApplied {
        applicant: User,
    },
    ApplicationApproved {
        user: User,
    },
    ApplicationDenied {
        user: User,
        reason: Option<String>,
    },
    RequestCreated {
        student: User,
        request: TutoringRequest,
    },
    RequestAccepted {
        student: User,
        tutor: User,
        session: Session,
    },
    SessionCompleted {
        tutor: User,
        student: User,
        session: Session,
        tutor_total_hours: f64,
        student_total_hours: f64,
    },
}

impl Notification {
    /// Renders the event into the emails it produces. `admin_email` is the
    /// operator inbox for admin-facing notifications.
    pub fn render(&self, admin_email: &str) -> Vec<Email> {
        match self {
            Notification::TutorApplied { applicant } => vec![Email {
                to: admin_email.to_string(),
                subject: format!("New tutor application: {}", applicant.full_name()),
                body: format!(
                    "{} <{}> applied to become a tutor.\n\
                     Subjects: {}\nAvailability: {}\n\n\
                     Review the application in the admin dashboard.",
                    applicant.full_name(),
                    applicant.email,
                    join_or_na(&applicant.profile.subjects),
                    applicant.profile.availability.as_deref().unwrap_or("N/A"),
                ),
            }],
            Notification::ApplicationApproved { user } => vec![Email {
                to: user.email.clone(),
                subject: "Your tutor application has been approved".to_string(),
                body: format!(
                    "Congratulations {}!\n\n\
                     Your tutor application has been approved. You can now view \
                     student requests in your subjects, accept them, and log \
                     your hours.\n\nYour subjects: {}",
                    user.first_name,
                    join_or_na(&user.profile.subjects),
                ),
            }],
            Notification::ApplicationDenied { user, reason } => {
                let feedback = reason
                    .as_deref()
                    .map(|r| format!("\n\nFeedback: {}", r))
                    .unwrap_or_default();
                vec![Email {
                    to: user.email.clone(),
                    subject: "Your tutor application".to_string(),
                    body: format!(
                        "Thank you for your interest in tutoring, {}.\n\
                         Unfortunately, your application was not approved at \
                         this time.{}\n\nYou are welcome to apply again in the \
                         future.",
                        user.first_name, feedback,
                    ),
                }]
            }
            Notification::RequestCreated { student, request } => vec![Email {
                to: admin_email.to_string(),
                subject: format!("New tutoring request: {}", request.subject),
                body: format!(
                    "{} requested help with {} ({} priority, {}).",
                    student.full_name(),
                    request.subject,
                    request.priority.as_str(),
                    request.requested_duration,
                ),
            }],
            Notification::RequestAccepted {
                student,
                tutor,
                session,
            } => vec![
                Email {
                    to: student.email.clone(),
                    subject: "A tutor has accepted your request".to_string(),
                    body: format!(
                        "Great news, {}!\n\n{} has accepted your {} request.\n\
                         Scheduled for: {}\nMeeting link: {}\nMeeting ID: {} \
                         (password {})",
                        student.first_name,
                        tutor.full_name(),
                        session.subject,
                        session.scheduled_time.format("%Y-%m-%d %H:%M UTC"),
                        session.meeting.link,
                        session.meeting.meeting_id,
                        session.meeting.password,
                    ),
                },
                Email {
                    to: tutor.email.clone(),
                    subject: format!("Session scheduled with {}", student.full_name()),
                    body: format!(
                        "You accepted {}'s {} request.\n\
                         Scheduled for: {}\nMeeting link: {}\nMeeting ID: {} \
                         (password {})",
                        student.full_name(),
                        session.subject,
                        session.scheduled_time.format("%Y-%m-%d %H:%M UTC"),
                        session.meeting.link,
                        session.meeting.meeting_id,
                        session.meeting.password,
                    ),
                },
                Email {
                    to: admin_email.to_string(),
                    subject: "Request accepted".to_string(),
                    body: format!(
                        "{} accepted {}'s {} request (session {}).",
                        tutor.full_name(),
                        student.full_name(),
                        session.subject,
                        session.id,
                    ),
                },
            ],
            Notification::SessionCompleted {
                tutor,
                student,
                session,
                tutor_total_hours,
                student_total_hours,
            } => vec![Email {
                to: admin_email.to_string(),
                subject: "Session completed".to_string(),
                body: format!(
                    "{} completed a {} session with {} ({:.1} hours).\n\
                     Tutor total: {:.1} hours. Student total: {:.1} hours.",
                    tutor.full_name(),
                    session.subject,
                    student.full_name(),
                    session.hours_spent.unwrap_or(0.0),
                    tutor_total_hours,
                    student_total_hours,
                ),
            }],
        }
    }
}

fn join_or_na(items: &[String]) -> String {
    if items.is_empty() {
        "N/A".to_string()
    } else {
        items.join(", ")
    }
}

//=========================================================================================
// Worker
//=========================================================================================

/// A cloneable handle for emitting notification events.
#[derive(Clone)]
pub struct NotifierHandle {
    tx: mpsc::UnboundedSender<Notification>,
}

impl NotifierHandle {
    /// Fire-and-forget: never blocks the caller, never fails the enclosing
    /// request.
    pub fn notify(&self, event: Notification) {
        if self.tx.send(event).is_err() {
            warn!("notifier worker is gone; dropping notification");
        }
    }
}

/// Spawns the notifier worker. The returned handle feeds it; the worker exits
/// once every handle has been dropped and the queue is drained.
pub fn spawn_notifier(
    mail: Arc<dyn MailService>,
    admin_email: String,
) -> (NotifierHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<Notification>();

    let worker = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            for email in event.render(&admin_email) {
                deliver_with_retry(mail.as_ref(), &email).await;
            }
        }
    });

    (NotifierHandle { tx }, worker)
}

async fn deliver_with_retry(mail: &dyn MailService, email: &Email) {
    for attempt in 1..=MAX_ATTEMPTS {
        match mail.send(email).await {
            Ok(()) => return,
            Err(e) if attempt < MAX_ATTEMPTS => {
                warn!(to = %email.to, attempt, "mail delivery failed, retrying: {e}");
                tokio::time::sleep(RETRY_BASE_DELAY * attempt).await;
            }
            Err(e) => {
                error!(to = %email.to, "mail delivery failed permanently: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;
    use tutoring_core::domain::{
        ApplicationStatus, MeetingReference, Role, SessionStatus, TutorApplication, TutorProfile,
    };
    use tutoring_core::ports::{PortError, PortResult};
    use uuid::Uuid;

    fn sample_user(name: &str, email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            first_name: name.to_string(),
            last_name: "Example".to_string(),
            email: email.to_string(),
            role: Role::Student,
            grade: None,
            interests: vec![],
            application: TutorApplication::default(),
            profile: TutorProfile {
                subjects: vec!["Math".to_string()],
                bio: None,
                availability: None,
            },
            created_at: Utc::now(),
        }
    }

    fn sample_session(tutor: &User, student: &User) -> Session {
        Session {
            id: Uuid::new_v4(),
            request_id: Uuid::new_v4(),
            tutor_id: tutor.id,
            student_id: student.id,
            subject: "Math".to_string(),
            scheduled_time: Utc::now(),
            status: SessionStatus::Scheduled,
            meeting: MeetingReference {
                meeting_id: "123456789".to_string(),
                password: "abc123".to_string(),
                link: "https://meet.example/123456789".to_string(),
            },
            hours_spent: None,
            completed_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn denial_mail_carries_the_reason() {
        let mut user = sample_user("Priya", "priya@example.com");
        user.application.status = ApplicationStatus::Denied;

        let emails = Notification::ApplicationDenied {
            user,
            reason: Some("insufficient experience".to_string()),
        }
        .render("admin@example.com");

        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].to, "priya@example.com");
        assert!(emails[0].body.contains("insufficient experience"));
    }

    #[test]
    fn accept_notifies_both_parties_and_admin_with_meeting_link() {
        let tutor = sample_user("Tom", "tom@example.com");
        let student = sample_user("Sara", "sara@example.com");
        let session = sample_session(&tutor, &student);

        let emails = Notification::RequestAccepted {
            student: student.clone(),
            tutor: tutor.clone(),
            session,
        }
        .render("admin@example.com");

        let recipients: Vec<&str> = emails.iter().map(|e| e.to.as_str()).collect();
        assert_eq!(
            recipients,
            vec!["sara@example.com", "tom@example.com", "admin@example.com"]
        );
        assert!(emails[0].body.contains("https://meet.example/123456789"));
        assert!(emails[1].body.contains("https://meet.example/123456789"));
    }

    struct FlakyMail {
        failures_left: Mutex<u32>,
        sent: Mutex<Vec<Email>>,
    }

    #[async_trait]
    impl MailService for FlakyMail {
        async fn send(&self, mail: &Email) -> PortResult<()> {
            let mut failures = self.failures_left.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(PortError::Unexpected("relay down".to_string()));
            }
            self.sent.lock().unwrap().push(mail.clone());
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn worker_retries_until_delivery() {
        let mail = Arc::new(FlakyMail {
            failures_left: Mutex::new(2),
            sent: Mutex::new(Vec::new()),
        });
        let (handle, worker) = spawn_notifier(mail.clone(), "admin@example.com".to_string());

        handle.notify(Notification::TutorApplied {
            applicant: sample_user("Tom", "tom@example.com"),
        });
        drop(handle);
        worker.await.unwrap();

        let sent = mail.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "admin@example.com");
    }
}
