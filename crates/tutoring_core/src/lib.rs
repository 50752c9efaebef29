pub mod domain;
pub mod ports;

pub use domain::{
    ApplicationStatus, MeetingReference, NewRequest, NewUser, Priority, RequestStatus, Role,
    Session, SessionStatus, StudentStats, TutorApplication, TutorProfile, TutorStats,
    TutoringRequest, User, UserCredentials,
};
pub use ports::{DatabaseService, Email, MailService, PortError, PortResult};
