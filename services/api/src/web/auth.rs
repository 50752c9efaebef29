//! services/api/src/web/auth.rs
//!
//! Account-directory endpoints: signup, login, and the profile lookup.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::notifier::Notification;
use crate::web::middleware::{current_user, require_admin, AuthUser};
use crate::web::rest::UserResponse;
use crate::web::state::AppState;
use crate::web::token::{encode_token, TokenClaims};
use tutoring_core::domain::{NewUser, TutorProfile, User};
use tutoring_core::ports::PortError;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TutorProfileBody {
    #[serde(default)]
    pub subjects: Vec<String>,
    pub experience: Option<String>,
    pub availability: Option<String>,
    pub motivation: Option<String>,
}

impl TutorProfileBody {
    pub fn into_domain(self) -> TutorProfile {
        // Experience and motivation fold into the bio shown on the site.
        let bio = match (self.experience, self.motivation) {
            (Some(e), Some(m)) => Some(format!("{e}\n{m}")),
            (e, m) => e.or(m),
        };
        TutorProfile {
            subjects: self.subjects,
            bio,
            availability: self.availability,
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub user_type: String,
    pub grade: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    pub tutor_profile: Option<TutorProfileBody>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: UserResponse,
}

#[derive(Serialize, ToSchema)]
pub struct ProfileResponse {
    pub success: bool,
    pub user: UserResponse,
}

#[derive(Serialize, ToSchema)]
pub struct UserListResponse {
    pub success: bool,
    pub users: Vec<UserResponse>,
}

//=========================================================================================
// Handlers
//=========================================================================================

fn issue_token(state: &AppState, user: &User) -> Result<String, ApiError> {
    let claims = TokenClaims::new(user.id, user.email.clone());
    encode_token(state.config.jwt_secret.as_bytes(), &claims).map_err(|e| {
        error!("Failed to sign token: {:?}", e);
        ApiError::Internal("Failed to sign token".to_string())
    })
}

/// POST /api/auth/signup - Create a new account.
///
/// A requested user type of "tutor" is stored as a student with a pending
/// tutor application attached; the role only flips on admin approval.
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Missing or malformed fields"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // 1. Validate input
    if req.first_name.trim().is_empty()
        || req.last_name.trim().is_empty()
        || req.email.trim().is_empty()
        || req.password.is_empty()
        || req.user_type.trim().is_empty()
    {
        return Err(ApiError::Validation("All fields required".to_string()));
    }
    if req.password.len() < 6 {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }
    let applying_as_tutor = match req.user_type.as_str() {
        "student" => false,
        "tutor" => true,
        _ => return Err(ApiError::Validation("Invalid user type".to_string())),
    };

    // 2. Hash the password
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            ApiError::Internal("Failed to hash password".to_string())
        })?
        .to_string();

    // 3. Create the user record. Tutor applicants are persisted as students
    //    with a pending application and their profile snapshot.
    let tutor_profile = applying_as_tutor
        .then(|| req.tutor_profile.map(TutorProfileBody::into_domain).unwrap_or_default());

    let user = state
        .db
        .create_user(NewUser {
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            email: req.email.trim().to_lowercase(),
            password_hash,
            grade: req.grade,
            interests: req.interests,
            tutor_profile,
        })
        .await?;

    // 4. Tutor signups notify the admin; plain student signups send no mail.
    if applying_as_tutor {
        state.notifier.notify(Notification::TutorApplied {
            applicant: user.clone(),
        });
    }

    // 5. Issue the bearer token.
    let token = issue_token(&state, &user)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            token,
            user: UserResponse::from(&user),
        }),
    ))
}

/// POST /api/auth/login - Login with existing credentials.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation("Email and password required".to_string()));
    }

    // Missing account and bad password produce the same message.
    let invalid = || ApiError::Auth("Invalid credentials".to_string());

    let creds = state
        .db
        .get_credentials_by_email(&req.email.trim().to_lowercase())
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => invalid(),
            other => other.into(),
        })?;

    let parsed_hash = PasswordHash::new(&creds.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        ApiError::Internal("Authentication error".to_string())
    })?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| invalid())?;

    // Pending or denied applicants still log in as students; application
    // state never locks an account.
    let user = state.db.get_user_by_id(creds.user_id).await?;
    let token = issue_token(&state, &user)?;

    Ok(Json(AuthResponse {
        success: true,
        token,
        user: UserResponse::from(&user),
    }))
}

/// GET /api/auth/profile - The caller's own public projection.
#[utoipa::path(
    get,
    path = "/api/auth/profile",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Profile", body = ProfileResponse),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let user = current_user(&state, &auth).await?;
    Ok(Json(ProfileResponse {
        success: true,
        user: UserResponse::from(&user),
    }))
}

/// GET /api/auth/all-users - The admin's directory of every account, public
/// projections only.
#[utoipa::path(
    get,
    path = "/api/auth/all-users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "All accounts", body = UserListResponse),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn all_users_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = current_user(&state, &auth).await?;
    require_admin(&caller)?;

    let users = state.db.list_all_users().await?;

    Ok(Json(UserListResponse {
        success: true,
        users: users.iter().map(UserResponse::from).collect(),
    }))
}
