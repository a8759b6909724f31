use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest},
        jwt::JwtKeys,
        password::{verify_against_placeholder, verify_password},
        repo::UserStore,
        repo_types::{normalize_email, NewUser, Role, User},
    },
    error::AppError,
};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// At least 8 characters with a lowercase letter, an uppercase letter and a digit.
pub(crate) fn is_strong_password(password: &str) -> bool {
    password.chars().count() >= 8
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
}

pub(crate) fn parse_role(raw: &str) -> Result<Role, String> {
    raw.parse::<Role>()
        .map_err(|_| "role: must be 'user' or 'admin'".to_string())
}

fn validate_registration(req: &RegisterRequest) -> Result<Role, AppError> {
    let mut problems = Vec::new();

    if req.name.trim().is_empty() {
        problems.push("name: is required".to_string());
    }
    if !is_valid_email(&normalize_email(&req.email)) {
        problems.push("email: must be a valid email address".to_string());
    }
    if !is_strong_password(&req.password) {
        problems.push(
            "password: must be at least 8 characters with an uppercase letter, a lowercase letter and a digit"
                .to_string(),
        );
    }
    let role = match req.role.as_deref() {
        None => Ok(Role::default()),
        Some(raw) => parse_role(raw),
    };
    if let Err(msg) = &role {
        problems.push(msg.clone());
    }

    if !problems.is_empty() {
        return Err(AppError::Validation(problems));
    }
    Ok(role.unwrap_or_default())
}

fn auth_response(keys: &JwtKeys, user: &User) -> Result<AuthResponse, AppError> {
    let token = keys.issue(user.id, user.role)?;
    Ok(AuthResponse {
        token,
        user: PublicUser {
            id: user.id,
            role: user.role,
            name: user.name.clone(),
        },
    })
}

/// Validates, hashes and stores a new account, then issues its first token.
pub async fn register(
    users: &dyn UserStore,
    keys: &JwtKeys,
    req: RegisterRequest,
) -> Result<AuthResponse, AppError> {
    let role = validate_registration(&req)?;
    let new_user = NewUser::new(&req.name, &req.email, &req.password, role)?;

    let user = users.create(new_user).await.map_err(|e| {
        warn!(error = %e, "create user failed");
        AppError::from(e)
    })?;

    info!(user_id = %user.id, role = %user.role, "user registered");
    auth_response(keys, &user)
}

/// Checks credentials first and the requested role second, so a role
/// mismatch is only reported to someone who knows the password.
pub async fn login(
    users: &dyn UserStore,
    keys: &JwtKeys,
    req: LoginRequest,
) -> Result<AuthResponse, AppError> {
    let email = normalize_email(&req.email);
    let requested_role = req
        .role
        .as_deref()
        .map(parse_role)
        .transpose()
        .map_err(|msg| AppError::Validation(vec![msg]))?;

    let Some(user) = users.find_by_email(&email).await? else {
        warn!("login unknown email");
        verify_against_placeholder(&req.password);
        return Err(AppError::Authentication(INVALID_CREDENTIALS));
    };

    if !verify_password(&req.password, &user.password_hash) {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Authentication(INVALID_CREDENTIALS));
    }

    if let Some(requested) = requested_role {
        if requested != user.role {
            warn!(user_id = %user.id, requested = %requested, "login role mismatch");
            return Err(AppError::BadRequest(format!(
                "You are not registered as {requested}. Please select the correct role."
            )));
        }
    }

    info!(user_id = %user.id, role = %user.role, "user logged in");
    auth_response(keys, &user)
}
