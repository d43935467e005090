use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use chrono::{TimeDelta, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use tracing::info;
use wheels_core::identity::{AuthResponse, LoginRequest, RegisterResponse};
use wheels_core::{NewUser, User};
use wheels_shared::Masked;

use crate::{error::AppError, middleware::Claims, state::AppState, state::AuthConfig};

const BAD_CREDENTIALS: &str = "Invalid email or password";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
}

/// Signs a token for `user` valid for the configured lifetime.
pub fn issue_token(auth: &AuthConfig, user: &User) -> Result<String, AppError> {
    let expires_at = i64::try_from(auth.expiration)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .ok_or_else(|| {
            AppError::InternalServerError(format!(
                "jwt_expiration_seconds {} is out of range",
                auth.expiration
            ))
        })?;
    let exp = usize::try_from(expires_at.timestamp())
        .map_err(|_| AppError::InternalServerError("Token expiry before the epoch".to_string()))?;

    let claims = Claims {
        sub: user.id,
        rol: user.role,
        exp,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(auth.secret.as_bytes()))
        .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))
}

pub async fn hash_password(password: Masked<String>) -> Result<String, AppError> {
    let hashed = tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.expose().as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))
    })
    .await
    .map_err(anyhow::Error::from)??;
    Ok(hashed)
}

async fn verify_password(password: Masked<String>, hash: Masked<String>) -> Result<bool, AppError> {
    let valid = tokio::task::spawn_blocking(move || match PasswordHash::new(hash.expose()) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.expose().as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    })
    .await
    .map_err(anyhow::Error::from)?;
    Ok(valid)
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let Json(req) = payload?;

    let record = state
        .users
        .find_by_email(&req.email)
        .await?
        .ok_or_else(|| AppError::AuthenticationError(BAD_CREDENTIALS.to_string()))?;

    if !verify_password(req.password, record.password_hash).await? {
        return Err(AppError::AuthenticationError(BAD_CREDENTIALS.to_string()));
    }

    let token = issue_token(&state.auth, &record.user)?;
    info!("User {} signed in as {}", record.user.id, record.user.role);

    Ok(Json(AuthResponse {
        token,
        user: record.user,
    }))
}

async fn register(
    State(state): State<AppState>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let Json(req) = payload?;
    req.validate(state.business_rules.max_seats_per_trip)?;

    let password_hash = hash_password(req.password.clone()).await?;
    let record = req.into_record(password_hash);
    state.users.insert_user(&record).await?;

    info!(
        "Registered {} {} ({})",
        record.user.role,
        record.user.id,
        Masked::new(&record.user.email)
    );

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            user: record.user,
        }),
    ))
}
