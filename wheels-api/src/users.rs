use axum::{
    extract::{rejection::JsonRejection, State},
    routing::get,
    Extension, Json, Router,
};
use tracing::info;
use wheels_core::{ProfileUpdate, User};

use crate::{
    error::AppError,
    middleware::{auth_middleware, Claims},
    state::AppState,
};

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/users/me", get(get_me).put(update_me))
        .route_layer(axum::middleware::from_fn_with_state(state, auth_middleware))
}

/// Loads the account behind a token. A token for a deleted account is treated as invalid.
pub async fn current_user(state: &AppState, claims: &Claims) -> Result<User, AppError> {
    state
        .users
        .get_user(claims.sub)
        .await?
        .ok_or_else(|| AppError::AuthenticationError("Account no longer exists".to_string()))
}

async fn get_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<User>, AppError> {
    Ok(Json(current_user(&state, &claims).await?))
}

async fn update_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> Result<Json<User>, AppError> {
    let Json(update) = payload?;
    let mut user = current_user(&state, &claims).await?;

    user.apply_update(update, state.business_rules.max_seats_per_trip)?;
    state.users.update_user(&user).await?;

    info!("Profile {} updated", user.id);
    Ok(Json(user))
}
