use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use sea_orm::EntityTrait;
use uuid::Uuid;

use crate::{
    entity::{Users, users::Model as UserModel},
    error::{AppError, AppResult},
    state::AppState,
};

/// The user behind a valid bearer token that is still in their token list.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: UserModel,
    pub token: String,
}

/// Like [`AuthUser`] but also accepts an expired token, for renewing or
/// revoking it.
#[derive(Debug, Clone)]
pub struct SessionUser(pub AuthUser);

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    if !user.user.is_admin() {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

fn bearer_token(parts: &Parts) -> AppResult<&str> {
    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("missing token".into()))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::Unauthorized("invalid token".into()))?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("invalid token".into()))?;
    Ok(token)
}

async fn authenticate(parts: &Parts, state: &AppState, allow_expired: bool) -> AppResult<AuthUser> {
    let token = bearer_token(parts)?;

    let claims = state.tokens.verify(token, allow_expired).map_err(|err| {
        tracing::debug!(error = %err, "token rejected");
        AppError::Unauthorized("invalid token".into())
    })?;

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("invalid token".into()))?;

    let user = Users::find_by_id(user_id)
        .one(&state.orm)
        .await?
        .filter(|user| user.tokens.contains(token))
        .ok_or_else(|| AppError::Unauthorized("invalid token".into()))?;

    Ok(AuthUser {
        user,
        token: token.to_string(),
    })
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        authenticate(parts, &state, false).await
    }
}

impl<S> FromRequestParts<S> for SessionUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        authenticate(parts, &state, true).await.map(SessionUser)
    }
}
