use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};
use uuid::Uuid;

use crate::{
    dto::users::{LoginRequest, RegisterRequest, TokenResponse},
    entity::{
        Users,
        users::{ActiveModel as UserActive, Column as UserCol},
    },
    error::{AppError, AppResult},
    middleware::auth::SessionUser,
    models::LoginResult,
    password::verify_password,
    response::ApiResponse,
    schema::provided,
    services::user_service::{lock_user, save_user},
    state::AppState,
};

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let RegisterRequest {
        account,
        email,
        password,
    } = payload;

    let active = UserActive {
        id: Set(Uuid::new_v4()),
        account: provided(account),
        email: provided(email),
        password: provided(password),
        ..Default::default()
    };
    let user = save_user(&state.orm, active).await?;

    tracing::info!(user_id = %user.id, account = %user.account, "user registered");
    Ok(ApiResponse::message("User created"))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResult>> {
    let LoginRequest { account, password } = payload;
    let user = Users::find()
        .filter(UserCol::Account.eq(account.as_str()))
        .one(&state.orm)
        .await?;

    let user = match user {
        Some(u) => u,
        None => return Err(AppError::Unauthorized("invalid account or password".into())),
    };

    if !verify_password(&password, &user.password)? {
        return Err(AppError::Unauthorized("invalid account or password".into()));
    }

    let txn = state.orm.begin().await?;
    let user = lock_user(&txn, user.id).await?;

    let token = state.tokens.issue(user.id)?;
    let mut tokens = user.tokens.clone();
    tokens.push(token.clone());

    let mut active: UserActive = user.into();
    active.tokens = Set(tokens);
    let user = save_user(&txn, active).await?;
    txn.commit().await?;

    tracing::info!(user_id = %user.id, "user logged in");
    Ok(ApiResponse::success(
        "Logged in",
        LoginResult {
            token,
            account: user.account.clone(),
            email: user.email.clone(),
            role: user.role,
            cart: user.cart_quantity(),
        },
        None,
    ))
}

/// Swap the presented token for a freshly issued one.
pub async fn extend_session(
    state: &AppState,
    session: SessionUser,
) -> AppResult<ApiResponse<TokenResponse>> {
    let SessionUser(auth) = session;
    let txn = state.orm.begin().await?;
    let user = lock_user(&txn, auth.user.id).await?;

    let token = state.tokens.issue(user.id)?;
    let mut tokens = user.tokens.clone();
    if !tokens.replace(&auth.token, token.clone()) {
        return Err(AppError::Unauthorized("invalid token".into()));
    }

    let mut active: UserActive = user.into();
    active.tokens = Set(tokens);
    save_user(&txn, active).await?;
    txn.commit().await?;

    Ok(ApiResponse::success("Extended", TokenResponse { token }, None))
}

pub async fn logout_user(
    state: &AppState,
    session: SessionUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let SessionUser(auth) = session;
    let txn = state.orm.begin().await?;
    let user = lock_user(&txn, auth.user.id).await?;

    let mut tokens = user.tokens.clone();
    tokens.remove(&auth.token);

    let mut active: UserActive = user.into();
    active.tokens = Set(tokens);
    let user = save_user(&txn, active).await?;
    txn.commit().await?;

    tracing::info!(user_id = %user.id, "user logged out");
    Ok(ApiResponse::message("Logged out"))
}
