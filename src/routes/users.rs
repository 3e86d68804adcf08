use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, patch, post},
};

use crate::{
    dto::users::{CartView, LoginRequest, RegisterRequest, TokenResponse, UpdateCartRequest, UserList},
    error::AppResult,
    middleware::{
        auth::{AuthUser, SessionUser},
        json::{AppJson, AppQuery},
    },
    models::{LoginResult, UserProfile},
    response::ApiResponse,
    routes::params::Pagination,
    services::{auth_service, user_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/extend", patch(extend))
        .route("/logout", delete(logout))
        .route("/cart", get(cart).patch(update_cart))
        .route("/all", get(list_users))
}

#[utoipa::path(
    post,
    path = "/users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created"),
        (status = 400, description = "Validation failed or malformed body")
    ),
    tag = "Users"
)]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<serde_json::Value>>)> {
    let resp = auth_service::register_user(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    post,
    path = "/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = ApiResponse<LoginResult>),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Users"
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResult>>> {
    let resp = auth_service::login_user(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/users/me",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<UserProfile>),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn me(user: AuthUser) -> Json<ApiResponse<UserProfile>> {
    Json(user_service::profile(&user))
}

#[utoipa::path(
    patch,
    path = "/users/extend",
    responses(
        (status = 200, description = "Token replaced", body = ApiResponse<TokenResponse>),
        (status = 401, description = "Unknown or revoked token")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn extend(
    State(state): State<AppState>,
    session: SessionUser,
) -> AppResult<Json<ApiResponse<TokenResponse>>> {
    let resp = auth_service::extend_session(&state, session).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/users/logout",
    responses(
        (status = 200, description = "Token revoked"),
        (status = 401, description = "Unknown or revoked token")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn logout(
    State(state): State<AppState>,
    session: SessionUser,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = auth_service::logout_user(&state, session).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/users/cart",
    responses(
        (status = 200, description = "Cart lines", body = ApiResponse<CartView>)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let resp = user_service::get_cart(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/users/cart",
    request_body = UpdateCartRequest,
    responses(
        (status = 200, description = "New cart quantity", body = ApiResponse<i32>),
        (status = 400, description = "Missing product or quantity"),
        (status = 404, description = "Product not found or not on sale")
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn update_cart(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<UpdateCartRequest>,
) -> AppResult<Json<ApiResponse<i32>>> {
    let resp = user_service::update_cart(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/users/all",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "All accounts", body = ApiResponse<UserList>),
        (status = 403, description = "Not an admin")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
    AppQuery(pagination): AppQuery<Pagination>,
) -> AppResult<Json<ApiResponse<UserList>>> {
    let resp = user_service::list_users(&state, &user, pagination).await?;
    Ok(Json(resp))
}
