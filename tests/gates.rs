use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use shop_api::{
    db::lazy_pool,
    entity::users::{Cart, Model as UserModel, TokenList, UserRole},
    error::AppError,
    middleware::auth::{AuthUser, ensure_admin},
    routes::{BODY_LIMIT, create_app, params::ProductQuery},
    services::product_service,
    state::AppState,
    token::TokenIssuer,
};
use tower::ServiceExt;

// Nothing here reaches the database; the pool never opens a connection.
fn state() -> AppState {
    let pool = lazy_pool("postgres://postgres@localhost:5432/shop").expect("lazy pool");
    let tokens = TokenIssuer::new("gate-secret", chrono::Duration::days(7));
    AppState::new(&pool, tokens)
}

fn app() -> Router {
    create_app(state())
}

fn signed_in(role: UserRole) -> AuthUser {
    let now = chrono::Utc::now().into();
    AuthUser {
        user: UserModel {
            id: uuid::Uuid::new_v4(),
            account: "ferris".into(),
            email: "ferris@example.com".into(),
            password: "$argon2id$unused".into(),
            tokens: TokenList::default(),
            cart: Cart::default(),
            role,
            created_at: now,
            updated_at: now,
        },
        token: "session".into(),
    }
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn unknown_path_returns_not_found_envelope() {
    let response = app()
        .oneshot(Request::get("/nonexistent").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await,
        json!({ "success": false, "message": "not found" })
    );
}

#[tokio::test]
async fn unparsable_body_returns_malformed_data() {
    let request = Request::post("/users")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"account\": "))
        .unwrap();
    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "success": false, "message": "malformed data" })
    );
}

#[tokio::test]
async fn wrong_content_type_is_malformed_data_too() {
    let request = Request::post("/users")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("account=ferris"))
        .unwrap();
    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "malformed data");
}

#[tokio::test]
async fn foreign_origin_is_rejected_before_routing() {
    let request = Request::get("/health")
        .header(header::ORIGIN, "https://evil.example.com")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(response).await,
        json!({ "success": false, "message": "request rejected" })
    );
}

#[tokio::test]
async fn foreign_origin_wins_over_not_found() {
    let request = Request::get("/nonexistent")
        .header(header::ORIGIN, "https://evil.example.com")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn allowed_origin_gets_cors_headers() {
    let request = Request::get("/health")
        .header(header::ORIGIN, "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:5173"
    );
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let response = app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn protected_route_without_token_is_unauthorized() {
    let response = app()
        .oneshot(Request::get("/users/me").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await,
        json!({ "success": false, "message": "missing token" })
    );
}

#[tokio::test]
async fn forged_token_is_unauthorized() {
    let forged = TokenIssuer::new("someone-else", chrono::Duration::days(7))
        .issue(uuid::Uuid::new_v4())
        .unwrap();
    let request = Request::get("/users/me")
        .header(header::AUTHORIZATION, format!("Bearer {forged}"))
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "invalid token");
}

#[tokio::test]
async fn product_id_must_be_a_uuid() {
    let response = app()
        .oneshot(Request::get("/products/42").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "invalid id");
}

#[tokio::test]
async fn unparsable_query_returns_bad_request_envelope() {
    let response = app()
        .oneshot(Request::get("/products?page=abc").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "success": false, "message": "invalid query" })
    );
}

#[tokio::test]
async fn oversized_body_returns_malformed_data() {
    let request = Request::post("/users")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(vec![b' '; BODY_LIMIT + 1]))
        .unwrap();
    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "success": false, "message": "malformed data" })
    );
}

#[tokio::test]
async fn members_are_denied_admin_operations() {
    let member = signed_in(UserRole::Member);
    assert!(matches!(ensure_admin(&member), Err(AppError::Forbidden)));
    assert!(ensure_admin(&signed_in(UserRole::Admin)).is_ok());

    // The role check comes before any query, so the lazy pool stays closed.
    let listing =
        product_service::list_all_products(&state(), &member, ProductQuery::default()).await;
    let response = match listing {
        Err(err) => err.into_response(),
        Ok(_) => panic!("member listed every product"),
    };

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(response).await,
        json!({ "success": false, "message": "permission denied" })
    );
}
