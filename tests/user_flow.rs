use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use shop_api::{
    db::connect_with_retry,
    dto::users::{LoginRequest, RegisterRequest, UpdateCartRequest},
    entity::{
        Users,
        products::ActiveModel as ProductActive,
        users::{ActiveModel as UserActive, UserRole},
    },
    error::AppError,
    middleware::auth::AuthUser,
    routes::params::OrderListQuery,
    services::{auth_service, order_service, user_service},
    state::AppState,
    token::TokenIssuer,
};
use uuid::Uuid;

async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DB_URL")) {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DB_URL to run database flow tests.");
            return Ok(None);
        }
    };
    let pool = connect_with_retry(&database_url, 1).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    let tokens = TokenIssuer::new("flow-secret", chrono::Duration::days(7));
    Ok(Some(AppState::new(&pool, tokens)))
}

/// Account names are unique per run so the flow can repeat against one database.
fn fresh_account() -> String {
    format!("u{}", &Uuid::new_v4().simple().to_string()[..12])
}

fn register_request(account: &str, password: &str) -> RegisterRequest {
    RegisterRequest {
        account: Some(account.to_string()),
        email: Some(format!("{account}@example.com")),
        password: Some(password.to_string()),
    }
}

async fn auth_user(state: &AppState, account: &str, token: String) -> anyhow::Result<AuthUser> {
    use sea_orm::{ColumnTrait, QueryFilter};
    let user = Users::find()
        .filter(shop_api::entity::users::Column::Account.eq(account))
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("user {account} missing"))?;
    Ok(AuthUser { user, token })
}

#[tokio::test]
async fn registration_enforces_uniqueness_and_password_rules() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let account = fresh_account();

    auth_service::register_user(&state, register_request(&account, "crab1234")).await?;

    let duplicate = auth_service::register_user(&state, register_request(&account, "crab1234")).await;
    match duplicate {
        Err(AppError::Validation(err)) => assert!(err.has_field("account")),
        other => panic!("expected account uniqueness error, got {other:?}"),
    }

    let other = fresh_account();
    let same_email = RegisterRequest {
        email: Some(format!("{account}@example.com")),
        ..register_request(&other, "crab1234")
    };
    match auth_service::register_user(&state, same_email).await {
        Err(AppError::Validation(err)) => assert!(err.has_field("email")),
        other => panic!("expected email uniqueness error, got {other:?}"),
    }

    let short = fresh_account();
    let result = auth_service::register_user(&state, register_request(&short, "abc")).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    let stored = auth_user(&state, &short, String::new()).await;
    assert!(stored.is_err(), "short password must not persist");

    Ok(())
}

#[tokio::test]
async fn saving_without_password_change_keeps_hash() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let account = fresh_account();
    auth_service::register_user(&state, register_request(&account, "crab1234")).await?;

    let before = auth_user(&state, &account, String::new()).await?.user;
    let mut active: UserActive = before.clone().into();
    active.role = Set(UserRole::Admin);
    let after = user_service::save_user(&state.orm, active).await?;

    assert_eq!(after.password, before.password);
    assert_eq!(after.role, UserRole::Admin);
    Ok(())
}

#[tokio::test]
async fn login_cart_and_order_flow() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let account = fresh_account();
    auth_service::register_user(&state, register_request(&account, "crab1234")).await?;

    let bad_login = auth_service::login_user(
        &state,
        LoginRequest {
            account: account.clone(),
            password: "wrong-pass".into(),
        },
    )
    .await;
    assert!(matches!(bad_login, Err(AppError::Unauthorized(_))));

    let login = auth_service::login_user(
        &state,
        LoginRequest {
            account: account.clone(),
            password: "crab1234".into(),
        },
    )
    .await?;
    let token = login.result.expect("login result").token;

    let user = auth_user(&state, &account, token.clone()).await?;
    assert!(user.user.tokens.contains(&token));

    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set("Flow Widget".into()),
        price: Set(1000),
        description: Set(String::new()),
        image: Set(None),
        category: Set("game".into()),
        sell: Set(true),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let quantity = user_service::update_cart(
        &state,
        &user,
        UpdateCartRequest {
            product: Some(product.id),
            quantity: Some(2),
        },
    )
    .await?;
    assert_eq!(quantity.result, Some(2));

    let user = auth_user(&state, &account, token.clone()).await?;
    let quantity = user_service::update_cart(
        &state,
        &user,
        UpdateCartRequest {
            product: Some(product.id),
            quantity: Some(3),
        },
    )
    .await?;
    assert_eq!(quantity.result, Some(5));

    let user = auth_user(&state, &account, token.clone()).await?;
    let order = order_service::create_order(&state, &user).await?;
    let order = order.result.expect("order");
    assert_eq!(order.cart.len(), 1);
    assert_eq!(order.cart[0].quantity, 5);
    assert!(order.cart[0].product.is_some());

    let user = auth_user(&state, &account, token.clone()).await?;
    assert!(user.user.cart.is_empty());

    let empty = order_service::create_order(&state, &user).await;
    assert!(matches!(empty, Err(AppError::BadRequest(_))));

    let orders = order_service::list_orders(&state, &user, OrderListQuery::default()).await?;
    assert_eq!(orders.result.expect("orders").items.len(), 1);

    let forbidden = order_service::list_all_orders(&state, &user, OrderListQuery::default()).await;
    assert!(matches!(forbidden, Err(AppError::Forbidden)));

    Ok(())
}

#[tokio::test]
async fn concurrent_logins_keep_every_token() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let account = fresh_account();
    auth_service::register_user(&state, register_request(&account, "crab1234")).await?;

    let credentials = || LoginRequest {
        account: account.clone(),
        password: "crab1234".into(),
    };
    let (first, second) = tokio::join!(
        auth_service::login_user(&state, credentials()),
        auth_service::login_user(&state, credentials()),
    );
    let first = first?.result.expect("first login").token;
    let second = second?.result.expect("second login").token;

    let user = auth_user(&state, &account, first.clone()).await?;
    assert!(user.user.tokens.contains(&first));
    assert!(user.user.tokens.contains(&second));
    Ok(())
}

#[tokio::test]
async fn order_uses_the_stored_cart_not_the_session_copy() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let account = fresh_account();
    auth_service::register_user(&state, register_request(&account, "crab1234")).await?;

    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set("Stale Widget".into()),
        price: Set(500),
        description: Set(String::new()),
        image: Set(None),
        category: Set("game".into()),
        sell: Set(true),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let stale = auth_user(&state, &account, String::new()).await?;
    let line = |quantity| UpdateCartRequest {
        product: Some(product.id),
        quantity: Some(quantity),
    };
    user_service::update_cart(&state, &stale, line(1)).await?;
    user_service::update_cart(&state, &stale, line(4)).await?;

    // `stale` was loaded while the cart was still empty.
    assert!(stale.user.cart.is_empty());
    let order = order_service::create_order(&state, &stale).await?;
    let order = order.result.expect("order");
    assert_eq!(order.cart.len(), 1);
    assert_eq!(order.cart[0].quantity, 5);

    let user = auth_user(&state, &account, String::new()).await?;
    assert!(user.user.cart.is_empty());
    Ok(())
}
