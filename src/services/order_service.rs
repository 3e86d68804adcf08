use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::orders::OrderList,
    entity::{
        Users,
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::{Column as ProdCol, Entity as Products},
        users::{ActiveModel as UserActive, Cart, Model as UserModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderOwner},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::{
        product_service::{cart_lines, load_products},
        user_service::{lock_user, save_user},
    },
    state::AppState,
};

/// Turn the caller's cart into an order and empty the cart, atomically.
pub async fn create_order(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Order>> {
    let txn = state.orm.begin().await?;
    let owner = lock_user(&txn, user.user.id).await?;

    let cart = owner.cart.clone();
    if cart.is_empty() {
        return Err(AppError::BadRequest("cart is empty".into()));
    }

    let ids = cart.products();
    let on_sale = Products::find()
        .filter(
            Condition::all()
                .add(ProdCol::Id.is_in(ids.clone()))
                .add(ProdCol::Sell.eq(true)),
        )
        .count(&txn)
        .await?;
    if on_sale as usize != ids.len() {
        return Err(AppError::BadRequest(
            "cart contains products that are not for sale".into(),
        ));
    }

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(owner.id),
        cart: Set(cart),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut active: UserActive = owner.into();
    active.cart = Set(Cart::default());
    save_user(&txn, active).await?;

    txn.commit().await?;
    tracing::info!(order_id = %order.id, user_id = %user.user.id, lines = order.cart.0.len(), "order created");

    let mut views = order_views(state, vec![(order, None)]).await?;
    let view = match views.pop() {
        Some(v) => v,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("Order created", view, None))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(OrderCol::UserId.eq(user.user.id));
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|order| (order, None))
        .collect();

    let items = order_views(state, orders).await?;
    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let total = Orders::find().count(&state.orm).await? as i64;

    let mut finder = Orders::find().find_also_related(Users);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let items = order_views(state, orders).await?;
    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

/// Resolve the products referenced by every order in one query.
async fn order_views(
    state: &AppState,
    orders: Vec<(OrderModel, Option<UserModel>)>,
) -> AppResult<Vec<Order>> {
    let mut ids: Vec<Uuid> = orders
        .iter()
        .flat_map(|(order, _)| order.cart.products())
        .collect();
    ids.sort_unstable();
    ids.dedup();

    let products = load_products(&state.orm, ids).await?;

    let views = orders
        .into_iter()
        .map(|(order, owner)| Order {
            id: order.id,
            user_id: order.user_id,
            user: owner.as_ref().map(OrderOwner::from),
            cart: cart_lines(&order.cart, &products),
            created_at: order.created_at.with_timezone(&chrono::Utc),
        })
        .collect();
    Ok(views)
}
