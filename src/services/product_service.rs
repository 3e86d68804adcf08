use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    dto::products::{CreateProductRequest, ProductList, UpdateProductRequest},
    entity::{
        products::{ActiveModel, Column, Entity as Products, PRODUCT_SCHEMA},
        users::Cart,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{CartLine, Product},
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    schema::provided,
    state::AppState,
};

/// Which products a listing may show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    OnSale,
    All,
}

pub async fn list_products(
    state: &AppState,
    listing: Listing,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();

    if listing == Listing::OnSale {
        condition = condition.add(Column::Sell.eq(true));
    }

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    if let Some(category) = query.category.as_ref().filter(|c| !c.is_empty()) {
        condition = condition.add(Column::Category.eq(category.as_str()));
    }

    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }

    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Name => Column::Name,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    let data = ProductList { items };
    Ok(ApiResponse::success("Products", data, Some(meta)))
}

pub async fn list_all_products(
    state: &AppState,
    user: &AuthUser,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_admin(user)?;
    list_products(state, Listing::All, query).await
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let result = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(Product::from);
    let result = match result {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("Product", result, None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let mut active = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: provided(payload.name),
        price: provided(payload.price),
        description: provided(payload.description),
        image: Set(payload.image.filter(|i| !i.is_empty())),
        category: provided(payload.category),
        sell: provided(payload.sell),
        created_at: NotSet,
        updated_at: NotSet,
    };
    PRODUCT_SCHEMA.apply_defaults(&mut active);
    PRODUCT_SCHEMA.validate(&active)?;

    let product = active.insert(&state.orm).await?;
    tracing::info!(product_id = %product.id, admin_id = %user.user.id, "product created");

    Ok(ApiResponse::success(
        "Product created",
        Product::from(product),
        None,
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(image) = payload.image {
        active.image = Set(Some(image).filter(|i| !i.is_empty()));
    }
    if let Some(category) = payload.category {
        active.category = Set(category);
    }
    if let Some(sell) = payload.sell {
        active.sell = Set(sell);
    }
    PRODUCT_SCHEMA.validate(&active)?;

    active.updated_at = Set(Utc::now().into());
    let product = active.update(&state.orm).await?;
    tracing::info!(product_id = %product.id, admin_id = %user.user.id, "product updated");

    Ok(ApiResponse::success("Updated", Product::from(product), None))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Products::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    tracing::info!(product_id = %id, admin_id = %user.user.id, "product deleted");

    Ok(ApiResponse::message("Deleted"))
}

/// Fetch the given products keyed by id; unknown ids are simply absent.
pub async fn load_products<C>(conn: &C, ids: Vec<Uuid>) -> AppResult<HashMap<Uuid, Product>>
where
    C: ConnectionTrait,
{
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let products = Products::find()
        .filter(Column::Id.is_in(ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|p| (p.id, Product::from(p)))
        .collect();
    Ok(products)
}

pub fn cart_lines(cart: &Cart, products: &HashMap<Uuid, Product>) -> Vec<CartLine> {
    cart.0
        .iter()
        .map(|entry| CartLine {
            product_id: entry.product,
            product: products.get(&entry.product).cloned(),
            quantity: entry.quantity,
        })
        .collect()
}
