use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ConnectionTrait, EntityTrait, PaginatorTrait, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::users::{CartView, UpdateCartRequest, UserList},
    entity::{
        Products, Users,
        products::Model as ProductModel,
        users::{
            self, ActiveModel as UserActive, CART_ENTRY_SCHEMA, Cart, Model as UserModel,
            USER_SCHEMA,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::UserProfile,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    schema::ValidationError,
    services::product_service::{cart_lines, load_products},
    state::AppState,
};

/// Persist a user document.
///
/// Every write goes through [`users::before_save`]. A document whose id is
/// still `Set` is new and inserted; one loaded from the store is updated.
/// Unique index violations come back as validation errors on the field.
pub async fn save_user<C>(conn: &C, active: UserActive) -> AppResult<UserModel>
where
    C: ConnectionTrait,
{
    let mut active = users::before_save(active)?;
    let result = if matches!(active.id, ActiveValue::Unchanged(_)) {
        active.updated_at = Set(Utc::now().into());
        active.update(conn).await
    } else {
        active.insert(conn).await
    };

    result.map_err(|err| match USER_SCHEMA.unique_violation(&err) {
        Some(validation) => AppError::Validation(validation),
        None => AppError::OrmError(err),
    })
}

pub fn profile(user: &AuthUser) -> ApiResponse<UserProfile> {
    ApiResponse::success("OK", UserProfile::from(&user.user), None)
}

pub async fn get_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let products = load_products(&state.orm, user.user.cart.products()).await?;
    let items = cart_lines(&user.user.cart, &products);
    Ok(ApiResponse::success("OK", CartView { items }, None))
}

/// Load a user and hold its row lock until the surrounding transaction ends,
/// so embedded documents are read and rewritten as one unit.
pub async fn lock_user<C>(conn: &C, id: Uuid) -> AppResult<UserModel>
where
    C: ConnectionTrait,
{
    Users::find_by_id(id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| AppError::Unauthorized("invalid token".into()))
}

fn quantity_out_of_range() -> AppError {
    ValidationError::single("quantity", "product quantity out of range").into()
}

/// Total cart quantity, rejecting carts whose total no longer fits.
pub fn checked_total(cart: &Cart) -> AppResult<i32> {
    cart.checked_quantity().ok_or_else(quantity_out_of_range)
}

/// Rejects an increase that would push the cart total past `i32::MAX`.
pub fn ensure_room(cart: &Cart, delta: i32) -> AppResult<()> {
    if delta > 0 {
        checked_total(cart)?
            .checked_add(delta)
            .ok_or_else(quantity_out_of_range)?;
    }
    Ok(())
}

/// Adjust the caller's cart and return the new total quantity.
pub async fn update_cart(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateCartRequest,
) -> AppResult<ApiResponse<i32>> {
    let product_id = CART_ENTRY_SCHEMA.require("product", payload.product)?;
    let quantity = CART_ENTRY_SCHEMA.require("quantity", payload.quantity)?;

    let txn = state.orm.begin().await?;
    let current = lock_user(&txn, user.user.id).await?;

    ensure_room(&current.cart, quantity)?;
    let mut cart = current.cart.clone();
    if !cart.adjust(product_id, quantity) {
        if quantity <= 0 {
            return Err(AppError::BadRequest(
                "quantity must be greater than 0".to_string(),
            ));
        }
        let product: Option<ProductModel> = Products::find_by_id(product_id).one(&txn).await?;
        match product {
            Some(p) if p.sell => cart.push(p.id, quantity),
            _ => return Err(AppError::NotFound),
        }
    }
    let total = checked_total(&cart)?;

    let mut active: UserActive = current.into();
    active.cart = Set(cart);
    let saved = save_user(&txn, active).await?;
    txn.commit().await?;

    tracing::debug!(user_id = %saved.id, product_id = %product_id, quantity, "cart updated");
    Ok(ApiResponse::success("OK", total, None))
}

pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = Users::find().order_by_desc(users::Column::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .iter()
        .map(UserProfile::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Users", UserList { items }, Some(meta)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_total_accepts_the_largest_total() {
        let mut cart = Cart::default();
        cart.push(Uuid::new_v4(), i32::MAX - 1);
        cart.push(Uuid::new_v4(), 1);
        assert_eq!(checked_total(&cart).unwrap(), i32::MAX);
    }

    #[test]
    fn checked_total_rejects_overflow_as_validation() {
        let mut cart = Cart::default();
        cart.push(Uuid::new_v4(), i32::MAX);
        cart.push(Uuid::new_v4(), 1);
        match checked_total(&cart) {
            Err(AppError::Validation(err)) => {
                assert!(err.has_field("quantity"));
                assert_eq!(err.message(), "product quantity out of range");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn full_line_cannot_grow() {
        let product = Uuid::new_v4();
        let mut cart = Cart::default();
        cart.push(product, i32::MAX);

        assert!(matches!(ensure_room(&cart, 1), Err(AppError::Validation(_))));
        assert!(ensure_room(&cart, 0).is_ok());
        assert!(ensure_room(&cart, -5).is_ok());
    }
}
