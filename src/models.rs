use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{
    products::Model as ProductModel,
    users::{Model as UserModel, UserRole},
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub account: String,
    pub email: String,
    pub role: UserRole,
    /// Total quantity across all cart lines.
    pub cart: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResult {
    pub token: String,
    pub account: String,
    pub email: String,
    pub role: UserRole,
    pub cart: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: i64,
    pub description: String,
    pub image: Option<String>,
    pub category: String,
    pub sell: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A cart entry with its product resolved; `product` is `None` once the
/// referenced product has been deleted.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartLine {
    pub product_id: Uuid,
    pub product: Option<Product>,
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderOwner {
    pub id: Uuid,
    pub account: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<OrderOwner>,
    pub cart: Vec<CartLine>,
    pub created_at: DateTime<Utc>,
}

impl From<&UserModel> for UserProfile {
    fn from(model: &UserModel) -> Self {
        Self {
            id: model.id,
            account: model.account.clone(),
            email: model.email.clone(),
            role: model.role,
            cart: model.cart_quantity(),
        }
    }
}

impl From<&UserModel> for OrderOwner {
    fn from(model: &UserModel) -> Self {
        Self {
            id: model.id,
            account: model.account.clone(),
        }
    }
}

impl From<ProductModel> for Product {
    fn from(model: ProductModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            price: model.price,
            description: model.description,
            image: model.image,
            category: model.category,
            sell: model.sell,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}
