use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{CartLine, UserProfile};

/// Fields stay optional so a missing one is reported by the user schema.
#[derive(Deserialize, Debug, ToSchema)]
pub struct RegisterRequest {
    pub account: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct LoginRequest {
    pub account: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct UpdateCartRequest {
    pub product: Option<Uuid>,
    /// Added to an existing line, or the quantity of a new one.
    pub quantity: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CartView {
    #[schema(value_type = Vec<CartLine>)]
    pub items: Vec<CartLine>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct UserList {
    #[schema(value_type = Vec<UserProfile>)]
    pub items: Vec<UserProfile>,
}
