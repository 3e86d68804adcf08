use sea_orm::ActiveValue::{self, Set};
use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    password::hash_password,
    schema::{
        Document, FieldDefault, FieldKind, FieldRule, FieldSpec, FieldValue, Rule, Schema,
        ValidationError, current,
    },
};

pub const PASSWORD_MIN_LEN: usize = 4;
pub const PASSWORD_MAX_LEN: usize = 20;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "i16", db_type = "SmallInteger")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    #[sea_orm(num_value = 0)]
    Member,
    #[sea_orm(num_value = 1)]
    Admin,
}

impl UserRole {
    pub fn number(self) -> i64 {
        match self {
            UserRole::Member => 0,
            UserRole::Admin => 1,
        }
    }

    pub fn from_number(value: i64) -> Self {
        match value {
            1 => UserRole::Admin,
            _ => UserRole::Member,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartEntry {
    pub product: Uuid,
    pub quantity: i32,
}

/// Cart lines embedded in the owning user row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct Cart(pub Vec<CartEntry>);

impl Cart {
    /// Total across lines, saturating at `i32::MAX`.
    pub fn quantity(&self) -> i32 {
        self.0
            .iter()
            .fold(0i32, |total, entry| total.saturating_add(entry.quantity))
    }

    /// Total across lines, or `None` when it does not fit in an `i32`.
    pub fn checked_quantity(&self) -> Option<i32> {
        self.0
            .iter()
            .try_fold(0i32, |total, entry| total.checked_add(entry.quantity))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn products(&self) -> Vec<Uuid> {
        self.0.iter().map(|entry| entry.product).collect()
    }

    /// Shift an existing line by `delta`, dropping it once it reaches zero.
    /// Returns `false` when the product is not in the cart.
    pub fn adjust(&mut self, product: Uuid, delta: i32) -> bool {
        let Some(index) = self.0.iter().position(|entry| entry.product == product) else {
            return false;
        };
        let quantity = self.0[index].quantity.saturating_add(delta);
        if quantity <= 0 {
            self.0.remove(index);
        } else {
            self.0[index].quantity = quantity;
        }
        true
    }

    pub fn push(&mut self, product: Uuid, quantity: i32) {
        self.0.push(CartEntry { product, quantity });
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct TokenList(pub Vec<String>);

impl TokenList {
    pub fn contains(&self, token: &str) -> bool {
        self.0.iter().any(|t| t == token)
    }

    pub fn push(&mut self, token: String) {
        self.0.push(token);
    }

    pub fn remove(&mut self, token: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|t| t != token);
        self.0.len() != before
    }

    pub fn replace(&mut self, old: &str, new: String) -> bool {
        match self.0.iter_mut().find(|t| t.as_str() == old) {
            Some(slot) => {
                *slot = new;
                true
            }
            None => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub account: String,
    #[sea_orm(unique)]
    pub email: String,
    pub password: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub tokens: TokenList,
    #[sea_orm(column_type = "JsonBinary")]
    pub cart: Cart,
    pub role: UserRole,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn cart_quantity(&self) -> i32 {
        self.cart.quantity()
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::orders::Entity")]
    Orders,
}

impl Related<super::orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub static USER_SCHEMA: Schema = Schema {
    name: "users",
    fields: &[
        FieldSpec::required("account", FieldKind::Text, "missing account"),
        FieldSpec::required("email", FieldKind::Text, "missing email"),
        FieldSpec::required("password", FieldKind::Text, "missing password"),
        FieldSpec::optional("tokens", FieldKind::List).with_default(FieldDefault::EmptyList),
        FieldSpec::optional("cart", FieldKind::List).with_default(FieldDefault::EmptyList),
        FieldSpec::optional("role", FieldKind::Integer).with_default(FieldDefault::Integer(0)),
    ],
    rules: &[
        FieldRule::new("account", Rule::MinLength(4), "account length out of range"),
        FieldRule::new("account", Rule::MaxLength(20), "account length out of range"),
        FieldRule::new("account", Rule::Alphanumeric, "account must be alphanumeric"),
        FieldRule::new("account", Rule::Unique, "account already exists"),
        FieldRule::new("email", Rule::Email, "invalid email"),
        FieldRule::new("email", Rule::Unique, "email already exists"),
    ],
};

pub static CART_ENTRY_SCHEMA: Schema = Schema {
    name: "cart",
    fields: &[
        FieldSpec::required("product", FieldKind::Reference, "missing product"),
        FieldSpec::required("quantity", FieldKind::Integer, "missing product quantity"),
    ],
    rules: &[],
};

impl Document for ActiveModel {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "account" => current(&self.account).map(|v| FieldValue::Text(v)),
            "email" => current(&self.email).map(|v| FieldValue::Text(v)),
            "password" => current(&self.password).map(|v| FieldValue::Text(v)),
            "tokens" => current(&self.tokens).map(|v| FieldValue::List(v.0.len())),
            "cart" => current(&self.cart).map(|v| FieldValue::List(v.0.len())),
            "role" => current(&self.role).map(|v| FieldValue::Integer(v.number())),
            _ => None,
        }
    }

    fn fill_default(&mut self, name: &str, default: FieldDefault) {
        match (name, default) {
            ("tokens", FieldDefault::EmptyList) => self.tokens = Set(TokenList::default()),
            ("cart", FieldDefault::EmptyList) => self.cart = Set(Cart::default()),
            ("role", FieldDefault::Integer(value)) => self.role = Set(UserRole::from_number(value)),
            _ => {}
        }
    }
}

/// Pre-persistence stage run before every user write.
///
/// Defaults and field rules are applied first. A password that is `Set`
/// (modified in this save) is length-checked and replaced by its hash; an
/// `Unchanged` password is left exactly as loaded.
pub fn before_save(mut active: ActiveModel) -> AppResult<ActiveModel> {
    USER_SCHEMA.apply_defaults(&mut active);
    USER_SCHEMA.validate(&active)?;

    if let ActiveValue::Set(plain) = &active.password {
        // Counted in UTF-16 code units, matching browser-side `length` checks.
        let length = plain.encode_utf16().count();
        if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&length) {
            return Err(ValidationError::single("password", "password length out of range").into());
        }
        let hashed = hash_password(plain)?;
        active.password = Set(hashed);
    }

    Ok(active)
}
