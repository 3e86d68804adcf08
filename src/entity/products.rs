use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;

use crate::schema::{
    Document, FieldDefault, FieldKind, FieldRule, FieldSpec, FieldValue, Rule, Schema, current,
};

pub const CATEGORIES: &[&str] = &["clothing", "food", "drink", "music", "electronics", "game"];

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub price: i64,
    pub description: String,
    pub image: Option<String>,
    pub category: String,
    pub sell: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub static PRODUCT_SCHEMA: Schema = Schema {
    name: "products",
    fields: &[
        FieldSpec::required("name", FieldKind::Text, "missing product name"),
        FieldSpec::required("price", FieldKind::Integer, "missing product price"),
        FieldSpec::optional("description", FieldKind::Text).with_default(FieldDefault::Text("")),
        FieldSpec::optional("image", FieldKind::Text),
        FieldSpec::required("category", FieldKind::Text, "missing product category"),
        FieldSpec::required("sell", FieldKind::Bool, "missing product sell status"),
    ],
    rules: &[
        FieldRule::new("price", Rule::Min(0), "product price must not be negative"),
        FieldRule::new("category", Rule::OneOf(CATEGORIES), "unknown product category"),
    ],
};

impl Document for ActiveModel {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "name" => current(&self.name).map(|v| FieldValue::Text(v)),
            "price" => current(&self.price).map(|v| FieldValue::Integer(*v)),
            "description" => current(&self.description).map(|v| FieldValue::Text(v)),
            "image" => current(&self.image)
                .and_then(|v| v.as_deref())
                .map(FieldValue::Text),
            "category" => current(&self.category).map(|v| FieldValue::Text(v)),
            "sell" => current(&self.sell).map(|v| FieldValue::Bool(*v)),
            _ => None,
        }
    }

    fn fill_default(&mut self, name: &str, default: FieldDefault) {
        if let ("description", FieldDefault::Text(text)) = (name, default) {
            self.description = Set(text.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::ActiveValue::NotSet;

    use super::*;

    fn draft() -> ActiveModel {
        ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set("Ferris Plush".into()),
            price: Set(1200),
            description: NotSet,
            image: Set(None),
            category: Set("game".into()),
            sell: Set(true),
            created_at: NotSet,
            updated_at: NotSet,
        }
    }

    #[test]
    fn complete_product_validates_and_gets_description_default() {
        let mut product = draft();
        PRODUCT_SCHEMA.apply_defaults(&mut product);
        assert_eq!(product.description, Set(String::new()));
        assert!(PRODUCT_SCHEMA.validate(&product).is_ok());
    }

    #[test]
    fn negative_price_and_unknown_category_are_rejected() {
        let mut product = draft();
        product.price = Set(-1);
        product.category = Set("weapons".into());
        let err = PRODUCT_SCHEMA.validate(&product).unwrap_err();
        assert!(err.has_field("price"));
        assert!(err.has_field("category"));
        assert_eq!(err.message(), "product price must not be negative");
    }

    #[test]
    fn missing_sell_flag_is_required() {
        let mut product = draft();
        product.sell = NotSet;
        let err = PRODUCT_SCHEMA.validate(&product).unwrap_err();
        assert_eq!(err.message(), "missing product sell status");
    }
}
