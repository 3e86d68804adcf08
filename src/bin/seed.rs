use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use shop_api::{
    config::AppConfig,
    db::{OrmConn, connect_with_retry, orm_from_pool},
    entity::{
        Products, Users,
        products::{ActiveModel as ProductActive, Column as ProdCol, PRODUCT_SCHEMA},
        users::{ActiveModel as UserActive, Column as UserCol, UserRole},
    },
    services::user_service::save_user,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = connect_with_retry(&config.database_url, config.db_connect_attempts).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    let orm = orm_from_pool(&pool);

    let admin_password = std::env::var("SEED_ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".into());
    let admin_id = ensure_account(&orm, "admin", "admin@example.com", &admin_password, UserRole::Admin).await?;
    let member_id = ensure_account(&orm, "ferris", "ferris@example.com", "ferris123", UserRole::Member).await?;
    seed_products(&orm).await?;

    println!("Seed completed. Admin ID: {admin_id}, Member ID: {member_id}");
    Ok(())
}

/// Create the account, or promote an existing one to `role`. The password
/// of an existing account is left alone.
async fn ensure_account(
    orm: &OrmConn,
    account: &str,
    email: &str,
    password: &str,
    role: UserRole,
) -> anyhow::Result<Uuid> {
    let existing = Users::find()
        .filter(UserCol::Account.eq(account))
        .one(orm)
        .await?;

    let active = match existing {
        Some(user) => {
            let mut active: UserActive = user.into();
            active.role = Set(role);
            active
        }
        None => UserActive {
            id: Set(Uuid::new_v4()),
            account: Set(account.to_string()),
            email: Set(email.to_string()),
            password: Set(password.to_string()),
            role: Set(role),
            ..Default::default()
        },
    };

    let user = save_user(orm, active)
        .await
        .map_err(|e| anyhow::anyhow!("could not save {account}: {e}"))?;
    println!("Ensured account {account} (role={role:?})");
    Ok(user.id)
}

async fn seed_products(orm: &OrmConn) -> anyhow::Result<()> {
    let products = [
        ("Axum Hoodie", "Warm hoodie for Rustaceans", 5500, "clothing", true),
        ("Ferris Mug", "Coffee tastes better with Ferris", 1200, "drink", true),
        ("Crab Cakes", "A dozen, frozen", 900, "food", true),
        ("Borrow Checker Blues", "Vinyl, limited run", 2500, "music", false),
    ];

    for (name, description, price, category, sell) in products {
        let exists = Products::find()
            .filter(ProdCol::Name.eq(name))
            .one(orm)
            .await?
            .is_some();
        if exists {
            continue;
        }

        let active = ProductActive {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            price: Set(price),
            description: Set(description.to_string()),
            image: Set(None),
            category: Set(category.to_string()),
            sell: Set(sell),
            created_at: NotSet,
            updated_at: NotSet,
        };
        PRODUCT_SCHEMA.validate(&active)?;
        active.insert(orm).await?;
    }

    println!("Seeded products");
    Ok(())
}
