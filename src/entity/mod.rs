pub mod orders;
pub mod products;
pub mod users;

pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use users::Entity as Users;
