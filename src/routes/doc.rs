use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        orders::OrderList,
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
        users::{CartView, LoginRequest, RegisterRequest, TokenResponse, UpdateCartRequest, UserList},
    },
    entity::users::UserRole,
    models::{CartLine, LoginResult, Order, OrderOwner, Product, UserProfile},
    response::{ApiResponse, Meta},
    routes::{health, orders, params, products, users},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        users::register,
        users::login,
        users::me,
        users::extend,
        users::logout,
        users::cart,
        users::update_cart,
        users::list_users,
        products::list_products,
        products::list_all_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        orders::create_order,
        orders::list_orders,
        orders::list_all_orders
    ),
    components(
        schemas(
            UserRole,
            UserProfile,
            LoginResult,
            Product,
            CartLine,
            Order,
            OrderOwner,
            RegisterRequest,
            LoginRequest,
            TokenResponse,
            UpdateCartRequest,
            CartView,
            UserList,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            OrderList,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<UserProfile>,
            ApiResponse<LoginResult>,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<OrderList>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Users", description = "Registration and sessions"),
        (name = "Cart", description = "Cart embedded in the user"),
        (name = "Products", description = "Product endpoints"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Admin", description = "Admin-only listings"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
