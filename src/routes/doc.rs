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
    cart::Cart,
    dto::{
        auth::AuthResponse,
        cart::{
            AddToCartRequest, AddToCartResponse, LogoutResponse, RemoveFromCartRequest,
            RemoveFromCartResponse,
        },
        orders::{CreateOrderRequest, CreateOrderResponse},
        products::ProductList,
    },
    models::{Order, OrderItem, Product},
    response::{ApiResponse, Meta},
    routes::{auth, cart, health, orders, params, products},
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
        auth::register,
        auth::login,
        cart::add_to_cart,
        cart::remove_from_cart,
        cart::get_cart,
        cart::logout,
        orders::create_order,
        products::list_products,
        products::get_product
    ),
    components(
        schemas(
            Product,
            Order,
            OrderItem,
            Cart,
            AddToCartRequest,
            AddToCartResponse,
            RemoveFromCartRequest,
            RemoveFromCartResponse,
            LogoutResponse,
            AuthResponse,
            CreateOrderRequest,
            CreateOrderResponse,
            ProductList,
            params::Pagination,
            params::ProductQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Cart", description = "Cart endpoints (legacy wire format)"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Products", description = "Catalog endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
