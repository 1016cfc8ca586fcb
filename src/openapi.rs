use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{LoginCredentials, RegisterRequest, TokenResponse};
use crate::errors::ErrorResponse;
use crate::handlers::common::MessageResponse;
use crate::handlers::orders::{
    CartLineRequest, OrderLineResponse, OrderResponse, OrderSummaryResponse, UpdateStatusRequest,
};
use crate::handlers::products::{CatalogItemResponse, ProductResponse, UpdateProductRequest};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::products::create_product,
        crate::handlers::products::get_product,
        crate::handlers::products::list_products,
        crate::handlers::products::update_product,
        crate::handlers::products::replace_product_image,
        crate::handlers::products::toggle_product_stock,
        crate::handlers::products::delete_product,
        crate::handlers::orders::create_order,
        crate::handlers::orders::get_order,
        crate::handlers::orders::order_payment,
        crate::handlers::orders::payment_from_cart,
        crate::handlers::orders::update_order_status,
        crate::handlers::files::get_file,
    ),
    components(schemas(
        ErrorResponse,
        MessageResponse,
        ProductResponse,
        CatalogItemResponse,
        UpdateProductRequest,
        CartLineRequest,
        UpdateStatusRequest,
        OrderResponse,
        OrderLineResponse,
        OrderSummaryResponse,
        LoginCredentials,
        RegisterRequest,
        TokenResponse,
    )),
    tags(
        (name = "Products", description = "Catalog management and browsing"),
        (name = "Orders", description = "Order placement and checkout"),
        (name = "Files", description = "Uploaded product photos"),
    ),
    info(
        title = "Storefront API",
        description = "Product catalog, orders, and hosted checkout sessions"
    )
)]
pub struct ApiDoc;

/// Swagger UI router, served at /swagger-ui
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
