use crate::auth::{AuthRouterExt, AuthenticatedUser, ROLE_ADMIN};
use crate::handlers::common::{map_service_error, success_response};
use crate::handlers::products::CatalogItemResponse;
use crate::{
    entities::{OrderModel, OrderStatus},
    errors::ApiError,
    services::orders::{CartLine, OrderDetails},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    routing::{get, post, put},
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Creates the router for order endpoints. Guest checkout is the only
/// anonymous route; status writes are admin-only.
pub fn orders_routes() -> Router<AppState> {
    let admin = Router::new()
        .route("/:id/status", put(update_order_status))
        .with_role(ROLE_ADMIN);

    let authenticated = Router::new()
        .route("/", post(create_order))
        .route("/:id", get(get_order))
        .route("/payment/:id", get(order_payment))
        .with_auth();

    Router::new()
        .route("/paymentfromcart", post(payment_from_cart))
        .merge(authenticated)
        .merge(admin)
}

fn to_cart_lines(payload: &[CartLineRequest]) -> Result<Vec<CartLine>, ApiError> {
    payload
        .iter()
        .map(|line| {
            if line.quantity <= 0 {
                return Err(ApiError::ValidationError(
                    "quantity must be a positive integer".to_string(),
                ));
            }
            Ok(CartLine {
                product_id: line.product_id,
                quantity: line.quantity,
            })
        })
        .collect()
}

/// Create an order from the submitted cart
#[utoipa::path(
    post,
    path = "/api/v1/order",
    request_body = [CartLineRequest],
    responses(
        (status = 200, description = "Order created", body = OrderResponse),
        (status = 401, description = "No session", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub(crate) async fn create_order(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Json(payload): Json<Vec<CartLineRequest>>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let lines = to_cart_lines(&payload)?;

    let details = state
        .services
        .orders
        .create_order(user.user_id, &lines)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(OrderResponse::from(details)))
}

/// Get one of the caller's orders
#[utoipa::path(
    get,
    path = "/api/v1/order/:id",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order retrieved", body = OrderResponse),
        (status = 400, description = "Unknown order id", body = crate::errors::ErrorResponse),
        (status = 401, description = "No session", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub(crate) async fn get_order(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let details = state
        .services
        .orders
        .get_order_for_user(user.user_id, id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(OrderResponse::from(details)))
}

/// Pay for an existing order: returns the hosted-checkout redirect URL
#[utoipa::path(
    get,
    path = "/api/v1/order/payment/:id",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Checkout redirect URL", body = String),
        (status = 400, description = "Unknown order id", body = crate::errors::ErrorResponse),
        (status = 401, description = "No session", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub(crate) async fn order_payment(
    user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    // The local order and identity checks run before any provider call.
    let email = user.email.clone().ok_or_else(|| {
        map_service_error(crate::errors::ServiceError::Unauthorized(
            "user session had been expired".to_string(),
        ))
    })?;

    let details = state
        .services
        .orders
        .get_order_for_user(user.user_id, id)
        .await
        .map_err(map_service_error)?;

    let url = state
        .services
        .checkout
        .session_for_order(&details, email)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(url))
}

/// Guest checkout straight from a client-side cart; no order is persisted
#[utoipa::path(
    post,
    path = "/api/v1/order/paymentfromcart",
    request_body = [CartLineRequest],
    responses(
        (status = 200, description = "Checkout redirect URL", body = String),
        (status = 502, description = "Payment provider failure", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub(crate) async fn payment_from_cart(
    State(state): State<AppState>,
    Json(payload): Json<Vec<CartLineRequest>>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let lines = to_cart_lines(&payload)?;

    let resolved = state
        .services
        .orders
        .resolve_cart_lines(&lines)
        .await
        .map_err(map_service_error)?;

    let url = state
        .services
        .checkout
        .session_for_cart(&resolved)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(url))
}

/// Drive the order lifecycle (admin)
#[utoipa::path(
    put,
    path = "/api/v1/order/:id/status",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = OrderSummaryResponse),
        (status = 400, description = "Unknown order id or illegal transition", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub(crate) async fn update_order_status(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .update_status(id, payload.status)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(OrderSummaryResponse::from(order)))
}

// Request/Response DTOs

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CartLineRequest {
    pub product_id: Uuid,
    /// Requested amount; must be positive
    #[schema(example = 2)]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderLineResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub quantity: i32,
    pub product: CatalogItemResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    #[schema(example = "39.98")]
    pub total_amount: Decimal,
    pub comment: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub products: Vec<OrderLineResponse>,
}

impl From<OrderDetails> for OrderResponse {
    fn from(details: OrderDetails) -> Self {
        let products = details
            .lines
            .into_iter()
            .map(|line| OrderLineResponse {
                id: line.item.id,
                order_id: line.item.order_id,
                quantity: line.item.quantity,
                product: CatalogItemResponse::from(line.product),
            })
            .collect();

        Self {
            id: details.order.id,
            user_id: details.order.user_id,
            status: details.order.status,
            total_amount: details.order.total_amount,
            comment: details.order.comment,
            created_at: details.order.created_at,
            products,
        }
    }
}

/// Order projection without line items, used where lines are not loaded.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderSummaryResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<OrderModel> for OrderSummaryResponse {
    fn from(order: OrderModel) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            status: order.status,
            total_amount: order.total_amount,
            created_at: order.created_at,
        }
    }
}
