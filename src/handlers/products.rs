use crate::auth::{AuthRouterExt, AuthenticatedUser, ROLE_ADMIN};
use crate::handlers::common::{
    map_service_error, success_response, validate_input, MessageResponse,
};
use crate::{
    entities::ProductModel,
    errors::ApiError,
    services::catalog::{CreateProductInput, ImageUpload, UpdateProductInput},
    AppState,
};
use axum::{
    extract::{Json, Multipart, Path, State},
    routing::{delete, get, post},
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for product endpoints. Reads are public; mutation is
/// admin-only.
pub fn products_routes() -> Router<AppState> {
    let admin = Router::new()
        .route("/", post(create_product))
        .route("/edit/:id", post(update_product))
        .route("/:id/image", post(replace_product_image))
        .route("/:id/stock", post(toggle_product_stock))
        .route("/:id", delete(delete_product))
        .with_role(ROLE_ADMIN);

    Router::new()
        .route("/", get(list_products))
        .route("/:id", get(get_product))
        .merge(admin)
}

/// Create a new product from a multipart form (name, description, price,
/// image file).
#[utoipa::path(
    post,
    path = "/api/v1/product",
    responses(
        (status = 200, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid payload or duplicate name", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub(crate) async fn create_product(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let form = ProductForm::from_multipart(multipart).await?;

    let name = form
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::ValidationError("name is required".to_string()))?;
    let price = form
        .price
        .ok_or_else(|| ApiError::ValidationError("price is required".to_string()))?;
    let image = form
        .image
        .ok_or_else(|| ApiError::ValidationError("image is required".to_string()))?;

    let input = CreateProductInput {
        name: name.trim().to_string(),
        description: form.description.unwrap_or_default(),
        price,
        image,
    };

    let product = state
        .services
        .catalog
        .create_product(input)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ProductResponse::from(product)))
}

/// Get a product by ID
#[utoipa::path(
    get,
    path = "/api/v1/product/:id",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product retrieved", body = ProductResponse),
        (status = 400, description = "Unknown product id", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub(crate) async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let product = state
        .services
        .catalog
        .get_product(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ProductResponse::from(product)))
}

/// List the catalog
#[utoipa::path(
    get,
    path = "/api/v1/product",
    responses(
        (status = 200, description = "Catalog summaries", body = [CatalogItemResponse])
    ),
    tag = "Products"
)]
pub(crate) async fn list_products(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let products = state
        .services
        .catalog
        .list_products()
        .await
        .map_err(map_service_error)?;

    let items: Vec<CatalogItemResponse> = products
        .into_iter()
        .map(CatalogItemResponse::from)
        .collect();

    Ok(success_response(items))
}

/// Edit a product's name, description, or price
#[utoipa::path(
    post,
    path = "/api/v1/product/edit/:id",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 400, description = "Unknown product id", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub(crate) async fn update_product(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = UpdateProductInput {
        name: payload.name.map(|n| n.trim().to_string()),
        description: payload.description,
        price: payload.price,
        image: None,
    };

    let product = state
        .services
        .catalog
        .update_product(id, input)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ProductResponse::from(product)))
}

/// Replace a product's photo
#[utoipa::path(
    post,
    path = "/api/v1/product/:id/image",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product image replaced", body = ProductResponse),
        (status = 400, description = "Unknown product id", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub(crate) async fn replace_product_image(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let form = ProductForm::from_multipart(multipart).await?;
    let image = form
        .image
        .ok_or_else(|| ApiError::ValidationError("image is required".to_string()))?;

    let input = UpdateProductInput {
        image: Some(image),
        ..Default::default()
    };

    let product = state
        .services
        .catalog
        .update_product(id, input)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ProductResponse::from(product)))
}

/// Toggle the in-stock flag
#[utoipa::path(
    post,
    path = "/api/v1/product/:id/stock",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Stock flag toggled", body = ProductResponse),
        (status = 400, description = "Unknown product id", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub(crate) async fn toggle_product_stock(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let product = state
        .services
        .catalog
        .toggle_stock(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ProductResponse::from(product)))
}

/// Delete a product
#[utoipa::path(
    delete,
    path = "/api/v1/product/:id",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product deleted", body = MessageResponse),
        (status = 400, description = "Unknown product id", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub(crate) async fn delete_product(
    _user: AuthenticatedUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .catalog
        .delete_product(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(MessageResponse {
        message: format!("product {} deleted", id),
    }))
}

/// Fields collected from a product multipart form.
#[derive(Default)]
struct ProductForm {
    name: Option<String>,
    description: Option<String>,
    price: Option<Decimal>,
    image: Option<ImageUpload>,
}

impl ProductForm {
    async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::ValidationError(format!("invalid multipart body: {}", e)))?
        {
            let field_name = field.name().map(str::to_string);
            match field_name.as_deref() {
                Some("name") => {
                    form.name = Some(field.text().await.map_err(|e| {
                        ApiError::ValidationError(format!("invalid name field: {}", e))
                    })?);
                }
                Some("description") => {
                    form.description = Some(field.text().await.map_err(|e| {
                        ApiError::ValidationError(format!("invalid description field: {}", e))
                    })?);
                }
                Some("price") => {
                    let raw = field.text().await.map_err(|e| {
                        ApiError::ValidationError(format!("invalid price field: {}", e))
                    })?;
                    let price = raw.trim().parse::<Decimal>().map_err(|_| {
                        ApiError::ValidationError(format!("price is not a number: {}", raw))
                    })?;
                    form.price = Some(price);
                }
                Some("image") => {
                    let file_name = field.file_name().unwrap_or("upload").to_string();
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| {
                            ApiError::ValidationError(format!("invalid image field: {}", e))
                        })?
                        .to_vec();
                    form.image = Some(ImageUpload {
                        data,
                        content_type,
                        file_name,
                    });
                }
                _ => {}
            }
        }

        Ok(form)
    }
}

// Request/Response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    /// Product UUID
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[schema(example = "19.99")]
    pub price: Decimal,
    pub in_stock: bool,
    /// Relative URL of the product photo
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<ProductModel> for ProductResponse {
    fn from(model: ProductModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            price: model.price,
            in_stock: model.in_stock,
            image_url: model.image_id.map(file_url),
            updated_at: model.updated_at,
        }
    }
}

/// Compact catalog listing entry
#[derive(Debug, Serialize, ToSchema)]
pub struct CatalogItemResponse {
    pub id: Uuid,
    pub name: String,
    #[schema(example = "19.99")]
    pub price: Decimal,
    pub in_stock: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl From<ProductModel> for CatalogItemResponse {
    fn from(model: ProductModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            price: model.price,
            in_stock: model.in_stock,
            image_url: model.image_id.map(file_url),
        }
    }
}

pub(crate) fn file_url(file_id: Uuid) -> String {
    format!("/api/v1/file/{}", file_id)
}
