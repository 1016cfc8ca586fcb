use crate::{
    entities::{product, Product, ProductModel},
    errors::ServiceError,
    events::{Event, EventSender},
    services::files::FileStorageService,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// An uploaded image accompanying a product create/edit request.
pub struct ImageUpload {
    pub data: Vec<u8>,
    pub content_type: String,
    pub file_name: String,
}

impl std::fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageUpload")
            .field("len", &self.data.len())
            .field("content_type", &self.content_type)
            .field("file_name", &self.file_name)
            .finish()
    }
}

#[derive(Debug)]
pub struct CreateProductInput {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub image: ImageUpload,
}

#[derive(Debug, Default)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub image: Option<ImageUpload>,
}

/// Product catalog service: admin-side CRUD plus the public read surface.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
    files: Arc<FileStorageService>,
    event_sender: Arc<EventSender>,
}

impl CatalogService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        files: Arc<FileStorageService>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            db,
            files,
            event_sender,
        }
    }

    /// Create a new product. The duplicate-name check runs before the image
    /// is written, so a rejected name performs no upload; a failed insert
    /// removes the just-stored image.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        self.ensure_unique_name(&input.name).await?;
        ensure_price_non_negative(&input.price)?;

        let image = self
            .files
            .store(
                &input.image.data,
                &input.image.content_type,
                &input.image.file_name,
            )
            .await?;

        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            description: Set(input.description),
            price: Set(input.price),
            in_stock: Set(true),
            image_id: Set(Some(image.id)),
            updated_at: Set(Utc::now()),
        };

        let created = match model.insert(&*self.db).await {
            Ok(created) => created,
            Err(e) => {
                let _ = self.files.remove(&image).await;
                return Err(ServiceError::DatabaseError(e));
            }
        };

        self.event_sender
            .send_or_log(Event::ProductCreated(created.id))
            .await;

        info!("Created product: {}", created.id);
        Ok(created)
    }

    /// Update name/description/price, optionally replacing the image. A
    /// replacement image supersedes the previous record, which is removed
    /// once the row update has landed.
    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        let existing = self.get_product(product_id).await?;
        let previous_image_id = existing.image_id;

        if let Some(ref price) = input.price {
            ensure_price_non_negative(price)?;
        }

        let new_image = match input.image {
            Some(upload) => Some(
                self.files
                    .store(&upload.data, &upload.content_type, &upload.file_name)
                    .await?,
            ),
            None => None,
        };

        let mut active: product::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(price) = input.price {
            active.price = Set(price);
        }
        if let Some(ref image) = new_image {
            active.image_id = Set(Some(image.id));
        }
        active.updated_at = Set(Utc::now());

        let updated = match active.update(&*self.db).await {
            Ok(updated) => updated,
            Err(e) => {
                if let Some(ref image) = new_image {
                    let _ = self.files.remove(image).await;
                }
                return Err(ServiceError::DatabaseError(e));
            }
        };

        if new_image.is_some() {
            if let Some(old_id) = previous_image_id {
                if let Ok(old) = self.files.get(old_id).await {
                    let _ = self.files.remove(&old).await;
                }
            }
        }

        self.event_sender
            .send_or_log(Event::ProductUpdated(product_id))
            .await;

        info!("Updated product: {}", product_id);
        Ok(updated)
    }

    /// Flip the in-stock flag.
    #[instrument(skip(self))]
    pub async fn toggle_stock(&self, product_id: Uuid) -> Result<ProductModel, ServiceError> {
        let product = self.get_product(product_id).await?;
        let in_stock = !product.in_stock;

        let mut active: product::ActiveModel = product.into();
        active.in_stock = Set(in_stock);
        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ProductStockToggled {
                product_id,
                in_stock,
            })
            .await;

        Ok(updated)
    }

    /// Get a product by ID
    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductModel, ServiceError> {
        Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("id", "invalid product id"))
    }

    /// List the whole catalog, newest first.
    pub async fn list_products(&self) -> Result<Vec<ProductModel>, ServiceError> {
        Product::find()
            .order_by_desc(product::Column::UpdatedAt)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    /// Delete a product and detach + remove its stored image.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, product_id: Uuid) -> Result<(), ServiceError> {
        let product = self.get_product(product_id).await?;
        let image_id = product.image_id;

        let active: product::ActiveModel = product.into();
        active.delete(&*self.db).await?;

        if let Some(image_id) = image_id {
            if let Ok(image) = self.files.get(image_id).await {
                let _ = self.files.remove(&image).await;
            }
        }

        self.event_sender
            .send_or_log(Event::ProductDeleted(product_id))
            .await;

        info!("Deleted product {}", product_id);
        Ok(())
    }

    async fn ensure_unique_name(&self, name: &str) -> Result<(), ServiceError> {
        let existing = Product::find()
            .filter(product::Column::Name.eq(name))
            .one(&*self.db)
            .await?;

        if existing.is_some() {
            return Err(ServiceError::validation(
                "product name",
                "invalid product name or product with such name already exists",
            ));
        }

        Ok(())
    }
}

fn ensure_price_non_negative(price: &Decimal) -> Result<(), ServiceError> {
    if *price < Decimal::ZERO {
        return Err(ServiceError::validation("price", "price cannot be negative"));
    }
    Ok(())
}
