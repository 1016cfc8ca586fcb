pub mod common;
pub mod files;
pub mod orders;
pub mod products;

use crate::{
    config::AppConfig,
    events::EventSender,
    services::{CatalogService, CheckoutService, FileStorageService, OrderService},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Aggregated services used by the HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<CatalogService>,
    pub orders: Arc<OrderService>,
    pub checkout: Arc<CheckoutService>,
    pub files: Arc<FileStorageService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: &AppConfig,
    ) -> Self {
        let files = Arc::new(FileStorageService::new(
            db.clone(),
            config.upload_dir.clone(),
            event_sender.clone(),
        ));
        let catalog = Arc::new(CatalogService::new(
            db.clone(),
            files.clone(),
            event_sender.clone(),
        ));
        let orders = Arc::new(OrderService::new(
            db,
            event_sender.clone(),
            config.unknown_product_policy,
        ));
        let checkout = Arc::new(CheckoutService::new(config, event_sender));

        Self {
            catalog,
            orders,
            checkout,
            files,
        }
    }
}
