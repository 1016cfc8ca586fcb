//! Storefront API Library
//!
//! Product catalog, order placement, image upload, and hosted checkout
//! sessions behind a JSON API.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod openapi;
pub mod services;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
    pub auth: Arc<auth::AuthService>,
}

/// The versioned API surface: catalog, orders, and uploaded files.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/product", handlers::products::products_routes())
        .nest("/order", handlers::orders::orders_routes())
        .nest("/file", handlers::files::files_routes())
}
