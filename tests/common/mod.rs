use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, http::Request, response::Response, Router};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use storefront_api::{
    auth::{AuthConfig, AuthService},
    config::AppConfig,
    db,
    entities::{product, user, ProductModel, UserModel},
    events::{self, EventSender},
    handlers::AppServices,
    AppState,
};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// Helper harness spinning up application state backed by a throwaway SQLite
/// database and upload directory.
pub struct TestApp {
    pub state: AppState,
    pub auth_service: Arc<AuthService>,
    router: Router,
    _dir: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Construct a test application, letting the caller adjust configuration
    /// (e.g. point the payment API at a mock server) before services spin up.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let db_path = dir.path().join("storefront_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "test_secret_key_for_testing_purposes_only_32chars",
            "127.0.0.1",
            18_080,
            "development",
        );
        cfg.upload_dir = dir
            .path()
            .join("uploads")
            .to_string_lossy()
            .into_owned();
        adjust(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        let db_arc = Arc::new(pool);

        db::ensure_schema(&db_arc)
            .await
            .expect("failed to create test schema");

        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let auth_cfg = AuthConfig::new(
            cfg.jwt_secret.clone(),
            cfg.auth_issuer.clone(),
            cfg.auth_audience.clone(),
            Duration::from_secs(cfg.jwt_expiration as u64),
        );
        let auth_service = Arc::new(AuthService::new(auth_cfg, db_arc.clone()));

        let services = AppServices::new(db_arc.clone(), Arc::new(event_sender.clone()), &cfg);

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
            auth: auth_service.clone(),
        };

        let router = Router::new()
            .nest("/api/v1", storefront_api::api_v1_routes())
            .nest_service(
                "/auth",
                storefront_api::auth::auth_routes().with_state(auth_service.clone()),
            )
            .layer(axum::middleware::from_fn_with_state(
                auth_service.clone(),
                |axum::extract::State(auth): axum::extract::State<Arc<AuthService>>,
                 mut req: axum::http::Request<axum::body::Body>,
                 next: axum::middleware::Next| async move {
                    req.extensions_mut().insert(auth);
                    next.run(req).await
                },
            ))
            .with_state(state.clone());

        Self {
            state,
            auth_service,
            router,
            _dir: dir,
            _event_task: event_task,
        }
    }

    /// Send one request through the router.
    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("request failed")
    }

    /// Create a user row with the given role and return it with a bearer
    /// token.
    pub async fn create_user(&self, email: &str, role: &str) -> (UserModel, String) {
        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.to_string()),
            name: Set("Test User".to_string()),
            // Argon2 hash of "correct horse battery staple"; tests that log
            // in go through register_user instead.
            password_hash: Set("$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHQ$placeholder".to_string()),
            role: Set(role.to_string()),
            is_active: Set(true),
            created_at: Set(Utc::now()),
        };
        let user = model
            .insert(&*self.state.db)
            .await
            .expect("failed to insert user");

        let token = self
            .auth_service
            .generate_token(&user)
            .expect("failed to generate token")
            .access_token;

        (user, token)
    }
}

/// Insert a catalog product directly, bypassing the upload path.
pub async fn insert_product(
    app: &TestApp,
    name: &str,
    price: Decimal,
    image_id: Option<Uuid>,
) -> ProductModel {
    let model = product::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(format!("{} description", name)),
        price: Set(price),
        in_stock: Set(true),
        image_id: Set(image_id),
        updated_at: Set(Utc::now()),
    };

    model
        .insert(&*app.state.db)
        .await
        .expect("failed to insert product")
}
