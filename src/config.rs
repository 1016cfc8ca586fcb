use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_UPLOAD_DIR: &str = "Resources/ProductsPhotos";
const DEFAULT_CHECKOUT_CURRENCY: &str = "eur";
const DEFAULT_PAYMENT_API_BASE: &str = "https://api.stripe.com";
const DEV_DEFAULT_JWT_SECRET: &str =
    "this_is_a_development_secret_key_that_is_at_least_64_characters_long_for_testing";

/// Policy applied when a cart references a product id that is not in the
/// catalog: `drop` silently omits the line, `reject` fails the request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownProductPolicy {
    Drop,
    Reject,
}

impl Default for UnknownProductPolicy {
    fn default() -> Self {
        Self::Drop
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// JWT secret key (minimum 32 characters)
    #[validate(length(min = 32))]
    pub jwt_secret: String,

    /// JWT access-token expiration time in seconds
    pub jwt_expiration: usize,

    /// JWT issuer
    #[serde(default = "default_auth_issuer")]
    pub auth_issuer: String,

    /// JWT audience
    #[serde(default = "default_auth_audience")]
    pub auth_audience: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Directory product photos are written to
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,

    /// Public base URL used when handing absolute image links to the
    /// payment provider (e.g. "https://shop.example.com")
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// Payment provider secret key. Injected into the checkout service at
    /// construction; never read from process-wide state.
    pub payment_secret_key: String,

    /// Payment provider API base URL
    #[serde(default = "default_payment_api_base")]
    pub payment_api_base: String,

    /// Currency code for checkout session line items
    #[serde(default = "default_checkout_currency")]
    #[validate(length(equal = 3))]
    pub checkout_currency: String,

    /// Redirect target after a completed payment
    #[serde(default = "default_checkout_success_url")]
    pub checkout_success_url: String,

    /// Redirect target after an abandoned payment
    #[serde(default = "default_checkout_cancel_url")]
    pub checkout_cancel_url: String,

    /// What to do with cart lines whose product id is unknown
    #[serde(default)]
    pub unknown_product_policy: UnknownProductPolicy,

    /// Event channel capacity for async event processing
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_auth_issuer() -> String {
    "storefront-api".to_string()
}

fn default_auth_audience() -> String {
    "storefront-clients".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_min_connections() -> u32 {
    1
}

fn default_db_connect_timeout_secs() -> u64 {
    30
}

fn default_db_idle_timeout_secs() -> u64 {
    600
}

fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_upload_dir() -> String {
    DEFAULT_UPLOAD_DIR.to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_payment_api_base() -> String {
    DEFAULT_PAYMENT_API_BASE.to_string()
}

fn default_checkout_currency() -> String {
    DEFAULT_CHECKOUT_CURRENCY.to_string()
}

fn default_checkout_success_url() -> String {
    "http://localhost:8080/success".to_string()
}

fn default_checkout_cancel_url() -> String {
    "http://localhost:8080/cancel".to_string()
}

fn default_event_channel_capacity() -> usize {
    1024
}

impl AppConfig {
    /// Construct a configuration programmatically (used by tests); fields not
    /// listed here take their serde defaults.
    pub fn new(
        database_url: impl Into<String>,
        jwt_secret: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            database_url: database_url.into(),
            jwt_secret: jwt_secret.into(),
            jwt_expiration: 3600,
            auth_issuer: default_auth_issuer(),
            auth_audience: default_auth_audience(),
            host: host.into(),
            port,
            environment: environment.into(),
            log_level: default_log_level(),
            log_json: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            upload_dir: default_upload_dir(),
            public_base_url: default_public_base_url(),
            payment_secret_key: "sk_test_placeholder".to_string(),
            payment_api_base: default_payment_api_base(),
            checkout_currency: default_checkout_currency(),
            checkout_success_url: default_checkout_success_url(),
            checkout_cancel_url: default_checkout_cancel_url(),
            unknown_product_policy: UnknownProductPolicy::default(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Returns true if explicit CORS origins are configured
    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    /// Whether we should fall back to permissive CORS
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.should_allow_permissive_cors() && !self.has_cors_allowed_origins() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message = Some(
                "Set APP__CORS_ALLOWED_ORIGINS for non-development environments or opt-in via APP__CORS_ALLOW_ANY_ORIGIN=true".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        if !self.is_development() && self.jwt_secret.trim() == DEV_DEFAULT_JWT_SECRET {
            let mut err = ValidationError::new("jwt_secret_default_dev");
            err.message = Some(
                "The bundled development JWT secret must not be used outside development. Set APP__JWT_SECRET to a unique value.".into(),
            );
            errors.add("jwt_secret", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),
    #[error("configuration validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("storefront_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Default config (config/default.toml)
/// 2. Environment-specific config (config/{env}.toml)
/// 3. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    // jwt_secret and payment_secret_key have no defaults: they MUST come from
    // a config file or the environment.
    let builder = Config::builder()
        .set_default("database_url", "sqlite://storefront.db?mode=rwc")?
        .set_default("jwt_expiration", 3600)?
        .set_default("host", "0.0.0.0")?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false));

    let config = builder
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    if config.get_string("jwt_secret").is_err() {
        error!("JWT secret is not configured. Set APP__JWT_SECRET to a secure random string (minimum 32 characters).");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "jwt_secret is required but not configured".into(),
        )));
    }

    if config.get_string("payment_secret_key").is_err() {
        error!("Payment provider secret is not configured. Set APP__PAYMENT_SECRET_KEY.");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "payment_secret_key is required but not configured".into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:",
            "test_secret_key_for_testing_purposes_only_32chars",
            "127.0.0.1",
            18_080,
            "development",
        )
    }

    #[test]
    fn development_allows_permissive_cors() {
        let cfg = base_config();
        assert!(cfg.should_allow_permissive_cors());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn production_requires_explicit_origins() {
        let mut cfg = base_config();
        cfg.environment = "production".to_string();
        assert!(cfg.validate_additional_constraints().is_err());

        cfg.cors_allowed_origins = Some("https://shop.example.com".to_string());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn production_rejects_bundled_dev_secret() {
        let mut cfg = base_config();
        cfg.environment = "production".to_string();
        cfg.cors_allowed_origins = Some("https://shop.example.com".to_string());
        cfg.jwt_secret = DEV_DEFAULT_JWT_SECRET.to_string();
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn unknown_product_policy_defaults_to_drop() {
        let cfg = base_config();
        assert_eq!(cfg.unknown_product_policy, UnknownProductPolicy::Drop);
    }
}
