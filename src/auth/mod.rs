/*!
 * # Authentication and Authorization Module
 *
 * JWT bearer authentication for the storefront API: token issuance on
 * login, validation against an in-memory revocation list, role-based
 * route guards, and password storage with Argon2.
 */

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::entities::{user, User, UserModel};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,           // Subject (user ID)
    pub name: Option<String>,  // User's name
    pub email: Option<String>, // User's email
    pub roles: Vec<String>,    // User's roles
    pub jti: String,           // JWT ID (unique identifier for this token)
    pub iat: i64,              // Issued at time
    pub exp: i64,              // Expiration time
    pub iss: String,           // Issuer
    pub aud: String,           // Audience
}

/// Authenticated user data extracted from the JWT token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub roles: Vec<String>,
    pub token_id: String,
}

impl AuthUser {
    /// Check if the user has a specific role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Check if the user is an admin
    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub access_token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        jwt_issuer: String,
        jwt_audience: String,
        access_token_expiration: Duration,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            access_token_expiration,
        }
    }
}

/// Token revocation entry
#[derive(Clone, Debug)]
struct RevokedToken {
    jti: String,
    expiry: DateTime<Utc>,
}

/// Authentication service that handles token issuance and validation
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
    pub db: Arc<DatabaseConnection>,
    revoked_tokens: Arc<RwLock<Vec<RevokedToken>>>,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self {
            config,
            db,
            revoked_tokens: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Register a new user with the `user` role. Email must be unused.
    pub async fn register_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<UserModel, AuthError> {
        let existing = User::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        if existing.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::InternalError(e.to_string()))?
            .to_string();

        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.to_string()),
            name: Set(name.to_string()),
            password_hash: Set(password_hash),
            role: Set(ROLE_USER.to_string()),
            is_active: Set(true),
            created_at: Set(Utc::now()),
        };

        let created = model
            .insert(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        info!(user_id = %created.id, "registered user");
        Ok(created)
    }

    /// Verify email/password credentials against the users table.
    pub async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserModel, AuthError> {
        let user = User::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?
            .ok_or(AuthError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AuthError::InvalidCredentials);
        }

        let parsed = PasswordHash::new(&user.password_hash)
            .map_err(|e| AuthError::InternalError(e.to_string()))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| AuthError::InvalidCredentials)?;

        Ok(user)
    }

    /// Generate a JWT access token for a user
    pub fn generate_token(&self, user: &UserModel) -> Result<TokenResponse, AuthError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.access_token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: user.id.to_string(),
            name: Some(user.name.clone()),
            email: Some(user.email.clone()),
            roles: vec![user.role.clone()],
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        let access_token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))?;

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_expiration.as_secs() as i64,
        })
    }

    /// Validate a JWT token and extract the claims. Consults the revocation
    /// list on every call.
    pub async fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?
        .claims;

        if self.is_token_revoked(&claims.jti).await {
            return Err(AuthError::RevokedToken);
        }

        Ok(claims)
    }

    /// Revoke a token (add it to the revocation list)
    pub async fn revoke_token(&self, token: &str) -> Result<(), AuthError> {
        let claims = self.validate_token(token).await?;

        let expiry = DateTime::<Utc>::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now);
        let mut revoked = self.revoked_tokens.write().await;
        revoked.push(RevokedToken {
            jti: claims.jti,
            expiry,
        });

        // Drop entries for tokens that have expired anyway.
        let now = Utc::now();
        revoked.retain(|t| t.expiry > now);

        Ok(())
    }

    async fn is_token_revoked(&self, token_id: &str) -> bool {
        let revoked = self.revoked_tokens.read().await;
        revoked.iter().any(|t| t.jti == token_id)
    }
}

/// Token response returned by login
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Login credentials
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

/// Registration request
#[derive(Debug, Serialize, Deserialize, validator::Validate, utoipa::ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email is already registered")]
    EmailTaken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    RevokedToken,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message): (StatusCode, &str, String) = match &self {
            Self::MissingAuth => (
                StatusCode::UNAUTHORIZED,
                "AUTH_MISSING",
                "Authentication required".to_string(),
            ),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_CREDENTIALS",
                "Invalid credentials".to_string(),
            ),
            Self::EmailTaken => (
                StatusCode::BAD_REQUEST,
                "AUTH_EMAIL_TAKEN",
                "Email is already registered".to_string(),
            ),
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_TOKEN",
                "Invalid authentication token".to_string(),
            ),
            Self::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "AUTH_TOKEN_EXPIRED",
                "Token has expired".to_string(),
            ),
            Self::RevokedToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REVOKED_TOKEN",
                "Authentication token has been revoked".to_string(),
            ),
            Self::TokenCreation(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_TOKEN_CREATION_FAILED",
                msg.clone(),
            ),
            Self::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                "AUTH_INSUFFICIENT_PERMISSIONS",
                "Insufficient permissions".to_string(),
            ),
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, "AUTH_VALIDATION", msg.clone()),
            Self::DatabaseError(_) | Self::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        };

        let body = Json(serde_json::json!({
            "error": {
                "code": error_code,
                "message": error_message,
            }
        }));

        (status, body).into_response()
    }
}

/// Role middleware to check if the authenticated user has the required role
pub async fn role_middleware(
    State(required_role): State<String>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = match request.extensions().get::<AuthUser>() {
        Some(user) => user.clone(),
        None => return Err(AuthError::MissingAuth),
    };

    if !user.has_role(&required_role) {
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Authentication middleware that extracts and validates the bearer token
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let headers = request.headers().clone();

    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication service not available",
            )
                .into_response();
        }
    };

    match extract_auth_from_headers(&headers, &auth_service).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Extract authentication info from request headers
async fn extract_auth_from_headers(
    headers: &HeaderMap,
    auth_service: &AuthService,
) -> Result<AuthUser, AuthError> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_value) = auth_header.to_str() {
            if auth_value.starts_with("Bearer ") {
                let token = auth_value.trim_start_matches("Bearer ").trim();
                let claims = auth_service.validate_token(token).await?;

                let user_id =
                    Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

                return Ok(AuthUser {
                    user_id,
                    name: claims.name,
                    email: claims.email,
                    roles: claims.roles,
                    token_id: claims.jti,
                });
            }
        }
    }

    Err(AuthError::MissingAuth)
}

/// Authentication routes
pub fn auth_routes() -> axum::Router<Arc<AuthService>> {
    axum::Router::new()
        .route("/register", axum::routing::post(register_handler))
        .route("/login", axum::routing::post(login_handler))
        .route("/logout", axum::routing::post(logout_handler))
}

/// Register handler
async fn register_handler(
    State(auth_service): State<Arc<AuthService>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    validator::Validate::validate(&request).map_err(|e| AuthError::Validation(e.to_string()))?;

    let user = auth_service
        .register_user(&request.name, &request.email, &request.password)
        .await?;

    let token = auth_service.generate_token(&user)?;
    Ok(Json(token))
}

/// Login handler
async fn login_handler(
    State(auth_service): State<Arc<AuthService>>,
    Json(credentials): Json<LoginCredentials>,
) -> Result<Json<TokenResponse>, AuthError> {
    let user = auth_service
        .verify_credentials(&credentials.email, &credentials.password)
        .await?;

    let token = auth_service.generate_token(&user)?;
    Ok(Json(token))
}

/// Logout handler: revokes the presented token
async fn logout_handler(
    State(auth_service): State<Arc<AuthService>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AuthError> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_value) = auth_header.to_str() {
            if auth_value.starts_with("Bearer ") {
                let token = auth_value.trim_start_matches("Bearer ").trim();
                auth_service.revoke_token(token).await?;
                return Ok(Json(
                    serde_json::json!({ "message": "Successfully logged out" }),
                ));
            }
        }
    }

    Err(AuthError::MissingAuth)
}

/// Extractor alias used in handler signatures
pub type AuthenticatedUser = AuthUser;

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_role(self, role: &str) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_role(self, role: &str) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            role.to_string(),
            role_middleware,
        ))
        .with_auth()
    }
}
