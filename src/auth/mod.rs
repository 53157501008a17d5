//! Identity boundary. Users and sessions live in an external provider; this
//! module only verifies the HS256 bearer tokens it issues and exposes the
//! caller as an [`AuthUser`].

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{errors::ServiceError, AppState};

/// Role carried in the token's `role` claim.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    #[default]
    Customer,
    Admin,
}

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (user ID)
    #[serde(default)]
    pub role: Role,
    pub iat: i64, // Issued at time
    pub exp: i64, // Expiration time
}

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn customer(user_id: Uuid) -> Self {
        Self::new(user_id, Role::Customer)
    }

    pub fn admin(user_id: Uuid) -> Self {
        Self::new(user_id, Role::Admin)
    }

    /// Check if the user has a specific role
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }

    /// Check if the user is an admin
    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }
}

/// Fails with `Unauthorized` when there is no current user.
pub fn require_user(actor: Option<&AuthUser>) -> Result<&AuthUser, ServiceError> {
    actor.ok_or_else(|| ServiceError::Unauthorized("Sign in to continue".to_string()))
}

/// Staff-only gate: `Unauthorized` without a user, `Forbidden` for non-admins.
pub fn require_admin(actor: Option<&AuthUser>) -> Result<&AuthUser, ServiceError> {
    let user = require_user(actor)?;
    if !user.is_admin() {
        return Err(ServiceError::Forbidden(
            "Administrator role required".to_string(),
        ));
    }
    Ok(user)
}

/// Issues and verifies bearer tokens.
#[derive(Clone)]
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService").finish_non_exhaustive()
    }
}

impl AuthService {
    pub fn new(jwt_secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
        }
    }

    /// Generate a JWT token for a user
    pub fn issue_token(&self, user: &AuthUser, ttl: Duration) -> Result<String, ServiceError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.user_id.to_string(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::InternalError(format!("Token creation failed: {}", e)))
    }

    pub fn verify_token(&self, token: &str) -> Result<AuthUser, ServiceError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::new(Algorithm::HS256))
            .map_err(|e| ServiceError::Unauthorized(format!("Invalid token: {}", e)))?;

        let user_id = Uuid::parse_str(&data.claims.sub)
            .map_err(|_| ServiceError::Unauthorized("Invalid subject claim".to_string()))?;

        Ok(AuthUser::new(user_id, data.claims.role))
    }

    /// Resolves the caller from an `Authorization: Bearer` header value.
    pub fn user_from_header(&self, value: &str) -> Option<AuthUser> {
        let token = value.strip_prefix("Bearer ")?.trim();
        match self.verify_token(token) {
            Ok(user) => Some(user),
            Err(e) => {
                debug!("Ignoring bearer token: {}", e);
                None
            }
        }
    }
}

/// The current user, if the request carried a valid bearer token.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<AuthUser>);

impl CurrentUser {
    pub fn user(&self) -> Option<&AuthUser> {
        self.0.as_ref()
    }
}

#[async_trait::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| state.auth.user_from_header(value));

        Ok(CurrentUser(user))
    }
}
