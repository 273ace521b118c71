//! Authentication service for user registration and JWT handling
//!
//! Provides:
//! - User registration and login
//! - Password hashing with bcrypt
//! - JWT token generation and validation

use anyhow::anyhow;
use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::db::error::{CatalogError, Result};
use crate::db::{Database, UserRecord};

/// Claims structure for access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// User ID (subject)
    pub sub: String,
    /// Email
    pub email: String,
    /// Token type
    pub token_type: String,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
}

/// Token returned after successful authentication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
    /// Signed access token
    pub access_token: String,
    /// Token lifetime in seconds
    pub expires_in: i64,
    /// Token type (always "Bearer")
    pub token_type: String,
}

/// User info carried by a validated token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub email: String,
}

/// Auth service configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// JWT signing secret
    pub jwt_secret: String,
    /// Access token lifetime in seconds (default: 24 hours)
    pub token_lifetime: i64,
    /// Bcrypt cost factor
    pub bcrypt_cost: u32,
}

impl AuthConfig {
    pub fn from_env() -> Self {
        Self {
            jwt_secret: std::env::var("JWT_SECRET")
                .unwrap_or_else(|_| "change-me-in-production".to_string()),
            token_lifetime: std::env::var("ACCESS_TOKEN_LIFETIME")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(24 * 60 * 60),
            bcrypt_cost: std::env::var("BCRYPT_COST")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_COST),
        }
    }
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: Database,
    config: AuthConfig,
}

impl AuthService {
    /// Create a new auth service
    pub fn new(db: Database, config: AuthConfig) -> Self {
        Self { db, config }
    }

    /// Create with config from environment
    pub fn with_env(db: Database) -> Self {
        Self::new(db, AuthConfig::from_env())
    }

    /// Register a new user
    pub async fn register(&self, email: &str, password: &str) -> Result<UserRecord> {
        if !is_valid_email(email) {
            return Err(CatalogError::ValidationFailed(
                "email must be a valid address".to_string(),
            ));
        }
        if password.is_empty() {
            return Err(CatalogError::MissingRequiredField("password"));
        }

        let password_hash = self.hash_password(password)?;
        self.db.users().create(email, &password_hash).await
    }

    /// Login with email and password
    ///
    /// Failures are indistinguishable: an unknown email and a wrong password
    /// report the same error.
    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedToken> {
        let user = self.db.users().get_by_email(email).await?;

        let user = match user {
            Some(u) => u,
            None => {
                return Err(CatalogError::Unauthorized(
                    "authentication failed".to_string(),
                ));
            }
        };

        if !self.verify_password(password, &user.password_hash)? {
            return Err(CatalogError::Unauthorized(
                "authentication failed".to_string(),
            ));
        }

        self.issue_token(&user)
    }

    /// Validate an access token and return the subject
    pub fn validate_token(&self, token: &str) -> Result<AuthenticatedUser> {
        let claims = self.decode_token(token)?;

        let id = claims
            .sub
            .parse()
            .map_err(|_| CatalogError::Unauthorized("Invalid token subject".to_string()))?;

        Ok(AuthenticatedUser {
            id,
            email: claims.email,
        })
    }

    /// Hash a password with bcrypt
    fn hash_password(&self, password: &str) -> Result<String> {
        hash(password, self.config.bcrypt_cost)
            .map_err(|e| anyhow!("Failed to hash password: {}", e).into())
    }

    /// Verify a password against a hash
    fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        verify(password, hash).map_err(|e| anyhow!("Failed to verify password: {}", e).into())
    }

    /// Sign an access token for a user
    fn issue_token(&self, user: &UserRecord) -> Result<IssuedToken> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.config.token_lifetime);

        let claims = AccessTokenClaims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            token_type: "access".to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        let access_token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| anyhow!("Failed to create access token: {}", e))?;

        Ok(IssuedToken {
            access_token,
            expires_in: self.config.token_lifetime,
            token_type: "Bearer".to_string(),
        })
    }

    /// Decode and validate an access token
    fn decode_token(&self, token: &str) -> Result<AccessTokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let token_data = decode::<AccessTokenClaims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| CatalogError::Unauthorized(format!("Invalid token: {}", e)))?;

        if token_data.claims.token_type != "access" {
            return Err(CatalogError::Unauthorized("Invalid token type".to_string()));
        }

        Ok(token_data.claims)
    }
}

/// Shape check only; uniqueness is enforced by the database constraint.
fn is_valid_email(email: &str) -> bool {
    let email_re = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    email_re.is_match(email)
}
