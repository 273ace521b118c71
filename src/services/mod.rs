//! Application services

pub mod auth;

pub use auth::{AccessTokenClaims, AuthConfig, AuthService, AuthenticatedUser, IssuedToken};
