//! Libretto - Rust-powered library catalog service
//!
//! REST backend over books, authors, and users. Catalog endpoints are
//! gated by bearer tokens issued at login.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod db;
pub mod services;

use crate::config::Config;
use crate::db::Database;
use crate::services::AuthService;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Database,
    pub auth: AuthService,
}
