//! Pain point search library.
//!
//! This library contains all the core modules for the pain-point search
//! backend.

use std::sync::Arc;

use sqlx::PgPool;

pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use services::{Intake, RedisCache, StatusReader, Subscriber};

/// Application shared state.
///
/// Design Philosophy: Keep it simple - Rust's type system IS our DI
/// container. No need for Service Container pattern with dyn Any. All
/// services are wrapped in Arc for cheap cloning and thread safety.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub cache: RedisCache,
    pub intake: Arc<Intake>,
    pub status_reader: Arc<StatusReader>,
    pub subscriber: Arc<Subscriber>,
}
