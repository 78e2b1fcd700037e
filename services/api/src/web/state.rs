//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;

use crate::config::Config;
use household_core::ports::{Clock, DatabaseService, FileStore};

/// The shared application state, created once at startup and passed to all
/// handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub files: Arc<dyn FileStore>,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<Config>,
}
