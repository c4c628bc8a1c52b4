//! Application state shared by the handlers

use std::sync::Arc;

use crate::infrastructure::cache::TieredCache;

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<TieredCache>,
    /// Bearer token guarding destructive admin routes; `None` disables them
    pub admin_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(cache: Arc<TieredCache>) -> Self {
        Self {
            cache,
            admin_token: None,
        }
    }

    pub fn with_admin_token(mut self, token: impl Into<String>) -> Self {
        self.admin_token = Some(Arc::from(token.into()));
        self
    }
}
