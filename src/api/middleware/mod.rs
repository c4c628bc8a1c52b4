//! API middleware components

pub mod admin_auth;
pub mod logging;

pub use admin_auth::RequireAdmin;
pub use logging::{logging_middleware, CounterRequestId};
