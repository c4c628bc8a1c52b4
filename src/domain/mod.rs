//! Domain layer - Core cache contracts and entities

pub mod cache;
pub mod error;
pub mod graph;
pub mod narration;

pub use error::DomainError;
