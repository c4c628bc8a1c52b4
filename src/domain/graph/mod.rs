//! Dependency graph domain - graph payload and repository identity

mod entity;
mod repository_id;
mod source;

pub use entity::{DependencyGraph, GraphEdge, GraphNode};
pub use repository_id::{normalize_repository_id, RepositoryId};
pub use source::DependencyGraphSource;

#[cfg(test)]
pub use source::MockDependencyGraphSource;
