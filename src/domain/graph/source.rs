//! Dependency graph producer contract

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::{DependencyGraph, RepositoryId};
use crate::domain::DomainError;

/// Builds a dependency graph by fetching and parsing a repository's manifests.
///
/// Calls are slow and rate-limited by the hosting service, which is why results are cached.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DependencyGraphSource: Send + Sync {
    async fn build_graph(&self, repository: &RepositoryId) -> Result<DependencyGraph, DomainError>;
}
