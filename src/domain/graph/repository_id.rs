//! Repository identity normalization

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::DomainError;

static REPOSITORY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?:https?://|ssh://)?(?:[^@/]+@)?(?:www\.)?github\.com[/:])?([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+?)(?:\.git)?/*$",
    )
    .expect("repository pattern is valid")
});

/// Canonical `owner/name` repository identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryId(String);

impl RepositoryId {
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        normalize_repository_id(input).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reduces the many ways a repository can be written to lowercase `owner/name`
pub fn normalize_repository_id(input: &str) -> Result<String, DomainError> {
    let trimmed = input.trim();

    let captures = REPOSITORY_PATTERN.captures(trimmed).ok_or_else(|| {
        DomainError::validation(format!("Invalid repository identifier: '{}'", input))
    })?;

    Ok(format!(
        "{}/{}",
        captures[1].to_lowercase(),
        captures[2].to_lowercase()
    ))
}
