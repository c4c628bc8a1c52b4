//! Text generation and speech synthesis contracts

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

#[cfg(test)]
use mockall::automock;

use crate::domain::DomainError;

/// Subject of a short natural-language analysis plus the dependency context shown to the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub subject: String,
    pub dependencies: Vec<String>,
}

impl AnalysisRequest {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }
}

/// Text to read aloud
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub text: String,
    pub voice: String,
    pub instructions: Option<String>,
}

impl SpeechRequest {
    pub fn new(text: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: voice.into(),
            instructions: None,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }
}

/// Synthesized audio in its cacheable form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechAudio {
    /// Base64-encoded audio bytes
    pub audio: String,
    pub content_type: String,
}

impl SpeechAudio {
    pub fn from_bytes(bytes: &[u8], content_type: impl Into<String>) -> Self {
        Self {
            audio: STANDARD.encode(bytes),
            content_type: content_type.into(),
        }
    }

    pub fn decode(&self) -> Result<Vec<u8>, DomainError> {
        STANDARD
            .decode(&self.audio)
            .map_err(|e| DomainError::internal(format!("Invalid base64 audio: {}", e)))
    }
}

/// Generates short analyses of packages (billable AI call)
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<String, DomainError>;
}

/// Turns text into speech (billable AI call)
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechAudio, DomainError>;
}
