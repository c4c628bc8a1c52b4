//! Narration domain - AI text analysis and speech synthesis contracts

mod provider;

pub use provider::{AnalysisRequest, SpeechAudio, SpeechRequest, SpeechSynthesizer, TextGenerator};

#[cfg(test)]
pub use provider::{MockSpeechSynthesizer, MockTextGenerator};
