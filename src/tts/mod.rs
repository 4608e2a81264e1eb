pub mod gtts;
pub mod piper;
pub mod tiktok;

use crate::config::{BackendChoice, Settings};
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// One failed backend call. Provider-reported categories stay distinguishable
/// so the orchestrator can decide between skipping a chunk and giving up on a
/// unit.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("text is {len} chars, over the backend limit of {max}")]
    TextTooLong { len: usize, max: usize },

    #[error("unknown voice '{0}'")]
    UnknownVoice(String),

    #[error("provider rejected the request (code {code}): {message}")]
    Provider { code: i64, message: String },

    #[error("malformed provider payload: {0}")]
    Payload(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("speech engine failed: {0}")]
    Engine(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Fatal before any audio is produced; surfaced with a remediation hint and
/// never retried mid-run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("voice model not found: {0}")]
    MissingVoiceModel(String),

    #[error("voice '{0}' is not in the provider catalog")]
    UnknownVoice(String),
}

/// Uniform capability over heterogeneous speech providers. `run` writes
/// exactly one mp3 to `destination` and reports nothing about its duration;
/// callers measure the artifact themselves. Text longer than `max_chars`
/// must be segmented before it gets here.
#[async_trait]
pub trait TtsBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn max_chars(&self) -> usize;

    async fn run(
        &self,
        text: &str,
        destination: &Path,
        voice: Option<&str>,
    ) -> Result<(), SynthesisError>;

    fn default_voice(&self) -> Option<String>;

    fn random_voice(&self) -> Option<String>;
}

pub fn build_backend(settings: &Settings) -> Result<Box<dyn TtsBackend>, ConfigError> {
    match settings.backend {
        BackendChoice::Gtts => Ok(Box::new(gtts::GoogleTts::new(settings.post_lang.clone()))),
        BackendChoice::Tiktok => Ok(Box::new(tiktok::TikTokTts::new(settings)?)),
        BackendChoice::Piper => Ok(Box::new(piper::PiperTts::new(settings)?)),
    }
}

pub(crate) fn ensure_within_limit(text: &str, max: usize) -> Result<(), SynthesisError> {
    let len = text.chars().count();
    if len > max {
        return Err(SynthesisError::TextTooLong { len, max });
    }
    Ok(())
}
