use super::{ensure_within_limit, SynthesisError, TtsBackend};
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use std::fs;
use std::path::Path;
use tracing::debug;

const MAX_CHARS: usize = 5000;
const TTS_URL: &str = "https://translate.google.com/translate_tts";

/// Cloud neural TTS. Voices are plain language codes; the request streams
/// back an mp3 body that is written verbatim to the destination.
pub struct GoogleTts {
    lang: String,
    client: reqwest::Client,
}

impl GoogleTts {
    pub fn new(post_lang: Option<String>) -> Self {
        GoogleTts {
            lang: post_lang.unwrap_or_else(|| "en".to_string()),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl TtsBackend for GoogleTts {
    fn name(&self) -> &'static str {
        "gtts"
    }

    fn max_chars(&self) -> usize {
        MAX_CHARS
    }

    async fn run(
        &self,
        text: &str,
        destination: &Path,
        voice: Option<&str>,
    ) -> Result<(), SynthesisError> {
        ensure_within_limit(text, MAX_CHARS)?;
        let lang = voice.unwrap_or(&self.lang);
        debug!("gtts request: lang={lang}, {} chars", text.chars().count());
        let response = self
            .client
            .get(TTS_URL)
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", lang),
                ("q", text),
            ])
            .header(USER_AGENT, "redditnarrator/0.1")
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(SynthesisError::Payload("empty audio response".to_string()));
        }
        fs::write(destination, &bytes)?;
        Ok(())
    }

    fn default_voice(&self) -> Option<String> {
        Some(self.lang.clone())
    }

    // No separate voice catalog here; the language code is the voice.
    fn random_voice(&self) -> Option<String> {
        self.default_voice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_code_doubles_as_voice() {
        let backend = GoogleTts::new(Some("de".to_string()));
        assert_eq!(backend.default_voice().as_deref(), Some("de"));
        assert_eq!(backend.random_voice().as_deref(), Some("de"));

        let default = GoogleTts::new(None);
        assert_eq!(default.default_voice().as_deref(), Some("en"));
    }
}
