use super::{ensure_within_limit, ConfigError, SynthesisError, TtsBackend};
use crate::audio::encode_to_mp3;
use crate::config::Settings;
use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, warn};

const MAX_CHARS: usize = 5000;

/// Local offline engine: pipes text into a `piper` subprocess with an onnx
/// voice model, then re-encodes the WAV it produces into the mp3 destination.
/// Voices are the model files installed next to the configured one.
pub struct PiperTts {
    model: PathBuf,
    post_lang: Option<String>,
}

impl PiperTts {
    pub fn new(settings: &Settings) -> Result<Self, ConfigError> {
        if !settings.piper_model.exists() {
            return Err(ConfigError::MissingVoiceModel(
                settings.piper_model.display().to_string(),
            ));
        }
        Ok(PiperTts {
            model: settings.piper_model.clone(),
            post_lang: settings.post_lang.clone(),
        })
    }
}

#[async_trait]
impl TtsBackend for PiperTts {
    fn name(&self) -> &'static str {
        "piper"
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
        let model = voice.map(PathBuf::from).unwrap_or_else(|| self.model.clone());
        let wav = destination.with_extension("wav");
        debug!("piper request: model={}, {} chars", model.display(), text.chars().count());

        let mut child = Command::new("piper")
            .arg("--model")
            .arg(&model)
            .arg("--output_file")
            .arg(&wav)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()?;
        match child.stdin.as_mut() {
            Some(stdin) => stdin.write_all(text.as_bytes())?,
            None => return Err(SynthesisError::Engine("piper stdin unavailable".to_string())),
        }
        let status = child.wait()?;
        if !status.success() {
            return Err(SynthesisError::Engine(format!(
                "piper exited with {status} for {}",
                wav.display()
            )));
        }

        encode_to_mp3(&wav, destination)
            .map_err(|e| SynthesisError::Engine(format!("mp3 encode failed: {e}")))?;
        if let Err(e) = fs::remove_file(&wav) {
            warn!("Could not remove intermediate {}: {e}", wav.display());
        }
        Ok(())
    }

    fn default_voice(&self) -> Option<String> {
        Some(self.model.display().to_string())
    }

    /// Samples sibling `.onnx` models, filtered to the narration language's
    /// prefix when one is configured; falls back to the configured model.
    fn random_voice(&self) -> Option<String> {
        let dir = self.model.parent()?;
        let prefix = self.post_lang.clone();
        let mut candidates = Vec::new();
        if let Ok(entries) = fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("onnx") {
                    continue;
                }
                let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
                if prefix.as_deref().is_none_or(|p| stem.starts_with(p)) {
                    candidates.push(path.display().to_string());
                }
            }
        }
        candidates
            .choose(&mut rand::thread_rng())
            .cloned()
            .or_else(|| self.default_voice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendChoice, Budget};

    fn settings_with_model(model: PathBuf) -> Settings {
        Settings {
            backend: BackendChoice::Piper,
            post_lang: None,
            translator: None,
            random_voice: false,
            silence_duration: 0.0,
            max_chars_override: None,
            storymode: false,
            storymode_method: 0,
            budget: Budget::MaxDuration(70.0),
            piper_model: model,
            tiktok_voice: "en_us_001".into(),
            tiktok_session_id: None,
            output_root: PathBuf::from("assets/temp"),
        }
    }

    #[test]
    fn missing_model_is_a_config_error() {
        let settings = settings_with_model(PathBuf::from("/nonexistent/voice.onnx"));
        assert!(matches!(
            PiperTts::new(&settings),
            Err(ConfigError::MissingVoiceModel(_))
        ));
    }

    #[test]
    fn random_voice_samples_models_matching_the_language() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["en_US-amy.onnx", "en_US-ryan.onnx", "de_DE-thorsten.onnx"] {
            fs::write(dir.path().join(name), b"model").unwrap();
        }
        let model = dir.path().join("en_US-amy.onnx");

        let mut settings = settings_with_model(model.clone());
        settings.post_lang = Some("de".to_string());
        let backend = PiperTts::new(&settings).unwrap();
        let picked = backend.random_voice().unwrap();
        assert!(picked.ends_with("de_DE-thorsten.onnx"), "picked {picked}");

        settings.post_lang = None;
        let backend = PiperTts::new(&settings).unwrap();
        for _ in 0..10 {
            let picked = backend.random_voice().unwrap();
            assert!(picked.ends_with(".onnx"));
        }
    }
}
