use crate::args::Args;
use clap::ValueEnum;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendChoice {
    /// Cloud neural voices keyed by language code
    Gtts,
    /// Short-form social voices, strict 300-char requests
    Tiktok,
    /// Local offline engine driven over stdin
    Piper,
}

/// Stopping criterion for the comment loop: either a total-duration target
/// for the finished video or a flat cap on narrated comments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Budget {
    MaxDuration(f64),
    MaxComments(usize),
}

/// Per-run settings, built once in `main` and passed by reference. No global
/// state survives between runs.
#[derive(Debug, Clone)]
pub struct Settings {
    pub backend: BackendChoice,
    pub post_lang: Option<String>,
    pub translator: Option<String>,
    pub random_voice: bool,
    pub silence_duration: f64,
    pub max_chars_override: Option<usize>,
    pub storymode: bool,
    pub storymode_method: u8,
    pub budget: Budget,
    pub piper_model: PathBuf,
    pub tiktok_voice: String,
    pub tiktok_session_id: Option<String>,
    pub output_root: PathBuf,
}

impl Settings {
    pub fn from_args(args: &Args) -> Self {
        let budget = match args.max_comments {
            Some(n) => Budget::MaxComments(n),
            None => Budget::MaxDuration(args.max_length),
        };
        Settings {
            backend: args.tts,
            post_lang: args.post_lang.clone(),
            translator: args.translator.clone(),
            random_voice: args.random_voice,
            silence_duration: args.silence_duration,
            max_chars_override: args.chunk_chars,
            storymode: args.storymode,
            storymode_method: args.storymode_method,
            budget,
            piper_model: PathBuf::from(&args.piper_model),
            tiktok_voice: args.tiktok_voice.clone(),
            tiktok_session_id: args
                .tiktok_session_id
                .clone()
                .or_else(|| std::env::var("TIKTOK_SESSIONID").ok()),
            output_root: PathBuf::from(&args.out_dir),
        }
    }

    /// Startup notice when a narration language is configured: translation
    /// providers live outside this crate, so the run proceeds untranslated
    /// unless the embedding application wires one in.
    pub fn translation_notice(&self) -> Option<String> {
        let lang = self.post_lang.as_deref()?;
        Some(match self.translator.as_deref() {
            Some(provider) => format!(
                "Narration language '{lang}' set; translation with '{provider}' must be wired by the embedding application"
            ),
            None => format!(
                "Narration language '{lang}' set but no translator configured; text stays untranslated"
            ),
        })
    }

    /// Per-call character limit: the backend's hard cap, optionally tightened
    /// by configuration, never loosened past what the provider accepts.
    pub fn effective_limit(&self, backend_max: usize) -> usize {
        self.max_chars_override
            .map(|o| o.min(backend_max))
            .unwrap_or(backend_max)
            .max(1)
    }
}
