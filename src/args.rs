use crate::config::BackendChoice;
use clap::Parser;

#[derive(Parser, Debug)]
pub struct Args {
    /// Scraped thread JSON handed over by the scraper
    #[clap(long, default_value = "thread.json")]
    pub thread: String,

    #[clap(long, value_enum, default_value_t = BackendChoice::Gtts)]
    pub tts: BackendChoice,

    /// Narration language code; also the translation target when set
    #[clap(long)]
    pub post_lang: Option<String>,

    /// Translation provider name (wired externally)
    #[clap(long)]
    pub translator: Option<String>,

    /// Pick a fresh random voice for every narrated unit
    #[clap(long, default_value_t = false)]
    pub random_voice: bool,

    /// Pause appended after each spoken unit, in seconds
    #[clap(long, default_value_t = 0.3)]
    pub silence_duration: f64,

    /// Tighten the per-call character limit below the backend's cap
    #[clap(long)]
    pub chunk_chars: Option<usize>,

    #[clap(long, default_value_t = false)]
    pub storymode: bool,

    /// 0 = narrate the whole self-text, 1 = one unit per paragraph
    #[clap(long, default_value_t = 0)]
    pub storymode_method: u8,

    /// Target total narration length in seconds
    #[clap(long, default_value_t = 70.0)]
    pub max_length: f64,

    /// Cap on narrated comments; replaces the duration budget when set
    #[clap(long)]
    pub max_comments: Option<usize>,

    #[clap(long, default_value = "./tts/en_US-hfc_male-medium.onnx")]
    pub piper_model: String,

    #[clap(long, default_value = "en_us_001")]
    pub tiktok_voice: String,

    /// TikTok session id; falls back to the TIKTOK_SESSIONID env var
    #[clap(long)]
    pub tiktok_session_id: Option<String>,

    #[clap(long, default_value = "assets/temp")]
    pub out_dir: String,
}
