use super::{ensure_within_limit, ConfigError, SynthesisError, TtsBackend};
use crate::config::Settings;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::seq::SliceRandom;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, USER_AGENT};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

const MAX_CHARS: usize = 300;
const SPEECH_URL: &str =
    "https://api16-normal-c-useast1a.tiktokv.com/media/api/text/speech/invoke/";

pub const CHARACTER_VOICES: &[&str] = &[
    "en_us_ghostface",
    "en_us_chewbacca",
    "en_us_c3po",
    "en_us_stitch",
    "en_us_stormtrooper",
    "en_us_rocket",
    "en_female_madam_leota",
    "en_male_ghosthost",
    "en_male_pirate",
];

pub const ENGLISH_VOICES: &[&str] = &[
    "en_au_001",
    "en_au_002",
    "en_uk_001",
    "en_uk_003",
    "en_us_001",
    "en_us_002",
    "en_us_006",
    "en_us_007",
    "en_us_009",
    "en_us_010",
    "en_male_narration",
    "en_male_funny",
    "en_female_emotional",
    "en_male_cody",
];

pub const NON_ENGLISH_VOICES: &[&str] = &[
    "fr_001",
    "fr_002",
    "de_001",
    "de_002",
    "es_002",
    "it_male_m18",
    "es_mx_002",
    "br_001",
    "br_003",
    "br_004",
    "br_005",
    "id_001",
    "jp_001",
    "jp_003",
    "jp_005",
    "jp_006",
    "kr_002",
    "kr_003",
    "kr_004",
];

pub const VOCAL_VOICES: &[&str] = &[
    "en_female_f08_salut_damour",
    "en_male_m03_lobby",
    "en_male_m03_sunshine_soon",
    "en_female_f08_warmy_breeze",
    "en_female_ht_f08_glorious",
    "en_male_sing_funny_it_goes_up",
    "en_male_m2_xhxs_m03_silly",
    "en_female_ht_f08_wonderful_world",
];

fn in_catalog(voice: &str) -> bool {
    CHARACTER_VOICES
        .iter()
        .chain(ENGLISH_VOICES)
        .chain(NON_ENGLISH_VOICES)
        .chain(VOCAL_VOICES)
        .any(|v| *v == voice)
}

#[derive(Debug, Deserialize)]
struct SpeechResponse {
    status_code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<SpeechData>,
}

#[derive(Debug, Deserialize)]
struct SpeechData {
    #[serde(default)]
    v_str: String,
}

/// Short-form social TTS: a strict 300-char request limit and a curated voice
/// catalog. The provider reports failures through small integer codes which
/// are kept as distinct error categories instead of being flattened into a
/// generic provider error.
pub struct TikTokTts {
    session_id: String,
    default_voice: String,
    post_lang: Option<String>,
    client: reqwest::Client,
}

impl TikTokTts {
    pub fn new(settings: &Settings) -> Result<Self, ConfigError> {
        let session_id = settings.tiktok_session_id.clone().ok_or(
            ConfigError::MissingCredential(
                "TikTok session id (pass --tiktok-session-id or set TIKTOK_SESSIONID)",
            ),
        )?;
        if !in_catalog(&settings.tiktok_voice) {
            return Err(ConfigError::UnknownVoice(settings.tiktok_voice.clone()));
        }
        Ok(TikTokTts {
            session_id,
            default_voice: settings.tiktok_voice.clone(),
            post_lang: settings.post_lang.clone(),
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl TtsBackend for TikTokTts {
    fn name(&self) -> &'static str {
        "tiktok"
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
        let voice = voice.unwrap_or(&self.default_voice);
        if !in_catalog(voice) {
            return Err(SynthesisError::UnknownVoice(voice.to_string()));
        }
        debug!("tiktok request: voice={voice}, {} chars", text.chars().count());

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(
                "com.zhiliaoapp.musically/2022600030 (Linux; U; Android 7.1.2)",
            ),
        );
        let cookie = format!("sessionid={}", self.session_id);
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&cookie)
                .map_err(|e| SynthesisError::Engine(format!("invalid session cookie: {e}")))?,
        );

        let response: SpeechResponse = self
            .client
            .post(SPEECH_URL)
            .headers(headers)
            .query(&[
                ("text_speaker", voice),
                ("req_text", text),
                ("speaker_map_type", "0"),
                ("aid", "1233"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.status_code != 0 {
            return Err(classify_status(
                response.status_code,
                response.message,
                voice,
                text.chars().count(),
            ));
        }

        let encoded = response
            .data
            .map(|d| d.v_str)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| SynthesisError::Payload("response carried no audio".to_string()))?;
        let audio = STANDARD
            .decode(encoded.trim())
            .map_err(|e| SynthesisError::Payload(format!("base64 audio: {e}")))?;
        fs::write(destination, &audio)?;
        Ok(())
    }

    fn default_voice(&self) -> Option<String> {
        Some(self.default_voice.clone())
    }

    /// Samples the English catalog; with a narration language configured the
    /// configured default voice already matches it, so that one is kept.
    fn random_voice(&self) -> Option<String> {
        if self.post_lang.is_some() {
            return self.default_voice();
        }
        ENGLISH_VOICES
            .choose(&mut rand::thread_rng())
            .map(|v| v.to_string())
    }
}

/// Maps the provider's integer status codes onto the error taxonomy:
/// 1 = invalid backend-internal id, 2 = text too long, 4 = unknown speaker.
/// Everything else stays a generic provider error.
fn classify_status(code: i64, message: String, voice: &str, len: usize) -> SynthesisError {
    match code {
        2 => SynthesisError::TextTooLong {
            len,
            max: MAX_CHARS,
        },
        4 => SynthesisError::UnknownVoice(voice.to_string()),
        1 => SynthesisError::Provider {
            code,
            message: format!("invalid backend-internal id: {message}"),
        },
        _ => SynthesisError::Provider { code, message },
    }
}
