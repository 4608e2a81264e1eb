use crate::audio::AudioAssembler;
use crate::config::{Budget, Settings};
use crate::segment::segment;
use crate::text::normalize;
use crate::thread::{sanitize_thread_id, ThreadContent};
use crate::translate::Translator;
use crate::tts::TtsBackend;
use std::fs;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

const UNIT_PACING: Duration = Duration::from_millis(150);

/// Running totals for one narration run. Only the pipeline mutates this,
/// once per completed unit.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunAccumulator {
    pub total_duration: f64,
    pub last_unit_duration: f64,
    pub processed_count: usize,
}

impl RunAccumulator {
    pub fn record(&mut self, duration: f64) {
        self.total_duration += duration;
        self.last_unit_duration = duration;
    }

    pub fn commit(&mut self) {
        self.processed_count += 1;
    }

    /// Drops the most recently committed unit from the accounting. The file
    /// stays on disk; only duration and count forget it.
    pub fn retract_last(&mut self) {
        self.total_duration -= self.last_unit_duration;
        self.last_unit_duration = 0.0;
        self.processed_count = self.processed_count.saturating_sub(1);
    }
}

pub(crate) fn count_budget_reached(acc: &RunAccumulator, budget: &Budget) -> bool {
    matches!(budget, Budget::MaxComments(n) if acc.processed_count >= *n)
}

/// Units 0 and 1 are always admitted, so one long opening comment cannot
/// produce an empty video.
pub(crate) fn duration_budget_exceeded(acc: &RunAccumulator, budget: &Budget, idx: usize) -> bool {
    matches!(budget, Budget::MaxDuration(b) if acc.total_duration > *b && idx > 1)
}

/// Walks the thread content in order (title, then self-text or ranked
/// comments), narrating one unit at a time: normalize, optionally translate,
/// segment to the backend's limit, synthesize, measure. Stops when the
/// configured budget is exhausted and returns the aggregate duration and the
/// number of fully-included units.
pub struct NarrationPipeline<'a> {
    backend: &'a dyn TtsBackend,
    settings: &'a Settings,
    translator: Option<&'a dyn Translator>,
}

impl<'a> NarrationPipeline<'a> {
    pub fn new(backend: &'a dyn TtsBackend, settings: &'a Settings) -> Self {
        NarrationPipeline {
            backend,
            settings,
            translator: None,
        }
    }

    pub fn with_translator(mut self, translator: &'a dyn Translator) -> Self {
        self.translator = Some(translator);
        self
    }

    pub async fn run(&self, thread: &ThreadContent) -> anyhow::Result<(f64, usize)> {
        let id = sanitize_thread_id(&thread.thread_id);
        let dir = self.settings.output_root.join(&id).join("mp3");
        fs::create_dir_all(&dir)?;
        info!(
            "Narrating thread '{}' with '{}' into {}",
            thread.thread_title,
            self.backend.name(),
            dir.display()
        );

        let mut assembler = AudioAssembler::new(dir);
        assembler.prepare_silence(self.settings.silence_duration)?;
        let mut acc = RunAccumulator::default();
        let lang = self
            .settings
            .post_lang
            .as_deref()
            .or(thread.post_lang.as_deref());

        info!("Saving title...");
        let duration = self
            .narrate_unit(&assembler, "title", &thread.thread_title, lang)
            .await;
        acc.record(duration);

        if self.settings.storymode {
            if self.settings.storymode_method == 0 {
                let body = thread.thread_post.whole();
                let duration = self.narrate_unit(&assembler, "postaudio", &body, lang).await;
                acc.record(duration);
                acc.commit();
            } else {
                for (idx, paragraph) in thread.thread_post.paragraphs().iter().enumerate() {
                    info!("#{} Saving paragraph...", idx + 1);
                    let stem = format!("postaudio-{idx}");
                    let duration = self.narrate_unit(&assembler, &stem, paragraph, lang).await;
                    acc.record(duration);
                    acc.commit();
                    sleep(UNIT_PACING).await;
                }
            }
        } else {
            for (idx, comment) in thread.comments.iter().enumerate() {
                if count_budget_reached(&acc, &self.settings.budget) {
                    info!("Comment budget reached after {} units", acc.processed_count);
                    break;
                }
                info!("#{} Saving comment...", idx + 1);
                let duration = self
                    .narrate_unit(&assembler, &idx.to_string(), &comment.comment_body, lang)
                    .await;
                acc.record(duration);
                acc.commit();
                if duration_budget_exceeded(&acc, &self.settings.budget, idx) {
                    // The overshooting unit stays on disk but is excluded
                    // from both the total and the count.
                    acc.retract_last();
                    info!(
                        "Duration budget reached: {:.2}s over {} units",
                        acc.total_duration, acc.processed_count
                    );
                    break;
                }
                sleep(UNIT_PACING).await;
            }
        }

        info!(
            "Saved text to mp3 files: {} unit(s), {:.2}s total",
            acc.processed_count, acc.total_duration
        );
        Ok((acc.total_duration, acc.processed_count))
    }

    /// Narrates one unit and returns its measured duration. Recoverable
    /// failures (synthesis, unreadable artifact, empty text) contribute zero
    /// and never stop the run.
    async fn narrate_unit(
        &self,
        assembler: &AudioAssembler,
        stem: &str,
        raw: &str,
        lang: Option<&str>,
    ) -> f64 {
        let text = self.process_text(raw, lang);
        if text.trim().is_empty() {
            warn!("Unit '{stem}' is empty after cleanup; skipping");
            return 0.0;
        }
        let limit = self.settings.effective_limit(self.backend.max_chars());
        let chunks = segment(&text, limit);
        let voice = if self.settings.random_voice {
            self.backend.random_voice()
        } else {
            None
        };
        info!(
            "[TTS] {:.90} ({} chunk(s))",
            text.replace('\n', " "),
            chunks.len()
        );
        match assembler
            .synthesize_unit(self.backend, &chunks, voice.as_deref(), stem)
            .await
        {
            Ok(artifact) => {
                info!("Unit '{stem}' -> {:.2}s", artifact.duration);
                artifact.duration
            }
            Err(e) => {
                warn!("Unit '{stem}' failed: {e}; continuing with zero duration");
                0.0
            }
        }
    }

    fn process_text(&self, raw: &str, lang: Option<&str>) -> String {
        let text = normalize(raw);
        let (Some(lang), Some(translator)) = (lang, self.translator) else {
            return text;
        };
        match translator.translate(&text, lang) {
            Ok(translated) => translated,
            Err(e) => {
                warn!("Translation with '{}' failed: {e}; narrating untranslated", translator.name());
                text
            }
        }
    }
}
