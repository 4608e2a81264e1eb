/// Machine-translation collaborator. The narration pipeline only depends on
/// this seam; providers live outside this crate and are wired in by the
/// caller. Translation runs on normalized text, after cleanup and before
/// segmentation.
pub trait Translator: Send + Sync {
    fn name(&self) -> &str;

    fn translate(&self, text: &str, to_lang: &str) -> anyhow::Result<String>;
}
