use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

/// Scraped thread handed over by the scraping collaborator. Immutable for the
/// whole narration run; normalization and translation produce new strings
/// instead of rewriting these fields.
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadContent {
    pub thread_id: String,
    pub thread_title: String,
    #[serde(default)]
    pub post_lang: Option<String>,
    #[serde(default)]
    pub thread_post: PostBody,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

/// Self-text of the post: one block, or pre-split paragraphs for
/// per-paragraph story mode.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PostBody {
    Whole(String),
    Paragraphs(Vec<String>),
}

impl Default for PostBody {
    fn default() -> Self {
        PostBody::Whole(String::new())
    }
}

impl PostBody {
    pub fn whole(&self) -> String {
        match self {
            PostBody::Whole(s) => s.clone(),
            PostBody::Paragraphs(v) => v.join("\n\n"),
        }
    }

    pub fn paragraphs(&self) -> Vec<String> {
        match self {
            PostBody::Whole(s) => s
                .split("\n\n")
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect(),
            PostBody::Paragraphs(v) => v.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    pub comment_body: String,
}

pub fn load_thread(path: &Path) -> anyhow::Result<ThreadContent> {
    let data = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("cannot read thread file {}: {e}", path.display()))?;
    let thread: ThreadContent = serde_json::from_str(&data)?;
    info!(
        "Loaded thread '{}' ({} comments)",
        thread.thread_title,
        thread.comments.len()
    );
    Ok(thread)
}

/// Thread ids become directory names, so everything but word characters,
/// whitespace and hyphens is removed.
pub fn sanitize_thread_id(id: &str) -> String {
    let re = Regex::new(r"[^\w\s-]").unwrap();
    re.replace_all(id, "").into_owned()
}
