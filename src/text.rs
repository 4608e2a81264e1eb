use regex::Regex;

/// Cleans raw thread text for narration: strips links and markdown, collapses
/// newlines into sentence breaks, spells out acronyms the engines mispronounce,
/// and guarantees terminal punctuation so the voice doesn't blend sentences.
///
/// Best effort and infallible: malformed input comes back with whatever
/// substitutions succeeded. Idempotent, so already-normalized text passes
/// through unchanged.
pub fn normalize(raw: &str) -> String {
    let mut text = raw.trim().to_string();
    if text.is_empty() {
        return text;
    }

    // Links are stripped before acronym handling; a bare-domain pattern would
    // re-match "A.I" on a second pass, so only scheme/www-anchored URLs count.
    let urls = Regex::new(r"(https?://|www\.)[^\s)\]]+").unwrap();
    text = urls.replace_all(&text, " ").into_owned();

    text = text.replace("\r\n", "\n").replace('\r', "\n");
    text = text.replace('\n', ". ");

    let ai = Regex::new(r"\bAI\b").unwrap();
    text = ai.replace_all(&text, "A.I").into_owned();
    let agi = Regex::new(r"\bAGI\b").unwrap();
    text = agi.replace_all(&text, "A.G.I").into_owned();

    text = text.trim().to_string();
    if !text.is_empty() && !ends_with_terminal(&text) {
        text.push('.');
    }

    // Heal the spaced-period artifacts the steps above can introduce.
    text = text.replace(". . .", ".");
    text = text.replace(".. .", ".");
    text = text.replace(". .", ".");
    let quoted_period = Regex::new(r#"\."\."#).unwrap();
    text = quoted_period.replace_all(&text, "\".").into_owned();

    text = strip_markdown(&text);

    let period_runs = Regex::new(r"\.{2,}").unwrap();
    text = period_runs.replace_all(&text, ".").into_owned();

    let spaces = Regex::new(r"[ \t]+").unwrap();
    text = spaces.replace_all(&text, " ").into_owned();

    text.trim().to_string()
}

fn ends_with_terminal(text: &str) -> bool {
    let mut rev = text.chars().rev();
    match rev.next() {
        Some('.') | Some('!') | Some('?') => true,
        Some('"') | Some('\'') => matches!(rev.next(), Some('.') | Some('!') | Some('?')),
        _ => false,
    }
}

fn strip_markdown(text: &str) -> String {
    let link = Regex::new(r"\[([^\]]*)\]\([^)]*\)").unwrap();
    let mut out = link.replace_all(text, "$1").into_owned();
    let heading = Regex::new(r"(?m)^#{1,6}\s*").unwrap();
    out = heading.replace_all(&out, "").into_owned();
    out = out.replace("~~", "");
    out.replace(['*', '`'], "")
}
