use regex::Regex;
use tracing::{debug, warn};

/// Splits normalized text into chunks that each fit one TTS call.
///
/// Splits at sentence-ending punctuation or newlines, then greedily merges
/// consecutive sentences while they still fit `limit` (counted in chars, the
/// unit providers enforce). A lone sentence longer than `limit` is broken at
/// whitespace so no chunk ever exceeds the limit. Text already within the
/// limit comes back untouched as a single chunk.
pub fn segment(text: &str, limit: usize) -> Vec<String> {
    if text.trim().is_empty() {
        debug!("Nothing to segment after trimming");
        return Vec::new();
    }
    let limit = limit.max(1);
    if text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    let re = Regex::new(r"(?s)([^.!?\n]+[.!?\n]+)|([^.!?\n]+$)").unwrap();
    let mut sentences = Vec::new();
    for cap in re.captures_iter(text) {
        let s = cap.get(0).unwrap().as_str().trim();
        if s.is_empty() {
            debug!("Dropping whitespace-only sentence fragment");
            continue;
        }
        if s.chars().count() > limit {
            sentences.extend(split_oversized(s, limit));
        } else {
            sentences.push(s.to_string());
        }
    }
    if sentences.is_empty() {
        warn!("No sentence breaks found; hard-splitting whole text");
        return split_oversized(text.trim(), limit);
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;
    for s in sentences {
        let s_len = s.chars().count();
        if current.is_empty() {
            current = s;
            current_len = s_len;
        } else if current_len + 1 + s_len <= limit {
            current.push(' ');
            current.push_str(&s);
            current_len += 1 + s_len;
        } else {
            chunks.push(std::mem::take(&mut current));
            current = s;
            current_len = s_len;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Breaks a fragment with no usable sentence boundary at whitespace, falling
/// back to raw character windows for a single overlong word.
fn split_oversized(fragment: &str, limit: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;
    for word in fragment.split_whitespace() {
        let w_len = word.chars().count();
        if w_len > limit {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for window in chars.chunks(limit) {
                out.push(window.iter().collect());
            }
        } else if current.is_empty() {
            current = word.to_string();
            current_len = w_len;
        } else if current_len + 1 + w_len <= limit {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + w_len;
        } else {
            out.push(std::mem::take(&mut current));
            current = word.to_string();
            current_len = w_len;
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence(word: &str, len: usize) -> String {
        // builds a sentence of exactly `len` chars ending in a period
        let mut s = String::new();
        while s.chars().count() + word.len() + 1 < len {
            s.push_str(word);
            s.push(' ');
        }
        while s.chars().count() < len - 1 {
            s.push('a');
        }
        s.push('.');
        s
    }

    #[test]
    fn short_text_is_a_single_identical_chunk() {
        let text = "Short enough already.";
        assert_eq!(segment(text, 300), vec![text.to_string()]);
    }

    #[test]
    fn no_chunk_exceeds_the_limit() {
        let text = format!(
            "{} {} {} wordthatkeepsgoingandgoingandgoingwithoutanybreaks",
            sentence("alpha", 120),
            sentence("beta", 45),
            sentence("gamma", 200),
        );
        for limit in [20, 50, 100, 300] {
            for chunk in segment(&text, limit) {
                assert!(
                    chunk.chars().count() <= limit,
                    "chunk of {} chars over limit {limit}",
                    chunk.chars().count()
                );
            }
        }
    }

    #[test]
    fn sentence_order_is_preserved() {
        let text = "First one. Second one. Third one. Fourth one.";
        let chunks = segment(text, 25);
        assert!(chunks.len() > 1);
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn three_long_sentences_become_three_chunks() {
        let text = format!(
            "{} {} {}",
            sentence("story", 300),
            sentence("drama", 299),
            sentence("reply", 298),
        );
        let chunks = segment(&text, 300);
        assert_eq!(chunks.len(), 3);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 300);
        }
    }

    #[test]
    fn whitespace_only_input_yields_no_chunks() {
        assert!(segment("", 300).is_empty());
        assert!(segment("   \n\t  ", 300).is_empty());
        assert!(segment("  ", 1).is_empty());
    }

    #[test]
    fn whitespace_fragments_are_dropped() {
        let chunks = segment("One.   \n   \n Two.", 6);
        assert_eq!(chunks, vec!["One.".to_string(), "Two.".to_string()]);
    }

    #[test]
    fn adjacent_sentences_merge_when_they_fit() {
        let chunks = segment("Aa. Bb. Cc. Dd. Ee. Ff. Gg. Hh.", 12);
        assert_eq!(chunks, vec!["Aa. Bb. Cc.", "Dd. Ee. Ff.", "Gg. Hh."]);
    }
}
