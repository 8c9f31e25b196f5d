//! Text segmentation for narration — markdown cleaning, sentence splitting,
//! and greedy merging into speakable chunks.
//!
//! Pure functions, no I/O. The merge step reduces round trips to the
//! synthesis backend (fewer pauses between chunks) while keeping each
//! request short enough for low latency-to-first-audio.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use crate::types::DEFAULT_MAX_SEGMENT_LEN;

// Compiled regexes — allocated once, reused across calls.
static RE_FENCED_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").unwrap());
static RE_HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static RE_MD_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[*#`_\[\]|>~]").unwrap());
static RE_PARA_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());
static RE_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").unwrap());
static RE_SENTENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^.!?]+[.!?]+").unwrap());

/// A unit of narratable text: one synthesis request, one playback unit.
///
/// Immutable after creation. A new source text invalidates and replaces the
/// entire sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    /// Zero-based position in the segment sequence.
    pub index: usize,
    /// Cleaned narration text, non-empty.
    pub text: String,
    /// `text` split on whitespace — used only for highlight mapping,
    /// never re-joined for speech.
    pub words: Vec<String>,
}

impl Segment {
    fn new(index: usize, text: String) -> Self {
        let words = text.split_whitespace().map(str::to_string).collect();
        Self { index, text, words }
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }
}

/// Strip markdown so the text reads naturally when spoken.
///
/// Fenced code blocks are removed entirely (narration must not read code),
/// HTML tags and residual formatting characters are dropped, paragraph
/// breaks become sentence breaks, and all whitespace collapses to single
/// spaces.
pub fn clean_for_narration(text: &str) -> String {
    let mut c = text.to_string();
    c = RE_FENCED_CODE.replace_all(&c, " ").into_owned();
    c = RE_HTML_TAG.replace_all(&c, " ").into_owned();
    c = RE_MD_CHARS.replace_all(&c, "").into_owned();
    c = RE_PARA_BREAK.replace_all(&c, ". ").into_owned();
    c = RE_WHITESPACE.replace_all(&c, " ").into_owned();
    c.trim().to_string()
}

/// Split cleaned text into raw sentences.
///
/// A sentence ends at a run of `.`, `!` or `?`. Any trailing text without a
/// terminator becomes a final sentence, so no content is ever dropped.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut consumed = 0;

    for m in RE_SENTENCE.find_iter(text) {
        let s = m.as_str().trim();
        if !s.is_empty() {
            sentences.push(s.to_string());
        }
        consumed = m.end();
    }

    let tail = text[consumed..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }

    sentences
}

/// Segment markdown text into speakable chunks with the default length bound.
pub fn segment(markdown: &str) -> Vec<Segment> {
    segment_with_limit(markdown, DEFAULT_MAX_SEGMENT_LEN)
}

/// Segment markdown text, greedily merging consecutive sentences while the
/// running chunk stays under `max_len` characters.
///
/// A sentence is never split across chunks: a lone sentence longer than
/// `max_len` becomes its own oversized chunk.
pub fn segment_with_limit(markdown: &str, max_len: usize) -> Vec<Segment> {
    let cleaned = clean_for_narration(markdown);
    if cleaned.is_empty() {
        return Vec::new();
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0;

    for sentence in split_sentences(&cleaned) {
        // max_len bounds characters, not bytes
        let sentence_chars = sentence.chars().count();
        if current.is_empty() {
            current_chars = sentence_chars;
            current = sentence;
        } else if current_chars + 1 + sentence_chars <= max_len {
            current.push(' ');
            current.push_str(&sentence);
            current_chars += 1 + sentence_chars;
        } else {
            chunks.push(std::mem::replace(&mut current, sentence));
            current_chars = sentence_chars;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
        .into_iter()
        .filter(|c| !c.trim().is_empty())
        .enumerate()
        .map(|(i, text)| Segment::new(i, text))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── clean_for_narration ─────────────────────────────────────────

    #[test]
    fn strips_fenced_code_blocks() {
        let input = "before ```rust\nfn main() {}\n``` after";
        assert_eq!(clean_for_narration(input), "before after");
    }

    #[test]
    fn strips_html_tags() {
        assert_eq!(clean_for_narration("a <b>bold</b> word"), "a bold word");
    }

    #[test]
    fn strips_markdown_characters() {
        assert_eq!(
            clean_for_narration("# Title with **bold** and `code`"),
            "Title with bold and code"
        );
    }

    #[test]
    fn paragraph_break_becomes_sentence_break() {
        assert_eq!(clean_for_narration("first\n\nsecond"), "first. second");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(clean_for_narration("hello    world"), "hello world");
    }

    #[test]
    fn empty_input() {
        assert_eq!(clean_for_narration(""), "");
        assert_eq!(clean_for_narration("   \n  "), "");
    }

    // ── split_sentences ─────────────────────────────────────────────

    #[test]
    fn splits_on_terminators() {
        let s = split_sentences("Hello world. How are you? I am fine!");
        assert_eq!(s, vec!["Hello world.", "How are you?", "I am fine!"]);
    }

    #[test]
    fn run_together_terminators_stay_with_sentence() {
        let s = split_sentences("Wait... really?! Yes.");
        assert_eq!(s, vec!["Wait...", "really?!", "Yes."]);
    }

    #[test]
    fn unterminated_tail_kept() {
        let s = split_sentences("Done. trailing remainder");
        assert_eq!(s, vec!["Done.", "trailing remainder"]);
    }

    #[test]
    fn no_terminator_at_all() {
        let s = split_sentences("just one pseudo sentence");
        assert_eq!(s, vec!["just one pseudo sentence"]);
    }

    #[test]
    fn split_sentences_empty() {
        assert!(split_sentences("").is_empty());
    }

    // ── segment ─────────────────────────────────────────────────────

    #[test]
    fn short_sentences_merge_into_one_segment() {
        // ~45 chars total, well under the 180 threshold
        let segs = segment("Sentence one. Sentence two. Sentence three.");
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].text, "Sentence one. Sentence two. Sentence three.");
        assert_eq!(segs[0].index, 0);
    }

    #[test]
    fn merge_respects_length_bound() {
        let text = "First sentence here. Second sentence here. Third sentence here.";
        let segs = segment_with_limit(text, 45);
        assert!(segs.len() >= 2);
        for seg in &segs {
            // Bound holds unless a lone sentence exceeds it (none do here)
            assert!(seg.text.len() <= 45, "segment too long: {}", seg.text.len());
        }
    }

    #[test]
    fn length_bound_counts_characters_not_bytes() {
        // 44 characters joined, 46 bytes: multi-byte text must not split
        // earlier than ASCII of the same visible length.
        let text = "Übung macht den Meister. Ärger lehrt Geduld.";
        let segs = segment_with_limit(text, 45);
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].text, text);
    }

    #[test]
    fn never_splits_a_sentence() {
        let long = format!("{} end.", "word ".repeat(50));
        let segs = segment_with_limit(&long, 40);
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].text, long.trim());
    }

    #[test]
    fn indices_are_sequential() {
        let text = "One. Two. Three. Four. Five. Six. Seven. Eight.";
        let segs = segment_with_limit(text, 12);
        for (i, seg) in segs.iter().enumerate() {
            assert_eq!(seg.index, i);
        }
    }

    #[test]
    fn words_are_whitespace_split() {
        let segs = segment("Hello brave new world.");
        assert_eq!(segs[0].words, vec!["Hello", "brave", "new", "world."]);
        assert_eq!(segs[0].word_count(), 4);
    }

    #[test]
    fn empty_input_yields_no_segments() {
        assert!(segment("").is_empty());
        assert!(segment("```\nonly code\n```").is_empty());
    }

    #[test]
    fn all_content_preserved_in_order() {
        let text = "The quick brown fox. Pack my box with jugs. Zebras jump quickly. A final fragment";
        let segs = segment_with_limit(text, 30);
        let rejoined: String = segs
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        for word in text.split_whitespace() {
            assert!(rejoined.contains(word), "missing word: {word}");
        }
        // Order preserved: first chunk starts the text, last chunk ends it
        assert!(text.starts_with(&segs[0].text));
        assert!(text.ends_with(segs.last().unwrap().text.as_str()));
    }

    #[test]
    fn default_threshold() {
        assert_eq!(DEFAULT_MAX_SEGMENT_LEN, 180);
    }
}
