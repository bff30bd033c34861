//! Sentence-window chunking.
//!
//! Turns raw crawled text into retrieval-sized chunks: split into
//! sentences on terminal punctuation, drop noise fragments, then group
//! consecutive sentences into fixed-size windows.

use std::sync::OnceLock;

use regex::Regex;

/// Default number of sentences grouped into one chunk.
pub const SENTENCES_PER_CHUNK: usize = 4;

/// Sentences shorter than this after trimming are treated as noise
/// (stray punctuation, navigation fragments) and dropped.
pub const MIN_SENTENCE_LEN: usize = 10;

fn boundary_regex() -> &'static Regex {
    static BOUNDARY: OnceLock<Regex> = OnceLock::new();
    BOUNDARY.get_or_init(|| Regex::new(r"[.?!]\s+").expect("valid regex"))
}

/// Split text into trimmed sentences, delimited by `.`, `?` or `!`
/// followed by whitespace. The terminal mark stays with its sentence; a
/// final sentence without one is kept as-is. Fragments shorter than
/// [`MIN_SENTENCE_LEN`] characters are dropped.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for boundary in boundary_regex().find_iter(text) {
        // the match begins on the terminal mark, which belongs to the
        // sentence before the split
        let end = boundary.start() + 1;
        push_sentence(&mut sentences, &text[start..end]);
        start = boundary.end();
    }
    push_sentence(&mut sentences, &text[start..]);

    sentences
}

fn push_sentence(sentences: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if trimmed.chars().count() >= MIN_SENTENCE_LEN {
        sentences.push(trimmed.to_string());
    }
}

/// Group the text's sentences into consecutive non-overlapping windows of
/// `sentences_per_chunk`, each joined by single spaces. The last window
/// may be smaller. Deterministic; sentences are never reordered or
/// duplicated.
pub fn chunk_text(text: &str, sentences_per_chunk: usize) -> Vec<String> {
    let window = sentences_per_chunk.max(1);
    split_sentences(text)
        .chunks(window)
        .map(|group| group.join(" "))
        .collect()
}
