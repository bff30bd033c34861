//! Corpus files for the offline pipeline.
//!
//! The crawl stage writes the raw corpus; the chunk stage writes the
//! chunked corpus, one chunk per section separated by double newlines.

use std::io;
use std::path::Path;

pub const RAW_CORPUS_FILE: &str = "aven_data.txt";
pub const CHUNKED_CORPUS_FILE: &str = "chunked_aven_data.txt";

/// Read the chunked corpus: split on double newlines, trim, drop empties.
pub fn read_chunks(path: &Path) -> io::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .split("\n\n")
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| chunk.to_string())
        .collect())
}

/// Write chunks separated by double newlines.
pub fn write_chunks(path: &Path, chunks: &[String]) -> io::Result<()> {
    let mut out = String::new();
    for chunk in chunks {
        out.push_str(chunk);
        out.push_str("\n\n");
    }
    std::fs::write(path, out)
}
