use sha2::{Digest, Sha256};

use crate::config::ChunkingConfig;
use crate::domain::{Chunk, Document};
use crate::error::AppError;

/// A window of text and the char offset it starts at within the joined document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSpan {
    pub start: usize,
    pub text: String,
}

/// Fixed-size character windows of `chunk_size`, each starting
/// `chunk_size - chunk_overlap` chars after the previous one. The window that reaches
/// the end of the text is the last one. Blank input yields no windows.
pub fn split_with_overlap(text: &str, cfg: &ChunkingConfig) -> Result<Vec<ChunkSpan>, AppError> {
    cfg.validate()?;
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    // Byte offset of every char boundary, plus the end of the string.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total = bounds.len() - 1;
    let step = cfg.chunk_size - cfg.chunk_overlap;

    let mut out = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + cfg.chunk_size).min(total);
        out.push(ChunkSpan {
            start,
            text: text[bounds[start]..bounds[end]].to_string(),
        });
        if end == total {
            break;
        }
        start += step;
    }
    Ok(out)
}

/// Chunks one document. Pages are joined with `\n`; each chunk is stamped with the
/// page its first character falls on.
pub fn chunk_document(doc: &Document, cfg: &ChunkingConfig) -> Result<Vec<Chunk>, AppError> {
    let mut joined = String::new();
    // (char offset where the page starts, page number)
    let mut page_starts: Vec<(usize, Option<u32>)> = Vec::with_capacity(doc.pages.len());
    let mut offset = 0usize;
    for (i, page) in doc.pages.iter().enumerate() {
        if i > 0 {
            joined.push('\n');
            offset += 1;
        }
        let text = normalize_text(&page.text);
        page_starts.push((offset, page.number));
        offset += text.chars().count();
        joined.push_str(&text);
    }

    let spans = split_with_overlap(&joined, cfg)?;
    let chunks = spans
        .into_iter()
        .enumerate()
        .map(|(ordinal, span)| {
            let page = page_starts
                .iter()
                .rev()
                .find(|(start, _)| *start <= span.start)
                .and_then(|(_, n)| *n);
            new_chunk(&doc.source, ordinal as u32, page, span.text)
        })
        .collect();
    Ok(chunks)
}

/// Chunk identity is content-derived: the same source, position and text always
/// produce the same id.
pub fn new_chunk(source: &str, ordinal: u32, page: Option<u32>, text: String) -> Chunk {
    let text_sha256 = sha256_hex(text.as_bytes());
    let chunk_id = sha256_hex(format!("v1|{source}|{ordinal}|{text_sha256}").as_bytes());
    Chunk {
        chunk_id,
        source: source.to_string(),
        page,
        ordinal,
        text,
        text_sha256,
    }
}

pub(crate) fn normalize_text(s: &str) -> String {
    s.replace("\r\n", "\n").replace('\r', "\n")
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
