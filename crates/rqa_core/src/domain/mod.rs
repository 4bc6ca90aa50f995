use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One page of extracted text. `number` is 1-based for paged formats and `None`
/// for formats without pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub number: Option<u32>,
    pub text: String,
}

/// A loaded source document. Only lives long enough to be chunked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub source: String,
    pub path: PathBuf,
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub chunk_id: String,
    pub source: String,
    pub page: Option<u32>,
    pub ordinal: u32,
    pub text: String,
    pub text_sha256: String,
}

impl Chunk {
    pub fn citation(&self) -> Citation {
        Citation {
            source: self.source.clone(),
            page: self.page,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Citation {
    pub source: String,
    pub page: Option<u32>,
}

impl Citation {
    /// Human-readable label, e.g. `capital_requirements.pdf | page 4`.
    pub fn label(&self) -> String {
        match self.page {
            Some(p) => format!("{} | page {}", self.source, p),
            None => format!("{} | page N/A", self.source),
        }
    }
}

impl fmt::Display for Citation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Ordered citations for `chunks`, de-duplicated by `(source, page)` in first-seen order.
pub fn dedup_citations(chunks: &[Chunk]) -> Vec<Citation> {
    let mut out: Vec<Citation> = Vec::new();
    for c in chunks {
        let cite = c.citation();
        if !out.contains(&cite) {
            out.push(cite);
        }
    }
    out
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Flag {
    #[serde(rename = "YES")]
    Yes,
    #[serde(rename = "NO")]
    No,
}

impl Flag {
    pub fn from_bool(raised: bool) -> Self {
        if raised {
            Flag::Yes
        } else {
            Flag::No
        }
    }

    pub fn is_raised(self) -> bool {
        self == Flag::Yes
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Flag::Yes => "YES",
            Flag::No => "NO",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit record for one answered query. Appended once, never rewritten.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryRecord {
    pub timestamp: String, // RFC3339
    pub query: String,
    pub answer: String,
    pub citations: Vec<Citation>,
    pub flag_hallucination: Flag,
    pub flag_redundancy: Flag,
}

impl QueryRecord {
    /// `"; "`-joined citation labels, the shape used by the CSV log.
    pub fn sources_joined(&self) -> String {
        self.citations
            .iter()
            .map(|c| c.label())
            .collect::<Vec<_>>()
            .join("; ")
    }
}
