//! Retrieved evidence units and the `<doc>` context format fed to the
//! generator. Documents are run-scoped values: immutable once retrieved,
//! never persisted.

pub mod images;

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One retrieved evidence unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Text content, possibly with inline `(image.png)` references.
    pub content: String,
    /// Source identifier (knowledge-base page URL, web search, ...).
    pub source: String,
}

impl Document {
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
        }
    }

    /// 32-hex page hash embedded in the source identifier, when present.
    pub fn page_hash(&self) -> Option<String> {
        extract_page_hash(&self.source)
    }

    /// Content-addressable reference: the page hash from the source, falling
    /// back to the sha-256 of the content for sources without one.
    pub fn reference(&self) -> String {
        self.page_hash()
            .unwrap_or_else(|| hex::encode(Sha256::digest(self.content.as_bytes())))
    }
}

fn page_hash_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("(?i)[a-f0-9]{32}").expect("static regex"))
}

pub fn extract_page_hash(source: &str) -> Option<String> {
    page_hash_regex()
        .find(source)
        .map(|m| m.as_str().to_lowercase())
}

/// Concatenates documents into the tagged context block the prompts expect:
/// `<doc> [pageId hash: ...]` header, blank line, content, closing tag.
pub fn wrap_documents(documents: &[Document]) -> String {
    documents
        .iter()
        .map(|doc| {
            format!(
                "<doc> [pageId hash: {}]\n\n{}\n</doc>",
                doc.reference(),
                doc.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
