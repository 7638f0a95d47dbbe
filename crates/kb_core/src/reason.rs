use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fields::{self, Record};
use crate::format::{format_short_date, parse_timestamp};

const DOCUMENT_KEYS: &[&str] = &[
    "source",
    "source_document",
    "document",
    "document_name",
    "file_name",
];
const PAGE_RANGE_KEYS: &[&str] = &["page_range"];
const PAGE_KEYS: &[&str] = &["page"];
const BODY_KEYS: &[&str] = &["full_text", "text"];
const DATE_KEYS: &[&str] = &["upload_date", "created_at"];
const SCORE_KEYS: &[&str] = &["score"];
const SUMMARY_KEYS: &[&str] = &["summary"];

pub const UNKNOWN_DOCUMENT: &str = "Unknown Document";
pub const UNKNOWN_PAGE: &str = "N/A";

/// Evidence record attached to an assistant answer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReasonChunk(Record);

impl ReasonChunk {
    pub fn from_record(record: Record) -> Self {
        Self(record)
    }

    pub fn record(&self) -> &Record {
        &self.0
    }

    pub fn document_name(&self) -> String {
        fields::first_text(&self.0, DOCUMENT_KEYS).unwrap_or_else(|| UNKNOWN_DOCUMENT.to_string())
    }

    pub fn page_label(&self) -> String {
        if let Some(range) = fields::first_text(&self.0, PAGE_RANGE_KEYS) {
            return range;
        }
        match fields::first_text(&self.0, PAGE_KEYS) {
            Some(page) => format!("Page {page}"),
            None => UNKNOWN_PAGE.to_string(),
        }
    }

    pub fn body_text(&self) -> String {
        fields::first_text(&self.0, BODY_KEYS).unwrap_or_default()
    }

    /// Relevance in `[0, 1]`; missing scores read as 0.
    pub fn score(&self) -> f64 {
        fields::first_f64(&self.0, SCORE_KEYS).unwrap_or(0.0)
    }

    pub fn relevance(&self) -> Relevance {
        Relevance::from_score(self.score())
    }

    /// Upload date as `"Oct 16, 2026"`; absent when missing or unparsable.
    pub fn date_label(&self) -> Option<String> {
        fields::first_text(&self.0, DATE_KEYS)
            .and_then(|raw| parse_timestamp(&raw))
            .map(format_short_date)
    }

    pub fn summary(&self) -> Option<String> {
        fields::first_text(&self.0, SUMMARY_KEYS)
    }

    pub fn tags(&self) -> Vec<String> {
        match self.0.get("tags") {
            Some(Value::Array(tags)) => tags
                .iter()
                .filter_map(|tag| tag.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn char_count(&self) -> usize {
        self.body_text().chars().count()
    }

    pub fn word_count(&self) -> usize {
        self.body_text().split_whitespace().count()
    }

    /// Plain-text block used by "copy source".
    pub fn source_summary(&self) -> String {
        format!(
            "Source: {}\nPage: {}\nRelevance: {:.1}%\n\nContent:\n{}",
            self.document_name(),
            self.page_label(),
            self.score() * 100.0,
            self.body_text()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relevance {
    High,
    Medium,
    Low,
}

impl Relevance {
    pub fn from_score(score: f64) -> Self {
        if score > 0.8 {
            Relevance::High
        } else if score > 0.6 {
            Relevance::Medium
        } else {
            Relevance::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Relevance::High => "High Relevance",
            Relevance::Medium => "Medium Relevance",
            Relevance::Low => "Low Relevance",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Relevance::High => "green",
            Relevance::Medium => "blue",
            Relevance::Low => "orange",
        }
    }
}

/// Wrap-around pager over the evidence of one answer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EvidencePager {
    chunks: Vec<ReasonChunk>,
    index: usize,
}

impl EvidencePager {
    pub fn new(chunks: Vec<ReasonChunk>) -> Self {
        Self { chunks, index: 0 }
    }

    pub fn current(&self) -> Option<&ReasonChunk> {
        self.chunks.get(self.index)
    }

    /// Zero-based position of the current chunk.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn next(&mut self) {
        if !self.chunks.is_empty() {
            self.index = (self.index + 1) % self.chunks.len();
        }
    }

    pub fn prev(&mut self) {
        if !self.chunks.is_empty() {
            self.index = (self.index + self.chunks.len() - 1) % self.chunks.len();
        }
    }

    pub fn title(&self) -> String {
        format!("Source {}", self.index + 1)
    }
}
