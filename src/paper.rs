use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized arXiv record.
///
/// Every field is present after gateway mapping; upstream absence maps to the
/// explicit empty value for the field (`None` for the date, `""` for the
/// strings), never to omission. `summary` carries the full abstract and is
/// never truncated inside the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub arxiv_id: String,
    pub title: String,
    /// Publication byline order, preserved and not deduplicated.
    pub authors: Vec<String>,
    pub published: Option<DateTime<Utc>>,
    pub summary: String,
    pub primary_category: String,
    pub pdf_url: String,
}

/// A free-text search request with an optional result bound.
///
/// The bound here is taken as-is; clamping to the supported range is the tool
/// layer's job.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub text: String,
    pub max_results: usize,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>, max_results: usize) -> Self {
        Self {
            text: text.into(),
            max_results,
        }
    }
}
