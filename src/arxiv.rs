//! Gateway to the arXiv metadata API.
//!
//! Wraps the two upstream operations (keyword search, single-record fetch)
//! against the Atom endpoint at `export.arxiv.org` and maps raw entries into
//! the normalized [`Paper`] representation. One attempt per call; transient
//! failures surface as `UpstreamUnavailable` for the caller to report.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::ArxivConfig;
use crate::error::{PaperbotError, Result};
use crate::ident::CanonicalId;
use crate::paper::{Paper, SearchQuery};

pub const DEFAULT_BASE_URL: &str = "https://export.arxiv.org/api/query";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("paperbot/", env!("CARGO_PKG_VERSION"));

/// Read-only access to the upstream paper repository.
///
/// Stands between the tool layer and the network so tests can substitute an
/// in-memory implementation.
#[async_trait]
pub trait PaperGateway: Send + Sync {
    /// Relevance-ordered keyword search. Returns at most the requested bound;
    /// an empty vec (not an error) when nothing matches.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Paper>>;

    /// Retrieves exactly one record. Fails with `NotFound` when the
    /// identifier is well formed but absent upstream.
    async fn fetch(&self, id: &CanonicalId) -> Result<Paper>;
}

/// `PaperGateway` implementation backed by the arXiv Atom API.
///
/// Owns no state beyond the HTTP client configuration, which is read-only
/// after construction and safe to share across concurrent requests.
#[derive(Clone)]
pub struct ArxivGateway {
    http: reqwest::Client,
    base_url: String,
}

impl ArxivGateway {
    pub fn new() -> Result<Self> {
        Self::from_config(&ArxivConfig::default())
    }

    pub fn from_config(cfg: &ArxivConfig) -> Result<Self> {
        let timeout = if cfg.timeout_secs == 0 {
            DEFAULT_TIMEOUT_SECS
        } else {
            cfg.timeout_secs
        };
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .map_err(|err| PaperbotError::Protocol(format!("http client error: {err}")))?;
        let base_url = if cfg.base_url.is_empty() {
            DEFAULT_BASE_URL.to_string()
        } else {
            cfg.base_url.clone()
        };
        Ok(Self { http, base_url })
    }

    async fn get_feed(&self, url: &str) -> Result<String> {
        debug!(%url, "querying arXiv");
        let response = self
            .http
            .get(url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(|err| PaperbotError::UpstreamUnavailable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(PaperbotError::UpstreamUnavailable(format!(
                "arXiv returned {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|err| PaperbotError::UpstreamUnavailable(err.to_string()))
    }
}

#[async_trait]
impl PaperGateway for ArxivGateway {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Paper>> {
        let url = format!(
            "{}?search_query=all:{}&start=0&max_results={}&sortBy=relevance",
            self.base_url,
            urlencoding::encode(&query.text),
            query.max_results
        );
        let xml = self.get_feed(&url).await?;
        let mut papers = parse_feed(&xml, None);
        papers.truncate(query.max_results);
        debug!(query = %query.text, results = papers.len(), "arXiv search complete");
        Ok(papers)
    }

    async fn fetch(&self, id: &CanonicalId) -> Result<Paper> {
        let url = format!(
            "{}?id_list={}&max_results=1",
            self.base_url,
            urlencoding::encode(id.as_str())
        );
        let xml = self.get_feed(&url).await?;
        parse_feed(&xml, Some(id))
            .into_iter()
            .next()
            .ok_or_else(|| PaperbotError::NotFound(id.as_str().to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Atom feed mapping
// ─────────────────────────────────────────────────────────────────────────────

/// Maps an Atom feed into normalized papers.
///
/// When `requested` is set (fetch), the resulting `arxiv_id` mirrors the
/// requested identifier's version preference; search results are always
/// versionless. Entries without a usable title, and the synthetic error
/// entries arXiv emits for malformed `id_list` values, are dropped.
fn parse_feed(xml: &str, requested: Option<&CanonicalId>) -> Vec<Paper> {
    let mut papers = Vec::new();
    for chunk in xml.split("<entry>").skip(1) {
        let Some(end) = chunk.find("</entry>") else {
            continue;
        };
        if let Some(paper) = parse_entry(&chunk[..end], requested) {
            papers.push(paper);
        }
    }
    papers
}

fn parse_entry(entry: &str, requested: Option<&CanonicalId>) -> Option<Paper> {
    let abs_url = extract_tag(entry, "id").unwrap_or_default();
    if abs_url.contains("/api/errors") {
        return None;
    }

    let title = extract_tag(entry, "title")
        .map(|s| collapse_ws(&unescape(&s)))
        .unwrap_or_default();
    if title.is_empty() {
        return None;
    }

    let summary = extract_tag(entry, "summary")
        .map(|s| collapse_ws(&unescape(&s)))
        .unwrap_or_default();

    let mut authors = Vec::new();
    for block in entry.split("<author>").skip(1) {
        if let Some(name) = extract_tag(block, "name") {
            authors.push(unescape(name.trim()));
        }
    }

    let published = extract_tag(entry, "published")
        .and_then(|raw| DateTime::parse_from_rfc3339(raw.trim()).ok())
        .map(|dt| dt.with_timezone(&Utc));

    let primary_category = extract_attr(entry, "<arxiv:primary_category", "term")
        .or_else(|| extract_attr(entry, "<category", "term"))
        .unwrap_or_default();

    let entry_id = abs_url
        .rsplit("/abs/")
        .next()
        .filter(|_| abs_url.contains("/abs/"))
        .unwrap_or_default();

    let arxiv_id = match requested {
        Some(id) if id.has_version() => {
            if entry_id.is_empty() {
                id.as_str().to_string()
            } else {
                entry_id.to_string()
            }
        }
        Some(id) => {
            if entry_id.is_empty() {
                id.versionless().to_string()
            } else {
                strip_version(entry_id).to_string()
            }
        }
        None => strip_version(entry_id).to_string(),
    };

    let pdf_url = extract_attr(entry, "<link title=\"pdf\"", "href").unwrap_or_else(|| {
        if abs_url.contains("/abs/") {
            abs_url.replace("/abs/", "/pdf/")
        } else {
            String::new()
        }
    });

    Some(Paper {
        arxiv_id,
        title,
        authors,
        published,
        summary,
        primary_category,
        pdf_url,
    })
}

fn strip_version(id: &str) -> &str {
    if let Some(pos) = id.rfind('v') {
        if pos > 0 && id[pos + 1..].bytes().all(|b| b.is_ascii_digit()) && pos + 1 < id.len() {
            return &id[..pos];
        }
    }
    id
}

fn extract_tag(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let start = xml.find(&open)?;
    let rest = &xml[start..];
    let content_start = rest.find('>')?;
    let body = &rest[content_start + 1..];
    let end = body.find(&close)?;
    Some(body[..end].to_string())
}

fn extract_attr(xml: &str, element: &str, attr: &str) -> Option<String> {
    let start = xml.find(element)?;
    let rest = &xml[start..];
    let element_end = rest.find('>')?;
    let element_body = &rest[..element_end];
    let marker = format!("{attr}=\"");
    let attr_start = element_body.find(&marker)? + marker.len();
    let tail = &element_body[attr_start..];
    let attr_end = tail.find('"')?;
    Some(unescape(&tail[..attr_end]))
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn collapse_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::resolve;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query results</title>
  <entry>
    <id>http://arxiv.org/abs/2303.10130v5</id>
    <updated>2023-08-22T17:35:28Z</updated>
    <published>2023-03-17T17:59:41Z</published>
    <title>GPTs are GPTs: An Early Look at the Labor Market Impact
 Potential of Large Language Models</title>
    <summary>  We investigate the potential implications of large language models
on the U.S. labor market. &amp;c.
</summary>
    <author><name>Tyna Eloundou</name></author>
    <author><name>Sam Manning</name></author>
    <link href="http://arxiv.org/abs/2303.10130v5" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2303.10130v5" rel="related" type="application/pdf"/>
    <arxiv:primary_category xmlns:arxiv="http://arxiv.org/schemas/atom" term="econ.GN" scheme="http://arxiv.org/schemas/atom"/>
    <category term="econ.GN" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <published>2017-06-12T17:57:34Z</published>
    <title>Attention Is All You Need</title>
    <summary>The dominant sequence transduction models...</summary>
    <author><name>Ashish Vaswani</name></author>
  </entry>
</feed>"#;

    const EMPTY_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <opensearch:totalResults>0</opensearch:totalResults>
</feed>"#;

    const ERROR_FEED: &str = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>http://arxiv.org/api/errors#incorrect_id_format_for_9999</id>
    <title>Error</title>
    <summary>incorrect id format for 9999</summary>
  </entry>
</feed>"#;

    #[test]
    fn maps_entries_in_feed_order() {
        let papers = parse_feed(FEED, None);
        assert_eq!(papers.len(), 2);
        assert_eq!(
            papers[0].title,
            "GPTs are GPTs: An Early Look at the Labor Market Impact Potential of Large Language Models"
        );
        assert_eq!(papers[1].title, "Attention Is All You Need");
    }

    #[test]
    fn search_results_are_versionless() {
        let papers = parse_feed(FEED, None);
        assert_eq!(papers[0].arxiv_id, "2303.10130");
        assert_eq!(papers[1].arxiv_id, "1706.03762");
    }

    #[test]
    fn preserves_author_order() {
        let papers = parse_feed(FEED, None);
        assert_eq!(papers[0].authors, vec!["Tyna Eloundou", "Sam Manning"]);
    }

    #[test]
    fn unescapes_and_collapses_summary() {
        let papers = parse_feed(FEED, None);
        assert!(papers[0].summary.starts_with("We investigate"));
        assert!(papers[0].summary.ends_with("labor market. &c."));
        assert!(!papers[0].summary.contains('\n'));
    }

    #[test]
    fn parses_published_date() {
        let papers = parse_feed(FEED, None);
        let published = papers[0].published.expect("date should parse");
        assert_eq!(published.to_rfc3339(), "2023-03-17T17:59:41+00:00");
    }

    #[test]
    fn reads_primary_category_and_pdf_link() {
        let papers = parse_feed(FEED, None);
        assert_eq!(papers[0].primary_category, "econ.GN");
        assert_eq!(papers[0].pdf_url, "http://arxiv.org/pdf/2303.10130v5");
    }

    #[test]
    fn derives_pdf_url_when_link_is_absent() {
        let papers = parse_feed(FEED, None);
        assert_eq!(papers[1].pdf_url, "http://arxiv.org/pdf/1706.03762v7");
    }

    #[test]
    fn absent_fields_map_to_empty_values() {
        let papers = parse_feed(FEED, None);
        assert_eq!(papers[1].primary_category, "");
    }

    #[test]
    fn fetch_mapping_round_trips_versionless_id() {
        let id = resolve("2303.10130").unwrap();
        let papers = parse_feed(FEED, Some(&id));
        assert_eq!(papers[0].arxiv_id, "2303.10130");
    }

    #[test]
    fn fetch_mapping_keeps_requested_version() {
        let id = resolve("2303.10130v5").unwrap();
        let papers = parse_feed(FEED, Some(&id));
        assert_eq!(papers[0].arxiv_id, "2303.10130v5");
    }

    #[test]
    fn empty_feed_maps_to_no_papers() {
        assert!(parse_feed(EMPTY_FEED, None).is_empty());
    }

    #[test]
    fn error_entries_are_dropped() {
        assert!(parse_feed(ERROR_FEED, None).is_empty());
    }

    #[test]
    fn strip_version_ignores_non_numeric_suffix() {
        assert_eq!(strip_version("2303.10130v12"), "2303.10130");
        assert_eq!(strip_version("solv-int/9701001"), "solv-int/9701001");
    }
}
