//! Extracts canonical arXiv identifiers from free-form text.
//!
//! Handles bare identifiers in the modern (`2303.10130`, optionally `v2`) and
//! legacy (`hep-th/0101001`) formats, as well as `arxiv.org/abs/...` and
//! `arxiv.org/pdf/...` URLs with or without scheme or a trailing `.pdf`.
//! Pure text transformation; never touches the network.

use std::sync::OnceLock;

use regex::Regex;

/// A normalized arXiv paper identifier, optionally versioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalId {
    id: String,
}

impl CanonicalId {
    pub fn as_str(&self) -> &str {
        &self.id
    }

    /// True when the identifier carries an explicit `vN` suffix.
    pub fn has_version(&self) -> bool {
        version_split(&self.id).1.is_some()
    }

    /// The identifier with any `vN` suffix removed.
    pub fn versionless(&self) -> &str {
        version_split(&self.id).0
    }
}

impl std::fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

fn version_split(id: &str) -> (&str, Option<&str>) {
    if let Some(pos) = id.rfind('v') {
        let (head, tail) = id.split_at(pos);
        if !head.is_empty()
            && tail.len() > 1
            && tail[1..].bytes().all(|b| b.is_ascii_digit())
        {
            return (head, Some(&tail[1..]));
        }
    }
    (id, None)
}

fn id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Modern ids are NNNN.NNNN(N); legacy ids are archive(.subject)/NNNNNNN.
        // The modern arm matches wherever the pattern occurs, even mid-digit-run.
        // URLs need no special case: the id embedded in an abs/pdf URL matches
        // the bare patterns, and a trailing `.pdf` cannot extend either one.
        Regex::new(
            r"\d{4}\.\d{4,5}(?:v\d+)?|[a-zA-Z][a-zA-Z-]*(?:\.[a-zA-Z-]+)?/\d{7}(?:v\d+)?",
        )
        .expect("identifier pattern is valid")
    })
}

/// Returns the first arXiv identifier found in `text`, in reading order.
///
/// `None` is the normal outcome for text without an identifier; it is what
/// distinguishes "summarize this text" from "search for this text".
pub fn resolve(text: &str) -> Option<CanonicalId> {
    let matched = id_pattern().find(text)?;
    Some(CanonicalId {
        id: matched.as_str().to_string(),
    })
}
