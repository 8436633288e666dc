//! The three arXiv capabilities: search, summarize, and question answering.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::arxiv::PaperGateway;
use crate::error::{PaperbotError, Result};
use crate::ident;
use crate::paper::{Paper, SearchQuery};
use crate::synthesizer::{AnswerResult, AnswerSynthesizer};
use crate::tool::{Tool, ToolRegistry};

pub const DEFAULT_RESULT_LIMIT: usize = 5;
pub const MAX_RESULT_LIMIT: usize = 20;

/// Typed façade over the gateway and synthesizer.
///
/// The `Tool` registrations below are thin JSON adapters around these
/// methods; tests and embedders can call them directly.
#[derive(Clone)]
pub struct ArxivTools {
    gateway: Arc<dyn PaperGateway>,
    synthesizer: Arc<AnswerSynthesizer>,
}

impl ArxivTools {
    pub fn new(gateway: Arc<dyn PaperGateway>, synthesizer: Arc<AnswerSynthesizer>) -> Self {
        Self {
            gateway,
            synthesizer,
        }
    }

    /// Keyword search with the result bound clamped into
    /// `[1, MAX_RESULT_LIMIT]`, defaulting to `DEFAULT_RESULT_LIMIT` when the
    /// bound is absent or unusable.
    pub async fn search_papers(&self, query: &str, limit: Option<usize>) -> Result<Vec<Paper>> {
        let bound = clamp_limit(limit);
        debug!(query, bound, "searching arXiv");
        self.gateway
            .search(&SearchQuery::new(query, bound))
            .await
    }

    /// Resolves an identifier out of `id_or_url` and fetches that record.
    pub async fn summarize_paper(&self, id_or_url: &str) -> Result<Paper> {
        let id = ident::resolve(id_or_url).ok_or(PaperbotError::InvalidIdentifier)?;
        debug!(id = %id, "fetching paper for summary");
        self.gateway.fetch(&id).await
    }

    /// Answers `question` from the paper's abstract alone.
    ///
    /// A blank question fails before any network call is made.
    pub async fn answer_question(&self, id_or_url: &str, question: &str) -> Result<AnswerResult> {
        let id = ident::resolve(id_or_url).ok_or(PaperbotError::InvalidIdentifier)?;
        if question.trim().is_empty() {
            return Err(PaperbotError::EmptyQuestion);
        }
        debug!(id = %id, "fetching paper for question answering");
        let paper = self.gateway.fetch(&id).await?;
        self.synthesizer.synthesize(&paper, question).await
    }
}

fn clamp_limit(limit: Option<usize>) -> usize {
    match limit {
        None | Some(0) => DEFAULT_RESULT_LIMIT,
        Some(n) => n.min(MAX_RESULT_LIMIT),
    }
}

/// Reads an optional limit that may arrive as a JSON number or a numeric
/// string; anything else counts as absent.
fn limit_from_input(input: &Value) -> Option<usize> {
    match &input["limit"] {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn required_str<'a>(input: &'a Value, key: &str) -> Result<&'a str> {
    input[key]
        .as_str()
        .ok_or_else(|| PaperbotError::Protocol(format!("missing `{key}` parameter")))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool registrations
// ─────────────────────────────────────────────────────────────────────────────

/// Registry carrying the three arXiv tools.
pub fn arxiv_toolkit(
    gateway: Arc<dyn PaperGateway>,
    synthesizer: Arc<AnswerSynthesizer>,
) -> ToolRegistry {
    let tools = ArxivTools::new(gateway, synthesizer);
    let mut registry = ToolRegistry::new();
    registry.register(SearchArxivPapersTool {
        tools: tools.clone(),
    });
    registry.register(SummarizeArxivPaperTool {
        tools: tools.clone(),
    });
    registry.register(AnswerPaperQuestionTool { tools });
    registry
}

pub struct SearchArxivPapersTool {
    tools: ArxivTools,
}

#[async_trait]
impl Tool for SearchArxivPapersTool {
    fn name(&self) -> &str {
        "search_arxiv_papers"
    }

    fn description(&self) -> &str {
        "Search arXiv for papers matching a free-text query. Returns title, authors, \
publication date, abstract, arXiv id, primary category, and PDF link for each match."
    }

    fn parameters(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Free-text search query"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of results (1-20, default 5)"
                }
            },
            "required": ["query"]
        }))
    }

    async fn call(&self, input: Value) -> Result<Value> {
        let query = required_str(&input, "query")?;
        let papers = self
            .tools
            .search_papers(query, limit_from_input(&input))
            .await?;

        if papers.is_empty() {
            return Ok(json!({
                "papers": [],
                "message": "No papers found matching your query."
            }));
        }

        Ok(json!({ "papers": serde_json::to_value(&papers)? }))
    }
}

pub struct SummarizeArxivPaperTool {
    tools: ArxivTools,
}

#[async_trait]
impl Tool for SummarizeArxivPaperTool {
    fn name(&self) -> &str {
        "summarize_arxiv_paper"
    }

    fn description(&self) -> &str {
        "Fetch one arXiv paper by id or URL and return its record, including the \
abstract to summarize from."
    }

    fn parameters(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "arxiv_id_or_url": {
                    "type": "string",
                    "description": "arXiv id (e.g. 2303.10130) or abs/pdf URL"
                }
            },
            "required": ["arxiv_id_or_url"]
        }))
    }

    async fn call(&self, input: Value) -> Result<Value> {
        let id_or_url = required_str(&input, "arxiv_id_or_url")?;
        let paper = self.tools.summarize_paper(id_or_url).await?;
        Ok(json!({ "paper": serde_json::to_value(&paper)? }))
    }
}

pub struct AnswerPaperQuestionTool {
    tools: ArxivTools,
}

#[async_trait]
impl Tool for AnswerPaperQuestionTool {
    fn name(&self) -> &str {
        "answer_paper_question"
    }

    fn description(&self) -> &str {
        "Answer a question about an arXiv paper using only its abstract as evidence."
    }

    fn parameters(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "arxiv_id_or_url": {
                    "type": "string",
                    "description": "arXiv id (e.g. 2303.10130) or abs/pdf URL"
                },
                "question": {
                    "type": "string",
                    "description": "The question to answer from the abstract"
                }
            },
            "required": ["arxiv_id_or_url", "question"]
        }))
    }

    async fn call(&self, input: Value) -> Result<Value> {
        let id_or_url = required_str(&input, "arxiv_id_or_url")?;
        let question = required_str(&input, "question")?;
        let answer = self.tools.answer_question(id_or_url, question).await?;
        Ok(serde_json::to_value(answer)?)
    }
}
