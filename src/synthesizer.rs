//! Answers questions about a paper using its abstract as the only evidence.
//!
//! The abstract-only contract is enforced in two layers: a keyword screening
//! pass that refuses to consult the model at all when the abstract plainly
//! lacks the asked-about material, and a prompt that instructs the model to
//! answer strictly from the supplied abstract or say that it cannot.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::llm::LanguageModel;
use crate::message::Message;
use crate::paper::Paper;

/// How the abstract related to the question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Evidence {
    /// Enough of the question's keywords occur in the abstract to attempt an
    /// answer grounded in it.
    FoundInAbstract,
    /// The abstract does not cover the question; no answer was fabricated.
    NotFoundInAbstract,
    /// The question carried no significant keywords after stop-word removal.
    NotEnoughKeywords,
}

/// A question/answer pair produced for one paper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub arxiv_id: String,
    pub title: String,
    pub question: String,
    pub answer: String,
    pub evidence: Evidence,
}

const INSUFFICIENT_EVIDENCE_ANSWER: &str =
    "The paper's abstract does not contain information relevant to this question, \
so an answer is not determinable from the abstract.";

const VAGUE_QUESTION_ANSWER: &str =
    "The question did not contain enough significant keywords to check against \
the abstract. Please ask something more specific about the paper.";

pub struct AnswerSynthesizer {
    model: Arc<dyn LanguageModel>,
}

impl AnswerSynthesizer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Produces a best-effort answer constrained to the paper's abstract.
    ///
    /// When the screening pass finds the abstract irrelevant, the explicit
    /// insufficient-evidence answer is returned and the model is never
    /// consulted.
    pub async fn synthesize(&self, paper: &Paper, question: &str) -> Result<AnswerResult> {
        let keywords = significant_keywords(question);
        if keywords.is_empty() {
            return Ok(self.result(paper, question, VAGUE_QUESTION_ANSWER, Evidence::NotEnoughKeywords));
        }

        let abstract_lower = paper.summary.to_lowercase();
        let matched = keywords
            .iter()
            .filter(|word| abstract_lower.contains(word.as_str()))
            .count();
        debug!(
            arxiv_id = %paper.arxiv_id,
            keywords = keywords.len(),
            matched,
            "screened question against abstract"
        );

        // More than half of the significant keywords must occur in the
        // abstract before the model is asked to answer from it.
        if matched * 2 <= keywords.len() {
            return Ok(self.result(
                paper,
                question,
                INSUFFICIENT_EVIDENCE_ANSWER,
                Evidence::NotFoundInAbstract,
            ));
        }

        let transcript = [
            Message::system(
                "You answer questions about a research paper using ONLY its abstract, \
quoted below. Do not use outside knowledge. If the abstract does not contain \
the information needed, say so explicitly instead of guessing.",
            ),
            Message::user(format!(
                "Abstract of \"{}\":\n\n{}\n\nQuestion: {}",
                paper.title, paper.summary, question
            )),
        ];

        let completion = self.model.complete_chat(&transcript, &[]).await?;
        // A blank model reply carries no evidence either; the result must say so.
        match completion.content.filter(|text| !text.trim().is_empty()) {
            Some(answer) => Ok(self.result(paper, question, &answer, Evidence::FoundInAbstract)),
            None => Ok(self.result(
                paper,
                question,
                INSUFFICIENT_EVIDENCE_ANSWER,
                Evidence::NotFoundInAbstract,
            )),
        }
    }

    fn result(
        &self,
        paper: &Paper,
        question: &str,
        answer: &str,
        evidence: Evidence,
    ) -> AnswerResult {
        AnswerResult {
            arxiv_id: paper.arxiv_id.clone(),
            title: paper.title.clone(),
            question: question.to_string(),
            answer: answer.to_string(),
            evidence,
        }
    }
}

fn significant_keywords(question: &str) -> Vec<String> {
    question
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| word.to_lowercase())
        .filter(|word| !stop_words().contains(word.as_str()))
        .collect()
}

fn stop_words() -> &'static HashSet<&'static str> {
    static WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    WORDS.get_or_init(|| {
        [
            "a", "an", "the", "is", "are", "was", "were", "be", "been", "being", "have", "has",
            "had", "do", "does", "did", "will", "would", "should", "can", "could", "may", "might",
            "must", "and", "but", "or", "nor", "for", "so", "yet", "in", "on", "at", "by", "from",
            "to", "with", "about", "above", "after", "again", "against", "all", "am", "as",
            "because", "before", "below", "between", "both", "during", "each", "few", "further",
            "here", "how", "i", "if", "into", "it", "its", "itself", "just", "me", "more", "most",
            "my", "myself", "no", "not", "now", "of", "off", "once", "only", "other", "our",
            "ours", "ourselves", "out", "over", "own", "same", "she", "he", "they", "them",
            "their", "theirs", "themselves", "then", "there", "these", "this", "those", "through",
            "too", "under", "until", "up", "very", "we", "what", "when", "where", "which",
            "while", "who", "whom", "why", "you", "your", "yours", "yourself", "yourselves",
        ]
        .into_iter()
        .collect()
    })
}
