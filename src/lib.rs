//! Building blocks for a chat bot that answers arXiv queries.
//!
//! The crate provides:
//! - An identifier resolver for arXiv ids and URLs (`ident`).
//! - A gateway to the arXiv metadata API (`ArxivGateway`).
//! - Three tool façades the agent can invoke: search, summarize, and
//!   abstract-grounded question answering (`tools`).
//! - A dispatcher (`Agent`) that routes one inbound message through the
//!   model, the tools, and back to a reply.

mod agent;
mod arxiv;
mod config;
mod error;
mod ident;
mod llm;
mod message;
mod paper;
mod server;
mod synthesizer;
mod tool;
pub mod tools;

pub use agent::{user_facing_message, Agent};
pub use arxiv::{ArxivGateway, PaperGateway, DEFAULT_BASE_URL};
pub use config::{AppConfig, ArxivConfig, ModelConfig, ServerConfig};
pub use error::{PaperbotError, Result};
pub use ident::{resolve, CanonicalId};
pub use llm::{build_model, LanguageModel, ModelCompletion, OpenAIClient, StubModel};
pub use message::{Message, Role, ToolCall, ToolResult};
pub use paper::{Paper, SearchQuery};
pub use server::{BotServer, InboundMessage, OutboundReply};
pub use synthesizer::{AnswerResult, AnswerSynthesizer, Evidence};
pub use tool::{Tool, ToolDescription, ToolRegistry};
