//! Tool façades exposed to the agent dispatcher.
//!
//! Each tool strictly validates its arguments, delegates to the arXiv gateway
//! (and the answer synthesizer where needed), and shapes the output for model
//! consumption. All operations are idempotent and safe to retry.

pub mod arxiv;

pub use arxiv::{arxiv_toolkit, ArxivTools, DEFAULT_RESULT_LIMIT, MAX_RESULT_LIMIT};
