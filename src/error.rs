use thiserror::Error;

pub type Result<T> = std::result::Result<T, PaperbotError>;

#[derive(Debug, Error)]
pub enum PaperbotError {
    /// The caller supplied text that contains no recognizable arXiv identifier.
    #[error("invalid or missing arXiv identifier")]
    InvalidIdentifier,

    /// The identifier is well formed but arXiv has no record for it.
    #[error("no arXiv record found for `{0}`")]
    NotFound(String),

    /// Network, timeout, or service failure reaching arXiv.
    #[error("arXiv service unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The question argument was blank.
    #[error("question must not be blank")]
    EmptyQuestion,

    #[error("tool `{0}` not found")]
    ToolNotFound(String),

    #[error("language model error: {0}")]
    LanguageModel(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PaperbotError {
    /// True for failures caused by the user's input rather than the system.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            PaperbotError::InvalidIdentifier
                | PaperbotError::NotFound(_)
                | PaperbotError::EmptyQuestion
        )
    }
}
