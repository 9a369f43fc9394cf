#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(String),

    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),
}

impl EngineError {
    /// Add context to the error.
    ///
    /// Context is prepended to the message.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            EngineError::Config(msg) => EngineError::Config(format!("{ctx}: {msg}")),
            EngineError::UnsupportedFormat(msg) => {
                EngineError::UnsupportedFormat(format!("{ctx}: {msg}"))
            }
        }
    }
}
