use metrics_engine::EngineError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("{0}")]
    Engine(#[from] EngineError),

    #[error("storage backend '{0}' is not supported")]
    UnsupportedBackend(String),

    #[error("worker runtime: {0}")]
    Runtime(std::io::Error),

    #[error("api: {0}")]
    Api(std::io::Error),

    #[error("signal: {0}")]
    Signal(std::io::Error),
}
