use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Exchange(#[from] mm_exchange::ExchangeError),

    #[error("invalid strategy config: {0}")]
    Config(String),

    #[error("startup check failed: {0}")]
    Startup(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
