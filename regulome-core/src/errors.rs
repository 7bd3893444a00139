use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegulomeError {
    #[error("Region \"{0}\" is not recognizable.")]
    InvalidRegion(String),

    #[error("Search backend error: {0}")]
    SearchBackend(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Signal track error: {0}")]
    SignalTrack(String),

    #[error("Unknown assembly: {0}")]
    UnknownAssembly(String),

    #[error("Malformed index document: {0}")]
    MalformedDocument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RegulomeError {
    /// Whether the caller may retry the same query later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RegulomeError::SearchBackend(_) | RegulomeError::ExternalService(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RegulomeError>;
