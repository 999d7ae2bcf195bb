use thiserror::Error;

#[derive(Error, Debug)]
pub enum WhoisError {
    #[error("The TLD {0} is currently not supported. Use valid_tlds() to see which top-level domains are supported.")]
    UnknownTld(String),

    #[error("The TLD {0} has no public WHOIS server or responds only with minimal information")]
    PrivateRegistry(String),

    #[error("whois command failed with exit code {code:?}: {stderr}")]
    CommandFailed { code: Option<i32>, stderr: String },

    #[error("WHOIS server not found for TLD: {0}")]
    ServerNotFound(String),

    #[error("WHOIS connection failed: {0}")]
    Connection(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("WHOIS quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Could not parse WHOIS response: {0}")]
    FailedParsing(String),

    #[error("Unknown date format: {0}")]
    UnknownDateFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl WhoisError {
    /// True for the errors raised by the lookup executor rather than by
    /// classification or parameter resolution.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            WhoisError::CommandFailed { .. }
                | WhoisError::ServerNotFound(_)
                | WhoisError::Connection(_)
                | WhoisError::Timeout(_)
                | WhoisError::QuotaExceeded(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, WhoisError>;
