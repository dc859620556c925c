use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    /// One bad input line. Surfaced through the parser's error callback;
    /// iteration continues.
    #[error("invalid rule at {position}: {reason}")]
    InvalidRule { position: String, reason: String },

    /// The accumulated-resumable-error cap was exceeded; iteration ends.
    #[error("too many invalid rules ({0}), giving up on source")]
    TooManyInvalidRules(usize),

    #[error("list source failed: {0}")]
    ListSource(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("upstream query timed out")]
    UpstreamTimeout,

    #[error("upstream refused the query")]
    UpstreamRefused,

    #[error("invalid domain name: {0}")]
    InvalidDomainName(String),

    #[error("invalid DNS response: {0}")]
    InvalidDnsResponse(String),

    #[error("shared store unavailable: {0}")]
    BrokerUnavailable(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Errors a bad line may produce without terminating list iteration.
    pub fn is_resumable(&self) -> bool {
        matches!(self, DomainError::InvalidRule { .. })
    }
}

impl From<std::io::Error> for DomainError {
    fn from(e: std::io::Error) -> Self {
        DomainError::Io(e.to_string())
    }
}
