/// Errors that can occur across the Conclave platform.
///
/// Each variant wraps a specific error domain. Library crates use this type
/// directly; the binary crate converts to `miette` diagnostics at the
/// boundary. Request-local failures (`Send`, `Timeout`) reach only the
/// caller that owns the request, while connection-level failures
/// (`Connection`, `ConnectionLost`) are broadcast to every pending request.
///
/// # Examples
///
/// ```
/// use conclave_core::ConclaveError;
///
/// let err = ConclaveError::Config("missing gateway url".into());
/// assert!(err.to_string().contains("missing gateway url"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConclaveError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The link to the review gateway could not be established.
    #[error("connection error: {0}")]
    Connection(String),

    /// An outbound frame could not be transmitted.
    #[error("send error: {0}")]
    Send(String),

    /// The gateway connection dropped while requests were in flight.
    #[error("connection to the review gateway was lost")]
    ConnectionLost,

    /// The per-request deadline elapsed before any verdict arrived.
    #[error("review timed out after {seconds}s with {received} of {expected} verdicts")]
    Timeout {
        /// Configured deadline in seconds.
        seconds: u64,
        /// Verdicts completed before the deadline.
        received: usize,
        /// Verdicts the gateway was expected to deliver.
        expected: usize,
    },

    /// A request id was registered while still live in the table.
    #[error("request id already registered: {0}")]
    DuplicateId(String),

    /// An inbound frame referenced no pending request.
    #[error("no pending request with id: {0}")]
    UnknownId(String),

    /// The gateway reported an error for a specific request.
    #[error("gateway error: {0}")]
    Gateway(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ConclaveError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn config_error_displays_message() {
        let err = ConclaveError::Config("bad value".into());
        assert_eq!(err.to_string(), "configuration error: bad value");
    }

    #[test]
    fn timeout_reports_verdict_counts() {
        let err = ConclaveError::Timeout {
            seconds: 300,
            received: 1,
            expected: 3,
        };
        let text = err.to_string();
        assert!(text.contains("300s"));
        assert!(text.contains("1 of 3"));
    }

    #[test]
    fn unknown_id_shows_the_id() {
        let err = ConclaveError::UnknownId("abc-123".into());
        assert!(err.to_string().contains("abc-123"));
    }
}
