use thiserror::Error;

/// Result type for voicecart operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for voicecart operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O related errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// An external service (LLM or tool) did not answer in time
    #[error("{service} timed out after {timeout_secs}s")]
    UpstreamTimeout { service: String, timeout_secs: u64 },

    /// An external service answered with a bad status or an unusable payload
    #[error("Upstream protocol error: {0}")]
    UpstreamProtocol(String),

    /// A model response that is not valid or extractable JSON
    #[error("Parse error: {0}")]
    Parse(String),

    /// Blank transcript
    #[error("empty_transcript")]
    EmptyInput,
}

impl Error {
    /// Creates a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an upstream timeout error
    pub fn upstream_timeout(service: impl Into<String>, timeout_secs: u64) -> Self {
        Self::UpstreamTimeout {
            service: service.into(),
            timeout_secs,
        }
    }

    /// Creates an upstream protocol error
    pub fn upstream_protocol(msg: impl Into<String>) -> Self {
        Self::UpstreamProtocol(msg.into())
    }

    /// Creates a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_timeout_message() {
        let err = Error::upstream_timeout("catalog_search", 20);
        assert_eq!(err.to_string(), "catalog_search timed out after 20s");
    }

    #[test]
    fn test_parse_error_message() {
        let err = Error::parse("no JSON object found");
        assert!(err.to_string().contains("no JSON object found"));
    }

    #[test]
    fn test_empty_input_reads_as_log_tag() {
        assert_eq!(Error::EmptyInput.to_string(), "empty_transcript");
    }

    #[test]
    fn test_io_error_converts() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert_eq!(err.to_string(), "I/O error: missing");
    }
}
