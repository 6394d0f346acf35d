//! Internal failure type for the transport and cache layers.
//!
//! Requests never see this type: at the operation boundary it is rendered
//! with `Display` and delivered to error callbacks as a plain string.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    /// libcurl reported an error (timeout, resolve failure, connection reset).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// Building the multipart body failed.
    #[error("form: {0}")]
    Form(#[from] curl::FormError),
    /// Response had a non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),
    /// Reading or writing the bundle cache failed.
    #[error("cache: {0}")]
    Io(#[from] std::io::Error),
    /// The consumer dropped the operation before it finished.
    #[error("transfer abandoned")]
    Abandoned,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_text() {
        assert_eq!(TransportError::Http(404).to_string(), "HTTP 404");
    }

    #[test]
    fn io_error_is_prefixed() {
        let err = TransportError::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only",
        ));
        assert_eq!(err.to_string(), "cache: read-only");
    }
}
