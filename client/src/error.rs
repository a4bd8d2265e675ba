//! Error types for node endpoint calls.

use reqwest::StatusCode;
use std::error::Error;
use std::fmt;

/// Errors that can occur while fetching one endpoint of one node.
///
/// Every variant is a remote-call failure. The distinction between them is
/// kept for display only, callers are expected to treat them alike.
#[derive(Debug)]
pub enum ClientError {
    /// The request could not be sent or the response could not be read.
    ///
    /// Possible causes:
    ///
    /// * The node is offline or its RPC port is closed.
    /// * The request timed out.
    /// * The HTTP client could not be constructed.
    Transport(reqwest::Error),
    /// The node answered with a non-success HTTP status.
    Status {
        /// Status code returned by the node.
        status: StatusCode,
        /// Response body, empty if it could not be read.
        body: String,
    },
    /// The response body did not match the expected JSON shape.
    Decode(serde_json::Error),
}

impl ClientError {
    /// Whether the failure was caused by the per-call timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Transport(err) if err.is_timeout())
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Transport(err) => write!(f, "Request failed: {err}"),
            ClientError::Status { status, body } if body.is_empty() => {
                write!(f, "Node responded with {status}")
            }
            ClientError::Status { status, body } => {
                write!(f, "Node responded with {status}: {body}")
            }
            ClientError::Decode(err) => write!(f, "Malformed response body: {err}"),
        }
    }
}

impl Error for ClientError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ClientError::Transport(err) => Some(err),
            ClientError::Status { .. } => None,
            ClientError::Decode(err) => Some(err),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        let err = ClientError::Status {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: String::new(),
        };
        assert_eq!(err.to_string(), "Node responded with 503 Service Unavailable");
        assert!(err.source().is_none());
        assert!(!err.is_timeout());

        let err = ClientError::Status {
            status: StatusCode::NOT_FOUND,
            body: "no such route".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Node responded with 404 Not Found: no such route"
        );
    }

    #[test]
    fn test_decode_keeps_source() {
        let json_err = serde_json::from_str::<u64>("\"not a number\"").unwrap_err();
        let err = ClientError::from(json_err);
        assert!(matches!(err, ClientError::Decode(_)));
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("Malformed response body"));
    }
}
