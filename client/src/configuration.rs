//! Client configuration types and constants.

use reqwest::header::HeaderValue;
use std::fmt;
use std::time::Duration;

/// Port the node RPC server listens on, which also serves the debug pages.
pub const DEFAULT_RPC_PORT: u16 = 3030;

/// Default timeout for a single endpoint call.
///
/// Nodes that never answer would otherwise leave their slots pending forever.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default user agent for near-peers requests.
pub fn default_user_agent() -> String {
    format!("near-peers/{}", env!("CARGO_PKG_VERSION"))
}

/// Errors that can occur during user agent validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAgentError {
    /// The user agent is empty.
    Empty,
    /// The user agent contains characters not allowed in an HTTP header value.
    InvalidCharacters,
}

impl fmt::Display for UserAgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserAgentError::Empty => write!(f, "User agent cannot be empty"),
            UserAgentError::InvalidCharacters => {
                write!(f, "User agent must be a visible ASCII header value")
            }
        }
    }
}

impl std::error::Error for UserAgentError {}

/// Configuration used to build a [`crate::NodeClient`].
#[derive(Debug, Clone)]
pub struct ClientConfiguration {
    /// Port of the node RPC server, shared by every node in the network.
    pub port: u16,
    /// Timeout applied to each endpoint call. `None` waits forever.
    pub request_timeout: Option<Duration>,
    /// Value of the `User-Agent` header sent with every request.
    user_agent: HeaderValue,
}

impl Default for ClientConfiguration {
    fn default() -> Self {
        Self {
            port: DEFAULT_RPC_PORT,
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            user_agent: HeaderValue::from_static(concat!(
                "near-peers/",
                env!("CARGO_PKG_VERSION")
            )),
        }
    }
}

impl ClientConfiguration {
    /// Set the node RPC port.
    ///
    /// # Arguments
    ///
    /// * `port` - Port used for every node (defaults to 3030).
    ///
    /// # Returns
    ///
    /// Self for method chaining.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the per-call timeout.
    ///
    /// A call that exceeds it settles as a transport failure.
    ///
    /// # Arguments
    ///
    /// * `timeout` - Maximum time to wait for one endpoint, `None` to disable.
    ///
    /// # Returns
    ///
    /// Self for method chaining.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set a custom user agent.
    ///
    /// # Arguments
    ///
    /// * `user_agent` - The user agent string, must be a valid header value.
    ///
    /// # Returns
    ///
    /// * `Ok(Self)` - The configuration for method chaining if validation succeeds.
    /// * `Err(UserAgentError)` - If the user agent is empty or not a valid header value.
    ///
    /// # Example
    ///
    /// ```
    /// use near_peers_client::ClientConfiguration;
    ///
    /// assert!(ClientConfiguration::default().with_user_agent("my-monitor/1.0").is_ok());
    /// assert!(ClientConfiguration::default().with_user_agent("").is_err());
    /// assert!(ClientConfiguration::default().with_user_agent("bad\nagent").is_err());
    /// ```
    pub fn with_user_agent<S: AsRef<str>>(mut self, user_agent: S) -> Result<Self, UserAgentError> {
        let user_agent = user_agent.as_ref();
        if user_agent.trim().is_empty() {
            return Err(UserAgentError::Empty);
        }
        self.user_agent =
            HeaderValue::from_str(user_agent).map_err(|_| UserAgentError::InvalidCharacters)?;
        Ok(self)
    }

    /// The user agent sent with every request.
    pub fn user_agent(&self) -> &HeaderValue {
        &self.user_agent
    }
}

impl fmt::Display for ClientConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let timeout = match self.request_timeout {
            Some(timeout) => format!("{}ms", timeout.as_millis()),
            None => "none".to_string(),
        };
        write!(
            f,
            "ClientConfiguration {{ port: {}, timeout: {}, user_agent: \"{}\" }}",
            self.port,
            timeout,
            self.user_agent.to_str().unwrap_or("<binary>")
        )
    }
}
