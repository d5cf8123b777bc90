use thiserror::Error;

/// Outcome classes of a gateway call that did not produce data.
///
/// `Cancelled` is not a failure: it means a newer request of the same kind
/// superseded this one, or its view went away. Callers must not surface it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("request cancelled")]
    Cancelled,
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("{0}")]
    Unknown(String),
}

impl GatewayError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn is_network_or_timeout(&self) -> bool {
        matches!(self, Self::Timeout | Self::Network(_))
    }

    /// Message attached to a state slice, e.g. "Failed to fetch search results (request timed out)".
    pub fn describe(&self, what: &str) -> String {
        format!("Failed to fetch {what} ({self})")
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() || e.is_request() {
            Self::Network(e.to_string())
        } else if let Some(status) = e.status() {
            Self::Unknown(format!("server responded with {status}"))
        } else if e.is_decode() {
            Self::Unknown(format!("unexpected response body: {e}"))
        } else {
            Self::Unknown(e.to_string())
        }
    }
}
