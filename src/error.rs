//! LocalBitcoins client error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LbcError {
    /// The requested method is in neither the public nor the private route set.
    #[error("{0} is not a valid API method.")]
    MethodNotFound(String),

    #[error("Error in server response: {source}")]
    Transport {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Could not understand response from server: {body}")]
    Parse {
        body: String,
        #[source]
        source: serde_json::Error,
    },

    /// Raw `error` payload returned by the API, forwarded untouched.
    #[error("API error: {0}")]
    Api(serde_json::Value),

    #[error("Invalid request parameters: {0}")]
    InvalidParams(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl LbcError {
    pub fn transport(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Transport { source: err.into() }
    }

    /// The API error payload, if this is an API-level failure.
    pub fn api_payload(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Api(payload) => Some(payload),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for LbcError {
    fn from(err: reqwest::Error) -> Self {
        Self::transport(err)
    }
}

pub type LbcResult<T> = Result<T, LbcError>;
