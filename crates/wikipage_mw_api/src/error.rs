use thiserror::Error;

/// Error code the server returns when a write token is no longer valid.
pub const BAD_TOKEN: &str = "badtoken";

#[derive(Debug, Error)]
pub enum MwApiError {
    #[error("HTTP error: {status} {url}")]
    Http { status: u16, url: String, body: String },

    #[error("maxlag exceeded: retry after {retry_after}s")]
    MaxLag { retry_after: u64 },

    #[error("Rate limited (429): retry after {retry_after}s")]
    RateLimited { retry_after: u64 },

    #[error("Service unavailable (503)")]
    ServiceUnavailable,

    #[error("API error: {code} - {info}")]
    Api { code: String, info: String },

    #[error("Auth failed: {reason}")]
    AuthError { reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Deserialization: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("Network: {0}")]
    Network(#[from] reqwest::Error),
}

impl MwApiError {
    pub fn api(code: impl Into<String>, info: impl Into<String>) -> Self {
        Self::Api { code: code.into(), info: info.into() }
    }

    /// The server error code, for errors the server reported itself.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            Self::MaxLag { .. } => Some("maxlag"),
            _ => None,
        }
    }

    pub fn info(&self) -> Option<&str> {
        match self {
            Self::Api { info, .. } => Some(info),
            _ => None,
        }
    }

    pub fn is_bad_token(&self) -> bool {
        self.code() == Some(BAD_TOKEN)
    }

    /// Transient failures worth a backoff retry. A stale token is not one of
    /// them: refreshing it is the caller's decision.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::MaxLag { .. } | Self::RateLimited { .. } | Self::ServiceUnavailable | Self::Network(_)
        )
    }

    /// Builds an error from a top-level `error` object of an API response.
    pub fn from_error_object(error: &serde_json::Value) -> Self {
        let code = error["code"].as_str().unwrap_or("unknown").to_string();
        let info = error["info"].as_str().unwrap_or("").to_string();
        if code == "maxlag" {
            let retry_after = error["lag"]
                .as_f64()
                .map(|lag| lag.ceil() as u64)
                .or_else(|| info.split_whitespace().find_map(|w| w.parse::<u64>().ok()))
                .unwrap_or(5);
            return Self::MaxLag { retry_after };
        }
        Self::Api { code, info }
    }
}
