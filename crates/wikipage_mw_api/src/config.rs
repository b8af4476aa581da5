use crate::error::MwApiError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use wikipage_domain::profile::ThrottlePolicy;

/// Connection settings for [`crate::client::ReqwestMwClient`].
///
/// ```toml
/// api_url = "https://en.wikipedia.org/w/api.php"
/// force_login = true
///
/// [throttle]
/// min_edit_interval = 10.0
/// maxlag = 5
/// max_retries = 3
/// backoff_base = 2.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api_url: url::Url,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Require a logged-in session for writes and send `assert=user`.
    #[serde(default = "default_force_login")]
    pub force_login: bool,
    #[serde(default)]
    pub throttle: ThrottlePolicy,
}

fn default_user_agent() -> String {
    concat!("wikipage-rs/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_force_login() -> bool {
    true
}

impl ClientConfig {
    pub fn new(api_url: url::Url) -> Self {
        Self {
            api_url,
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            force_login: default_force_login(),
            throttle: ThrottlePolicy::default(),
        }
    }

    #[must_use]
    pub fn with_force_login(mut self, force_login: bool) -> Self {
        self.force_login = force_login;
        self
    }

    #[must_use]
    pub fn with_throttle(mut self, throttle: ThrottlePolicy) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn from_toml_str(data: &str) -> Result<Self, MwApiError> {
        toml::from_str(data).map_err(|e| MwApiError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, MwApiError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .map_err(|e| MwApiError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&data)
    }
}
