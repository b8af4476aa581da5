use crate::error::MwApiError;
use crate::session::{SessionInfo, TokenKind};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;

/// Request parameters in insertion order. Inserting an existing key
/// overwrites its value in place.
pub type Params = IndexMap<String, String>;

/// Builds [`Params`] from string pairs.
pub fn params<K, V, I>(pairs: I) -> Params
where
    K: Into<String>,
    V: Into<String>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

/// Authenticated access to the remote API and the session behind it.
///
/// Server-reported failures come back as [`MwApiError::Api`] with the
/// server's error code intact so callers can classify them.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues an `action=query` read with the given parameters.
    async fn query(&self, params: &Params) -> Result<Value, MwApiError>;

    /// Issues a write for `action` with the given parameters.
    async fn post(&self, action: &str, params: &Params) -> Result<Value, MwApiError>;

    /// Returns a token of `kind`, reusing the cached one unless `force_refresh`.
    /// `title` is only consulted by servers that scope tokens to a page.
    async fn get_token(
        &self,
        kind: TokenKind,
        force_refresh: bool,
        title: Option<&str>,
    ) -> Result<String, MwApiError>;

    /// Expands templates in `text` server-side.
    async fn expand_templates(&self, text: &str, title: Option<&str>) -> Result<String, MwApiError>;

    /// Current session state: login, rights, block status, write availability.
    async fn session(&self) -> SessionInfo;
}
