use crate::auth;
use crate::config::ClientConfig;
use crate::error::MwApiError;
use crate::listing::{self, ListRequest, Listing};
use crate::retry::RetryPolicy;
use crate::session::{SessionInfo, TokenKind};
use crate::throttle::ThrottleController;
use crate::transport::{Params, Transport};
use async_trait::async_trait;
use futures::stream::BoxStream;
use secrecy::SecretString;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Title used when a pre-csrf server needs a page to scope a token to.
const LEGACY_TOKEN_TITLE: &str = "Main Page";

/// `reqwest`-backed implementation of [`Transport`] and [`Listing`].
pub struct ReqwestMwClient {
    http: reqwest::Client,
    config: ClientConfig,
    tokens: RwLock<HashMap<&'static str, String>>,
    session: RwLock<SessionInfo>,
    throttle: ThrottleController,
    retry_policy: RetryPolicy,
}

impl ReqwestMwClient {
    pub fn new(config: ClientConfig) -> Result<Self, MwApiError> {
        let jar = Arc::new(reqwest::cookie::Jar::default());
        let http = reqwest::ClientBuilder::new()
            .cookie_provider(jar)
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http,
            tokens: RwLock::new(HashMap::new()),
            session: RwLock::new(SessionInfo { force_login: config.force_login, ..Default::default() }),
            throttle: ThrottleController::new(config.throttle.clone()),
            retry_policy: RetryPolicy::from_throttle(&config.throttle),
            config,
        })
    }

    /// Builds the client and loads the anonymous session and site info.
    pub async fn connect(config: ClientConfig) -> Result<Self, MwApiError> {
        let client = Self::new(config)?;
        client.refresh_session().await?;
        Ok(client)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn login_bot_password(&self, username: &str, password: &SecretString) -> Result<(), MwApiError> {
        auth::login_bot_password(&self.http, &self.config.api_url, username, password).await?;
        self.tokens.write().await.clear();
        self.refresh_session().await?;
        Ok(())
    }

    /// Re-reads user rights, block status, server version and write
    /// availability.
    pub async fn refresh_session(&self) -> Result<SessionInfo, MwApiError> {
        let params = crate::transport::params([
            ("meta", "userinfo|siteinfo"),
            ("uiprop", "rights|blockinfo"),
            ("siprop", "general"),
        ]);
        let resp = self.query(&params).await?;
        let session = SessionInfo::from_meta(
            &resp["query"]["userinfo"],
            &resp["query"]["general"],
            self.config.force_login,
        );
        debug!(user = ?session.user, version = ?session.version, "Session refreshed");
        *self.session.write().await = session.clone();
        Ok(session)
    }

    fn with_common(&self, action: &str, params: &Params) -> Params {
        let mut full = Params::with_capacity(params.len() + 3);
        full.insert("action".into(), action.into());
        full.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
        full.insert("format".into(), "json".into());
        full.insert("maxlag".into(), self.throttle.maxlag().to_string());
        full
    }

    async fn decode(&self, resp: reqwest::Response) -> Result<Value, MwApiError> {
        let status = resp.status();
        if status.as_u16() == 429 {
            let retry_after = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            return Err(MwApiError::RateLimited { retry_after });
        }
        if status.as_u16() == 503 {
            return Err(MwApiError::ServiceUnavailable);
        }
        if !status.is_success() {
            let url = resp.url().to_string();
            let body = resp.text().await.unwrap_or_default();
            return Err(MwApiError::Http { status: status.as_u16(), url, body });
        }

        let body: Value = resp.json().await?;
        if let Some(error) = body.get("error") {
            return Err(MwApiError::from_error_object(error));
        }
        Ok(body)
    }

    async fn send_get(&self, params: &Params) -> Result<Value, MwApiError> {
        let resp = self.http.get(self.config.api_url.as_str()).query(params).send().await?;
        self.decode(resp).await
    }

    async fn send_post(&self, params: &Params) -> Result<Value, MwApiError> {
        let resp = self.http.post(self.config.api_url.as_str()).form(params).send().await?;
        self.decode(resp).await
    }
}

#[async_trait]
impl Transport for ReqwestMwClient {
    async fn query(&self, params: &Params) -> Result<Value, MwApiError> {
        let full = self.with_common("query", params);
        self.retry_policy.execute(|| self.send_get(&full)).await
    }

    async fn post(&self, action: &str, params: &Params) -> Result<Value, MwApiError> {
        if ThrottleController::is_paced(action) {
            self.throttle.acquire_edit_permit().await;
        }
        let full = self.with_common(action, params);
        debug!(action, "Posting write request");
        self.send_post(&full).await
    }

    async fn get_token(
        &self,
        kind: TokenKind,
        force_refresh: bool,
        title: Option<&str>,
    ) -> Result<String, MwApiError> {
        let csrf = self.session.read().await.uses_csrf_tokens();
        let token_type = kind.api_type(csrf);

        if !force_refresh {
            if let Some(token) = self.tokens.read().await.get(token_type) {
                return Ok(token.clone());
            }
        }

        let legacy_title = (!csrf && kind != TokenKind::Login).then(|| title.unwrap_or(LEGACY_TOKEN_TITLE));
        let token = auth::fetch_token(&self.http, &self.config.api_url, token_type, legacy_title).await?;
        debug!(token_type, force_refresh, "Fetched token");
        self.tokens.write().await.insert(token_type, token.clone());
        Ok(token)
    }

    async fn expand_templates(&self, text: &str, title: Option<&str>) -> Result<String, MwApiError> {
        let mut params = crate::transport::params([("text", text), ("prop", "wikitext")]);
        if let Some(title) = title {
            params.insert("title".into(), title.into());
        }
        let resp = self.send_post(&self.with_common("expandtemplates", &params)).await?;
        let expanded = &resp["expandtemplates"];
        expanded["wikitext"]
            .as_str()
            .or_else(|| expanded["*"].as_str())
            .map(String::from)
            .ok_or_else(|| MwApiError::api("noexpansion", "No expanded wikitext returned"))
    }

    async fn session(&self) -> SessionInfo {
        self.session.read().await.clone()
    }
}

impl Listing for ReqwestMwClient {
    fn list(&self, request: ListRequest) -> BoxStream<'_, Result<Value, MwApiError>> {
        listing::paginate(self, request)
    }
}
