use crate::error::PageError;
use crate::text::TextKey;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use wikipage_domain::protection::ProtectionMap;
use wikipage_domain::timestamp::Timestamp;
use wikipage_domain::types::{Namespace, PageId, RevisionId, strip_namespace};
use wikipage_mw_api::error::MwApiError;
use wikipage_mw_api::listing::Listing;
use wikipage_mw_api::session::SessionInfo;
use wikipage_mw_api::transport::{Params, Transport, params};

/// Everything a [`Page`] needs from the remote side: authenticated calls and
/// paginated listings.
pub trait Site: Transport + Listing {}

impl<T: Transport + Listing + ?Sized> Site for T {}

/// Identifies the page to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageTarget {
    Title(String),
    Id(PageId),
}

impl From<&str> for PageTarget {
    fn from(title: &str) -> Self {
        Self::Title(title.to_string())
    }
}

impl From<String> for PageTarget {
    fn from(title: String) -> Self {
        Self::Title(title)
    }
}

impl From<PageId> for PageTarget {
    fn from(id: PageId) -> Self {
        Self::Id(id)
    }
}

/// Additional `prop=` modules to request alongside `info`, each with its own
/// parameters.
pub type ExtraProperties = IndexMap<String, Params>;

/// One remote page and its locally cached state.
///
/// Not synchronised: share a `Page` across tasks only behind a lock. Distinct
/// pages share nothing but the site.
pub struct Page<S: Site + ?Sized> {
    pub(crate) site: Arc<S>,
    pub(crate) name: String,
    page_title: String,
    namespace: Namespace,
    page_id: Option<PageId>,
    pub(crate) exists: bool,
    revision: Option<RevisionId>,
    length: Option<u64>,
    redirect: bool,
    pub(crate) protection: ProtectionMap,
    touched: Timestamp,
    content_model: Option<String>,
    page_language: Option<String>,
    restriction_types: Option<Vec<String>>,
    info: Value,
    /// Timestamp of the revision the cached text came from; sent as `basetimestamp`.
    pub(crate) last_rev_time: Option<Timestamp>,
    /// When the current text snapshot was fetched; sent as `starttimestamp`.
    pub(crate) edit_time: Option<Timestamp>,
    pub(crate) text_cache: HashMap<TextKey, String>,
}

impl<S: Site + ?Sized> Page<S> {
    pub async fn load(site: Arc<S>, target: impl Into<PageTarget>) -> Result<Self, PageError> {
        Self::load_with(site, target, &ExtraProperties::new()).await
    }

    /// Fetches page info with protection entries, plus any extra properties.
    pub async fn load_with(
        site: Arc<S>,
        target: impl Into<PageTarget>,
        extra: &ExtraProperties,
    ) -> Result<Self, PageError> {
        let mut prop = String::from("info");
        for name in extra.keys() {
            prop.push('|');
            prop.push_str(name);
        }

        let mut query = params([("prop", prop.as_str()), ("inprop", "protection")]);
        match target.into() {
            PageTarget::Title(title) => query.insert("titles".into(), title),
            PageTarget::Id(id) => query.insert("pageids".into(), id.to_string()),
        };
        for extra_params in extra.values() {
            query.extend(extra_params.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let resp = site.query(&query).await?;
        let info = match &resp["query"]["pages"] {
            Value::Object(pages) => pages.values().next().cloned(),
            Value::Array(pages) => pages.first().cloned(),
            _ => None,
        }
        .ok_or_else(|| MwApiError::api("nopage", "No page info in query response"))?;
        Self::from_info(site, info)
    }

    /// Builds a page from an info object the caller already holds, such as
    /// one returned by a listing. No request is made.
    pub fn from_info(site: Arc<S>, info: Value) -> Result<Self, PageError> {
        if info.get("invalid").is_some() {
            return Err(PageError::InvalidTitle { reason: info["invalidreason"].as_str().map(String::from) });
        }

        let namespace = Namespace(info["ns"].as_i64().unwrap_or(0) as i32);
        let name = info["title"].as_str().unwrap_or("").to_string();
        let page_title = if namespace == Namespace::MAIN {
            name.clone()
        } else {
            strip_namespace(&name).to_string()
        };
        let touched = Timestamp::parse(info["touched"].as_str())?;
        let redirect = match info.get("redirect") {
            Some(Value::Bool(flag)) => *flag,
            Some(_) => true,
            None => false,
        };
        let missing = match info.get("missing") {
            Some(Value::Bool(flag)) => *flag,
            Some(_) => true,
            None => false,
        };

        debug!(title = %name, exists = !missing, "Loaded page info");
        Ok(Self {
            site,
            page_title,
            namespace,
            page_id: info["pageid"].as_u64().map(PageId),
            exists: !missing,
            revision: info["lastrevid"].as_u64().map(RevisionId),
            length: info["length"].as_u64(),
            redirect,
            protection: ProtectionMap::from_info(&info["protection"]),
            touched,
            content_model: info["contentmodel"].as_str().map(String::from),
            page_language: info["pagelanguage"].as_str().map(String::from),
            restriction_types: info["restrictiontypes"]
                .as_array()
                .map(|types| types.iter().filter_map(|t| t.as_str().map(String::from)).collect()),
            name,
            info,
            last_rev_time: None,
            edit_time: None,
            text_cache: HashMap::new(),
        })
    }

    /// An independent copy of `other` with the same metadata and conflict
    /// timestamps but its own, empty text cache.
    pub fn from_page(other: &Self) -> Self {
        Self {
            site: Arc::clone(&other.site),
            name: other.name.clone(),
            page_title: other.page_title.clone(),
            namespace: other.namespace,
            page_id: other.page_id,
            exists: other.exists,
            revision: other.revision,
            length: other.length,
            redirect: other.redirect,
            protection: other.protection.clone(),
            touched: other.touched,
            content_model: other.content_model.clone(),
            page_language: other.page_language.clone(),
            restriction_types: other.restriction_types.clone(),
            info: other.info.clone(),
            last_rev_time: other.last_rev_time,
            edit_time: other.edit_time,
            text_cache: HashMap::new(),
        }
    }

    pub fn site(&self) -> &Arc<S> {
        &self.site
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn page_title(&self) -> &str {
        &self.page_title
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn page_id(&self) -> Option<PageId> {
        self.page_id
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn revision(&self) -> Option<RevisionId> {
        self.revision
    }

    pub fn length(&self) -> Option<u64> {
        self.length
    }

    pub fn is_redirect(&self) -> bool {
        self.redirect
    }

    pub fn protection(&self) -> &ProtectionMap {
        &self.protection
    }

    pub fn touched(&self) -> Timestamp {
        self.touched
    }

    pub fn content_model(&self) -> Option<&str> {
        self.content_model.as_deref()
    }

    pub fn page_language(&self) -> Option<&str> {
        self.page_language.as_deref()
    }

    pub fn restriction_types(&self) -> Option<&[String]> {
        self.restriction_types.as_deref()
    }

    /// The raw info object, including any extra properties that were requested.
    pub fn info(&self) -> &Value {
        &self.info
    }

    pub fn last_rev_time(&self) -> Option<Timestamp> {
        self.last_rev_time
    }

    pub fn edit_time(&self) -> Option<Timestamp> {
        self.edit_time
    }

    /// Number of cached text entries.
    pub fn cached_texts(&self) -> usize {
        self.text_cache.len()
    }

    pub(crate) fn allows(&self, session: &SessionInfo, action: &str) -> bool {
        session.has_right(self.protection.required_right(action))
    }

    /// Whether the session's rights allow `action` on this page.
    pub async fn can(&self, action: &str) -> bool {
        let session = self.site.session().await;
        self.allows(&session, action)
    }

    /// The page this one redirects to, if it is a redirect.
    pub async fn redirect_target(&self) -> Result<Option<Self>, PageError> {
        let query = params([("prop", "pageprops"), ("titles", self.name.as_str()), ("redirects", "")]);
        let resp = self.site.query(&query).await?;

        let target = resp["query"]["redirects"].as_array().and_then(|redirects| {
            redirects
                .iter()
                .find(|r| r["from"].as_str() == Some(self.name.as_str()))
                .and_then(|r| r["to"].as_str())
                .map(String::from)
        });
        match target {
            Some(to) => Ok(Some(Self::load(Arc::clone(&self.site), to).await?)),
            None => Ok(None),
        }
    }

    /// Follows one redirect hop, or returns this page unchanged.
    pub async fn resolve_redirect(self) -> Result<Self, PageError> {
        match self.redirect_target().await? {
            Some(target) => Ok(target),
            None => Ok(self),
        }
    }
}

impl<S: Site + ?Sized> std::fmt::Debug for Page<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("page_id", &self.page_id)
            .field("exists", &self.exists)
            .field("revision", &self.revision)
            .field("cached_texts", &self.text_cache.len())
            .finish_non_exhaustive()
    }
}

impl<S: Site + ?Sized> std::fmt::Display for Page<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
