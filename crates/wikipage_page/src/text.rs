use crate::error::PageError;
use crate::page::{Page, Site};
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use tracing::debug;
use wikipage_domain::timestamp::Timestamp;
use wikipage_domain::types::RevisionId;
use wikipage_mw_api::error::MwApiError;
use wikipage_mw_api::listing::{ListRequest, Revision};
use wikipage_mw_api::session::ApiVersion;
use wikipage_mw_api::transport::Params;
use wikipage_telemetry::PageEvent;

/// Servers before this version reject the `rvslots` parameter.
const SLOTS_SINCE: ApiVersion = ApiVersion::new(1, 32);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct TextKey {
    section: Option<String>,
    expand_templates: bool,
    slot: String,
}

/// What [`Page::text`] retrieves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextOptions {
    /// Numbered section, or `None` for the whole page.
    pub section: Option<String>,
    /// Expand templates in the retrieved text with a separate server call.
    pub expand_templates: bool,
    /// Serve from and store into the page's text cache.
    pub cache: bool,
    pub slot: String,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self { section: None, expand_templates: false, cache: true, slot: "main".to_string() }
    }
}

impl TextOptions {
    #[must_use]
    pub fn section(mut self, section: impl ToString) -> Self {
        self.section = Some(section.to_string());
        self
    }

    #[must_use]
    pub fn expand_templates(mut self) -> Self {
        self.expand_templates = true;
        self
    }

    #[must_use]
    pub fn without_cache(mut self) -> Self {
        self.cache = false;
        self
    }

    #[must_use]
    pub fn slot(mut self, slot: impl Into<String>) -> Self {
        self.slot = slot.into();
        self
    }

    fn key(&self) -> TextKey {
        TextKey {
            section: self.section.clone(),
            expand_templates: self.expand_templates,
            slot: self.slot.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Older,
    Newer,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Older => "older",
            Self::Newer => "newer",
        }
    }
}

/// Filters and properties for a revision history listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionQuery {
    pub start_id: Option<RevisionId>,
    pub end_id: Option<RevisionId>,
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
    pub direction: Direction,
    pub user: Option<String>,
    pub exclude_user: Option<String>,
    /// Revisions per request (`rvlimit`).
    pub batch_size: u32,
    /// Stop after this many revisions in total.
    pub max_items: Option<usize>,
    pub prop: String,
    pub expand_templates: bool,
    pub section: Option<String>,
    pub diff_to: Option<String>,
    pub slots: Option<String>,
}

impl Default for RevisionQuery {
    fn default() -> Self {
        Self {
            start_id: None,
            end_id: None,
            start: None,
            end: None,
            direction: Direction::Older,
            user: None,
            exclude_user: None,
            batch_size: 50,
            max_items: None,
            prop: "ids|timestamp|flags|comment|user".to_string(),
            expand_templates: false,
            section: None,
            diff_to: None,
            slots: None,
        }
    }
}

impl RevisionQuery {
    pub(crate) fn to_params(&self, title: &str, version: Option<ApiVersion>) -> Params {
        let mut p = Params::new();
        p.insert("titles".into(), title.into());
        let optional = [
            ("rvstartid", self.start_id.map(|id| id.to_string())),
            ("rvendid", self.end_id.map(|id| id.to_string())),
            ("rvstart", self.start.map(|ts| ts.to_iso())),
            ("rvend", self.end.map(|ts| ts.to_iso())),
            ("rvuser", self.user.clone()),
            ("rvexcludeuser", self.exclude_user.clone()),
            ("rvdiffto", self.diff_to.clone()),
            ("rvslots", self.slots.clone().filter(|_| version.is_none_or(|v| v >= SLOTS_SINCE))),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                p.insert(key.into(), value);
            }
        }
        p.insert("rvdir".into(), self.direction.as_str().into());
        p.insert("rvprop".into(), self.prop.clone());
        p.insert("rvlimit".into(), self.batch_size.to_string());
        if self.expand_templates {
            p.insert("rvexpandtemplates".into(), "1".into());
        }
        if let Some(section) = &self.section {
            p.insert("rvsection".into(), section.clone());
        }
        p
    }
}

impl<S: Site + ?Sized> Page<S> {
    /// Lists this page's revisions, newest first by default.
    pub async fn revisions(&self, query: &RevisionQuery) -> BoxStream<'_, Result<Revision, MwApiError>> {
        let version = self.site.session().await.version;
        let request = ListRequest::page_prop("revisions", query.to_params(&self.name, version)).with_limit(query.max_items);
        self.site.list(request).map_ok(|rev| Revision::from_value(&rev)).boxed()
    }

    /// Current text of the page, a section of it, or its template expansion.
    ///
    /// A page that does not exist yields an empty string without any request.
    /// A fresh (non-expanded) fetch records when the snapshot was taken so a
    /// following edit can detect conflicts against it.
    pub async fn text(&mut self, options: &TextOptions) -> Result<String, PageError> {
        if !self.can("read").await {
            return Err(PageError::permission(&self.name, "read"));
        }
        if !self.exists {
            return Ok(String::new());
        }

        let key = options.key();
        if options.cache {
            if let Some(text) = self.text_cache.get(&key) {
                debug!(title = %self.name, section = ?options.section, "Text cache hit");
                return Ok(text.clone());
            }
        }

        let query = RevisionQuery {
            prop: "content|timestamp".to_string(),
            batch_size: 1,
            max_items: Some(1),
            section: options.section.clone(),
            slots: Some(options.slot.clone()),
            ..Default::default()
        };
        let latest = self.revisions(&query).await.try_next().await?;

        let mut text = match latest {
            Some(rev) => {
                self.last_rev_time = rev
                    .timestamp
                    .as_deref()
                    .map(|ts| Timestamp::parse(Some(ts)))
                    .transpose()?
                    .filter(|ts| !ts.is_epoch());
                rev.text(&options.slot).unwrap_or_default().to_string()
            }
            None => {
                self.last_rev_time = None;
                String::new()
            }
        };

        if options.expand_templates {
            text = self.site.expand_templates(&text, Some(&self.name)).await?;
        } else {
            self.edit_time = Some(Timestamp::now());
        }

        debug!(title = %self.name, section = ?options.section, bytes = text.len(), "Fetched text");
        PageEvent::text_fetched(&self.name, options.section.clone(), options.expand_templates).emit();
        if options.cache {
            self.text_cache.insert(key, text.clone());
        }
        Ok(text)
    }
}
