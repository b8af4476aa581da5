use crate::page::{Page, Site};
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use serde_json::Value;
use wikipage_domain::types::{Namespace, Title};
use wikipage_mw_api::error::MwApiError;
use wikipage_mw_api::listing::{ListRequest, title_from_item};
use wikipage_mw_api::transport::{Params, params};

/// Which pages a backlink-style listing reports, by redirect status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RedirectFilter {
    #[default]
    All,
    Redirects,
    NonRedirects,
}

impl RedirectFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Redirects => "redirects",
            Self::NonRedirects => "nonredirects",
        }
    }
}

/// Filters shared by the link listings. A module ignores the fields it
/// has no parameter for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkQuery {
    pub namespace: Option<Namespace>,
    /// `backlinks` and `embedded_in` only.
    pub filter: RedirectFilter,
    /// `backlinks`: also list pages linking through a redirect.
    /// `links`: resolve redirects among the linked titles.
    pub through_redirects: bool,
    /// Stop after this many items in total.
    pub limit: Option<usize>,
}

impl LinkQuery {
    #[must_use]
    pub fn namespace(mut self, namespace: Namespace) -> Self {
        self.namespace = Some(namespace);
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: RedirectFilter) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn through_redirects(mut self) -> Self {
        self.through_redirects = true;
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A link to another wiki, by interwiki prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterwikiLink {
    pub prefix: String,
    pub title: String,
}

/// A link to the same subject on another language edition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageLink {
    pub lang: String,
    pub title: String,
}

fn namespace_param(p: &mut Params, key: &str, namespace: Option<Namespace>) {
    if let Some(ns) = namespace {
        p.insert(key.into(), ns.0.to_string());
    }
}

/// Link target of an item: `*` in the legacy format, `title` or `url` in
/// the newer one.
fn target_of<'a>(item: &'a Value, key: &str) -> Option<&'a str> {
    item["*"].as_str().or_else(|| item[key].as_str())
}

fn interwiki_from_item(item: &Value) -> Option<InterwikiLink> {
    Some(InterwikiLink { prefix: item["prefix"].as_str()?.to_string(), title: target_of(item, "title")?.to_string() })
}

fn language_from_item(item: &Value) -> Option<LanguageLink> {
    Some(LanguageLink { lang: item["lang"].as_str()?.to_string(), title: target_of(item, "title")?.to_string() })
}

impl<S: Site + ?Sized> Page<S> {
    fn items<T, F>(&self, request: ListRequest, read: F) -> BoxStream<'_, Result<T, MwApiError>>
    where
        T: Send + 'static,
        F: Fn(&Value) -> Option<T> + Send + Sync + 'static,
    {
        self.site
            .list(request)
            .try_filter_map(move |item| futures::future::ready(Ok(read(&item))))
            .boxed()
    }

    fn titles_of(&self, module: &str, p: Params, limit: Option<usize>) -> BoxStream<'_, Result<Title, MwApiError>> {
        self.items(ListRequest::page_prop(module, p).with_limit(limit), title_from_item)
    }

    fn own_title(&self) -> Params {
        params([("titles", self.name.as_str())])
    }

    /// Pages linking here.
    pub fn backlinks(&self, query: &LinkQuery) -> BoxStream<'_, Result<Title, MwApiError>> {
        let mut p = params([("bltitle", self.name.as_str()), ("blfilterredir", query.filter.as_str())]);
        namespace_param(&mut p, "blnamespace", query.namespace);
        if query.through_redirects {
            p.insert("blredirect".into(), "1".into());
        }
        self.items(ListRequest::list("backlinks", p).with_limit(query.limit), title_from_item)
    }

    /// Pages transcluding this one.
    pub fn embedded_in(&self, query: &LinkQuery) -> BoxStream<'_, Result<Title, MwApiError>> {
        let mut p = params([("eititle", self.name.as_str()), ("eifilterredir", query.filter.as_str())]);
        namespace_param(&mut p, "einamespace", query.namespace);
        self.items(ListRequest::list("embeddedin", p).with_limit(query.limit), title_from_item)
    }

    /// Categories the page belongs to. `hidden` restricts to hidden
    /// (`Some(true)`) or visible (`Some(false)`) categories.
    pub fn categories(&self, hidden: Option<bool>, limit: Option<usize>) -> BoxStream<'_, Result<Title, MwApiError>> {
        let mut p = self.own_title();
        if let Some(hidden) = hidden {
            p.insert("clshow".into(), if hidden { "hidden" } else { "!hidden" }.into());
        }
        self.titles_of("categories", p, limit)
    }

    pub fn templates(&self, query: &LinkQuery) -> BoxStream<'_, Result<Title, MwApiError>> {
        let mut p = self.own_title();
        namespace_param(&mut p, "tlnamespace", query.namespace);
        self.titles_of("templates", p, query.limit)
    }

    /// Outgoing wiki links.
    pub fn links(&self, query: &LinkQuery) -> BoxStream<'_, Result<Title, MwApiError>> {
        let mut p = self.own_title();
        namespace_param(&mut p, "plnamespace", query.namespace);
        if query.through_redirects {
            p.insert("redirects".into(), "1".into());
        }
        self.titles_of("links", p, query.limit)
    }

    /// Files used on the page.
    pub fn images(&self, limit: Option<usize>) -> BoxStream<'_, Result<Title, MwApiError>> {
        self.titles_of("images", self.own_title(), limit)
    }

    /// External URLs linked from the page.
    pub fn extlinks(&self, limit: Option<usize>) -> BoxStream<'_, Result<String, MwApiError>> {
        let request = ListRequest::page_prop("extlinks", self.own_title()).with_limit(limit);
        self.items(request, |item| target_of(item, "url").map(String::from))
    }

    pub fn iwlinks(&self, limit: Option<usize>) -> BoxStream<'_, Result<InterwikiLink, MwApiError>> {
        let request = ListRequest::page_prop("iwlinks", self.own_title()).with_limit(limit);
        self.items(request, interwiki_from_item)
    }

    pub fn langlinks(&self, limit: Option<usize>) -> BoxStream<'_, Result<LanguageLink, MwApiError>> {
        let request = ListRequest::page_prop("langlinks", self.own_title()).with_limit(limit);
        self.items(request, language_from_item)
    }
}
