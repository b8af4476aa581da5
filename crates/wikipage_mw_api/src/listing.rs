use crate::error::MwApiError;
use crate::transport::{Params, Transport};
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use wikipage_domain::types::{Namespace, RevisionId, Title};

/// Where the items of a query module live in a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultPath {
    /// `query.<key>`, used by list modules such as `backlinks`.
    List(String),
    /// `query.pages[*].<key>`, used by page-property modules such as `revisions`.
    PageProp(String),
}

impl ResultPath {
    pub fn extract(&self, resp: &Value) -> Vec<Value> {
        let query = &resp["query"];
        match self {
            Self::List(key) => query[key.as_str()].as_array().cloned().unwrap_or_default(),
            Self::PageProp(key) => {
                let pages: Vec<&Value> = match &query["pages"] {
                    Value::Object(map) => map.values().collect(),
                    Value::Array(arr) => arr.iter().collect(),
                    _ => Vec::new(),
                };
                pages
                    .into_iter()
                    .filter_map(|page| page[key.as_str()].as_array())
                    .flatten()
                    .cloned()
                    .collect()
            }
        }
    }
}

/// One paginated query: parameters (without `action`), where to read the
/// items, and an optional cap on the number of items yielded.
#[derive(Debug, Clone)]
pub struct ListRequest {
    pub params: Params,
    pub path: ResultPath,
    pub limit: Option<usize>,
}

impl ListRequest {
    pub fn list(module: &str, mut params: Params) -> Self {
        params.insert("list".into(), module.into());
        Self { params, path: ResultPath::List(module.into()), limit: None }
    }

    pub fn page_prop(module: &str, mut params: Params) -> Self {
        params.insert("prop".into(), module.into());
        Self { params, path: ResultPath::PageProp(module.into()), limit: None }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

/// Lazy iteration over paginated query results.
///
/// Each call to [`Listing::list`] starts a fresh sequence; nothing is fetched
/// until the stream is polled.
pub trait Listing: Send + Sync {
    fn list(&self, request: ListRequest) -> BoxStream<'_, Result<Value, MwApiError>>;
}

/// Copies every key of the response's `continue` object into `params`.
/// Returns `false` when the response has no continuation.
pub fn merge_continue(params: &mut Params, resp: &Value) -> bool {
    let Some(cont) = resp.get("continue").and_then(Value::as_object) else {
        return false;
    };
    for (key, value) in cont {
        let value = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        params.insert(key.clone(), value);
    }
    true
}

struct PageState {
    params: Params,
    path: ResultPath,
    buffer: VecDeque<Value>,
    finished: bool,
}

/// Drives a [`ListRequest`] over any transport, following continuations
/// one request at a time as the stream is consumed.
pub fn paginate<'a, T>(transport: &'a T, request: ListRequest) -> BoxStream<'a, Result<Value, MwApiError>>
where
    T: Transport + ?Sized,
{
    let state = PageState {
        params: request.params,
        path: request.path,
        buffer: VecDeque::new(),
        finished: false,
    };
    let items = stream::try_unfold(state, move |mut state| async move {
        loop {
            if let Some(item) = state.buffer.pop_front() {
                return Ok(Some((item, state)));
            }
            if state.finished {
                return Ok(None);
            }
            let resp = transport.query(&state.params).await?;
            state.buffer.extend(state.path.extract(&resp));
            state.finished = !merge_continue(&mut state.params, &resp);
        }
    });
    match request.limit {
        Some(limit) => items.take(limit).boxed(),
        None => items.boxed(),
    }
}

/// Reads a `{ns, title}` list item.
pub fn title_from_item(item: &Value) -> Option<Title> {
    let ns = Namespace(item["ns"].as_i64().unwrap_or(0) as i32);
    let name = item["title"].as_str()?;
    Some(Title::new(ns, name))
}

/// Content of one revision: either the legacy single blob or named slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionContent {
    Flat(String),
    Slots(BTreeMap<String, String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub revid: Option<RevisionId>,
    pub parentid: Option<RevisionId>,
    /// Raw server timestamp, left for the caller to decode.
    pub timestamp: Option<String>,
    pub user: Option<String>,
    pub comment: Option<String>,
    pub content: Option<RevisionContent>,
}

fn content_of(value: &Value) -> Option<&str> {
    value["*"].as_str().or_else(|| value["content"].as_str())
}

impl Revision {
    pub fn from_value(rev: &Value) -> Self {
        let content = match rev.get("slots").and_then(Value::as_object) {
            Some(slots) => Some(RevisionContent::Slots(
                slots
                    .iter()
                    .filter_map(|(name, slot)| Some((name.clone(), content_of(slot)?.to_string())))
                    .collect(),
            )),
            None => content_of(rev).map(|text| RevisionContent::Flat(text.to_string())),
        };
        Self {
            revid: rev["revid"].as_u64().map(RevisionId),
            parentid: rev["parentid"].as_u64().map(RevisionId),
            timestamp: rev["timestamp"].as_str().map(String::from),
            user: rev["user"].as_str().map(String::from),
            comment: rev["comment"].as_str().map(String::from),
            content,
        }
    }

    /// Text of `slot`, or the legacy blob when the revision has no slots.
    pub fn text(&self, slot: &str) -> Option<&str> {
        match self.content.as_ref()? {
            RevisionContent::Flat(text) => Some(text),
            RevisionContent::Slots(slots) => slots.get(slot).map(String::as_str),
        }
    }
}
