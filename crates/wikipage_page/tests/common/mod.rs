//! Scripted in-memory site shared by the page integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use wikipage_mw_api::listing::{ListRequest, Listing, ResultPath};
use wikipage_mw_api::session::{BlockInfo, SessionInfo, TokenKind};
use wikipage_mw_api::transport::{Params, Transport};
use wikipage_mw_api::MwApiError;
use wikipage_page::Page;

#[derive(Default)]
pub struct FakeSite {
    pub session: Mutex<SessionInfo>,
    query_replies: Mutex<VecDeque<Result<Value, MwApiError>>>,
    post_replies: Mutex<VecDeque<Result<Value, MwApiError>>>,
    list_items: Mutex<HashMap<String, Vec<Value>>>,
    token: Mutex<Option<String>>,
    pub posts: Mutex<Vec<(String, Params)>>,
    pub queries: Mutex<Vec<Params>>,
    pub lists: Mutex<Vec<ListRequest>>,
    pub query_calls: AtomicUsize,
    pub post_calls: AtomicUsize,
    pub token_calls: AtomicUsize,
    pub token_fetches: AtomicUsize,
    pub expand_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
}

pub fn rights(names: &[&str]) -> HashSet<String> {
    names.iter().map(|r| r.to_string()).collect()
}

impl FakeSite {
    /// Logged-in editor with write access and the ordinary rights.
    pub fn editor() -> Arc<Self> {
        Self::with_session(SessionInfo {
            user: Some("Editor".into()),
            logged_in: true,
            force_login: true,
            blocked: None,
            write_api: true,
            rights: rights(&["read", "edit", "move", "delete"]),
            version: None,
        })
    }

    pub fn with_session(session: SessionInfo) -> Arc<Self> {
        Arc::new(Self { session: Mutex::new(session), ..Default::default() })
    }

    pub fn update_session(&self, f: impl FnOnce(&mut SessionInfo)) {
        f(&mut self.session.lock().unwrap());
    }

    pub fn block(&self) {
        self.update_session(|s| {
            s.blocked = Some(BlockInfo {
                id: Some(7),
                by: Some("Admin".into()),
                reason: Some("vandalism".into()),
                expiry: Some("infinite".into()),
            })
        });
    }

    pub fn push_query(&self, reply: Result<Value, MwApiError>) {
        self.query_replies.lock().unwrap().push_back(reply);
    }

    pub fn push_post(&self, reply: Result<Value, MwApiError>) {
        self.post_replies.lock().unwrap().push_back(reply);
    }

    pub fn set_items(&self, module: &str, items: Vec<Value>) {
        self.list_items.lock().unwrap().insert(module.to_string(), items);
    }

    /// Latest revision of a page, returned by the `revisions` module.
    pub fn set_revision(&self, timestamp: &str, text: &str) {
        self.set_items(
            "revisions",
            vec![json!({"revid": 100, "timestamp": timestamp, "slots": {"main": {"content": text}}})],
        );
    }

    pub fn last_post(&self) -> (String, Params) {
        self.posts.lock().unwrap().last().cloned().expect("no post recorded")
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    /// Total of every remote interaction, session snapshots excluded.
    pub fn remote_calls(&self) -> usize {
        [&self.query_calls, &self.post_calls, &self.token_calls, &self.expand_calls, &self.list_calls]
            .iter()
            .map(|c| Self::count(c))
            .sum()
    }
}

#[async_trait]
impl Transport for FakeSite {
    async fn query(&self, params: &Params) -> Result<Value, MwApiError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(params.clone());
        self.query_replies.lock().unwrap().pop_front().unwrap_or_else(|| Ok(json!({})))
    }

    async fn post(&self, action: &str, params: &Params) -> Result<Value, MwApiError> {
        self.post_calls.fetch_add(1, Ordering::SeqCst);
        self.posts.lock().unwrap().push((action.to_string(), params.clone()));
        self.post_replies.lock().unwrap().pop_front().unwrap_or_else(|| Ok(json!({})))
    }

    async fn get_token(&self, _kind: TokenKind, force_refresh: bool, _title: Option<&str>) -> Result<String, MwApiError> {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        let mut cached = self.token.lock().unwrap();
        if force_refresh || cached.is_none() {
            let n = self.token_fetches.fetch_add(1, Ordering::SeqCst) + 1;
            *cached = Some(format!("token-{n}"));
        }
        Ok(cached.clone().unwrap_or_default())
    }

    async fn expand_templates(&self, text: &str, _title: Option<&str>) -> Result<String, MwApiError> {
        self.expand_calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("expanded:{text}"))
    }

    async fn session(&self) -> SessionInfo {
        self.session.lock().unwrap().clone()
    }
}

impl Listing for FakeSite {
    fn list(&self, request: ListRequest) -> BoxStream<'_, Result<Value, MwApiError>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let module = match &request.path {
            ResultPath::List(key) | ResultPath::PageProp(key) => key.clone(),
        };
        let items = self.list_items.lock().unwrap().get(&module).cloned().unwrap_or_default();
        let limit = request.limit.unwrap_or(usize::MAX);
        self.lists.lock().unwrap().push(request);
        stream::iter(items.into_iter().take(limit).map(Ok)).boxed()
    }
}

pub fn info(title: &str) -> Value {
    json!({
        "pageid": 42,
        "ns": 0,
        "title": title,
        "touched": "2024-01-10T08:00:00Z",
        "lastrevid": 100,
        "length": 1234,
        "contentmodel": "wikitext",
        "pagelanguage": "en",
        "restrictiontypes": ["edit", "move"],
        "protection": []
    })
}

pub fn existing(site: &Arc<FakeSite>, title: &str) -> Page<FakeSite> {
    Page::from_info(Arc::clone(site), info(title)).unwrap()
}

pub fn missing(site: &Arc<FakeSite>, title: &str) -> Page<FakeSite> {
    Page::from_info(Arc::clone(site), json!({"ns": 0, "title": title, "missing": ""})).unwrap()
}

pub fn protected(site: &Arc<FakeSite>, title: &str, action: &str, level: &str) -> Page<FakeSite> {
    let mut info = info(title);
    info["protection"] = json!([{"type": action, "level": level, "expiry": "infinity"}]);
    Page::from_info(Arc::clone(site), info).unwrap()
}

pub fn saved(newrevid: u64, timestamp: &str) -> Value {
    json!({"edit": {"result": "Success", "pageid": 42, "title": "Test Page",
        "oldrevid": 100, "newrevid": newrevid, "newtimestamp": timestamp}})
}
