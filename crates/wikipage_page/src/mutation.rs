//! Writes against a page: edit, undo, move, delete and purge.
//!
//! Edits and undos share one submission path. The token is taken from the
//! site's cache; if the server reports it stale, the token is force-refreshed
//! and the request is sent exactly once more. Whatever the second attempt
//! returns is final.

use crate::classify::classify_edit_error;
use crate::error::PageError;
use crate::page::{Page, Site};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use wikipage_domain::timestamp::Timestamp;
use wikipage_domain::types::RevisionId;
use wikipage_mw_api::error::MwApiError;
use wikipage_mw_api::session::{SessionInfo, TokenKind};
use wikipage_mw_api::transport::{Params, params};
use wikipage_telemetry::PageEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOptions {
    pub summary: String,
    pub minor: bool,
    pub bot: bool,
    pub section: Option<String>,
    /// Sent last; overrides any parameter built from the fields above.
    pub extra: Params,
}

impl Default for EditOptions {
    fn default() -> Self {
        Self { summary: String::new(), minor: false, bot: true, section: None, extra: Params::new() }
    }
}

impl EditOptions {
    pub fn new(summary: impl Into<String>) -> Self {
        Self { summary: summary.into(), ..Default::default() }
    }

    #[must_use]
    pub fn minor(mut self, minor: bool) -> Self {
        self.minor = minor;
        self
    }

    #[must_use]
    pub fn bot(mut self, bot: bool) -> Self {
        self.bot = bot;
        self
    }

    #[must_use]
    pub fn section(mut self, section: impl ToString) -> Self {
        self.section = Some(section.to_string());
        self
    }

    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UndoOptions {
    pub summary: String,
    pub bot: bool,
    pub extra: Params,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOptions {
    pub reason: String,
    pub move_talk: bool,
    pub no_redirect: bool,
}

impl Default for MoveOptions {
    fn default() -> Self {
        Self { reason: String::new(), move_talk: true, no_redirect: false }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    pub reason: String,
    pub watch: bool,
    pub unwatch: bool,
    pub old_image: Option<String>,
}

/// The `edit` object of a successful write.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EditResponse {
    pub result: String,
    #[serde(rename = "pageid")]
    pub page_id: Option<u64>,
    pub title: Option<String>,
    #[serde(rename = "oldrevid")]
    pub old_revid: Option<u64>,
    #[serde(rename = "newrevid")]
    pub new_revid: Option<u64>,
    /// Absent when the edit changed nothing.
    #[serde(rename = "newtimestamp")]
    pub new_timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl EditResponse {
    pub fn is_nochange(&self) -> bool {
        self.extra.contains_key("nochange")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Initial,
    Retry,
}

impl Attempt {
    fn force_token(self) -> bool {
        matches!(self, Self::Retry)
    }
}

impl<S: Site + ?Sized> Page<S> {
    /// Checks session, block, permission and write availability, in that
    /// order, before anything is sent.
    async fn check_edit(&self) -> Result<SessionInfo, PageError> {
        let session = self.site.session().await;
        if session.force_login && !session.logged_in {
            return Err(PageError::SessionAssertion);
        }
        if let Some(block) = &session.blocked {
            return Err(PageError::UserBlocked(block.clone()));
        }
        if !self.allows(&session, "edit") {
            return Err(PageError::permission(&self.name, "edit"));
        }
        if !session.write_api {
            return Err(PageError::NoWriteCapability { page: self.name.clone() });
        }
        Ok(session)
    }

    async fn check_action(&self, action: &str) -> Result<(), PageError> {
        let session = self.site.session().await;
        if !self.allows(&session, action) {
            return Err(PageError::permission(&self.name, action));
        }
        if !session.write_api {
            return Err(PageError::NoWriteCapability { page: self.name.clone() });
        }
        Ok(())
    }

    fn conflict_fields(&self, data: &mut Params) {
        if let Some(base) = self.last_rev_time {
            data.insert("basetimestamp".into(), base.format());
        }
        if let Some(start) = self.edit_time {
            data.insert("starttimestamp".into(), start.format());
        }
    }

    pub(crate) fn edit_payload(&self, text: &str, options: &EditOptions, assert_user: bool) -> Params {
        let mut data = Params::new();
        if options.minor {
            data.insert("minor".into(), "1".into());
        } else {
            data.insert("notminor".into(), "1".into());
        }
        self.conflict_fields(&mut data);
        if options.bot {
            data.insert("bot".into(), "1".into());
        }
        if let Some(section) = &options.section {
            data.insert("section".into(), section.clone());
        }
        data.insert("title".into(), self.name.clone());
        data.insert("text".into(), text.into());
        data.insert("summary".into(), options.summary.clone());
        data.extend(options.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        if assert_user {
            data.insert("assert".into(), "user".into());
        }
        data
    }

    pub(crate) fn undo_payload(&self, rev_id: RevisionId, options: &UndoOptions, assert_user: bool) -> Params {
        let mut data = Params::new();
        self.conflict_fields(&mut data);
        data.insert("undo".into(), rev_id.to_string());
        data.insert("bot".into(), if options.bot { "1" } else { "0" }.into());
        data.insert("title".into(), self.name.clone());
        data.insert("summary".into(), options.summary.clone());
        data.extend(options.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        if assert_user {
            data.insert("assert".into(), "user".into());
        }
        data
    }

    async fn post_edit(&self, payload: &Params, attempt: Attempt) -> Result<Value, MwApiError> {
        let token = self.site.get_token(TokenKind::Edit, attempt.force_token(), Some(&self.name)).await?;
        let mut data = payload.clone();
        data.insert("token".into(), token);
        self.site.post("edit", &data).await
    }

    /// Sends an edit-class write with at most one stale-token retry, then
    /// applies the result to the page.
    async fn submit_edit<F>(&mut self, build: F, rebuild_on_retry: bool, summary: &str) -> Result<EditResponse, PageError>
    where
        F: Fn(&Self) -> Params,
    {
        let payload = build(self);
        let first = self.post_edit(&payload, Attempt::Initial).await;
        let outcome = match first {
            Err(err) if err.is_bad_token() => {
                warn!(title = %self.name, "Edit token rejected; refreshing and retrying once");
                PageEvent::token_refreshed(&self.name).emit();
                let payload = if rebuild_on_retry { build(self) } else { payload };
                self.post_edit(&payload, Attempt::Retry).await
            }
            other => other,
        };

        let mut result = match outcome {
            Ok(result) => result,
            Err(err) => {
                let err = classify_edit_error(err, &self.name, summary);
                PageEvent::edit_failed(&self.name, err.to_string()).emit();
                return Err(err);
            }
        };

        let Some(edit) = result.get_mut("edit").map(Value::take) else {
            return Err(MwApiError::api("unexpectedresponse", "No edit result in response").into());
        };
        if edit["result"].as_str().is_some_and(|r| r.eq_ignore_ascii_case("failure")) {
            PageEvent::edit_failed(&self.name, "rejected").emit();
            return Err(PageError::EditRejected { page: self.name.clone(), result: edit });
        }
        // The server has saved the write; cached text is stale from here on.
        self.text_cache.clear();
        let response: EditResponse = serde_json::from_value(edit).map_err(MwApiError::from)?;

        if let Some(ts) = response.new_timestamp.as_deref() {
            self.last_rev_time = match Timestamp::parse(Some(ts)) {
                Ok(parsed) => Some(parsed).filter(|t| !t.is_epoch()),
                Err(err) => {
                    warn!(title = %self.name, error = %err, "Unreadable timestamp in edit result");
                    None
                }
            };
        }

        info!(title = %self.name, new_revid = ?response.new_revid, "Edit saved");
        PageEvent::edit_saved(&self.name, response.new_revid).emit();
        Ok(response)
    }

    /// Replaces the text of the page, or of `options.section`.
    ///
    /// The conflict timestamps recorded by the last [`Page::text`] call are
    /// sent along, so the server refuses the edit if someone else saved in
    /// between.
    pub async fn edit(&mut self, text: &str, options: &EditOptions) -> Result<EditResponse, PageError> {
        let session = self.check_edit().await?;
        self.submit_edit(|page| page.edit_payload(text, options, session.force_login), false, &options.summary)
            .await
    }

    /// Reverts revision `rev_id`.
    pub async fn undo(&mut self, rev_id: RevisionId, options: &UndoOptions) -> Result<EditResponse, PageError> {
        let session = self.check_edit().await?;
        self.submit_edit(|page| page.undo_payload(rev_id, options, session.force_login), true, &options.summary)
            .await
    }

    /// Renames the page. Returns the server's `move` object as is.
    pub async fn move_to(&self, new_title: &str, options: &MoveOptions) -> Result<Value, PageError> {
        self.check_action("move").await?;

        let token = self.site.get_token(TokenKind::Move, false, Some(&self.name)).await?;
        let mut data = params([
            ("from", self.name.as_str()),
            ("to", new_title),
            ("token", token.as_str()),
            ("reason", options.reason.as_str()),
        ]);
        if options.move_talk {
            data.insert("movetalk".into(), "1".into());
        }
        if options.no_redirect {
            data.insert("noredirect".into(), "1".into());
        }

        let mut result = self.site.post("move", &data).await?;
        info!(from = %self.name, to = new_title, "Page moved");
        PageEvent::page_moved(&self.name, new_title).emit();
        Ok(result.get_mut("move").map(Value::take).unwrap_or_default())
    }

    /// Deletes the page. Returns the server's `delete` object as is.
    pub async fn delete(&self, options: &DeleteOptions) -> Result<Value, PageError> {
        self.check_action("delete").await?;

        let token = self.site.get_token(TokenKind::Delete, false, Some(&self.name)).await?;
        let mut data = params([
            ("title", self.name.as_str()),
            ("token", token.as_str()),
            ("reason", options.reason.as_str()),
        ]);
        if options.watch {
            data.insert("watch".into(), "1".into());
        }
        if options.unwatch {
            data.insert("unwatch".into(), "1".into());
        }
        if let Some(old_image) = &options.old_image {
            data.insert("oldimage".into(), old_image.clone());
        }

        let mut result = self.site.post("delete", &data).await?;
        info!(title = %self.name, "Page deleted");
        PageEvent::page_deleted(&self.name).emit();
        Ok(result.get_mut("delete").map(Value::take).unwrap_or_default())
    }

    /// Asks the server to drop its rendered cache of the page.
    pub async fn purge(&self) -> Result<(), PageError> {
        self.site.post("purge", &params([("titles", self.name.as_str())])).await?;
        PageEvent::page_purged(&self.name).emit();
        Ok(())
    }
}
