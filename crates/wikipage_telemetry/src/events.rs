use chrono::{DateTime, Utc};
use serde::Serialize;

/// Target the serialized events are logged under.
pub const EVENT_TARGET: &str = "wikipage::events";

#[derive(Debug, Clone, Serialize)]
pub enum PageEvent {
    TextFetched { title: String, section: Option<String>, expanded: bool, timestamp: DateTime<Utc> },
    EditSaved { title: String, new_revid: Option<u64>, timestamp: DateTime<Utc> },
    EditFailed { title: String, error: String, timestamp: DateTime<Utc> },
    TokenRefreshed { title: String, timestamp: DateTime<Utc> },
    PageMoved { from: String, to: String, timestamp: DateTime<Utc> },
    PageDeleted { title: String, timestamp: DateTime<Utc> },
    PagePurged { title: String, timestamp: DateTime<Utc> },
}

impl PageEvent {
    pub fn text_fetched(title: impl Into<String>, section: Option<String>, expanded: bool) -> Self {
        Self::TextFetched { title: title.into(), section, expanded, timestamp: Utc::now() }
    }
    pub fn edit_saved(title: impl Into<String>, new_revid: Option<u64>) -> Self {
        Self::EditSaved { title: title.into(), new_revid, timestamp: Utc::now() }
    }
    pub fn edit_failed(title: impl Into<String>, error: impl Into<String>) -> Self {
        Self::EditFailed { title: title.into(), error: error.into(), timestamp: Utc::now() }
    }
    pub fn token_refreshed(title: impl Into<String>) -> Self {
        Self::TokenRefreshed { title: title.into(), timestamp: Utc::now() }
    }
    pub fn page_moved(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::PageMoved { from: from.into(), to: to.into(), timestamp: Utc::now() }
    }
    pub fn page_deleted(title: impl Into<String>) -> Self {
        Self::PageDeleted { title: title.into(), timestamp: Utc::now() }
    }
    pub fn page_purged(title: impl Into<String>) -> Self {
        Self::PagePurged { title: title.into(), timestamp: Utc::now() }
    }

    /// Logs the event as JSON on [`EVENT_TARGET`].
    pub fn emit(&self) {
        match serde_json::to_string(self) {
            Ok(json) => tracing::info!(target: EVENT_TARGET, event = %json),
            Err(e) => tracing::warn!(target: EVENT_TARGET, error = %e, "Failed to serialize page event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_variant_tag() {
        let event = PageEvent::page_moved("Old", "New");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["PageMoved"]["from"], "Old");
        assert_eq!(json["PageMoved"]["to"], "New");
        assert!(json["PageMoved"]["timestamp"].is_string());
    }

    #[test]
    fn test_edit_saved_event() {
        match PageEvent::edit_saved("Test Page", Some(42)) {
            PageEvent::EditSaved { title, new_revid, .. } => {
                assert_eq!(title, "Test Page");
                assert_eq!(new_revid, Some(42));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_emit_without_subscriber_does_not_panic() {
        PageEvent::page_purged("Test Page").emit();
    }
}
