use crate::classify::ProtectionCode;
use thiserror::Error;
use wikipage_domain::timestamp::TimestampError;
use wikipage_mw_api::error::MwApiError;
use wikipage_mw_api::session::BlockInfo;

#[derive(Debug, Error)]
pub enum PageError {
    #[error("Invalid page title: {}", reason.as_deref().unwrap_or("no reason given"))]
    InvalidTitle { reason: Option<String> },

    #[error("Insufficient permission to {action} {page}")]
    InsufficientPermission { page: String, action: String },

    #[error("Session assertion failed: not logged in")]
    SessionAssertion,

    #[error("User is {0}")]
    UserBlocked(BlockInfo),

    #[error("Write API unavailable, cannot modify {page}")]
    NoWriteCapability { page: String },

    #[error("Edit conflict on {page}: {info}")]
    EditConflict { page: String, summary: String, info: String },

    #[error("{page} is protected ({code}): {info}")]
    ProtectedPage { page: String, code: ProtectionCode, info: String },

    #[error("Edit of {page} rejected by the server: {result}")]
    EditRejected { page: String, result: serde_json::Value },

    #[error(transparent)]
    Api(#[from] MwApiError),

    #[error(transparent)]
    Format(#[from] TimestampError),
}

impl PageError {
    pub(crate) fn permission(page: &str, action: &str) -> Self {
        Self::InsufficientPermission { page: page.to_string(), action: action.to_string() }
    }

    /// The server error code behind this failure, when there is one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::EditConflict { .. } => Some("editconflict"),
            Self::ProtectedPage { code, .. } => Some(code.as_str()),
            Self::Api(err) => err.code(),
            _ => None,
        }
    }
}
