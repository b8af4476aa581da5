//! Translation of write-API error codes into [`PageError`] kinds.
//!
//! The recognised codes live in [`EDIT_FAILURES`]; supporting a new code
//! means adding a row there.

use crate::error::PageError;
use wikipage_mw_api::error::MwApiError;

/// A server code that means the page (or its title) is protected against
/// the attempted write. Only obtainable from the classification table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProtectionCode(&'static str);

impl ProtectionCode {
    pub fn as_str(self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for ProtectionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditFailure {
    Conflict,
    Protected(ProtectionCode),
    AssertUserFailed,
}

const fn protected(code: &'static str) -> (&'static str, EditFailure) {
    (code, EditFailure::Protected(ProtectionCode(code)))
}

pub const EDIT_FAILURES: &[(&str, EditFailure)] = &[
    ("editconflict", EditFailure::Conflict),
    protected("protectedtitle"),
    protected("cantcreate"),
    protected("cantcreate-anon"),
    protected("noimageredirect-anon"),
    protected("noimageredirect"),
    protected("noedit-anon"),
    protected("noedit"),
    protected("protectedpage"),
    protected("cascadeprotected"),
    protected("customcssjsprotected"),
    protected("protectednamespace-interface"),
    protected("protectednamespace"),
    ("assertuserfailed", EditFailure::AssertUserFailed),
];

impl EditFailure {
    pub fn from_code(code: &str) -> Option<Self> {
        EDIT_FAILURES.iter().find(|(c, _)| *c == code).map(|(_, failure)| *failure)
    }
}

/// Maps a transport error raised while submitting a write on `page`.
/// Codes outside [`EDIT_FAILURES`] come back unchanged as [`PageError::Api`].
pub fn classify_edit_error(err: MwApiError, page: &str, summary: &str) -> PageError {
    let Some(failure) = err.code().and_then(EditFailure::from_code) else {
        return PageError::Api(err);
    };
    let info = err.info().unwrap_or_default().to_string();
    match failure {
        EditFailure::Conflict => PageError::EditConflict { page: page.to_string(), summary: summary.to_string(), info },
        EditFailure::Protected(code) => PageError::ProtectedPage { page: page.to_string(), code, info },
        EditFailure::AssertUserFailed => PageError::SessionAssertion,
    }
}
