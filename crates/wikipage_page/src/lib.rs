//! A client-side model of one remote wiki page.
//!
//! [`Page`] caches the page's metadata and revision text, answers permission
//! questions from its protection entries and the session's rights, and
//! performs edits, undos, moves, deletions and purges with the token and
//! edit-conflict bookkeeping the write API requires.

pub mod classify;
pub mod error;
pub mod listings;
pub mod mutation;
pub mod page;
pub mod text;

pub use classify::{EditFailure, ProtectionCode};
pub use error::PageError;
pub use listings::{InterwikiLink, LanguageLink, LinkQuery, RedirectFilter};
pub use mutation::{DeleteOptions, EditOptions, EditResponse, MoveOptions, UndoOptions};
pub use page::{ExtraProperties, Page, PageTarget, Site};
pub use text::{Direction, RevisionQuery, TextOptions};
