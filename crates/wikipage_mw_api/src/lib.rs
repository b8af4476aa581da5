pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod listing;
pub mod retry;
pub mod session;
pub mod throttle;
pub mod transport;

pub use client::ReqwestMwClient;
pub use config::ClientConfig;
pub use error::MwApiError;
pub use listing::{ListRequest, Listing, ResultPath, Revision, RevisionContent};
pub use session::{ApiVersion, BlockInfo, SessionInfo, TokenKind};
pub use transport::{Params, Transport};
