pub mod profile;
pub mod protection;
pub mod timestamp;
pub mod types;

pub use protection::{Protection, ProtectionMap};
pub use timestamp::{Timestamp, TimestampError};
pub use types::{Namespace, PageId, RevisionId};
