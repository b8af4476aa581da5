use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RevisionId(pub u64);

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for RevisionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Namespace(pub i32);

impl Namespace {
    pub const MAIN: Self = Self(0);
    pub const TALK: Self = Self(1);
    pub const USER: Self = Self(2);
    pub const USER_TALK: Self = Self(3);
    pub const PROJECT: Self = Self(4);
    pub const PROJECT_TALK: Self = Self(5);
    pub const FILE: Self = Self(6);
    pub const FILE_TALK: Self = Self(7);
    pub const MEDIAWIKI: Self = Self(8);
    pub const TEMPLATE: Self = Self(10);
    pub const TEMPLATE_TALK: Self = Self(11);
    pub const HELP: Self = Self(12);
    pub const CATEGORY: Self = Self(14);
    pub const CATEGORY_TALK: Self = Self(15);
}

/// A title as reported by the server: the full prefixed name plus its namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Title {
    pub namespace: Namespace,
    pub name: String,
}

impl Title {
    pub fn new(namespace: Namespace, name: impl Into<String>) -> Self {
        Self {
            namespace,
            name: name.into(),
        }
    }

    /// The title without its namespace prefix.
    pub fn page_title(&self) -> &str {
        if self.namespace == Namespace::MAIN {
            &self.name
        } else {
            strip_namespace(&self.name)
        }
    }
}

impl std::fmt::Display for Title {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Drops a leading colon and everything up to and including the first `:`.
pub fn strip_namespace(title: &str) -> &str {
    let title = title.strip_prefix(':').unwrap_or(title);
    match title.find(':') {
        Some(idx) => &title[idx + 1..],
        None => title,
    }
}
