use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

/// Major/minor version of the remote MediaWiki installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
}

impl ApiVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parses a siteinfo `generator` string such as `MediaWiki 1.39.4-wmf.2`.
    pub fn from_generator(generator: &str) -> Option<Self> {
        let version = generator.strip_prefix("MediaWiki ")?;
        let mut parts = version.split(|c: char| !c.is_ascii_digit());
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        Some(Self { major, minor })
    }
}

impl std::fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Block details reported for the acting user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BlockInfo {
    pub id: Option<u64>,
    pub by: Option<String>,
    pub reason: Option<String>,
    pub expiry: Option<String>,
}

impl std::fmt::Display for BlockInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "blocked by {} ({}), expires {}",
            self.by.as_deref().unwrap_or("unknown"),
            self.reason.as_deref().unwrap_or("no reason given"),
            self.expiry.as_deref().unwrap_or("unknown")
        )
    }
}

/// Snapshot of the session as the transport currently knows it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionInfo {
    pub user: Option<String>,
    pub logged_in: bool,
    /// Writes must carry `assert=user` and fail when logged out.
    pub force_login: bool,
    pub blocked: Option<BlockInfo>,
    pub write_api: bool,
    pub rights: HashSet<String>,
    /// `None` until site info has been fetched; treated as a current server.
    pub version: Option<ApiVersion>,
}

impl SessionInfo {
    /// Builds the session from `meta=userinfo` and `meta=siteinfo` results.
    pub fn from_meta(userinfo: &Value, general: &Value, force_login: bool) -> Self {
        let anonymous = userinfo.get("anon").is_some() || userinfo["id"].as_u64().unwrap_or(0) == 0;
        let rights = userinfo["rights"]
            .as_array()
            .map(|arr| arr.iter().filter_map(|r| r.as_str().map(String::from)).collect())
            .unwrap_or_default();
        let blocked = userinfo.get("blockid").map(|id| BlockInfo {
            id: id.as_u64(),
            by: userinfo["blockedby"].as_str().map(String::from),
            reason: userinfo["blockreason"].as_str().map(String::from),
            expiry: userinfo["blockexpiry"].as_str().map(String::from),
        });
        let write_api = match general.get("writeapi") {
            Some(Value::Bool(enabled)) => *enabled,
            Some(_) => true,
            None => false,
        };

        Self {
            user: userinfo["name"].as_str().map(String::from),
            logged_in: !anonymous,
            force_login,
            blocked,
            write_api,
            rights,
            version: general["generator"].as_str().and_then(ApiVersion::from_generator),
        }
    }

    pub fn has_right(&self, right: &str) -> bool {
        self.rights.contains(right)
    }

    /// Edit-class tokens are requested as `csrf` from MediaWiki 1.24 on.
    pub fn uses_csrf_tokens(&self) -> bool {
        self.version.is_none_or(|v| v >= ApiVersion::new(1, 24))
    }
}

/// Class of token a request needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    Edit,
    Move,
    Delete,
    Login,
}

impl TokenKind {
    /// The `type`/`intoken` name to request from the server.
    pub fn api_type(self, csrf: bool) -> &'static str {
        match self {
            Self::Edit | Self::Move | Self::Delete if csrf => "csrf",
            Self::Edit => "edit",
            Self::Move => "move",
            Self::Delete => "delete",
            Self::Login => "login",
        }
    }
}
