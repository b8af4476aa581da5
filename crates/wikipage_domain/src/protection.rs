use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Protection level that is checked against the `editprotected` right rather
/// than a right of the same name.
const SYSOP_LEVEL: &str = "sysop";
const SYSOP_RIGHT: &str = "editprotected";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protection {
    pub level: String,
    pub expiry: String,
}

/// Per-action protection entries of a page, keyed by action name
/// (`edit`, `move`, `upload`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionMap(BTreeMap<String, Protection>);

impl ProtectionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the map from the `protection` array of a page info object.
    /// Entries missing a type or level are ignored.
    pub fn from_info(entries: &serde_json::Value) -> Self {
        let mut map = BTreeMap::new();
        if let Some(entries) = entries.as_array() {
            for entry in entries {
                let (Some(action), Some(level)) = (entry["type"].as_str(), entry["level"].as_str()) else {
                    continue;
                };
                map.insert(
                    action.to_string(),
                    Protection {
                        level: level.to_string(),
                        expiry: entry["expiry"].as_str().unwrap_or("infinity").to_string(),
                    },
                );
            }
        }
        Self(map)
    }

    pub fn insert(&mut self, action: impl Into<String>, level: impl Into<String>, expiry: impl Into<String>) {
        self.0.insert(
            action.into(),
            Protection {
                level: level.into(),
                expiry: expiry.into(),
            },
        );
    }

    pub fn get(&self, action: &str) -> Option<&Protection> {
        self.0.get(action)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Protection)> {
        self.0.iter().map(|(action, p)| (action.as_str(), p))
    }

    /// The right a user must hold to perform `action`.
    ///
    /// Unprotected actions require the right named after the action itself.
    /// A `sysop` level maps to `editprotected`; this is evaluated on every call.
    pub fn required_right<'a>(&'a self, action: &'a str) -> &'a str {
        let level = self.0.get(action).map_or(action, |p| p.level.as_str());
        if level == SYSOP_LEVEL { SYSOP_RIGHT } else { level }
    }
}
