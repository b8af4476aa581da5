//! Server timestamp codec.
//!
//! The API reports times as `YYYY-MM-DDTHH:MM:SSZ` and expects the compact
//! `YYYYMMDDHHMMSS` form back in the conflict-detection fields of an edit.
//! An absent value, and the all-zero date some wikis emit for "never", both
//! decode to [`Timestamp::Epoch`].

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Serialize, Serializer};
use thiserror::Error;

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const COMPACT_FORMAT: &str = "%Y%m%d%H%M%S";
const ZERO_ISO: &str = "0000-00-00T00:00:00Z";
const ZERO_COMPACT: &str = "00000000000000";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error("Malformed timestamp: {raw:?}")]
    Format { raw: String },
}

/// A point in server time. `Epoch` orders before every real instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Timestamp {
    #[default]
    Epoch,
    At(DateTime<Utc>),
}

impl Timestamp {
    pub fn now() -> Self {
        // The wire format carries whole seconds only.
        let now = Utc::now();
        Self::At(DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now))
    }

    pub fn parse(raw: Option<&str>) -> Result<Self, TimestampError> {
        let raw = match raw {
            None => return Ok(Self::Epoch),
            Some(raw) => raw,
        };
        if raw.is_empty() || raw == ZERO_ISO || raw == ZERO_COMPACT {
            return Ok(Self::Epoch);
        }

        let format = if raw.len() == 14 && raw.bytes().all(|b| b.is_ascii_digit()) {
            COMPACT_FORMAT
        } else {
            ISO_FORMAT
        };
        NaiveDateTime::parse_from_str(raw, format)
            .map(|naive| Self::At(naive.and_utc()))
            .map_err(|_| TimestampError::Format { raw: raw.to_string() })
    }

    /// Renders the compact `YYYYMMDDHHMMSS` form used by `basetimestamp` and
    /// `starttimestamp`.
    pub fn format(&self) -> String {
        match self {
            Self::Epoch => ZERO_COMPACT.to_string(),
            Self::At(dt) => dt.format(COMPACT_FORMAT).to_string(),
        }
    }

    pub fn to_iso(&self) -> String {
        match self {
            Self::Epoch => ZERO_ISO.to_string(),
            Self::At(dt) => dt.format(ISO_FORMAT).to_string(),
        }
    }

    pub fn is_epoch(&self) -> bool {
        matches!(self, Self::Epoch)
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Epoch => None,
            Self::At(dt) => Some(*dt),
        }
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::At(dt)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_iso())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    #[test]
    fn test_parse_absent_and_zero_date_are_epoch() {
        assert_eq!(Timestamp::parse(None).unwrap(), Timestamp::Epoch);
        assert_eq!(Timestamp::parse(Some("")).unwrap(), Timestamp::Epoch);
        assert_eq!(
            Timestamp::parse(Some("0000-00-00T00:00:00Z")).unwrap(),
            Timestamp::parse(Some("")).unwrap()
        );
    }

    #[test]
    fn test_parse_iso() {
        let ts = Timestamp::parse(Some("2024-01-15T10:30:00Z")).unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(ts, Timestamp::At(expected));
    }

    #[test]
    fn test_format_compact() {
        let ts = Timestamp::parse(Some("2024-01-15T10:30:05Z")).unwrap();
        assert_eq!(ts.format(), "20240115103005");
        assert_eq!(ts.to_iso(), "2024-01-15T10:30:05Z");
    }

    #[test]
    fn test_epoch_formats_as_zeros() {
        assert_eq!(Timestamp::Epoch.format(), "00000000000000");
        assert_eq!(Timestamp::parse(Some("00000000000000")).unwrap(), Timestamp::Epoch);
    }

    #[test]
    fn test_malformed_is_format_error() {
        for raw in ["yesterday", "2024-01-15 10:30:00", "2024-13-01T00:00:00Z", "2024011510300"] {
            match Timestamp::parse(Some(raw)) {
                Err(TimestampError::Format { raw: got }) => assert_eq!(got, raw),
                other => panic!("expected format error for {raw:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_epoch_sorts_first() {
        let early = Timestamp::parse(Some("0001-01-01T00:00:00Z")).unwrap();
        let late = Timestamp::parse(Some("2024-01-15T10:30:00Z")).unwrap();
        assert!(Timestamp::Epoch < early);
        assert!(early < late);
    }

    #[test]
    fn test_now_has_whole_seconds() {
        let now = Timestamp::now();
        let reparsed = Timestamp::parse(Some(&now.format())).unwrap();
        assert_eq!(now, reparsed);
    }

    #[test]
    fn test_serializes_as_iso_string() {
        let ts = Timestamp::parse(Some("2024-01-15T10:30:00Z")).unwrap();
        assert_eq!(serde_json::to_string(&ts).unwrap(), "\"2024-01-15T10:30:00Z\"");
    }

    proptest! {
        #[test]
        fn prop_format_parse_roundtrip(secs in 0i64..253_402_300_799i64) {
            let dt = DateTime::from_timestamp(secs, 0).unwrap();
            let compact = Timestamp::At(dt).format();
            let parsed = Timestamp::parse(Some(&compact)).unwrap();
            prop_assert_eq!(parsed.format(), compact);
        }

        #[test]
        fn prop_iso_and_compact_agree(secs in 0i64..253_402_300_799i64) {
            let ts = Timestamp::At(DateTime::from_timestamp(secs, 0).unwrap());
            let from_iso = Timestamp::parse(Some(&ts.to_iso())).unwrap();
            prop_assert_eq!(from_iso, ts);
        }
    }
}
