use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Pacing applied by the transport to write requests and lag-sensitive reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThrottlePolicy {
    #[serde(with = "duration_secs")]
    pub min_edit_interval: Duration,
    pub maxlag: u32,
    pub max_retries: u32,
    #[serde(with = "duration_secs")]
    pub backoff_base: Duration,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            min_edit_interval: Duration::from_secs(10),
            maxlag: 5,
            max_retries: 3,
            backoff_base: Duration::from_secs(2),
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(serde::de::Error::custom("duration must be a non-negative number of seconds"));
        }
        Ok(Duration::from_secs_f64(secs))
    }
}
