use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dispatcher: DispatcherConfig,
    pub work_unit: WorkUnitConfig,
    pub web: WebConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Maximum number of ids per batch
    pub batch_size: usize,

    /// Minimum time between the end of one dispatch and the start of the next
    #[serde(with = "duration_format")]
    pub rate_limit: Duration,

    /// How long an idle tick waits before checking again
    #[serde(with = "duration_format")]
    pub poll_interval: Duration,

    /// How long the loop backs off after a tick fails
    #[serde(with = "duration_format")]
    pub error_backoff: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            batch_size: crate::batch::DEFAULT_BATCH_SIZE,
            rate_limit: Duration::from_millis(5000),
            poll_interval: Duration::from_millis(100),
            error_backoff: Duration::from_millis(1000),
        }
    }
}

/// Settings for the mock downstream work unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkUnitConfig {
    #[serde(with = "duration_format")]
    pub min_latency: Duration,

    #[serde(with = "duration_format")]
    pub max_latency: Duration,

    /// Probability in [0, 1] that a single invocation fails
    pub failure_rate: f64,
}

impl Default for WorkUnitConfig {
    fn default() -> Self {
        Self {
            min_latency: Duration::from_millis(100),
            max_latency: Duration::from_millis(500),
            failure_rate: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub listen: String,
}

pub const DEFAULT_PORT: u16 = 3000;

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen: format!("0.0.0.0:{}", DEFAULT_PORT),
        }
    }
}

// Custom serde module for duration parsing
pub(crate) mod duration_format {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_duration(*duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub fn parse_duration(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty duration string".to_string());
        }

        let (value_str, unit) = if let Some(v) = s.strip_suffix("ms") {
            (v, "ms")
        } else if let Some(v) = s.strip_suffix('s') {
            (v, "s")
        } else if let Some(v) = s.strip_suffix('m') {
            (v, "m")
        } else if let Some(v) = s.strip_suffix('h') {
            (v, "h")
        } else {
            return Err(format!("invalid duration format: {}", s));
        };

        let value: u64 = value_str
            .trim()
            .parse()
            .map_err(|_| format!("invalid numeric value: {}", value_str))?;

        let secs_per_unit = match unit {
            "ms" => return Ok(Duration::from_millis(value)),
            "s" => 1,
            "m" => 60,
            "h" => 3600,
            _ => return Err(format!("unknown unit: {}", unit)),
        };

        value
            .checked_mul(secs_per_unit)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("duration out of range: {}", s))
    }

    pub fn format_duration(d: Duration) -> String {
        if d.subsec_millis() != 0 || d.as_secs() == 0 {
            return format!("{}ms", d.as_millis());
        }
        let secs = d.as_secs();
        if secs % 3600 == 0 {
            format!("{}h", secs / 3600)
        } else if secs % 60 == 0 {
            format!("{}m", secs / 60)
        } else {
            format!("{}s", secs)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_parse_units() {
            assert_eq!(parse_duration("100ms").unwrap(), Duration::from_millis(100));
            assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
            assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
            assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        }

        #[test]
        fn test_parse_rejects_garbage() {
            assert!(parse_duration("").is_err());
            assert!(parse_duration("5").is_err());
            assert!(parse_duration("fast").is_err());
            assert!(parse_duration("-3s").is_err());
        }

        #[test]
        fn test_parse_rejects_overflowing_values() {
            let err = parse_duration("9999999999999999999h").unwrap_err();
            assert!(err.contains("out of range"), "{}", err);
            assert!(parse_duration("9999999999999999999m").is_err());
            assert_eq!(
                parse_duration("18446744073709551615s").unwrap(),
                Duration::from_secs(u64::MAX)
            );
        }

        #[test]
        fn test_format_picks_largest_whole_unit() {
            assert_eq!(format_duration(Duration::from_millis(100)), "100ms");
            assert_eq!(format_duration(Duration::from_millis(5000)), "5s");
            assert_eq!(format_duration(Duration::from_millis(1500)), "1500ms");
            assert_eq!(format_duration(Duration::from_secs(180)), "3m");
            assert_eq!(format_duration(Duration::from_secs(7200)), "2h");
            assert_eq!(format_duration(Duration::ZERO), "0ms");
        }
    }
}
