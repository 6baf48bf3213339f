//! Configuration for the job board orchestrator.
//!
//! Loaded from environment variables via figment. Supports flexible duration
//! parsing that accepts both numeric values (interpreted as seconds) and
//! duration strings with units, the same as the rest of the ambient stack.

use fundu::{DurationParser, TimeUnit};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Main application configuration.
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    /// Log level for the application's own target.
    ///
    /// Valid values are: "trace", "debug", "info", "warn", "error".
    /// Defaults to "info" if not specified.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Graceful shutdown timeout. Accepts both numeric values (seconds) and
    /// duration strings. Defaults to 15 seconds.
    #[serde(default = "default_shutdown_timeout", deserialize_with = "deserialize_duration")]
    pub shutdown_timeout: Duration,

    /// Maximum number of tasks the priority queue holds at once.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Number of concurrent worker loops draining the queue.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Default per-host rate limit delay when a board doesn't specify one.
    #[serde(default = "default_rate_limit_delay", deserialize_with = "deserialize_duration")]
    pub default_rate_limit_delay: Duration,

    /// Ceiling a host's effective rate-limit delay is capped at after
    /// repeated 429s.
    #[serde(default = "default_rate_limit_ceiling", deserialize_with = "deserialize_duration")]
    pub rate_limit_ceiling: Duration,

    /// Window without a 429 after which a host's delay decays back to
    /// baseline.
    #[serde(default = "default_rate_limit_cooldown", deserialize_with = "deserialize_duration")]
    pub rate_limit_cooldown: Duration,

    /// Capacity of the fingerprint store used for duplicate detection.
    #[serde(default = "default_dedup_capacity")]
    pub dedup_capacity: usize,

    /// Deadline for an advisor call before falling back to the deterministic
    /// default analysis.
    #[serde(default = "default_advisor_deadline", deserialize_with = "deserialize_duration")]
    pub advisor_deadline: Duration,

    /// Default max pages fetched per board per task when unset.
    #[serde(default = "default_max_pages")]
    pub default_max_pages: usize,

    /// Maximum automatic retries for a retryable task failure.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Whether persistence should be asked to load existing job boards at
    /// startup before accepting new scrape tasks.
    #[serde(default = "default_persistence_warm_start")]
    pub persistence_warm_start: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_queue_capacity() -> usize {
    1000
}

fn default_worker_count() -> usize {
    5
}

fn default_rate_limit_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_rate_limit_ceiling() -> Duration {
    Duration::from_secs(60)
}

fn default_rate_limit_cooldown() -> Duration {
    Duration::from_secs(300)
}

fn default_dedup_capacity() -> usize {
    10_000
}

fn default_advisor_deadline() -> Duration {
    Duration::from_secs(30)
}

fn default_max_pages() -> usize {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_persistence_warm_start() -> bool {
    true
}

/// Duration parser configured to handle various time units with seconds as
/// default.
///
/// Supports seconds (default), milliseconds, and minutes. Does not support
/// fractions, exponents, or infinity values. Allows whitespace between the
/// number and the unit, and multiple units summed together (e.g. "10s 2m").
const DURATION_PARSER: DurationParser<'static> = DurationParser::builder()
    .time_units(&[TimeUnit::Second, TimeUnit::MilliSecond, TimeUnit::Minute])
    .parse_multiple(None)
    .allow_time_unit_delimiter()
    .disable_infinity()
    .disable_fraction()
    .disable_exponent()
    .default_unit(TimeUnit::Second)
    .build();

/// Accepts unsigned/signed integers (seconds) or duration strings parsed via
/// `DURATION_PARSER` (e.g. "30s", "2m", "1500ms").
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Visitor;

    struct DurationVisitor;

    impl<'de> Visitor<'de> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a duration string or number")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            DURATION_PARSER
                .parse(value)
                .map_err(|e| {
                    serde::de::Error::custom(format!(
                        "invalid duration format '{value}': {e}. examples: '5' (5 seconds), '3500ms', '30s', '2m'"
                    ))
                })?
                .try_into()
                .map_err(|e| serde::de::Error::custom(format!("duration conversion error: {e}")))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Duration::from_secs(value))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            if value < 0 {
                return Err(serde::de::Error::custom("duration cannot be negative"));
            }
            Ok(Duration::from_secs(value as u64))
        }
    }

    deserializer.deserialize_any(DurationVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        assert_eq!(default_queue_capacity(), 1000);
        assert_eq!(default_worker_count(), 5);
        assert_eq!(default_dedup_capacity(), 10_000);
    }
}
