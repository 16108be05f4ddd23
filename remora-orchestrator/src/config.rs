//! Orchestrator configuration
//!
//! Defines the tunables of the polling loop and the artifact retriever:
//! polling cadence, local timeouts, transient failure tolerance and
//! transfer retries.

use std::path::PathBuf;
use std::time::Duration;

/// Orchestrator configuration
///
/// All timeouts and intervals are configurable to allow tuning for
/// different job durations and API rate limits.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Fixed wait before every status query
    pub poll_interval: Duration,

    /// Upper bound of a random delay added to each wait, zero disables it
    pub poll_jitter: Duration,

    /// Local limit on the total wait; `None` waits indefinitely
    pub max_elapsed_timeout: Option<Duration>,

    /// Consecutive failed status queries tolerated before giving up with
    /// `Unknown`; `None` never gives up
    pub max_consecutive_transient_failures: Option<u32>,

    /// Whether Ctrl-C detaches the local wait
    pub cancel_on_signal: bool,

    /// Attempts per artifact transfer (including the first)
    pub fetch_attempts: u32,

    /// Base delay of the linear backoff between transfer attempts
    pub fetch_backoff: Duration,

    /// Where successful jobs' artifacts are mirrored, if anywhere
    pub output_dir: Option<PathBuf>,
}

impl OrchestratorConfig {
    /// Creates a new configuration with defaults
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            poll_jitter: Duration::ZERO,
            max_elapsed_timeout: None,
            max_consecutive_transient_failures: Some(5),
            cancel_on_signal: true,
            fetch_attempts: 3,
            fetch_backoff: Duration::from_secs(1),
            output_dir: None,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - REMORA_POLL_INTERVAL (seconds, default: 30)
    /// - REMORA_POLL_JITTER (milliseconds, default: 0)
    /// - REMORA_MAX_ELAPSED (seconds, default: unbounded; 0 means unbounded)
    /// - REMORA_MAX_TRANSIENT_FAILURES (default: 5; "none" disables the limit)
    /// - REMORA_CANCEL_ON_SIGNAL (true/false, default: true)
    /// - REMORA_FETCH_ATTEMPTS (default: 3)
    /// - REMORA_OUTPUT_DIR (default: none)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::new();

        if let Some(value) = lookup("REMORA_POLL_INTERVAL") {
            config.poll_interval = Duration::from_secs(parse_number(
                "REMORA_POLL_INTERVAL",
                &value,
            )?);
        }

        if let Some(value) = lookup("REMORA_POLL_JITTER") {
            config.poll_jitter =
                Duration::from_millis(parse_number("REMORA_POLL_JITTER", &value)?);
        }

        if let Some(value) = lookup("REMORA_MAX_ELAPSED") {
            let secs = parse_number("REMORA_MAX_ELAPSED", &value)?;
            config.max_elapsed_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        if let Some(value) = lookup("REMORA_MAX_TRANSIENT_FAILURES") {
            config.max_consecutive_transient_failures =
                match value.trim().to_ascii_lowercase().as_str() {
                    "none" | "unbounded" => None,
                    other => Some(parse_u32("REMORA_MAX_TRANSIENT_FAILURES", other)?),
                };
        }

        if let Some(value) = lookup("REMORA_CANCEL_ON_SIGNAL") {
            config.cancel_on_signal = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                other => anyhow::bail!("REMORA_CANCEL_ON_SIGNAL must be a boolean, got '{}'", other),
            };
        }

        if let Some(value) = lookup("REMORA_FETCH_ATTEMPTS") {
            config.fetch_attempts = parse_u32("REMORA_FETCH_ATTEMPTS", &value)?;
        }

        config.output_dir = lookup("REMORA_OUTPUT_DIR")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        Ok(config)
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_poll_jitter(mut self, jitter: Duration) -> Self {
        self.poll_jitter = jitter;
        self
    }

    pub fn with_max_elapsed_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.max_elapsed_timeout = timeout;
        self
    }

    pub fn with_max_consecutive_transient_failures(mut self, max: Option<u32>) -> Self {
        self.max_consecutive_transient_failures = max;
        self
    }

    pub fn with_cancel_on_signal(mut self, enabled: bool) -> Self {
        self.cancel_on_signal = enabled;
        self
    }

    pub fn with_fetch_retry(mut self, attempts: u32, backoff: Duration) -> Self {
        self.fetch_attempts = attempts;
        self.fetch_backoff = backoff;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if let Some(timeout) = self.max_elapsed_timeout {
            if timeout.is_zero() {
                anyhow::bail!("max_elapsed_timeout must be greater than 0 when set");
            }
        }

        if self.fetch_attempts == 0 {
            anyhow::bail!("fetch_attempts must be at least 1");
        }

        Ok(())
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_number(name: &str, value: &str) -> anyhow::Result<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| anyhow::anyhow!("{} must be a non-negative integer, got '{}'", name, value))
}

fn parse_u32(name: &str, value: &str) -> anyhow::Result<u32> {
    let number = parse_number(name, value)?;
    u32::try_from(number)
        .map_err(|_| anyhow::anyhow!("{} must be at most {}, got '{}'", name, u32::MAX, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.max_elapsed_timeout, None);
        assert_eq!(config.max_consecutive_transient_failures, Some(5));
        assert!(config.cancel_on_signal);
        assert_eq!(config.fetch_attempts, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = OrchestratorConfig::default();
        assert!(config.validate().is_ok());

        config.poll_interval = Duration::ZERO;
        assert!(config.validate().is_err());

        config.poll_interval = Duration::from_secs(1);
        config.fetch_attempts = 0;
        assert!(config.validate().is_err());

        config.fetch_attempts = 1;
        config.max_elapsed_timeout = Some(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = OrchestratorConfig::from_lookup(lookup_from(&[
            ("REMORA_POLL_INTERVAL", "10"),
            ("REMORA_MAX_ELAPSED", "3600"),
            ("REMORA_MAX_TRANSIENT_FAILURES", "none"),
            ("REMORA_CANCEL_ON_SIGNAL", "false"),
            ("REMORA_OUTPUT_DIR", "/tmp/out"),
        ]))
        .unwrap();

        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.max_elapsed_timeout, Some(Duration::from_secs(3600)));
        assert_eq!(config.max_consecutive_transient_failures, None);
        assert!(!config.cancel_on_signal);
        assert_eq!(config.output_dir, Some(PathBuf::from("/tmp/out")));
    }

    #[test]
    fn test_counts_out_of_u32_range_are_rejected() {
        assert!(
            OrchestratorConfig::from_lookup(lookup_from(&[(
                "REMORA_MAX_TRANSIENT_FAILURES",
                "4294967296"
            )]))
            .is_err()
        );
        assert!(
            OrchestratorConfig::from_lookup(lookup_from(&[("REMORA_FETCH_ATTEMPTS", "4294967296")]))
                .is_err()
        );

        let config = OrchestratorConfig::from_lookup(lookup_from(&[(
            "REMORA_MAX_TRANSIENT_FAILURES",
            "4294967295",
        )]))
        .unwrap();
        assert_eq!(config.max_consecutive_transient_failures, Some(u32::MAX));
    }

    #[test]
    fn test_zero_max_elapsed_means_unbounded() {
        let config =
            OrchestratorConfig::from_lookup(lookup_from(&[("REMORA_MAX_ELAPSED", "0")])).unwrap();
        assert_eq!(config.max_elapsed_timeout, None);
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        assert!(
            OrchestratorConfig::from_lookup(lookup_from(&[("REMORA_POLL_INTERVAL", "soon")]))
                .is_err()
        );
        assert!(
            OrchestratorConfig::from_lookup(lookup_from(&[("REMORA_CANCEL_ON_SIGNAL", "maybe")]))
                .is_err()
        );
    }
}
