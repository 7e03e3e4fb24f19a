//! Environment-driven configuration.

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Desktop Chrome user agent; several career sites reject obvious bots.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    /// Extra attempts after a failed fetch. Zero keeps "record once and move on".
    pub retries: u32,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retries: 0,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScreenshotConfig {
    pub endpoint: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct ReferenceConfig {
    pub base_url: String,
    pub api_key: String,
    pub collection: String,
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Root holding the registry, the result log and the snapshot folders.
    pub data_dir: PathBuf,
    pub fetch: FetchConfig,
    pub negation_filter: bool,
    pub screenshot: Option<ScreenshotConfig>,
    pub reference: Option<ReferenceConfig>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            fetch: FetchConfig::default(),
            negation_filter: true,
            screenshot: None,
            reference: None,
        }
    }
}

impl MonitorConfig {
    pub fn from_env() -> Self {
        let screenshot = match (env_opt("SCREENSHOT_API_URL"), env_opt("SCREENSHOT_API_KEY")) {
            (Some(endpoint), Some(api_key)) => Some(ScreenshotConfig { endpoint, api_key }),
            _ => None,
        };
        let reference = match (
            env_opt("REFERENCE_API_URL"),
            env_opt("REFERENCE_API_KEY"),
            env_opt("REFERENCE_COLLECTION"),
        ) {
            (Some(base_url), Some(api_key), Some(collection)) => Some(ReferenceConfig {
                base_url,
                api_key,
                collection,
            }),
            _ => None,
        };

        Self {
            data_dir: env_opt("MONITOR_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            fetch: FetchConfig {
                timeout: Duration::from_secs(env_parse(
                    "MONITOR_FETCH_TIMEOUT_SECS",
                    DEFAULT_TIMEOUT_SECS,
                )),
                retries: env_parse("MONITOR_FETCH_RETRIES", 0),
                user_agent: env_opt("MONITOR_USER_AGENT")
                    .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            },
            negation_filter: env_bool("MONITOR_VISA_NEGATION", true),
            screenshot,
            reference,
        }
    }

    pub fn with_data_dir(mut self, data_dir: impl AsRef<Path>) -> Self {
        self.data_dir = data_dir.as_ref().to_path_buf();
        self
    }

    pub fn targets_path(&self) -> PathBuf {
        self.data_dir.join("targets.csv")
    }

    pub fn results_path(&self) -> PathBuf {
        self.data_dir.join("results.csv")
    }

    pub fn latest_dir(&self) -> PathBuf {
        self.data_dir.join("Latest_Snapshot")
    }

    pub fn old_dir(&self) -> PathBuf {
        self.data_dir.join("Old_Snapshot")
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.data_dir.join("Archive")
    }
}

/// Reads a variable, treating unset and blank the same.
pub fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

pub fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.trim() {
            "1" | "true" | "TRUE" | "True" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "False" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

/// Reads and parses a variable. Unset, blank, malformed and out-of-range
/// values all fall back to `default`.
pub fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    parse_or(env::var(name).ok().as_deref(), default)
}

fn parse_or<T: FromStr>(raw: Option<&str>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_hang_off_data_dir() {
        let config = MonitorConfig::default().with_data_dir("/srv/monitor");
        assert_eq!(config.targets_path(), PathBuf::from("/srv/monitor/targets.csv"));
        assert_eq!(config.results_path(), PathBuf::from("/srv/monitor/results.csv"));
        assert_eq!(config.latest_dir(), PathBuf::from("/srv/monitor/Latest_Snapshot"));
        assert_eq!(config.old_dir(), PathBuf::from("/srv/monitor/Old_Snapshot"));
        assert_eq!(config.archive_dir(), PathBuf::from("/srv/monitor/Archive"));
    }

    #[test]
    fn test_out_of_range_retries_fall_back_instead_of_wrapping() {
        assert_eq!(parse_or::<u32>(Some("4294967296"), 0), 0);
        assert_eq!(parse_or::<u32>(Some(" 3 "), 0), 3);
        assert_eq!(parse_or::<u32>(Some("-1"), 2), 2);
        assert_eq!(parse_or::<u64>(None, 15), 15);
    }

    #[test]
    fn test_defaults_keep_fetch_retry_free() {
        let config = MonitorConfig::default();
        assert_eq!(config.fetch.retries, 0);
        assert_eq!(config.fetch.timeout, Duration::from_secs(15));
        assert!(config.negation_filter);
        assert!(config.screenshot.is_none() && config.reference.is_none());
    }
}
