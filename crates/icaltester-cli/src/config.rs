//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/icaltester/config.toml` by default. Every section is optional.
//!
//! Setting `ALLOW_HTTP_ICAL_URLS=true` in the environment allows plain-http
//! feeds regardless of `fetch.allow_http`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use icaltester_core::{TracingConfig, TracingOutputFormat};
use icaltester_fetch::{FetchLimits, UrlPolicy};
use icaltester_sync::SyncConfig;
use serde::{Deserialize, Serialize};
use tracing::Level;

/// Environment switch for plain-http feeds.
pub const ALLOW_HTTP_ENV: &str = "ALLOW_HTTP_ICAL_URLS";

/// Configuration for the icaltester client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Outbound fetch limits.
    pub fetch: FetchSettings,

    /// Batch sync settings.
    pub sync: SyncSettings,

    /// Log output.
    pub logging: LoggingSettings,
}

/// Outbound fetch limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Deadline for one fetch, redirects included, in milliseconds.
    pub timeout_ms: u64,

    /// Largest accepted body in bytes.
    pub max_bytes: u64,

    /// Redirects followed before giving up.
    pub max_redirects: u32,

    /// Accept plain-http URLs.
    pub allow_http: bool,

    /// Allowed explicit ports; empty means 443 (plus 80 with http).
    pub allowed_ports: Vec<u16>,

    /// User agent override.
    pub user_agent: Option<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_ms: FetchLimits::DEFAULT_TIMEOUT_MS,
            max_bytes: FetchLimits::DEFAULT_MAX_BYTES,
            max_redirects: FetchLimits::DEFAULT_MAX_REDIRECTS,
            allow_http: false,
            allowed_ports: Vec::new(),
            user_agent: None,
        }
    }
}

impl FetchSettings {
    /// Builds fetch limits; `force_http` widens the scheme policy.
    pub fn to_limits(&self, force_http: bool) -> FetchLimits {
        let policy = UrlPolicy {
            allow_http: self.allow_http || force_http,
            allowed_ports: self.allowed_ports.clone(),
        };
        let limits = FetchLimits::default()
            .with_timeout(Duration::from_millis(self.timeout_ms))
            .with_max_bytes(self.max_bytes)
            .with_max_redirects(self.max_redirects)
            .with_policy(policy);
        match &self.user_agent {
            Some(agent) => limits.with_user_agent(agent.clone()),
            None => limits,
        }
    }
}

/// Batch sync settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Subscriptions claimed per batch.
    pub batch_size: usize,

    /// Concurrent syncs within a batch.
    pub concurrency: usize,

    /// Claim lease in seconds.
    pub claim_lease_secs: u64,

    /// Seconds between batches in `sync --watch`.
    pub tick_secs: u64,

    /// State file used when `--state` is not given.
    pub state_file: Option<PathBuf>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        let defaults = SyncConfig::default();
        Self {
            batch_size: defaults.batch_size,
            concurrency: defaults.concurrency,
            claim_lease_secs: defaults.claim_lease.as_secs(),
            tick_secs: defaults.tick_interval.as_secs(),
            state_file: None,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default level when `RUST_LOG` is unset.
    pub level: String,

    /// `compact`, `pretty` or `json`.
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl LoggingSettings {
    /// Builds the tracing configuration.
    ///
    /// `--debug` wins over everything. The long-running scheduler logs JSON
    /// with span events, at `info` or more verbose.
    pub fn to_tracing_config(&self, debug: bool, watching: bool) -> Result<TracingConfig, String> {
        let level: Level = self
            .level
            .parse()
            .map_err(|_| format!("unknown log level `{}`", self.level))?;
        let format = TracingOutputFormat::from_name(&self.format)
            .ok_or_else(|| format!("unknown log format `{}`", self.format))?;
        let config = if debug {
            TracingConfig::cli_debug().with_format(format)
        } else if watching {
            TracingConfig::scheduler().with_level(level.max(Level::INFO))
        } else {
            TracingConfig::default().with_level(level).with_format(format)
        };
        Ok(config)
    }
}

impl ClientConfig {
    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {}", e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("icaltester")
    }

    /// Returns the default state file path.
    pub fn default_state_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("icaltester")
            .join("state.json")
    }

    /// Resolves the state file: explicit argument, then config, then default.
    pub fn state_path(&self, explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| self.sync.state_file.clone())
            .unwrap_or_else(Self::default_state_path)
    }

    /// Fetch limits, honouring the CLI flag and the environment switch.
    pub fn fetch_limits(&self, allow_http_flag: bool) -> FetchLimits {
        self.fetch.to_limits(allow_http_flag || allow_http_from_env())
    }

    /// Sync configuration built on top of [`Self::fetch_limits`].
    pub fn sync_config(&self, allow_http_flag: bool) -> SyncConfig {
        SyncConfig::new(self.fetch_limits(allow_http_flag))
            .with_batch_size(self.sync.batch_size)
            .with_concurrency(self.sync.concurrency)
            .with_claim_lease(Duration::from_secs(self.sync.claim_lease_secs))
            .with_tick_interval(Duration::from_secs(self.sync.tick_secs.max(1)))
    }

    /// Checks values that deserialize fine but cannot work.
    pub fn validate(&self) -> Result<(), String> {
        if self.fetch.timeout_ms == 0 {
            return Err("fetch.timeout_ms must be positive".to_string());
        }
        if self.fetch.max_bytes == 0 {
            return Err("fetch.max_bytes must be positive".to_string());
        }
        if self.fetch.allowed_ports.contains(&0) {
            return Err("fetch.allowed_ports must not contain 0".to_string());
        }
        if self.sync.batch_size == 0 || self.sync.concurrency == 0 {
            return Err("sync.batch_size and sync.concurrency must be positive".to_string());
        }
        if self.sync.tick_secs == 0 {
            return Err("sync.tick_secs must be positive".to_string());
        }
        self.logging.to_tracing_config(false, false)?;
        Ok(())
    }
}

fn allow_http_from_env() -> bool {
    std::env::var(ALLOW_HTTP_ENV).is_ok_and(|v| v == "true")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_library_defaults() {
        let config = ClientConfig::default();
        let limits = config.fetch.to_limits(false);
        assert_eq!(limits.timeout, Duration::from_secs(10));
        assert_eq!(limits.max_bytes, 2_000_000);
        assert_eq!(limits.max_redirects, 3);
        assert!(!limits.policy.allow_http);

        let sync = config.sync_config(false);
        assert_eq!(sync.batch_size, 25);
        assert_eq!(sync.concurrency, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_partial_toml() {
        let config: ClientConfig = toml::from_str(
            r#"
[fetch]
timeout_ms = 2500
allow_http = true
allowed_ports = [80, 443, 8080]

[sync]
batch_size = 10
state_file = "/var/lib/icaltester/state.json"

[logging]
level = "debug"
format = "json"
"#,
        )
        .unwrap();

        let limits = config.fetch.to_limits(false);
        assert_eq!(limits.timeout, Duration::from_millis(2500));
        assert_eq!(limits.max_bytes, 2_000_000);
        assert!(limits.policy.allow_http);
        assert_eq!(limits.policy.effective_ports(), &[80, 443, 8080]);

        assert_eq!(config.sync.batch_size, 10);
        assert_eq!(config.sync.concurrency, 4);
        assert_eq!(
            config.state_path(None),
            PathBuf::from("/var/lib/icaltester/state.json")
        );

        let tracing = config.logging.to_tracing_config(false, false).unwrap();
        assert_eq!(tracing.default_level, Level::DEBUG);
        assert_eq!(tracing.output_format, TracingOutputFormat::Json);
    }

    #[test]
    fn watch_uses_scheduler_preset() {
        let logging = LoggingSettings::default();
        let tracing = logging.to_tracing_config(false, true).unwrap();
        assert_eq!(tracing.default_level, Level::INFO);
        assert_eq!(tracing.output_format, TracingOutputFormat::Json);
        assert!(tracing.include_span_events);

        let tracing = logging.to_tracing_config(true, true).unwrap();
        assert_eq!(tracing.default_level, Level::DEBUG);
        assert_eq!(tracing.output_format, TracingOutputFormat::Compact);
    }

    #[test]
    fn explicit_state_path_wins() {
        let config = ClientConfig::default();
        assert_eq!(
            config.state_path(Some(Path::new("here.json"))),
            PathBuf::from("here.json")
        );
        assert!(config.state_path(None).ends_with("icaltester/state.json"));
    }

    #[test]
    fn force_http_widens_policy() {
        let limits = FetchSettings::default().to_limits(true);
        assert!(limits.policy.allow_http);
        assert_eq!(limits.policy.effective_ports(), &[80, 443]);
    }

    #[test]
    fn validate_rejects_unusable_values() {
        let mut config = ClientConfig::default();
        config.fetch.timeout_ms = 0;
        assert!(config.validate().unwrap_err().contains("timeout_ms"));

        let mut config = ClientConfig::default();
        config.logging.level = "chatty".to_string();
        assert!(config.validate().unwrap_err().contains("log level"));

        let mut config = ClientConfig::default();
        config.fetch.allowed_ports = vec![443, 0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[sync]\nconcurrency = 2\n").unwrap();
        let config = ClientConfig::load_from(&path).unwrap();
        assert_eq!(config.sync.concurrency, 2);

        std::fs::write(&path, "[sync\n").unwrap();
        assert!(ClientConfig::load_from(&path).unwrap_err().contains("parse"));
    }
}
