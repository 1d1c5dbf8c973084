//! Configuration management with environment variable support.
//!
//! This module provides centralized configuration for testpilot, supporting:
//! - Environment variables for all configurable values
//! - Sensible defaults for a local developer machine
//! - Builder-style overrides for programmatic configuration
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `TESTPILOT_WORKERS` | Background workers draining the job queue | `4` |
//! | `TESTPILOT_NODE` | Node.js binary used for the Playwright bridge | `node` |
//! | `TESTPILOT_NODE_PATH` | `NODE_PATH` handed to the bridge process | unset |
//! | `TESTPILOT_API_BASE` | Host used when an API prompt only names a path | `https://api.example.com` |
//! | `TESTPILOT_HTTP_TIMEOUT` | API request timeout in seconds | `30` |
//! | `TESTPILOT_ARTIFACT_DIR` | Base directory for saved run artifacts | `/tmp/testpilot` |
//! | `TESTPILOT_ARTIFACT_RETENTION_HOURS` | Age after which saved runs are pruned | `24` |
//! | `TESTPILOT_LOG` | `tracing` filter directive | `info` |
//!
//! # Example
//!
//! ```bash
//! # Point path-only API prompts at a local service
//! export TESTPILOT_API_BASE="http://localhost:3000"
//!
//! # Run more tests in parallel
//! export TESTPILOT_WORKERS=8
//! ```

use std::env;
use std::sync::OnceLock;
use std::time::Duration;

// ============================================================================
// Default Values
// ============================================================================

/// Default number of background workers
pub const DEFAULT_WORKERS: usize = 4;

/// Default Node.js binary
pub const DEFAULT_NODE_BINARY: &str = "node";

/// Default host for path-only API prompts
pub const DEFAULT_API_BASE: &str = "https://api.example.com";

/// Default API request timeout (seconds)
pub const DEFAULT_HTTP_TIMEOUT: u64 = 30;

/// Default artifact base directory
pub const DEFAULT_ARTIFACT_DIR: &str = "/tmp/testpilot";

/// Default artifact retention (hours)
pub const DEFAULT_ARTIFACT_RETENTION_HOURS: u64 = 24;

/// Default log filter
pub const DEFAULT_LOG_FILTER: &str = "info";

// ============================================================================
// Environment Variable Names
// ============================================================================

/// Environment variable for the worker count
pub const ENV_WORKERS: &str = "TESTPILOT_WORKERS";

/// Environment variable for the Node.js binary
pub const ENV_NODE_BINARY: &str = "TESTPILOT_NODE";

/// Environment variable for the bridge `NODE_PATH`
pub const ENV_NODE_PATH: &str = "TESTPILOT_NODE_PATH";

/// Environment variable for the API placeholder host
pub const ENV_API_BASE: &str = "TESTPILOT_API_BASE";

/// Environment variable for the API request timeout
pub const ENV_HTTP_TIMEOUT: &str = "TESTPILOT_HTTP_TIMEOUT";

/// Environment variable for the artifact directory
pub const ENV_ARTIFACT_DIR: &str = "TESTPILOT_ARTIFACT_DIR";

/// Environment variable for the artifact retention
pub const ENV_ARTIFACT_RETENTION: &str = "TESTPILOT_ARTIFACT_RETENTION_HOURS";

/// Environment variable for the log filter
pub const ENV_LOG_FILTER: &str = "TESTPILOT_LOG";

// ============================================================================
// Configuration Getters (with caching)
// ============================================================================

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Centralized configuration for testpilot
#[derive(Debug, Clone)]
pub struct Config {
    /// Job scheduler settings
    pub scheduler: SchedulerSettings,
    /// Browser bridge settings
    pub browser: BrowserSettings,
    /// API test settings
    pub api: ApiSettings,
    /// Base directory for saved artifacts
    pub artifact_dir: String,
    /// Saved runs older than this are pruned
    pub artifact_retention: Duration,
    /// `tracing` filter directive
    pub log_filter: String,
}

/// Job scheduler settings
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Number of background workers
    pub workers: usize,
}

/// Playwright bridge settings
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    /// Node.js binary
    pub node_binary: String,
    /// Optional `NODE_PATH` for resolving the `playwright` package
    pub node_path: Option<String>,
}

/// API test settings
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Host prepended to path-only endpoints
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            scheduler: SchedulerSettings::from_env(),
            browser: BrowserSettings::from_env(),
            api: ApiSettings::from_env(),
            artifact_dir: env::var(ENV_ARTIFACT_DIR)
                .unwrap_or_else(|_| DEFAULT_ARTIFACT_DIR.to_string()),
            artifact_retention: env::var(ENV_ARTIFACT_RETENTION)
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .map(hours)
                .unwrap_or_else(|| hours(DEFAULT_ARTIFACT_RETENTION_HOURS)),
            log_filter: env::var(ENV_LOG_FILTER)
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string()),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            scheduler: SchedulerSettings::defaults(),
            browser: BrowserSettings::defaults(),
            api: ApiSettings::defaults(),
            artifact_dir: DEFAULT_ARTIFACT_DIR.to_string(),
            artifact_retention: hours(DEFAULT_ARTIFACT_RETENTION_HOURS),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl SchedulerSettings {
    pub fn from_env() -> Self {
        Self {
            workers: env::var(ENV_WORKERS)
                .ok()
                .and_then(|s| parse_workers(&s))
                .unwrap_or(DEFAULT_WORKERS),
        }
    }

    pub fn defaults() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
        }
    }
}

impl BrowserSettings {
    pub fn from_env() -> Self {
        Self {
            node_binary: env::var(ENV_NODE_BINARY)
                .unwrap_or_else(|_| DEFAULT_NODE_BINARY.to_string()),
            node_path: env::var(ENV_NODE_PATH).ok().filter(|s| !s.trim().is_empty()),
        }
    }

    pub fn defaults() -> Self {
        Self {
            node_binary: DEFAULT_NODE_BINARY.to_string(),
            node_path: None,
        }
    }
}

impl ApiSettings {
    pub fn from_env() -> Self {
        Self {
            base_url: env::var(ENV_API_BASE)
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            timeout: Duration::from_secs(
                env::var(ENV_HTTP_TIMEOUT)
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_HTTP_TIMEOUT),
            ),
        }
    }

    pub fn defaults() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT),
        }
    }

    /// Override the placeholder host
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse a worker count; zero workers would never drain the queue
fn parse_workers(value: &str) -> Option<usize> {
    value.trim().parse().ok().filter(|n: &usize| *n > 0)
}

/// Get the configured worker count (convenience function)
pub fn workers() -> usize {
    get().scheduler.workers
}

/// Get the artifact base directory (convenience function)
pub fn artifact_dir() -> String {
    get().artifact_dir.clone()
}

/// Get the artifact retention (convenience function)
pub fn artifact_retention() -> Duration {
    get().artifact_retention
}

fn hours(n: u64) -> Duration {
    Duration::from_secs(n.saturating_mul(3600))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_workers() {
        assert_eq!(parse_workers("8"), Some(8));
        assert_eq!(parse_workers(" 2 "), Some(2));
        assert_eq!(parse_workers("0"), None);
        assert_eq!(parse_workers("many"), None);
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::defaults();
        assert_eq!(config.scheduler.workers, DEFAULT_WORKERS);
        assert_eq!(config.browser.node_binary, DEFAULT_NODE_BINARY);
        assert_eq!(config.api.base_url, DEFAULT_API_BASE);
        assert_eq!(config.api.timeout, Duration::from_secs(30));
        assert_eq!(config.artifact_dir, DEFAULT_ARTIFACT_DIR);
        assert_eq!(config.artifact_retention, Duration::from_secs(24 * 3600));
    }

    #[test]
    fn test_api_settings_builder() {
        let api = ApiSettings::defaults()
            .base_url("http://127.0.0.1:9000/")
            .timeout(Duration::from_secs(5));
        assert_eq!(api.base_url, "http://127.0.0.1:9000");
        assert_eq!(api.timeout, Duration::from_secs(5));
    }
}
