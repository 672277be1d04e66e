//! Environment-derived runtime configuration.
//!
//! Read once at daemon start, the same way `gnosis_vpn-lib::config` loads a
//! versioned config file up front rather than re-reading the environment on
//! every call.

use std::path::PathBuf;
use std::time::Duration;

/// Governs the deployment/rollback lifecycle.
#[derive(Clone, Debug)]
pub struct DeployerConfig {
    /// `MCP_HOST` — address the control socket's TCP fallback binds, if any.
    pub host: String,
    /// `MCP_PORT`.
    pub port: u16,
    /// `REQUIRE_APPROVAL` — when set, `deploy_policy` refuses an unapproved rule.
    pub require_approval: bool,
    /// `ROLLBACK_TIMEOUT` — seconds the watchdog waits for confirmation.
    pub rollback_timeout: Duration,
    /// Directory backups are written under, ensured to exist before use.
    pub backup_dir: PathBuf,
}

impl Default for DeployerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8765,
            require_approval: true,
            rollback_timeout: Duration::from_secs(30),
            backup_dir: PathBuf::from("/var/lib/afo/backups"),
        }
    }
}

impl DeployerConfig {
    /// Builds configuration from environment variables, falling back to
    /// the defaults above for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("MCP_HOST").unwrap_or(defaults.host),
            port: std::env::var("MCP_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            require_approval: std::env::var("REQUIRE_APPROVAL")
                .map(|v| v == "1")
                .unwrap_or(defaults.require_approval),
            rollback_timeout: std::env::var("ROLLBACK_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.rollback_timeout),
            backup_dir: defaults.backup_dir,
        }
    }
}

/// `AFO_LOG_FILTER` — `tracing_subscriber::EnvFilter` directive string.
pub fn log_filter() -> String {
    std::env::var("AFO_LOG_FILTER").unwrap_or_else(|_| "info".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_require_approval_and_use_thirty_second_rollback_timeout() {
        let cfg = DeployerConfig::default();
        assert!(cfg.require_approval);
        assert_eq!(cfg.rollback_timeout, Duration::from_secs(30));
        assert_eq!(cfg.backup_dir, PathBuf::from("/var/lib/afo/backups"));
    }
}
