//! Supervised deployment. Orchestrates the safety gate, backup, atomic
//! apply, and watchdog around a single rule deployment, tracking in-flight
//! watchdogs on the `Deployer` instance rather than as process-global state,
//! so a daemon can hold one per socket server.

use std::collections::HashMap;
use std::sync::Arc;

use afo_core::config::DeployerConfig;
use afo_core::model::{DeploymentResult, DeploymentStatus};
use afo_core::safety::{contains_dangerous_chars, is_safe_rule_id};
use afo_nft::NftOps;
use tokio::sync::Mutex;

use crate::backup::{create_backup, most_recent_backup, restore_backup};
use crate::watchdog::{BoxedHealthProbe, Watchdog};

/// Supervises deploy/confirm/rollback for one backend. Cheaply cloneable:
/// the watchdog table is shared behind a mutex so every clone sees the same
/// in-flight deployments.
#[derive(Clone)]
pub struct Deployer<N> {
    nft: N,
    config: DeployerConfig,
    watchdogs: Arc<Mutex<HashMap<String, Watchdog>>>,
}

impl<N> Deployer<N>
where
    N: NftOps + Clone + Send + Sync + 'static,
{
    pub fn new(nft: N, config: DeployerConfig) -> Self {
        Self {
            nft,
            config,
            watchdogs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Deploys `rule_content` under `rule_id`. `approved` must be `true`
    /// when `DeployerConfig::require_approval` is set. `probe`, if given, is
    /// polled once per watchdog tick in addition to the timeout deadline —
    /// the in-process equivalent of the `heartbeat_fn` callback.
    pub async fn deploy_policy(
        &self,
        rule_id: &str,
        rule_content: &str,
        approved: bool,
        enable_heartbeat: bool,
        heartbeat_timeout: Option<std::time::Duration>,
        probe: Option<BoxedHealthProbe>,
        now: i64,
    ) -> DeploymentResult {
        if self.config.require_approval && !approved {
            return DeploymentResult::pending(
                rule_id,
                "Deployment requires explicit approval (approved=True)",
                now,
            );
        }

        if contains_dangerous_chars(rule_content) {
            return DeploymentResult::failed(
                rule_id,
                "Rule content contains potentially dangerous characters",
                now,
            );
        }

        if !is_safe_rule_id(rule_id) {
            return DeploymentResult::failed(
                rule_id,
                "Rule id contains dangerous characters or path segments",
                now,
            );
        }

        let backup_path = match create_backup(&self.nft, &self.config.backup_dir, rule_id, now).await
        {
            Ok(path) => path,
            Err(err) => {
                tracing::error!(%err, rule_id, "failed to create backup, aborting deployment");
                return DeploymentResult::failed(
                    rule_id,
                    "Failed to create backup - aborting deployment",
                    now,
                );
            }
        };

        let tmp = match tempfile::Builder::new().suffix(".nft").tempfile() {
            Ok(tmp) => tmp,
            Err(err) => {
                return DeploymentResult::failed(rule_id, format!("failed to stage rule: {err}"), now);
            }
        };
        if let Err(err) = tokio::fs::write(tmp.path(), rule_content).await {
            return DeploymentResult::failed(rule_id, format!("failed to stage rule: {err}"), now);
        }

        if let Err(err) = self.nft.apply_file(tmp.path()).await {
            tracing::warn!(%err, rule_id, "deployment failed, restoring backup");
            if let Err(restore_err) = restore_backup(&self.nft, &backup_path).await {
                tracing::error!(%restore_err, rule_id, "rollback after failed deployment also failed");
            }
            return DeploymentResult {
                success: false,
                status: DeploymentStatus::Failed,
                rule_id: rule_id.to_string(),
                backup_path: Some(backup_path.display().to_string()),
                error: Some(err.to_string()),
                timestamp: now,
                heartbeat_active: false,
            };
        }

        let heartbeat_active = if enable_heartbeat {
            let watchdog = crate::watchdog::spawn(
                self.nft.clone(),
                backup_path.clone(),
                heartbeat_timeout.unwrap_or(self.config.rollback_timeout),
                probe,
            );
            self.watchdogs
                .lock()
                .await
                .insert(rule_id.to_string(), watchdog);
            true
        } else {
            false
        };

        DeploymentResult {
            success: true,
            status: DeploymentStatus::Deployed,
            rule_id: rule_id.to_string(),
            backup_path: Some(backup_path.display().to_string()),
            error: None,
            timestamp: now,
            heartbeat_active,
        }
    }

    /// Confirms a deployment, standing down its watchdog so it is never
    /// auto-rolled-back. Returns `true` if a watchdog was found and stopped.
    pub async fn confirm_rule_deployment(&self, rule_id: &str) -> bool {
        let watchdog = self.watchdogs.lock().await.remove(rule_id);
        match watchdog {
            Some(watchdog) => {
                watchdog.confirm().await;
                true
            }
            None => false,
        }
    }

    /// Manually rolls back `rule_id` to its most recent backup, independent
    /// of whether a watchdog is currently monitoring it.
    pub async fn rollback_rule(&self, rule_id: &str, now: i64) -> DeploymentResult {
        if !is_safe_rule_id(rule_id) {
            return DeploymentResult::failed(
                rule_id,
                "Rule id contains dangerous characters or path segments",
                now,
            );
        }

        if let Some(watchdog) = self.watchdogs.lock().await.remove(rule_id) {
            watchdog.confirm().await;
        }

        let backup_path = match most_recent_backup(&self.config.backup_dir, rule_id).await {
            Ok(Some(path)) => path,
            Ok(None) => {
                return DeploymentResult::failed(rule_id, "No backup found for this rule", now);
            }
            Err(err) => {
                return DeploymentResult::failed(rule_id, format!("failed to locate backup: {err}"), now);
            }
        };

        match restore_backup(&self.nft, &backup_path).await {
            Ok(()) => DeploymentResult {
                success: true,
                status: DeploymentStatus::RolledBack,
                rule_id: rule_id.to_string(),
                backup_path: Some(backup_path.display().to_string()),
                error: None,
                timestamp: now,
                heartbeat_active: false,
            },
            Err(err) => {
                tracing::error!(%err, rule_id, "failed to restore backup");
                DeploymentResult::failed(rule_id, "Failed to restore backup", now)
            }
        }
    }
}
