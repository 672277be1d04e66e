//! Wire protocol spoken over the control socket.
//!
//! Mirrors `gnosis_vpn-lib::command`'s tagged `Command`/`Response` pair: one
//! variant per RPC operation, serialized as JSON.

use serde::{Deserialize, Serialize};

use crate::model::{ConflictReport, DeploymentResult, NetworkContext, ValidationResult};

fn default_true() -> bool {
    true
}

fn default_platform() -> String {
    "nftables".to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    GetNetworkContext,
    ValidateSyntax {
        rule_text: String,
        #[serde(default = "default_platform")]
        platform: String,
    },
    DetectConflicts {
        proposed_rule: String,
        #[serde(default)]
        active_ruleset: Option<String>,
    },
    DeployPolicy {
        rule_id: String,
        rule_content: String,
        #[serde(default)]
        approved: bool,
        #[serde(default = "default_true")]
        enable_heartbeat: bool,
        /// Overrides `ROLLBACK_TIMEOUT` for this deployment only, in seconds.
        #[serde(default)]
        heartbeat_timeout: Option<u64>,
    },
    ConfirmRuleDeployment { rule_id: String },
    RollbackRule { rule_id: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Response {
    NetworkContext(NetworkContext),
    ValidationResult(ValidationResult),
    ConflictReport(ConflictReport),
    DeploymentResult(DeploymentResult),
    /// Result of `confirm_rule_deployment`: `success` is `true` iff a live
    /// watchdog for `rule_id` was found and stood down.
    Confirmation { success: bool, rule_id: String },
    Error(String),
}
