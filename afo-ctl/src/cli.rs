use std::path::PathBuf;

use afo_core::command::Command as LibCommand;
use afo_core::socket;
use clap::{Parser, Subcommand};

/// Operator control interface for the firewall orchestrator daemon.
#[derive(Debug, Parser)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Specify socket path
    #[arg(short, long, env = socket::ENV_VAR, default_value = socket::DEFAULT_PATH)]
    pub socket_path: PathBuf,

    /// Format output as json
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Query current network interfaces, active ruleset, and hostname
    NetworkContext {},

    /// Validate an nftables rule or script without applying it
    ValidateSyntax {
        rule_text: String,
        /// Target platform; only `nftables` is currently supported
        #[arg(long, default_value = "nftables")]
        platform: String,
    },

    /// Check a proposed rule against the active ruleset for conflicts
    DetectConflicts {
        proposed_rule: String,
        /// Ruleset text to check against; fetched from the daemon if omitted
        #[arg(long)]
        active_ruleset: Option<String>,
    },

    /// Deploy a firewall rule with a backup/watchdog safety net
    DeployPolicy {
        rule_id: String,
        rule_content: String,
        /// Must be set for the deployment to actually apply
        #[arg(long)]
        approved: bool,
        /// Disable the auto-rollback watchdog
        #[arg(long)]
        no_heartbeat: bool,
        /// Override the default rollback deadline, in seconds
        #[arg(long)]
        heartbeat_timeout: Option<u64>,
    },

    /// Confirm a deployment, cancelling its auto-rollback watchdog
    ConfirmRuleDeployment { rule_id: String },

    /// Roll back a rule to its most recent backup
    RollbackRule { rule_id: String },
}

impl From<Command> for LibCommand {
    fn from(val: Command) -> Self {
        match val {
            Command::NetworkContext {} => LibCommand::GetNetworkContext,
            Command::ValidateSyntax { rule_text, platform } => {
                LibCommand::ValidateSyntax { rule_text, platform }
            }
            Command::DetectConflicts {
                proposed_rule,
                active_ruleset,
            } => LibCommand::DetectConflicts {
                proposed_rule,
                active_ruleset,
            },
            Command::DeployPolicy {
                rule_id,
                rule_content,
                approved,
                no_heartbeat,
                heartbeat_timeout,
            } => LibCommand::DeployPolicy {
                rule_id,
                rule_content,
                approved,
                enable_heartbeat: !no_heartbeat,
                heartbeat_timeout,
            },
            Command::ConfirmRuleDeployment { rule_id } => {
                LibCommand::ConfirmRuleDeployment { rule_id }
            }
            Command::RollbackRule { rule_id } => LibCommand::RollbackRule { rule_id },
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}
