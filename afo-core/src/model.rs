//! Data-model types shared across every operation.
//!
//! These are plain data holders: `serde`-derived, no subprocess or file I/O,
//! mirroring how `gnosis_vpn-lib::command` keeps its `Command`/`Response`
//! payload types free of behavior.

use serde::{Deserialize, Serialize};

/// One host network interface, as reported by the network collector.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkInterface {
    pub name: String,
    pub mac_address: Option<String>,
    #[serde(default)]
    pub ipv4_addresses: Vec<String>,
    #[serde(default)]
    pub ipv6_addresses: Vec<String>,
    pub state: LinkState,
    pub mtu: u32,
    pub vlan_id: Option<u16>,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum LinkState {
    Up,
    Down,
    #[default]
    Unknown,
}

/// Full network snapshot quoted back to callers.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkContext {
    pub interfaces: Vec<NetworkInterface>,
    pub active_ruleset: String,
    pub hostname: String,
    /// Unix seconds at capture time.
    pub captured_at: i64,
}

/// Terminal action keyword recognized by the parser and renderer.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Accept,
    Drop,
    Reject,
    Return,
    Jump,
    Goto,
    Log,
    Counter,
}

impl RuleAction {
    pub fn as_str(self) -> &'static str {
        match self {
            RuleAction::Accept => "accept",
            RuleAction::Drop => "drop",
            RuleAction::Reject => "reject",
            RuleAction::Return => "return",
            RuleAction::Jump => "jump",
            RuleAction::Goto => "goto",
            RuleAction::Log => "log",
            RuleAction::Counter => "counter",
        }
    }

    pub fn parse(s: &str) -> Option<RuleAction> {
        match s.to_ascii_lowercase().as_str() {
            "accept" => Some(RuleAction::Accept),
            "drop" => Some(RuleAction::Drop),
            "reject" => Some(RuleAction::Reject),
            "return" => Some(RuleAction::Return),
            "jump" => Some(RuleAction::Jump),
            "goto" => Some(RuleAction::Goto),
            "log" => Some(RuleAction::Log),
            "counter" => Some(RuleAction::Counter),
            _ => None,
        }
    }
}

/// A structured view of one textual `nft` rule line.
///
/// A `None` field denotes "matches anything" — the wildcard.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParsedRule {
    pub family: Option<String>,
    pub table: Option<String>,
    pub chain: Option<String>,
    pub protocol: Option<String>,
    pub source_address: Option<String>,
    pub destination_address: Option<String>,
    pub source_port: Option<String>,
    pub destination_port: Option<String>,
    pub interface_in: Option<String>,
    pub interface_out: Option<String>,
    pub action: Option<RuleAction>,
    pub raw: String,
}

impl ParsedRule {
    /// Count of non-wildcard match criteria, used by the Shadow check.
    pub fn specificity(&self) -> u8 {
        [
            self.protocol.is_some(),
            self.source_address.is_some(),
            self.destination_address.is_some(),
            self.source_port.is_some(),
            self.destination_port.is_some(),
            self.interface_in.is_some(),
            self.interface_out.is_some(),
        ]
        .into_iter()
        .filter(|b| *b)
        .count() as u8
    }
}

/// A structured rule a caller can build field-by-field instead of hand
/// assembling `nft` syntax by hand.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FirewallRule {
    pub id: Option<String>,
    #[serde(default = "default_table")]
    pub table: String,
    pub chain: String,
    #[serde(default = "default_family")]
    pub family: String,
    pub protocol: Option<String>,
    pub source_address: Option<String>,
    pub destination_address: Option<String>,
    pub source_port: Option<String>,
    pub destination_port: Option<String>,
    pub interface_in: Option<String>,
    pub interface_out: Option<String>,
    pub action: RuleAction,
    pub jump_target: Option<String>,
    pub comment: Option<String>,
    #[serde(default)]
    pub priority: i64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// A named, versioned collection of [`FirewallRule`]s, for callers that want
/// to group related rules rather than deploy them one `rule_id` at a time.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleSet {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub rules: Vec<FirewallRule>,
    /// Unix seconds at creation time.
    pub created_at: i64,
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    1
}

impl RuleSet {
    /// Renders every member rule to its `nft` line, in order.
    pub fn to_nft_commands(&self) -> Vec<String> {
        self.rules.iter().map(FirewallRule::to_nft_command).collect()
    }
}

fn default_table() -> String {
    "filter".to_string()
}

fn default_family() -> String {
    "inet".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ConflictType {
    Shadow,
    Redundant,
    Contradiction,
    Overlap,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conflict {
    #[serde(rename = "type")]
    pub kind: ConflictType,
    pub existing_rule: String,
    pub explanation: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConflictReport {
    pub has_conflicts: bool,
    pub proposed_rule: String,
    #[serde(default)]
    pub conflicts: Vec<Conflict>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    pub command: String,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub line_numbers: Vec<u32>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    Pending,
    Approved,
    Deployed,
    Failed,
    RolledBack,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentResult {
    pub success: bool,
    pub status: DeploymentStatus,
    pub rule_id: String,
    pub backup_path: Option<String>,
    pub error: Option<String>,
    pub timestamp: i64,
    #[serde(default)]
    pub heartbeat_active: bool,
}

impl DeploymentResult {
    pub fn failed(rule_id: impl Into<String>, error: impl Into<String>, now: i64) -> Self {
        Self {
            success: false,
            status: DeploymentStatus::Failed,
            rule_id: rule_id.into(),
            backup_path: None,
            error: Some(error.into()),
            timestamp: now,
            heartbeat_active: false,
        }
    }

    pub fn pending(rule_id: impl Into<String>, error: impl Into<String>, now: i64) -> Self {
        Self {
            success: false,
            status: DeploymentStatus::Pending,
            rule_id: rule_id.into(),
            backup_path: None,
            error: Some(error.into()),
            timestamp: now,
            heartbeat_active: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ruleset_renders_every_member_rule_in_order() {
        let set = RuleSet {
            name: "baseline".to_string(),
            description: "default inbound policy".to_string(),
            rules: vec![
                FirewallRule {
                    id: Some("r1".into()),
                    table: "filter".into(),
                    chain: "input".into(),
                    family: "inet".into(),
                    protocol: Some("tcp".into()),
                    source_address: None,
                    destination_address: None,
                    source_port: None,
                    destination_port: Some("22".into()),
                    interface_in: None,
                    interface_out: None,
                    action: RuleAction::Accept,
                    jump_target: None,
                    comment: None,
                    priority: 0,
                    enabled: true,
                },
                FirewallRule {
                    id: Some("r2".into()),
                    table: "filter".into(),
                    chain: "input".into(),
                    family: "inet".into(),
                    protocol: None,
                    source_address: None,
                    destination_address: None,
                    source_port: None,
                    destination_port: None,
                    interface_in: None,
                    interface_out: None,
                    action: RuleAction::Drop,
                    jump_target: None,
                    comment: None,
                    priority: 0,
                    enabled: true,
                },
            ],
            created_at: 0,
            version: 1,
        };

        let commands = set.to_nft_commands();
        assert_eq!(commands.len(), 2);
        assert!(commands[0].contains("dport 22 accept"));
        assert!(commands[1].ends_with("drop"));
    }
}
