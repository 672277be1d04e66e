//! Rendering a structured [`FirewallRule`] down to `nft` rule text.
//!
//! Protocol goes out via `meta l4proto`, addresses are prefixed by family,
//! and ports are only emitted when the protocol is `tcp`/`udp`.

use crate::model::{FirewallRule, RuleAction};

impl FirewallRule {
    pub fn to_nft_command(&self) -> String {
        let mut parts = vec![format!(
            "add rule {} {} {}",
            self.family, self.table, self.chain
        )];

        if let Some(iif) = &self.interface_in {
            parts.push(format!("iifname \"{iif}\""));
        }
        if let Some(oif) = &self.interface_out {
            parts.push(format!("oifname \"{oif}\""));
        }

        if let Some(proto) = &self.protocol {
            if proto != "any" {
                parts.push(format!("meta l4proto {proto}"));
            }
        }

        if let Some(saddr) = &self.source_address {
            let prefix = if saddr.contains(':') { "ip6" } else { "ip" };
            parts.push(format!("{prefix} saddr {saddr}"));
        }
        if let Some(daddr) = &self.destination_address {
            let prefix = if daddr.contains(':') { "ip6" } else { "ip" };
            parts.push(format!("{prefix} daddr {daddr}"));
        }

        let is_port_protocol = matches!(self.protocol.as_deref(), Some("tcp") | Some("udp"));
        if is_port_protocol {
            let proto = self.protocol.as_deref().unwrap();
            if let Some(sport) = &self.source_port {
                parts.push(format!("{proto} sport {sport}"));
            }
            if let Some(dport) = &self.destination_port {
                parts.push(format!("{proto} dport {dport}"));
            }
        }

        if let Some(comment) = &self.comment {
            parts.push(format!("comment \"{comment}\""));
        }

        match (self.action, &self.jump_target) {
            (RuleAction::Jump, Some(target)) => parts.push(format!("jump {target}")),
            (RuleAction::Goto, Some(target)) => parts.push(format!("goto {target}")),
            _ => parts.push(self.action.as_str().to_string()),
        }

        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_rule() -> FirewallRule {
        FirewallRule {
            id: Some("r1".into()),
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
            action: RuleAction::Accept,
            jump_target: None,
            comment: None,
            priority: 0,
            enabled: true,
        }
    }

    #[test]
    fn renders_tcp_dport_rule() {
        let rule = FirewallRule {
            protocol: Some("tcp".into()),
            destination_port: Some("22".into()),
            ..base_rule()
        };
        assert_eq!(
            rule.to_nft_command(),
            "add rule inet filter input meta l4proto tcp tcp dport 22 accept"
        );
    }

    #[test]
    fn drops_port_qualifier_for_non_tcp_udp_protocol() {
        let rule = FirewallRule {
            protocol: Some("icmpv6".into()),
            destination_port: Some("22".into()),
            ..base_rule()
        };
        assert_eq!(
            rule.to_nft_command(),
            "add rule inet filter input meta l4proto icmpv6 accept"
        );
    }

    #[test]
    fn renders_ipv6_address_prefix() {
        let rule = FirewallRule {
            source_address: Some("fd00::1".into()),
            ..base_rule()
        };
        assert_eq!(
            rule.to_nft_command(),
            "add rule inet filter input ip6 saddr fd00::1 accept"
        );
    }

    #[test]
    fn renders_jump_with_target() {
        let rule = FirewallRule {
            action: RuleAction::Jump,
            jump_target: Some("rejectors".into()),
            ..base_rule()
        };
        assert_eq!(
            rule.to_nft_command(),
            "add rule inet filter input jump rejectors"
        );
    }

    #[test]
    fn rendered_rule_parses_back_to_the_same_non_wildcard_criteria() {
        let rule = FirewallRule {
            protocol: Some("tcp".into()),
            source_address: Some("10.0.0.0/8".into()),
            destination_port: Some("22".into()),
            interface_in: Some("eth0".into()),
            action: RuleAction::Drop,
            ..base_rule()
        };

        let parsed = crate::parser::parse_rule(&rule.to_nft_command());

        assert_eq!(parsed.family.as_deref(), Some("inet"));
        assert_eq!(parsed.table.as_deref(), Some("filter"));
        assert_eq!(parsed.chain.as_deref(), Some("input"));
        assert_eq!(parsed.protocol.as_deref(), Some("tcp"));
        assert_eq!(parsed.source_address.as_deref(), Some("10.0.0.0/8"));
        assert_eq!(parsed.destination_port.as_deref(), Some("22"));
        assert_eq!(parsed.interface_in.as_deref(), Some("eth0"));
        assert_eq!(parsed.action, Some(RuleAction::Drop));
    }
}
