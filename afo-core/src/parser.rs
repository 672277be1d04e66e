//! Textual `nft` rule line → [`ParsedRule`].
//!
//! Deliberately permissive: a rule line this parser cannot fully decompose
//! still yields a `ParsedRule` with the fields it did recognize set and the
//! rest left as wildcards. Downstream conflict detection treats wildcards as
//! "matches anything", which is the fail-safe direction — an unparsed field
//! can only make the classifier over-report overlap, never under-report it.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{ParsedRule, RuleAction};

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"add rule\s+(\w+)\s+(\w+)\s+(\w+)\s+(.+)").expect("static regex")
});
static PROTOCOL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(tcp|udp|icmp|icmpv6)\b").expect("static regex"));
static SADDR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:ip6?\s+)?saddr\s+(\S+)").expect("static regex"));
static DADDR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:ip6?\s+)?daddr\s+(\S+)").expect("static regex"));
static SPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"sport\s+(\S+)").expect("static regex"));
static DPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"dport\s+(\S+)").expect("static regex"));
static IIFNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"iifname\s+["']?(\S+?)["']?(?:\s|$)"#).expect("static regex"));
static OIFNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"oifname\s+["']?(\S+?)["']?(?:\s|$)"#).expect("static regex"));
static ACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(accept|drop|reject|return|jump|goto|log|counter)\b").expect("static regex")
});

fn capture(re: &Regex, line: &str) -> Option<String> {
    re.captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Parse one `nft` rule line of the form `add rule <family> <table> <chain> <body>`.
///
/// Lines that do not even match the `add rule ...` header still produce a
/// `ParsedRule` carrying only `raw` and whatever body-level fields matched,
/// rather than failing outright — the parser favors surfacing a partial
/// match over rejecting the line.
pub fn parse_rule(line: &str) -> ParsedRule {
    let line = line.trim();
    let mut rule = ParsedRule {
        raw: line.to_string(),
        ..Default::default()
    };

    let body = if let Some(caps) = HEADER_RE.captures(line) {
        rule.family = Some(caps[1].to_string());
        rule.table = Some(caps[2].to_string());
        rule.chain = Some(caps[3].to_string());
        caps[4].to_string()
    } else {
        line.to_string()
    };

    rule.protocol = capture(&PROTOCOL_RE, &body).map(|p| p.to_ascii_lowercase());
    rule.source_address = capture(&SADDR_RE, &body);
    rule.destination_address = capture(&DADDR_RE, &body);
    rule.source_port = capture(&SPORT_RE, &body);
    rule.destination_port = capture(&DPORT_RE, &body);
    rule.interface_in = capture(&IIFNAME_RE, &body);
    rule.interface_out = capture(&OIFNAME_RE, &body);
    rule.action = capture(&ACTION_RE, &body).and_then(|a| RuleAction::parse(&a));

    rule
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_header_and_body() {
        let rule = parse_rule("add rule inet filter input tcp dport 22 accept");
        assert_eq!(rule.family.as_deref(), Some("inet"));
        assert_eq!(rule.table.as_deref(), Some("filter"));
        assert_eq!(rule.chain.as_deref(), Some("input"));
        assert_eq!(rule.protocol.as_deref(), Some("tcp"));
        assert_eq!(rule.destination_port.as_deref(), Some("22"));
        assert_eq!(rule.action, Some(RuleAction::Accept));
    }

    #[test]
    fn parses_addresses_and_interfaces() {
        let rule = parse_rule(
            "add rule inet filter input iifname \"eth0\" ip saddr 10.0.0.0/8 udp dport 53 drop",
        );
        assert_eq!(rule.interface_in.as_deref(), Some("eth0"));
        assert_eq!(rule.source_address.as_deref(), Some("10.0.0.0/8"));
        assert_eq!(rule.destination_port.as_deref(), Some("53"));
        assert_eq!(rule.action, Some(RuleAction::Drop));
    }

    #[test]
    fn tolerates_a_line_without_the_add_rule_header() {
        let rule = parse_rule("tcp dport 443 accept");
        assert!(rule.family.is_none());
        assert_eq!(rule.protocol.as_deref(), Some("tcp"));
        assert_eq!(rule.action, Some(RuleAction::Accept));
    }

    #[test]
    fn protocol_and_action_are_matched_case_insensitively() {
        let rule = parse_rule("add rule inet filter input TCP dport 22 ACCEPT");
        assert_eq!(rule.protocol.as_deref(), Some("tcp"));
        assert_eq!(rule.action, Some(RuleAction::Accept));
    }

    #[test]
    fn unrecognized_line_yields_all_wildcards() {
        let rule = parse_rule("table inet filter");
        assert_eq!(rule.protocol, None);
        assert_eq!(rule.action, None);
        assert_eq!(rule.specificity(), 0);
    }
}
