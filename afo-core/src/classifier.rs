//! Conflict classification.
//!
//! Classification order matters and is preserved exactly: contradiction,
//! then redundancy, then shadow, then the overlap fallback. An ambiguous
//! rule pair that matches none of the first three checks is always
//! reported, never silently dropped.

use crate::algebra::{networks_overlap, ports_overlap};
use crate::model::{Conflict, ConflictReport, ConflictType, ParsedRule, RuleAction};
use crate::parser::parse_rule;
use crate::walker::walk_ruleset;

/// `true` iff both fields are present and unequal. Absence on either side is
/// treated as compatible, matching the Python original's `if a and b and a !=
/// b`.
fn fields_conflict(a: &Option<String>, b: &Option<String>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a != b)
}

pub fn rules_overlap(proposed: &ParsedRule, existing: &ParsedRule) -> bool {
    if fields_conflict(&proposed.family, &existing.family) {
        return false;
    }
    if fields_conflict(&proposed.table, &existing.table) {
        return false;
    }
    if fields_conflict(&proposed.chain, &existing.chain) {
        return false;
    }
    if fields_conflict(&proposed.protocol, &existing.protocol) {
        return false;
    }
    if proposed.source_address.is_some() && existing.source_address.is_some() {
        if !networks_overlap(
            proposed.source_address.as_deref(),
            existing.source_address.as_deref(),
        ) {
            return false;
        }
    }
    if proposed.destination_address.is_some() && existing.destination_address.is_some() {
        if !networks_overlap(
            proposed.destination_address.as_deref(),
            existing.destination_address.as_deref(),
        ) {
            return false;
        }
    }
    if !ports_overlap(
        proposed.source_port.as_deref(),
        existing.source_port.as_deref(),
    ) {
        return false;
    }
    if !ports_overlap(
        proposed.destination_port.as_deref(),
        existing.destination_port.as_deref(),
    ) {
        return false;
    }
    if fields_conflict(&proposed.interface_in, &existing.interface_in) {
        return false;
    }
    if fields_conflict(&proposed.interface_out, &existing.interface_out) {
        return false;
    }

    true
}

fn detect_conflict_type(proposed: &ParsedRule, existing: &ParsedRule) -> Option<(ConflictType, String)> {
    if !rules_overlap(proposed, existing) {
        return None;
    }

    if let (Some(p_action), Some(e_action)) = (proposed.action, existing.action) {
        let p_accepts = p_action == RuleAction::Accept;
        let p_denies = matches!(p_action, RuleAction::Drop | RuleAction::Reject);
        let e_accepts = e_action == RuleAction::Accept;
        let e_denies = matches!(e_action, RuleAction::Drop | RuleAction::Reject);

        if (p_accepts && e_denies) || (p_denies && e_accepts) {
            return Some((
                ConflictType::Contradiction,
                format!(
                    "Opposite actions: proposed={}, existing={}",
                    p_action.as_str(),
                    e_action.as_str()
                ),
            ));
        }
    }

    if proposed.action == existing.action {
        return Some((
            ConflictType::Redundant,
            "Proposed rule duplicates existing rule functionality".to_string(),
        ));
    }

    if existing.specificity() < proposed.specificity() {
        return Some((
            ConflictType::Shadow,
            "Proposed rule may be shadowed by less specific existing rule".to_string(),
        ));
    }

    Some((
        ConflictType::Overlap,
        "Rules have overlapping match criteria".to_string(),
    ))
}

/// Compares `proposed_rule` against every rule line found in `active_ruleset`
/// and reports any conflicts, with human-readable recommendations grouped by
/// conflict kind.
pub fn detect_conflicts(proposed_rule: &str, active_ruleset: &str) -> ConflictReport {
    let trimmed = proposed_rule.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return ConflictReport {
            has_conflicts: false,
            proposed_rule: proposed_rule.to_string(),
            conflicts: Vec::new(),
            recommendations: vec!["Could not parse proposed rule".to_string()],
        };
    }
    let proposed = parse_rule(proposed_rule);

    let mut conflicts = Vec::new();
    for existing in walk_ruleset(active_ruleset) {
        if let Some((kind, explanation)) = detect_conflict_type(&proposed, &existing) {
            conflicts.push(Conflict {
                kind,
                existing_rule: existing.raw.clone(),
                explanation,
            });
        }
    }

    let mut recommendations = Vec::new();
    let kinds: std::collections::HashSet<ConflictType> =
        conflicts.iter().map(|c| c.kind).collect();
    if kinds.contains(&ConflictType::Contradiction) {
        recommendations
            .push("Review rule logic - contradicting rules may cause unexpected behavior".to_string());
    }
    if kinds.contains(&ConflictType::Shadow) {
        recommendations.push("Consider rule ordering or make the proposed rule more specific".to_string());
    }
    if kinds.contains(&ConflictType::Redundant) {
        recommendations.push("This rule may be unnecessary - consider removing if truly redundant".to_string());
    }
    if kinds.contains(&ConflictType::Overlap) {
        recommendations.push("Verify intended behavior for overlapping traffic".to_string());
    }

    ConflictReport {
        has_conflicts: !conflicts.is_empty(),
        proposed_rule: proposed_rule.to_string(),
        conflicts,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULESET: &str = r#"
table inet filter {
    chain input {
        type filter hook input priority 0; policy drop;
        ip saddr 10.0.0.0/8 drop
    }
}
"#;

    #[test]
    fn contradiction_beats_overlap() {
        let report = detect_conflicts(
            "add rule inet filter input ip saddr 10.0.0.5 accept",
            RULESET,
        );
        assert!(report.has_conflicts);
        assert_eq!(report.conflicts[0].kind, ConflictType::Contradiction);
    }

    #[test]
    fn disjoint_networks_produce_no_conflict() {
        let report = detect_conflicts(
            "add rule inet filter input ip saddr 192.168.0.0/16 accept",
            RULESET,
        );
        assert!(!report.has_conflicts);
    }

    #[test]
    fn redundant_rule_is_flagged() {
        let report = detect_conflicts(
            "add rule inet filter input ip saddr 10.0.0.0/8 drop",
            RULESET,
        );
        assert_eq!(report.conflicts[0].kind, ConflictType::Redundant);
    }

    #[test]
    fn different_table_never_conflicts() {
        let report = detect_conflicts(
            "add rule inet nat input ip saddr 10.0.0.5 accept",
            RULESET,
        );
        assert!(!report.has_conflicts);
    }

    #[test]
    fn different_family_never_conflicts() {
        let report = detect_conflicts(
            "add rule ip6 filter input ip saddr 10.0.0.5 accept",
            RULESET,
        );
        assert!(!report.has_conflicts);
    }

    #[test]
    fn blank_proposed_rule_is_reported_unparseable() {
        let report = detect_conflicts("   ", RULESET);
        assert!(!report.has_conflicts);
        assert_eq!(report.recommendations, vec!["Could not parse proposed rule".to_string()]);
    }

    #[test]
    fn shadow_when_existing_is_less_specific() {
        let ruleset = r#"
table inet filter {
    chain input {
        type filter hook input priority 0; policy drop;
        return
    }
}
"#;
        let report = detect_conflicts("add rule inet filter input tcp dport 22 accept", ruleset);
        assert_eq!(report.conflicts[0].kind, ConflictType::Shadow);
    }
}
