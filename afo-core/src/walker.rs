//! Walks `nft list ruleset` text into the rule lines it contains, tracking
//! each rule's enclosing `table`/`chain`/`family` context.
//!
//! Pulled out as a standalone walk so conflict classification can stay free
//! of ruleset-text parsing concerns.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::ParsedRule;
use crate::parser::parse_rule;

static TABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^table\s+(\w+)\s+(\w+)\s*\{?").expect("static regex"));
static CHAIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^chain\s+(\w+)\s*\{?").expect("static regex"));

/// One rule line found inside a chain block, with its context filled in.
pub fn walk_ruleset(active_ruleset: &str) -> Vec<ParsedRule> {
    let mut rules = Vec::new();
    let mut in_chain = false;
    let mut current_family = String::new();
    let mut current_table = String::new();
    let mut current_chain = String::new();

    for raw_line in active_ruleset.lines() {
        let line = raw_line.trim();

        if let Some(caps) = TABLE_RE.captures(line) {
            current_family = caps[1].to_string();
            current_table = caps[2].to_string();
            continue;
        }

        if let Some(caps) = CHAIN_RE.captures(line) {
            current_chain = caps[1].to_string();
            in_chain = true;
            continue;
        }

        if line == "}" {
            in_chain = false;
            continue;
        }

        if in_chain && !line.is_empty() && !line.starts_with("type ") && !line.starts_with("policy ")
        {
            let mut parsed = parse_rule(line);
            parsed.family = Some(current_family.clone());
            parsed.table = Some(current_table.clone());
            parsed.chain = Some(current_chain.clone());
            rules.push(parsed);
        }
    }

    rules
}
