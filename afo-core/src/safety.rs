//! Input-safety gate.
//!
//! These checks reject, they never sanitize: rewriting caller-supplied rule
//! text would silently change rule semantics, which is worse than refusing
//! outright. Every subprocess invocation and file-name construction
//! downstream depends on these having run first.

const DANGEROUS_CHARS: &[char] = &[';', '|', '&', '$', '`', '\\'];

/// True iff `s` contains a shell metacharacter capable of escaping an
/// argument boundary.
pub fn contains_dangerous_chars(s: &str) -> bool {
    s.chars().any(|c| DANGEROUS_CHARS.contains(&c))
}

/// Linux interface name: non-empty, at most 15 bytes (`IFNAMSIZ - 1`),
/// `[A-Za-z0-9_.-]` only.
pub fn is_valid_interface_name(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= 15
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-')
}

/// nftables table name: non-empty, at most 64 bytes, first char
/// `[A-Za-z_]`, remaining `[A-Za-z0-9_]`.
pub fn is_valid_table_name(s: &str) -> bool {
    if s.is_empty() || s.len() > 64 {
        return false;
    }
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Same rules as a table name.
pub fn is_valid_chain_name(s: &str) -> bool {
    is_valid_table_name(s)
}

/// A caller-chosen `rule_id` is folded directly into a backup file name
/// (`backup_<rule_id>_<timestamp>.nft`); this guards that construction the
/// same way the other validators guard subprocess argv construction. Beyond
/// the dangerous-character set, a rule id must not escape the backup
/// directory via a path separator or `..` segment.
pub fn is_safe_rule_id(s: &str) -> bool {
    !s.is_empty() && !contains_dangerous_chars(s) && !s.contains('/') && !s.contains("..") && !s.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_each_dangerous_char() {
        for c in [';', '|', '&', '$', '`', '\\'] {
            assert!(contains_dangerous_chars(&format!("accept {c} rm -rf /")));
        }
        assert!(!contains_dangerous_chars("tcp dport 22 accept"));
    }

    #[test]
    fn interface_name_rules() {
        assert!(is_valid_interface_name("eth0"));
        assert!(is_valid_interface_name("wg0.100"));
        assert!(!is_valid_interface_name(""));
        assert!(!is_valid_interface_name("this-name-is-too-long-for-ifnamsiz"));
        assert!(!is_valid_interface_name("eth0;rm"));
    }

    #[test]
    fn rule_id_rejects_path_traversal_and_dangerous_chars() {
        assert!(is_safe_rule_id("r1"));
        assert!(is_safe_rule_id("my-rule_42"));
        assert!(!is_safe_rule_id(""));
        assert!(!is_safe_rule_id("../../etc/passwd"));
        assert!(!is_safe_rule_id("a/b"));
        assert!(!is_safe_rule_id("r1; rm -rf /"));
    }

    #[test]
    fn table_and_chain_name_rules() {
        assert!(is_valid_table_name("filter"));
        assert!(is_valid_table_name("_private"));
        assert!(!is_valid_table_name("1leading_digit"));
        assert!(!is_valid_table_name(""));
        assert!(!is_valid_table_name(&"a".repeat(65)));
        assert_eq!(is_valid_chain_name("input"), is_valid_table_name("input"));
    }
}
