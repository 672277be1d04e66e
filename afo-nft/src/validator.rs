//! Syntax validation: a structural pre-check that never touches the system,
//! plus an `nft --check` dry run for anything that needs the real parser.

use std::sync::LazyLock;

use regex::Regex;

use afo_core::model::ValidationResult;
use afo_core::safety::contains_dangerous_chars;

use crate::ruleset::NftOps;

static LINE_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":(\d+):\d+-\d+:").expect("static regex"));

/// Lightweight check that never shells out: verifies the input is non-empty,
/// quotes balance per line, and flags obvious iptables-isms. Useful when the
/// caller has no root and `nft --check` would fail on permissions alone.
pub fn validate_rule_structure(command: &str) -> ValidationResult {
    let command = command.trim();
    let lines: Vec<&str> = command
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .collect();

    if lines.is_empty() {
        return ValidationResult {
            valid: false,
            command: command.to_string(),
            errors: vec!["Empty command".to_string()],
            warnings: Vec::new(),
            line_numbers: Vec::new(),
        };
    }

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let n = i + 1;
        if *line == "}" || *line == "};" {
            continue;
        }
        if line.matches('"').count() % 2 != 0 {
            errors.push(format!("Line {n}: Unbalanced quotes"));
        }
        if line.to_ascii_lowercase().contains("iptables") {
            warnings.push(format!("Line {n}: iptables syntax detected - this is nftables"));
        }
    }

    ValidationResult {
        valid: errors.is_empty(),
        command: command.to_string(),
        errors,
        warnings,
        line_numbers: Vec::new(),
    }
}

/// Full dry-run validation via `nft --check -f`. Rejects an unsupported
/// platform or dangerous characters up front, writes `command` to a temp
/// file, and classifies each `stderr` line as a warning or an error,
/// extracting the `<line>` from nft's `path:line:col-col:` diagnostic format
/// when present.
pub async fn validate_syntax(nft: &impl NftOps, command: &str, platform: &str) -> ValidationResult {
    if platform != "nftables" {
        return ValidationResult {
            valid: false,
            command: command.to_string(),
            errors: vec![format!(
                "Unsupported platform: {platform}. Only 'nftables' is supported."
            )],
            warnings: Vec::new(),
            line_numbers: Vec::new(),
        };
    }

    if contains_dangerous_chars(command) {
        return ValidationResult {
            valid: false,
            command: command.to_string(),
            errors: vec!["Command contains potentially dangerous characters".to_string()],
            warnings: Vec::new(),
            line_numbers: Vec::new(),
        };
    }

    let tmp = match tempfile::Builder::new().suffix(".nft").tempfile() {
        Ok(tmp) => tmp,
        Err(err) => {
            return ValidationResult {
                valid: false,
                command: command.to_string(),
                errors: vec![format!("failed to create temp file: {err}")],
                warnings: Vec::new(),
                line_numbers: Vec::new(),
            };
        }
    };
    if let Err(err) = tokio::fs::write(tmp.path(), command).await {
        return ValidationResult {
            valid: false,
            command: command.to_string(),
            errors: vec![format!("failed to write temp file: {err}")],
            warnings: Vec::new(),
            line_numbers: Vec::new(),
        };
    }

    let (success, stdout, stderr) = match nft.check_file(tmp.path()).await {
        Ok(result) => result,
        Err(err) => {
            return ValidationResult {
                valid: false,
                command: command.to_string(),
                errors: vec![err.to_string()],
                warnings: Vec::new(),
                line_numbers: Vec::new(),
            };
        }
    };

    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut line_numbers = Vec::new();

    if !success {
        for line in stderr.trim().lines() {
            if line.is_empty() {
                continue;
            }
            if let Some(caps) = LINE_NUMBER_RE.captures(line) {
                if let Ok(n) = caps[1].parse::<u32>() {
                    line_numbers.push(n);
                }
            }
            if line.to_ascii_lowercase().contains("warning") {
                warnings.push(line.to_string());
            } else {
                errors.push(line.to_string());
            }
        }
        if !stderr.trim().is_empty() && errors.is_empty() {
            errors.push(stderr.trim().to_string());
        }
    }

    for line in stdout.trim().lines() {
        if !line.is_empty() && line.to_ascii_lowercase().contains("warning") {
            warnings.push(line.to_string());
        }
    }

    ValidationResult {
        valid: success,
        command: command.to_string(),
        errors,
        warnings,
        line_numbers,
    }
}
