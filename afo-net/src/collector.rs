//! Gathers the current network state the way
//! `original_source/afo_mcp/tools/network.py` does: `ip -o addr show` and
//! `ip -o link show` for interfaces, `/proc/net/dev` for counters, `nft list
//! ruleset` for the active policy, `hostname` for the host name. Every
//! subprocess is invoked with an explicit argv (no shell), matching the
//! no-shell discipline `gnosis_vpn-root`'s `ShellOps` implementors use.

use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tokio::process::Command;
use tokio::time::timeout;

use afo_core::model::{LinkState, NetworkContext, NetworkInterface};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error running `{0}`: {1}")]
    Io(&'static str, std::io::Error),
    #[error("`{0}` timed out")]
    Timeout(&'static str),
}

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+:\s+(\S+):\s+<([^>]*)>.*mtu\s+(\d+)").expect("static regex"));
static MAC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"link/\S+\s+([\da-f:]+)").expect("static regex"));
static VLAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@.*\.(\d+)").expect("static regex"));

#[derive(Default, Clone)]
struct LinkInfo {
    state: LinkState,
    mtu: u32,
    mac_address: Option<String>,
    vlan_id: Option<u16>,
}

#[derive(Default, Clone)]
struct AddrInfo {
    ipv4: Vec<String>,
    ipv6: Vec<String>,
}

async fn run_capture(label: &'static str, program: &str, args: &[&str], secs: u64) -> Option<String> {
    let fut = Command::new(program).args(args).output();
    match timeout(Duration::from_secs(secs), fut).await {
        Ok(Ok(output)) if output.status.success() => {
            Some(String::from_utf8_lossy(&output.stdout).to_string())
        }
        Ok(Ok(_)) => None,
        Ok(Err(err)) => {
            tracing::warn!(cmd = label, %err, "command failed to spawn");
            None
        }
        Err(_) => {
            tracing::warn!(cmd = label, "command timed out");
            None
        }
    }
}

fn parse_link_info(link_output: &str) -> HashMap<String, LinkInfo> {
    let mut info = HashMap::new();
    for line in link_output.lines() {
        let Some(caps) = LINK_RE.captures(line) else {
            continue;
        };
        let raw_name = caps[1].trim_end_matches('@');
        let flags = &caps[2];
        let mtu: u32 = caps[3].parse().unwrap_or(1500);
        let mac_address = MAC_RE.captures(line).map(|c| c[1].to_string());
        let vlan_id = VLAN_RE
            .captures(raw_name)
            .and_then(|c| c[1].parse::<u16>().ok());
        let state = if flags.split(',').any(|f| f == "UP") {
            LinkState::Up
        } else {
            LinkState::Down
        };
        let name = raw_name.split('@').next().unwrap_or(raw_name).to_string();
        info.insert(
            name,
            LinkInfo {
                state,
                mtu,
                mac_address,
                vlan_id,
            },
        );
    }
    info
}

fn parse_addr_info(addr_output: &str) -> HashMap<String, AddrInfo> {
    let mut info: HashMap<String, AddrInfo> = HashMap::new();
    for line in addr_output.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            continue;
        }
        let name = parts[1]
            .trim_end_matches('@')
            .split('@')
            .next()
            .unwrap_or(parts[1])
            .to_string();
        let addr_type = parts[2];
        let addr = parts[3].split('/').next().unwrap_or(parts[3]).to_string();
        let entry = info.entry(name).or_default();
        match addr_type {
            "inet" => entry.ipv4.push(addr),
            "inet6" => entry.ipv6.push(addr),
            _ => {}
        }
    }
    info
}

fn parse_proc_net_dev(content: &str) -> HashMap<String, (u64, u64)> {
    let mut stats = HashMap::new();
    for line in content.lines().skip(2) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 10 {
            continue;
        }
        let iface = parts[0].trim_end_matches(':').to_string();
        let rx_bytes = parts[1].parse().unwrap_or(0);
        let tx_bytes = parts[9].parse().unwrap_or(0);
        stats.insert(iface, (rx_bytes, tx_bytes));
    }
    stats
}

async fn list_interfaces() -> Vec<NetworkInterface> {
    let Some(addr_output) = run_capture("ip -o addr show", "ip", &["-o", "addr", "show"], 10).await
    else {
        return Vec::new();
    };
    let link_output = run_capture("ip -o link show", "ip", &["-o", "link", "show"], 10)
        .await
        .unwrap_or_default();

    let link_info = parse_link_info(&link_output);
    let addr_info = parse_addr_info(&addr_output);
    let stats = tokio::fs::read_to_string("/proc/net/dev")
        .await
        .map(|c| parse_proc_net_dev(&c))
        .unwrap_or_default();

    let mut names: Vec<&String> = link_info.keys().chain(addr_info.keys()).collect();
    names.sort();
    names.dedup();

    names
        .into_iter()
        .map(|name| {
            let link = link_info.get(name).cloned().unwrap_or_default();
            let addrs = addr_info.get(name).cloned().unwrap_or_default();
            let (rx_bytes, tx_bytes) = stats.get(name).copied().unwrap_or((0, 0));
            NetworkInterface {
                name: name.clone(),
                mac_address: link.mac_address,
                ipv4_addresses: addrs.ipv4,
                ipv6_addresses: addrs.ipv6,
                state: link.state,
                mtu: if link.mtu == 0 { 1500 } else { link.mtu },
                vlan_id: link.vlan_id,
                rx_bytes,
                tx_bytes,
            }
        })
        .collect()
}

async fn active_ruleset() -> String {
    match run_capture("nft list ruleset", "nft", &["list", "ruleset"], 10).await {
        Some(text) => text,
        None => "# unable to read active ruleset".to_string(),
    }
}

async fn hostname() -> String {
    run_capture("hostname", "hostname", &[], 5)
        .await
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Builds the full [`NetworkContext`] snapshot used to answer
/// `get_network_context` and to seed conflict detection with a live ruleset.
pub async fn collect_network_context() -> NetworkContext {
    let (interfaces, active_ruleset, hostname) =
        tokio::join!(list_interfaces(), active_ruleset(), hostname());

    let captured_at = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    NetworkContext {
        interfaces,
        active_ruleset,
        hostname,
        captured_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_link_flags_mac_and_mtu() {
        let link_output = "1: lo: <LOOPBACK,UP,LOWER_UP> mtu 65536 qdisc noqueue state UNKNOWN mode DEFAULT group default qlen 1000\\    link/loopback 00:00:00:00:00:00 brd 00:00:00:00:00:00";
        let info = parse_link_info(link_output);
        let lo = info.get("lo").expect("lo present");
        assert_eq!(lo.state, LinkState::Up);
        assert_eq!(lo.mtu, 65536);
    }

    #[test]
    fn parses_addr_lines_by_family() {
        let addr_output = "1: lo    inet 127.0.0.1/8 scope host lo\n1: lo    inet6 ::1/128 scope host";
        let info = parse_addr_info(addr_output);
        let lo = info.get("lo").expect("lo present");
        assert_eq!(lo.ipv4, vec!["127.0.0.1".to_string()]);
        assert_eq!(lo.ipv6, vec!["::1".to_string()]);
    }

    #[test]
    fn parses_proc_net_dev_skipping_header() {
        let content = "Inter-|   Receive                                                |  Transmit\n face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed\n  lo: 1234      10    0    0    0     0          0         0    5678      10    0    0    0     0       0          0\n";
        let stats = parse_proc_net_dev(content);
        assert_eq!(stats.get("lo"), Some(&(1234, 5678)));
    }
}
