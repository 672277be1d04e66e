//! Match algebra: do two match criteria overlap?
//!
//! The network side is done over the `cidr` crate instead of hand-rolled bit
//! masking.

use cidr::IpCidr;

/// `None` means "wildcard" and overlaps everything, matching the parser's
/// convention that an absent field matches anything.
pub fn networks_overlap(a: Option<&str>, b: Option<&str>) -> bool {
    let (Some(a), Some(b)) = (a, b) else {
        return true;
    };
    if a == b {
        return true;
    }
    let (Some(a), Some(b)) = (parse_cidr(a), parse_cidr(b)) else {
        // Unparsable text (a bare hostname, an nft set reference, ...): fail
        // safe and assume overlap rather than silently ignoring the match.
        return true;
    };
    cidrs_overlap(&a, &b)
}

fn parse_cidr(s: &str) -> Option<IpCidr> {
    if s.contains('/') {
        s.parse().ok()
    } else {
        // A bare address is a /32 or /128 host route.
        match s.parse::<std::net::IpAddr>().ok()? {
            std::net::IpAddr::V4(v4) => cidr::Ipv4Cidr::new(v4, 32).ok().map(IpCidr::V4),
            std::net::IpAddr::V6(v6) => cidr::Ipv6Cidr::new(v6, 128).ok().map(IpCidr::V6),
        }
    }
}

fn cidrs_overlap(a: &IpCidr, b: &IpCidr) -> bool {
    match (a, b) {
        (IpCidr::V4(a), IpCidr::V4(b)) => a.contains(&b.first_address()) || b.contains(&a.first_address()),
        (IpCidr::V6(a), IpCidr::V6(b)) => a.contains(&b.first_address()) || b.contains(&a.first_address()),
        _ => false,
    }
}

/// Parses `"22"` or `"1024-2048"` into an inclusive `(low, high)` range.
fn parse_port_range(s: &str) -> Option<(u32, u32)> {
    if let Some((lo, hi)) = s.split_once('-') {
        Some((lo.trim().parse().ok()?, hi.trim().parse().ok()?))
    } else {
        let p: u32 = s.trim().parse().ok()?;
        Some((p, p))
    }
}

/// Materializes `"22"`, `"1024-2048"`, or a comma list of either (`"22,80,443"`,
/// `"22,1000-2000"`) into the set of ports it denotes. Returns `None` if any
/// comma-separated member fails to parse.
fn materialize_ports(s: &str) -> Option<std::collections::HashSet<u32>> {
    let mut ports = std::collections::HashSet::new();
    for member in s.split(',') {
        let (lo, hi) = parse_port_range(member.trim())?;
        ports.extend(lo..=hi);
    }
    Some(ports)
}

/// `None` means "wildcard" and overlaps everything.
pub fn ports_overlap(a: Option<&str>, b: Option<&str>) -> bool {
    let (Some(a), Some(b)) = (a, b) else {
        return true;
    };
    let (Some(a_ports), Some(b_ports)) = (materialize_ports(a), materialize_ports(b)) else {
        return true;
    };
    !a_ports.is_disjoint(&b_ports)
}
