// ── Subnet enumeration ──
//
// Expands a CIDR into the host addresses a scan should probe, and derives
// the local subnet from the host's own address.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use ipnet::Ipv4Net;
use tracing::{debug, warn};

use crate::error::CoreError;

/// Remote used only to select the outbound interface. Nothing is sent.
const ROUTE_PROBE: (Ipv4Addr, u16) = (Ipv4Addr::new(8, 8, 8, 8), 80);

/// Usable host addresses of an IPv4 CIDR, in ascending order.
///
/// Network and broadcast addresses are excluded. A `/31` yields both of its
/// addresses and a `/32` yields its single address. Host bits set in the
/// input are ignored (`10.0.0.7/30` enumerates `10.0.0.4/30`).
pub fn enumerate(cidr: &str) -> Result<Vec<Ipv4Addr>, CoreError> {
    let net = parse(cidr)?;
    Ok(net.hosts().collect())
}

/// Parse and normalise an IPv4 CIDR. A bare address is treated as `/32`.
pub fn parse(cidr: &str) -> Result<Ipv4Net, CoreError> {
    let trimmed = cidr.trim();
    let invalid = |reason: String| CoreError::InvalidSubnet {
        subnet: cidr.to_owned(),
        reason,
    };

    if trimmed.is_empty() {
        return Err(invalid("empty subnet".into()));
    }

    let net = if trimmed.contains('/') {
        trimmed
            .parse::<Ipv4Net>()
            .map_err(|e| invalid(e.to_string()))?
    } else {
        let addr = trimmed
            .parse::<Ipv4Addr>()
            .map_err(|e| invalid(e.to_string()))?;
        Ipv4Net::from(addr)
    };

    Ok(net.trunc())
}

/// The network containing `host` at `prefix_len`, as a CIDR string.
pub fn local_subnet(host: Ipv4Addr, prefix_len: u8) -> Result<String, CoreError> {
    let net = Ipv4Net::new(host, prefix_len).map_err(|e| CoreError::InvalidSubnet {
        subnet: format!("{host}/{prefix_len}"),
        reason: e.to_string(),
    })?;
    Ok(net.trunc().to_string())
}

/// Address of the interface the host would use to reach the outside world,
/// or loopback when there is no route.
pub fn detect_host_address() -> Ipv4Addr {
    match outbound_address() {
        Ok(IpAddr::V4(addr)) => {
            debug!(%addr, "detected local host address");
            addr
        }
        Ok(IpAddr::V6(addr)) => {
            warn!(%addr, "outbound interface is IPv6-only, falling back to loopback");
            Ipv4Addr::LOCALHOST
        }
        Err(e) => {
            warn!(error = %e, "could not detect local host address, falling back to loopback");
            Ipv4Addr::LOCALHOST
        }
    }
}

fn outbound_address() -> std::io::Result<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.connect(ROUTE_PROBE)?;
    Ok(socket.local_addr()?.ip())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn slash_30_has_two_hosts() {
        assert_eq!(
            enumerate("10.0.0.0/30").unwrap(),
            vec![Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2)]
        );
    }

    #[test]
    fn host_bits_are_ignored() {
        assert_eq!(enumerate("10.0.0.7/30").unwrap(), enumerate("10.0.0.4/30").unwrap());
    }

    #[test]
    fn degenerate_prefixes() {
        assert_eq!(
            enumerate("192.168.1.5/32").unwrap(),
            vec![Ipv4Addr::new(192, 168, 1, 5)]
        );
        assert_eq!(enumerate("192.168.1.4/31").unwrap().len(), 2);
        assert_eq!(
            enumerate("192.168.1.5").unwrap(),
            vec![Ipv4Addr::new(192, 168, 1, 5)]
        );
    }

    #[test]
    fn slash_23_size() {
        let hosts = enumerate("172.16.6.0/23").unwrap();
        assert_eq!(hosts.len(), 510);
        assert_eq!(hosts.first(), Some(&Ipv4Addr::new(172, 16, 6, 1)));
        assert_eq!(hosts.last(), Some(&Ipv4Addr::new(172, 16, 7, 254)));
    }

    #[test]
    fn malformed_subnets_are_rejected() {
        for bad in ["", "10.0.0.0/33", "10.0.0/24", "fe80::/64", "not-a-subnet"] {
            let err = enumerate(bad).unwrap_err();
            assert!(
                matches!(err, CoreError::InvalidSubnet { .. }),
                "{bad:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn local_subnet_truncates_host() {
        assert_eq!(
            local_subnet(Ipv4Addr::new(172, 16, 7, 42), 23).unwrap(),
            "172.16.6.0/23"
        );
        assert!(local_subnet(Ipv4Addr::new(172, 16, 7, 42), 40).is_err());
    }
}
