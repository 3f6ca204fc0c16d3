use std::net::Ipv4Addr;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("invalid trusted subnet: {0}")]
pub struct InvalidSubnet(String);

/// IPv4 CIDR allow-list guarding the usage-statistics surface.
///
/// Transport adapters check the caller-reported address (`X-Real-IP`)
/// against it before the stats operation is invoked at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrustedSubnet {
    network: u32,
    mask: u32,
}

impl TrustedSubnet {
    /// Parses CIDR notation, e.g. `192.168.0.0/24`.
    pub fn parse(cidr: &str) -> Result<Self, InvalidSubnet> {
        let (addr, prefix) = cidr
            .split_once('/')
            .ok_or_else(|| InvalidSubnet(format!("missing prefix length: '{cidr}'")))?;
        let addr: Ipv4Addr = addr
            .parse()
            .map_err(|_| InvalidSubnet(format!("bad address: '{cidr}'")))?;
        let prefix: u32 = prefix
            .parse()
            .map_err(|_| InvalidSubnet(format!("bad prefix length: '{cidr}'")))?;
        if prefix > 32 {
            return Err(InvalidSubnet(format!("prefix length above 32: '{cidr}'")));
        }
        let mask = if prefix == 0 { 0 } else { u32::MAX << (32 - prefix) };
        Ok(Self {
            network: u32::from(addr) & mask,
            mask,
        })
    }

    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        u32::from(ip) & self.mask == self.network
    }

    /// Parses and checks a caller-reported address. Anything that is not a
    /// valid IPv4 address is outside the subnet.
    pub fn contains_str(&self, ip: &str) -> bool {
        ip.parse::<Ipv4Addr>().is_ok_and(|ip| self.contains(ip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_addresses() {
        let subnet = TrustedSubnet::parse("192.168.0.0/24").unwrap();
        assert!(subnet.contains_str("192.168.0.1"));
        assert!(subnet.contains_str("192.168.0.254"));
        assert!(!subnet.contains_str("192.168.1.1"));
        assert!(!subnet.contains_str("10.0.0.1"));
    }

    #[test]
    fn host_address_in_cidr_is_masked() {
        // Same network whether the host bits are set or not.
        let a = TrustedSubnet::parse("192.168.0.1/24").unwrap();
        let b = TrustedSubnet::parse("192.168.0.0/24").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn zero_prefix_matches_everything() {
        let subnet = TrustedSubnet::parse("0.0.0.0/0").unwrap();
        assert!(subnet.contains_str("8.8.8.8"));
    }

    #[test]
    fn full_prefix_matches_one_host() {
        let subnet = TrustedSubnet::parse("10.1.2.3/32").unwrap();
        assert!(subnet.contains_str("10.1.2.3"));
        assert!(!subnet.contains_str("10.1.2.4"));
    }

    #[test]
    fn rejects_malformed_cidr() {
        assert!(TrustedSubnet::parse("192.168.0.0").is_err());
        assert!(TrustedSubnet::parse("192.168.0.0/33").is_err());
        assert!(TrustedSubnet::parse("not-a-net/24").is_err());
        assert!(TrustedSubnet::parse("").is_err());
    }

    #[test]
    fn garbage_ip_is_not_contained() {
        let subnet = TrustedSubnet::parse("192.168.0.0/16").unwrap();
        assert!(!subnet.contains_str(""));
        assert!(!subnet.contains_str("nope"));
    }
}
