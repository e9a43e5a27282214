use std::net::Ipv4Addr;

use thiserror::Error;

/// Errors raised while turning a CIDR string into an [`Ipv4Range`].
///
/// Any of these is fatal to a scan run: nothing is dispatched until the
/// whole target range parsed cleanly.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("not a CIDR block (expected <address>/<prefix>): {0}")]
    MissingPrefix(String),
    #[error("invalid network address '{0}'")]
    InvalidAddress(String),
    #[error("invalid prefix length '{0}'")]
    InvalidPrefix(String),
    #[error("prefix length {0} out of range (0-32)")]
    PrefixOutOfRange(u8),
}

/// An inclusive, ascending range of IPv4 addresses.
///
/// For a CIDR block this spans the network address through the broadcast
/// address; neither end is excluded. Scanning them costs two extra probes
/// per block and keeps the enumeration trivially predictable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Range {
    pub start_addr: Ipv4Addr,
    pub end_addr: Ipv4Addr,
}

impl Ipv4Range {
    pub fn new(start_addr: Ipv4Addr, end_addr: Ipv4Addr) -> Self {
        Self {
            start_addr,
            end_addr,
        }
    }

    pub fn len(&self) -> usize {
        let start: u32 = self.start_addr.into();
        let end: u32 = self.end_addr.into();
        (end - start) as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Materializes the full address list, ascending.
    ///
    /// The scan engine needs the complete set up front to know how many
    /// results to wait for, so this is deliberately not a lazy iterator.
    pub fn enumerate(&self) -> Vec<Ipv4Addr> {
        let start: u32 = self.start_addr.into();
        let end: u32 = self.end_addr.into();
        (start..=end).map(Ipv4Addr::from).collect()
    }
}

/// Parses CIDR notation like "192.168.1.0/24" into an [`Ipv4Range`].
pub fn parse_cidr(s: &str) -> Result<Ipv4Range, RangeError> {
    let Some((ip_str, prefix_str)) = s.split_once('/') else {
        return Err(RangeError::MissingPrefix(s.to_string()));
    };

    let ipv4_addr = ip_str
        .parse::<Ipv4Addr>()
        .map_err(|_| RangeError::InvalidAddress(ip_str.to_string()))?;

    let prefix = prefix_str
        .parse::<u8>()
        .map_err(|_| RangeError::InvalidPrefix(prefix_str.to_string()))?;

    cidr_range(ipv4_addr, prefix)
}

pub fn cidr_range(ip: Ipv4Addr, prefix: u8) -> Result<Ipv4Range, RangeError> {
    let network = pnet::ipnetwork::Ipv4Network::new(ip, prefix)
        .map_err(|_| RangeError::PrefixOutOfRange(prefix))?;
    let start = network.network();
    let end = network.broadcast();

    Ok(Ipv4Range::new(start, end))
}
