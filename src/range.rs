use ipnetwork::IpNetwork;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::{ProbeError, Result};

/// Narrowest IPv6 prefix we are willing to walk: the low 64 bits.
pub const MIN_IPV6_PREFIX: u8 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Network {
    V4(u32),
    V6 { high: u64, low: u64 },
}

impl Network {
    fn address(&self, offset: u64) -> IpAddr {
        match *self {
            Network::V4(base) => IpAddr::V4(Ipv4Addr::from(base ^ offset as u32)),
            Network::V6 { high, low } => {
                let bits = (u128::from(high) << 64) | u128::from(low ^ offset);
                IpAddr::V6(Ipv6Addr::from(bits))
            }
        }
    }
}

/// Lazy walk over every address of a CIDR block, lowest first.
///
/// Nothing runs in the background; dropping the iterator part way through
/// simply stops the walk.
#[derive(Debug, Clone)]
pub struct AddressRange {
    network: Network,
    prefix: u8,
    cursor: u64,
    last: u64,
    exhausted: bool,
}

impl AddressRange {
    /// Prefix length of the block being walked.
    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Network (lowest) address of the block.
    pub fn first(&self) -> IpAddr {
        self.network.address(0)
    }

    /// Number of addresses not yet yielded.
    pub fn remaining(&self) -> u128 {
        if self.exhausted {
            0
        } else {
            u128::from(self.last - self.cursor) + 1
        }
    }
}

impl Iterator for AddressRange {
    type Item = IpAddr;

    fn next(&mut self) -> Option<IpAddr> {
        if self.exhausted {
            return None;
        }
        let offset = self.cursor;
        if offset == self.last {
            self.exhausted = true;
        } else {
            self.cursor += 1;
        }
        Some(self.network.address(offset))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.remaining()) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.first(), self.prefix)
    }
}

/// Reports whether a target string names an address block rather than a host.
pub fn is_cidr(value: &str) -> bool {
    value.contains('/')
}

/// Parses `cidr` and returns a lazy iterator over every address in it.
///
/// IPv4 blocks of any prefix are accepted. IPv6 blocks must be /64 or
/// narrower, since only the low 64 bits are enumerated.
pub fn expand_range(cidr: &str) -> Result<AddressRange> {
    if !is_cidr(cidr) {
        return Err(ProbeError::invalid_range(cidr, "missing prefix length"));
    }

    let network: IpNetwork = cidr
        .trim()
        .parse()
        .map_err(|e| ProbeError::invalid_range(cidr, format!("{e}")))?;

    let range = match network {
        IpNetwork::V4(net) => {
            let prefix = net.prefix();
            let host_bits = 32 - u32::from(prefix);
            let last = if host_bits == 32 { u64::from(u32::MAX) } else { (1u64 << host_bits) - 1 };
            AddressRange {
                network: Network::V4(u32::from(net.network())),
                prefix,
                cursor: 0,
                last,
                exhausted: false,
            }
        }
        IpNetwork::V6(net) => {
            let prefix = net.prefix();
            if prefix < MIN_IPV6_PREFIX {
                return Err(ProbeError::invalid_range(
                    cidr,
                    format!("IPv6 mask is too wide, use one from range /[{MIN_IPV6_PREFIX}-128]"),
                ));
            }
            let host_bits = 128 - u32::from(prefix);
            let last = if host_bits == 64 { u64::MAX } else { (1u64 << host_bits) - 1 };
            let bits = u128::from(net.network());
            AddressRange {
                network: Network::V6 {
                    high: (bits >> 64) as u64,
                    low: bits as u64,
                },
                prefix,
                cursor: 0,
                last,
                exhausted: false,
            }
        }
    };

    log::debug!("[range] expand_range: cidr={} first={} count={}", cidr, range.first(), range.remaining());
    Ok(range)
}
