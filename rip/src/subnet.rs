//! Network key derivation.
//!
//! The routing table is not keyed by raw destination addresses, but by the
//! network portion of the address under a single process-wide subnet mask.
//! This module is not meant to fully support arbitrary subnets, only the
//! fixed-mask derivation the routing engine needs.

use core::fmt;
use std::net::Ipv4Addr;

use ipnet::Ipv4Net;

/// The process-wide subnet mask applied to every address before it is used as
/// a routing table key. Also the mask advertised on the wire, where it has no
/// protocol significance beyond display.
pub const ROUTE_MASK: Ipv4Addr = Ipv4Addr::new(255, 255, 255, 0);

/// Prefix length equivalent of [`ROUTE_MASK`].
pub const ROUTE_PREFIX_LEN: u8 = 24;

/// The network key of a destination: its address with all non-prefix bits set
/// to 0 under [`ROUTE_MASK`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetKey(Ipv4Addr);

impl NetKey {
    /// Derive the key for an address by masking it with [`ROUTE_MASK`].
    pub fn from_addr(addr: Ipv4Addr) -> Self {
        let net = Ipv4Net::new(addr, ROUTE_PREFIX_LEN)
            .expect("24 is a valid IPv4 prefix size; qed");
        NetKey(net.network())
    }

    /// The network address represented by this key.
    pub fn address(&self) -> Ipv4Addr {
        self.0
    }
}

impl From<Ipv4Addr> for NetKey {
    fn from(addr: Ipv4Addr) -> Self {
        NetKey::from_addr(addr)
    }
}

impl fmt::Display for NetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0, ROUTE_PREFIX_LEN)
    }
}
