use std::{
    net::Ipv4Addr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::metric::Metric;

/// A peer represents a directly configured neighbour of this node.
///
/// The liveness flag is set by the receive loop on any datagram from the
/// peer's address and cleared by the monitor loop at the start of each
/// liveness window. A peer whose flag is still clear when the next window
/// starts is considered down.
#[derive(Debug, Clone)]
pub struct Peer {
    inner: Arc<PeerInner>,
}

impl Peer {
    /// Create a new `Peer` with the given address and static link cost. Peers
    /// start out live.
    pub fn new(address: Ipv4Addr, link_cost: Metric) -> Self {
        Peer {
            inner: Arc::new(PeerInner {
                address,
                link_cost,
                alive: AtomicBool::new(true),
            }),
        }
    }

    /// The address of this peer.
    pub fn address(&self) -> Ipv4Addr {
        self.inner.address
    }

    /// The configured cost of the direct link to this peer.
    pub fn link_cost(&self) -> Metric {
        self.inner.link_cost
    }

    /// Record that a datagram was received from this peer.
    pub fn mark_alive(&self) {
        self.inner.alive.store(true, Ordering::Relaxed);
    }

    /// Re-arm the liveness flag for the next window, returning whether the
    /// peer was live during the window which just ended.
    pub fn disarm(&self) -> bool {
        self.inner.alive.swap(false, Ordering::Relaxed)
    }
}

impl PartialEq for Peer {
    fn eq(&self, other: &Self) -> bool {
        self.inner.address == other.inner.address
    }
}

impl Eq for Peer {}

#[derive(Debug)]
struct PeerInner {
    address: Ipv4Addr,
    /// Static cost of the direct link, as configured at startup.
    link_cost: Metric,
    /// Liveness flag for the current monitor window.
    alive: AtomicBool,
}
