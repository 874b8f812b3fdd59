use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;
use tracing::info;

use crate::{metric::Metric, peer::Peer, router::Router, routing_table::RouteEntry};

pub mod metric;
pub mod peer;
pub mod rip;
pub mod router;
pub mod routing_table;
pub mod subnet;

/// The default port used for routing traffic between nodes.
pub const DEFAULT_LISTEN_PORT: u16 = 3020;

/// Configuration for a new [`Node`].
pub struct Config {
    /// The address of this node, as known to its neighbours.
    pub node_addr: Ipv4Addr,
    /// The statically configured neighbours and their direct link costs.
    pub neighbours: Vec<(Ipv4Addr, Metric)>,
    /// The UDP port to listen on for routing traffic. Neighbours are assumed
    /// to listen on the same port.
    pub listen_port: u16,
    /// Time between periodic full table advertisements.
    pub advertise_interval: Duration,
    /// Length of the liveness window neighbours must send traffic within.
    pub liveness_interval: Duration,
}

/// A `Node` is a single routing daemon instance. Creating one binds the
/// routing socket and starts the routing loops in the background.
pub struct Node {
    router: Router,
}

impl Node {
    /// Setup a new `Node` with the provided [`Config`].
    pub async fn new(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        info!("Starting routing daemon for node {}", config.node_addr);

        let socket = UdpSocket::bind(SocketAddr::from((
            Ipv4Addr::UNSPECIFIED,
            config.listen_port,
        )))
        .await?;
        info!("Listening for routing traffic on UDP port {}", config.listen_port);

        let router = Router::new(
            config.node_addr,
            &config.neighbours,
            config.advertise_interval,
            config.liveness_interval,
        );
        router.log_table();
        router.start(socket, config.listen_port);

        Ok(Node { router })
    }

    /// Get a snapshot of all routes currently in the routing table.
    pub fn routes(&self) -> Vec<RouteEntry> {
        self.router.routes()
    }

    /// Get the currently registered neighbours.
    pub fn neighbours(&self) -> Vec<Peer> {
        self.router.neighbours()
    }
}
