use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::{Arc, RwLock},
    time::Duration,
};

use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use tokio::{
    net::UdpSocket,
    select,
    sync::{mpsc, oneshot, Notify},
};
use tokio_util::udp::UdpFramed;
use tracing::{debug, error, info, trace, warn};

use crate::{
    metric::Metric,
    peer::Peer,
    rip::{Advertisement, AdvertisedRoute, Codec, FailureNotice, Tlv},
    routing_table::{RouteEntry, RoutingTable},
    subnet::ROUTE_MASK,
};

/// Time between periodic full table advertisements to neighbours.
pub const ADVERTISE_INTERVAL: Duration = Duration::from_secs(3);
/// Time between liveness sweeps over the neighbour registry. A neighbour must
/// send at least one datagram per window to avoid being declared down.
pub const LIVENESS_CHECK_INTERVAL: Duration = Duration::from_secs(20);

/// Capacity of the inbound queue between the receive loop and the update
/// loop.
const INBOUND_QUEUE_SIZE: usize = 100;
/// Capacity of the failure notice channel towards the send loop.
const FAILURE_QUEUE_SIZE: usize = 1;

/// Sink half of the framed socket, used by the send loop.
type FramedSink = SplitSink<UdpFramed<Codec>, (Tlv, SocketAddr)>;
/// Stream half of the framed socket, used by the receive loop.
type FramedStream = SplitStream<UdpFramed<Codec>>;

/// A failure notice on its way to the send loop. When `flushed` is set, the
/// send loop signals it after the notice went out to all remaining
/// neighbours, so the producer can block until the notice reached the wire.
struct FailureEvent {
    notice: FailureNotice,
    flushed: Option<oneshot::Sender<()>>,
}

/// The `Router` holds the shared state of the routing engine: the routing
/// table, the neighbour registry and the trigger used for out-of-cycle
/// updates. It is cheap to clone, and a clone is handed to each of the four
/// loops when they are spawned.
#[derive(Clone)]
pub struct Router {
    node_addr: Ipv4Addr,
    routing_table: Arc<RwLock<RoutingTable>>,
    peers: Arc<RwLock<Vec<Peer>>>,
    /// Wakes the send loop for a triggered update.
    trigger: Arc<Notify>,
    advertise_interval: Duration,
    liveness_interval: Duration,
}

impl Router {
    /// Create a new `Router` for a node with the given address and statically
    /// configured neighbours. The neighbour registry is seeded with every
    /// neighbour live, and the routing table with one direct route per
    /// neighbour.
    pub fn new(
        node_addr: Ipv4Addr,
        neighbours: &[(Ipv4Addr, Metric)],
        advertise_interval: Duration,
        liveness_interval: Duration,
    ) -> Self {
        let mut peers = Vec::with_capacity(neighbours.len());
        let mut routing_table = RoutingTable::new();

        for &(addr, link_cost) in neighbours {
            info!("Adding neighbour {addr} with link cost {link_cost}");
            peers.push(Peer::new(addr, link_cost));
            routing_table.insert(RouteEntry::new(addr, addr, link_cost));
        }

        Router {
            node_addr,
            routing_table: Arc::new(RwLock::new(routing_table)),
            peers: Arc::new(RwLock::new(peers)),
            trigger: Arc::new(Notify::new()),
            advertise_interval,
            liveness_interval,
        }
    }

    /// Start the four routing loops on the given socket. The `peer_port` is
    /// the port neighbours listen on for our datagrams.
    pub fn start(&self, socket: UdpSocket, peer_port: u16) {
        let (sink, stream) = UdpFramed::new(socket, Codec::new()).split();
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE_SIZE);
        let (failure_tx, failure_rx) = mpsc::channel(FAILURE_QUEUE_SIZE);

        tokio::spawn(self.clone().receive_loop(stream, inbound_tx));
        tokio::spawn(self.clone().update_loop(inbound_rx, failure_tx.clone()));
        tokio::spawn(self.clone().send_loop(sink, failure_rx, peer_port));
        tokio::spawn(self.clone().monitor_loop(failure_tx));
    }

    /// The address of this node.
    pub fn node_addr(&self) -> Ipv4Addr {
        self.node_addr
    }

    /// Get a snapshot of all routes currently in the routing table.
    pub fn routes(&self) -> Vec<RouteEntry> {
        self.routing_table
            .read()
            .unwrap()
            .iter()
            .map(|(_, entry)| entry.clone())
            .collect()
    }

    /// Get the currently registered neighbours.
    pub fn neighbours(&self) -> Vec<Peer> {
        self.peers.read().unwrap().clone()
    }

    /// Apply the distance vector relaxation for every tuple in a received
    /// advertisement. Returns whether the routing table changed, in which
    /// case the caller is expected to initiate a triggered update.
    fn handle_advertisement(&self, adv: &Advertisement) -> bool {
        // Compound read over both structures; lock order is peers, then
        // table.
        let peers = self.peers.read().unwrap();
        let mut table = self.routing_table.write().unwrap();

        let mut changed = false;
        for route in adv.routes() {
            // Never learn routes back to ourselves: we are always directly
            // reachable, and a neighbour announcing us as next hop would
            // route through us anyway.
            if route.destination() == self.node_addr || route.next_hop() == self.node_addr {
                continue;
            }

            // Cost of the path through the advertising neighbour: our own
            // cost towards it (the unreachable sentinel if we have none)
            // plus the announced cost.
            let candidate_cost = table.cost_to(route.source()) + route.cost();

            match table.route_to(route.destination()).cloned() {
                Some(current) if current.next_hop() == route.source() => {
                    // The update comes from the hop we currently use for
                    // this destination. Accepting it blindly would mask and
                    // perpetuate routing loops.
                    changed |=
                        Self::apply_poison_reverse(&peers, &mut table, route, candidate_cost);
                }
                Some(current) => {
                    if candidate_cost < current.cost() {
                        debug!(
                            "Better route to {} via {} at cost {candidate_cost}",
                            route.destination(),
                            route.source()
                        );
                        table.insert(RouteEntry::new(
                            route.destination(),
                            route.source(),
                            candidate_cost,
                        ));
                        changed = true;
                    }
                }
                None => {
                    info!(
                        "Learned route to {} via {} at cost {candidate_cost}",
                        route.destination(),
                        route.source()
                    );
                    table.insert(RouteEntry::new(
                        route.destination(),
                        route.source(),
                        candidate_cost,
                    ));
                    changed = true;
                }
            }
        }

        changed
    }

    /// Poison reverse handling for an advertisement tuple received from the
    /// neighbour which is the current next hop for the advertised
    /// destination.
    ///
    /// The recomputed path cost through the advertiser is compared against
    /// the direct link cost of the configured neighbour matching the
    /// destination. A strictly cheaper recomputed path is accepted; anything
    /// else collapses the route back to the direct link, refusing to
    /// propagate a worse path through the node which originated it. If the
    /// destination is not itself a configured neighbour the tuple is
    /// discarded outright.
    fn apply_poison_reverse(
        peers: &[Peer],
        table: &mut RoutingTable,
        route: &AdvertisedRoute,
        candidate_cost: Metric,
    ) -> bool {
        let Some(nbr) = peers.iter().find(|p| p.address() == route.destination()) else {
            trace!(
                "Discarding worsened announcement for {} from its current next hop",
                route.destination()
            );
            return false;
        };

        let replacement = if candidate_cost < nbr.link_cost() {
            RouteEntry::new(route.destination(), route.source(), candidate_cost)
        } else {
            RouteEntry::new(nbr.address(), nbr.address(), nbr.link_cost())
        };

        if table.route_to(route.destination()) == Some(&replacement) {
            return false;
        }

        debug!(
            "Poison reverse update for {}: route now via {} at cost {}",
            route.destination(),
            replacement.next_hop(),
            replacement.cost()
        );
        table.insert(replacement);
        true
    }

    /// Remove a failed node from the neighbour registry and drop every route
    /// which depends on it. Returns whether any state was removed, so
    /// handling the same failure twice is a no-op.
    ///
    /// This is a compound mutation: both the registry and the table are
    /// locked for the duration so no reader observes a half-updated state.
    fn remove_failed(&self, failed: Ipv4Addr) -> bool {
        let mut peers = self.peers.write().unwrap();
        let mut table = self.routing_table.write().unwrap();

        let peers_before = peers.len();
        peers.retain(|p| p.address() != failed);
        let peer_removed = peers.len() != peers_before;

        let routes_removed = table.remove_failed(failed);

        peer_removed || routes_removed
    }

    /// Re-arm the liveness flag of every neighbour and collect those whose
    /// window expired without any inbound traffic.
    fn sweep_liveness(&self) -> Vec<Ipv4Addr> {
        self.peers
            .read()
            .unwrap()
            .iter()
            .filter(|p| !p.disarm())
            .map(Peer::address)
            .collect()
    }

    /// Record that a datagram arrived from the given address, marking the
    /// matching neighbour live for the current window.
    fn mark_peer_alive(&self, addr: Ipv4Addr) {
        if let Some(peer) = self
            .peers
            .read()
            .unwrap()
            .iter()
            .find(|p| p.address() == addr)
        {
            trace!("Neighbour {addr} is live");
            peer.mark_alive();
        }
    }

    /// Serialize the current routing table into an [`Advertisement`].
    fn table_advertisement(&self) -> Advertisement {
        Advertisement::new(
            self.routing_table
                .read()
                .unwrap()
                .iter()
                .map(|(_, entry)| {
                    AdvertisedRoute::new(
                        entry.destination(),
                        self.node_addr,
                        ROUTE_MASK,
                        entry.next_hop(),
                        entry.cost(),
                    )
                })
                .collect(),
        )
    }

    /// Dump the full routing table to the log.
    pub fn log_table(&self) {
        info!("Routing table:\n{}", self.routing_table.read().unwrap());
    }

    /// Loop which reads datagrams from the socket, marks the sending
    /// neighbour live and hands the decoded message to the update loop.
    /// Malformed payloads are logged and dropped.
    async fn receive_loop(self, mut stream: FramedStream, inbound_tx: mpsc::Sender<(Tlv, Ipv4Addr)>) {
        while let Some(res) = stream.next().await {
            match res {
                Ok((tlv, remote)) => {
                    let IpAddr::V4(remote_ip) = remote.ip() else {
                        trace!("Ignoring datagram from non-IPv4 remote {remote}");
                        continue;
                    };
                    self.mark_peer_alive(remote_ip);
                    if inbound_tx.send((tlv, remote_ip)).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to decode inbound datagram: {e}");
                }
            }
        }
        warn!("Receive loop halted");
    }

    /// Loop which consumes the inbound queue and applies each message to the
    /// routing table, signaling the send loop whenever the table changed.
    async fn update_loop(
        self,
        mut inbound_rx: mpsc::Receiver<(Tlv, Ipv4Addr)>,
        failure_tx: mpsc::Sender<FailureEvent>,
    ) {
        while let Some((tlv, remote)) = inbound_rx.recv().await {
            match tlv {
                Tlv::Advertisement(adv) => {
                    trace!("Processing advertisement from {remote}");
                    if self.handle_advertisement(&adv) {
                        self.log_table();
                        debug!("Routing table changed, initiating triggered update");
                        self.trigger.notify_one();
                    }
                }
                Tlv::FailureNotice(notice) => {
                    let failed = notice.address();
                    if self.remove_failed(failed) {
                        info!("Removed failed node {failed} reported by {remote}");
                        self.log_table();
                        // First observation of this failure, propagate the
                        // notice onward.
                        if failure_tx
                            .send(FailureEvent {
                                notice,
                                flushed: None,
                            })
                            .await
                            .is_err()
                        {
                            break;
                        }
                        self.trigger.notify_one();
                    } else {
                        trace!("Ignoring failure notice for unknown node {failed}");
                    }
                }
            }
        }
        warn!("Update loop halted");
    }

    /// Loop which advertises the full routing table to all neighbours, then
    /// waits for the advertise interval, a triggered update or a pending
    /// failure notice, whichever comes first. Failure notices take priority
    /// over periodic traffic and are acknowledged once flushed.
    async fn send_loop(
        self,
        mut sink: FramedSink,
        mut failure_rx: mpsc::Receiver<FailureEvent>,
        peer_port: u16,
    ) {
        loop {
            let adv = self.table_advertisement();
            trace!("Advertising {} routes", adv.routes().len());
            self.broadcast(&mut sink, adv.into(), peer_port).await;

            select! {
                biased;
                event = failure_rx.recv() => {
                    let Some(FailureEvent { notice, flushed }) = event else {
                        break;
                    };
                    info!("Notifying neighbours that {} is unreachable", notice.address());
                    self.broadcast(&mut sink, notice.into(), peer_port).await;
                    if let Some(flushed) = flushed {
                        // The monitor resumes its scan on this signal.
                        let _ = flushed.send(());
                    }
                }
                _ = self.trigger.notified() => {
                    trace!("Woken for a triggered update");
                }
                _ = tokio::time::sleep(self.advertise_interval) => {}
            }
        }
        warn!("Send loop halted");
    }

    /// Send a message to every registered neighbour. Per-neighbour transport
    /// errors are logged and do not abort the cycle for the other
    /// neighbours.
    async fn broadcast(&self, sink: &mut FramedSink, tlv: Tlv, peer_port: u16) {
        let targets: Vec<Ipv4Addr> = self
            .peers
            .read()
            .unwrap()
            .iter()
            .map(Peer::address)
            .collect();

        if targets.is_empty() {
            debug!("No neighbours to send to");
            return;
        }

        for addr in targets {
            trace!("Sending data to {addr}");
            if let Err(e) = sink
                .send((tlv.clone(), SocketAddr::new(IpAddr::V4(addr), peer_port)))
                .await
            {
                error!("Failed to send to {addr}: {e}");
            }
        }
    }

    /// Loop which periodically evaluates neighbour liveness. A neighbour
    /// which sent no traffic for a full window is removed together with all
    /// routes depending on it, and a failure notice is pushed to the send
    /// loop. The scan resumes only after the notice was flushed.
    async fn monitor_loop(self, failure_tx: mpsc::Sender<FailureEvent>) {
        loop {
            tokio::time::sleep(self.liveness_interval).await;
            trace!("Checking neighbour liveness");

            for failed in self.sweep_liveness() {
                warn!("Neighbour down: {failed}");
                if !self.remove_failed(failed) {
                    continue;
                }
                self.log_table();

                let (flushed_tx, flushed_rx) = oneshot::channel();
                if failure_tx
                    .send(FailureEvent {
                        notice: FailureNotice::new(failed),
                        flushed: Some(flushed_tx),
                    })
                    .await
                    .is_err()
                {
                    warn!("Monitor loop halted");
                    return;
                }
                if flushed_rx.await.is_err() {
                    warn!("Monitor loop halted");
                    return;
                }
            }
        }
    }
}
