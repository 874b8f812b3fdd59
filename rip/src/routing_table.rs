use core::fmt;
use std::{collections::HashMap, net::Ipv4Addr};

use crate::{
    metric::Metric,
    subnet::{NetKey, ROUTE_MASK},
};

/// The best known route towards a destination network.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteEntry {
    destination: Ipv4Addr,
    next_hop: Ipv4Addr,
    cost: Metric,
}

impl RouteEntry {
    /// Create a new `RouteEntry` towards `destination` via `next_hop`.
    pub fn new(destination: Ipv4Addr, next_hop: Ipv4Addr, cost: Metric) -> Self {
        Self {
            destination,
            next_hop,
            cost,
        }
    }

    /// The destination address this route was learned for.
    pub fn destination(&self) -> Ipv4Addr {
        self.destination
    }

    /// The neighbour used to reach the destination.
    pub fn next_hop(&self) -> Ipv4Addr {
        self.next_hop
    }

    /// The total cost of this route.
    pub fn cost(&self) -> Metric {
        self.cost
    }
}

impl fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.destination, ROUTE_MASK, self.next_hop, self.cost
        )
    }
}

/// Mapping from network keys to the best known [`RouteEntry`] for the
/// network. Every entry corresponds to either a directly configured neighbour
/// or a route learned from one.
#[derive(Debug, Default)]
pub struct RoutingTable {
    routes: HashMap<NetKey, RouteEntry>,
}

impl RoutingTable {
    /// Create a new empty `RoutingTable`.
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// Look up the route for the network containing `addr`.
    pub fn route_to(&self, addr: Ipv4Addr) -> Option<&RouteEntry> {
        self.routes.get(&NetKey::from_addr(addr))
    }

    /// Insert a route, keyed by the network of its destination. An existing
    /// route for the same network is overwritten.
    pub fn insert(&mut self, entry: RouteEntry) {
        self.routes.insert(NetKey::from_addr(entry.destination), entry);
    }

    /// The cost of the current route towards `addr`'s network, or the
    /// unreachable sentinel if no route is known.
    pub fn cost_to(&self, addr: Ipv4Addr) -> Metric {
        self.route_to(addr)
            .map(RouteEntry::cost)
            .unwrap_or_else(Metric::unreachable)
    }

    /// Remove every route which depends on the given failed node: all routes
    /// whose next hop is the failed address, as well as the entry for the
    /// failed node's own network. Returns whether anything was removed, so
    /// processing the same failure twice is a no-op.
    pub fn remove_failed(&mut self, failed: Ipv4Addr) -> bool {
        let len_before = self.routes.len();
        self.routes.retain(|_, entry| entry.next_hop != failed);
        let removed_via = self.routes.len() != len_before;

        let removed_key = self.routes.remove(&NetKey::from_addr(failed)).is_some();

        removed_via || removed_key
    }

    /// Iterate over all routes in the table.
    pub fn iter(&self) -> impl Iterator<Item = (&NetKey, &RouteEntry)> {
        self.routes.iter()
    }

    /// The amount of routes in the table.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Checks if the table holds no routes.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl fmt::Display for RoutingTable {
    /// Full table dump, one row per route.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Destination\tSubnet\t\tNext hop\tCost")?;
        for (_, entry) in self.routes.iter() {
            writeln!(f, "{entry}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use crate::metric::Metric;

    use super::{RouteEntry, RoutingTable};

    #[test]
    fn lookup_is_keyed_by_network() {
        let mut table = RoutingTable::new();
        table.insert(RouteEntry::new(
            Ipv4Addr::new(10, 0, 0, 5),
            Ipv4Addr::new(10, 0, 1, 1),
            Metric::new(2),
        ));

        // Any address in the same /24 resolves to the same route.
        let route = table
            .route_to(Ipv4Addr::new(10, 0, 0, 200))
            .expect("Route for the network is present");
        assert_eq!(route.next_hop(), Ipv4Addr::new(10, 0, 1, 1));
        assert!(table.route_to(Ipv4Addr::new(10, 0, 1, 5)).is_some());
        assert!(table.route_to(Ipv4Addr::new(10, 1, 0, 5)).is_none());
    }

    #[test]
    fn unknown_cost_is_unreachable() {
        let table = RoutingTable::new();
        assert!(table.cost_to(Ipv4Addr::new(10, 9, 9, 9)).is_unreachable());
    }

    #[test]
    fn remove_failed_removes_dependent_routes() {
        let failed = Ipv4Addr::new(10, 0, 1, 1);
        let mut table = RoutingTable::new();
        // Direct route to the failed neighbour.
        table.insert(RouteEntry::new(failed, failed, Metric::new(1)));
        // Learned route via the failed neighbour.
        table.insert(RouteEntry::new(
            Ipv4Addr::new(10, 0, 2, 2),
            failed,
            Metric::new(3),
        ));
        // Unrelated route.
        table.insert(RouteEntry::new(
            Ipv4Addr::new(10, 0, 3, 3),
            Ipv4Addr::new(10, 0, 3, 3),
            Metric::new(1),
        ));

        assert!(table.remove_failed(failed));
        assert_eq!(table.len(), 1);
        assert!(table.route_to(failed).is_none());
        assert!(table.route_to(Ipv4Addr::new(10, 0, 2, 2)).is_none());
        assert!(table.route_to(Ipv4Addr::new(10, 0, 3, 3)).is_some());

        // Removing an already absent node is a no-op.
        assert!(!table.remove_failed(failed));
    }
}
