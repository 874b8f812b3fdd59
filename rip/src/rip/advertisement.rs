//! The routing table advertisement TLV.
//!
//! An advertisement carries the sender's entire routing table at encode time,
//! one 20-byte tuple per known route.

use std::net::Ipv4Addr;

use bytes::{Buf, BufMut};
use tracing::trace;

use crate::metric::Metric;

/// Wire size of a single advertised route tuple: four IPv4 addresses plus a
/// u32 cost.
const ROUTE_WIRE_SIZE: u16 = 20;

/// A single route tuple inside an [`Advertisement`].
#[derive(Debug, Clone, PartialEq)]
pub struct AdvertisedRoute {
    /// The destination this tuple describes a route for.
    destination: Ipv4Addr,
    /// The address of the advertising node.
    source: Ipv4Addr,
    /// The subnet mask, carried for display only. Receivers derive their own
    /// keys with the process-wide mask.
    subnet_mask: Ipv4Addr,
    /// The next hop as announced by the sender.
    next_hop: Ipv4Addr,
    /// The sender's cost for this route.
    cost: Metric,
}

impl AdvertisedRoute {
    /// Create a new `AdvertisedRoute` tuple.
    pub fn new(
        destination: Ipv4Addr,
        source: Ipv4Addr,
        subnet_mask: Ipv4Addr,
        next_hop: Ipv4Addr,
        cost: Metric,
    ) -> Self {
        Self {
            destination,
            source,
            subnet_mask,
            next_hop,
            cost,
        }
    }

    /// The destination this tuple describes a route for.
    pub fn destination(&self) -> Ipv4Addr {
        self.destination
    }

    /// The address of the advertising node.
    pub fn source(&self) -> Ipv4Addr {
        self.source
    }

    /// The subnet mask as carried on the wire.
    pub fn subnet_mask(&self) -> Ipv4Addr {
        self.subnet_mask
    }

    /// The next hop as announced by the sender.
    pub fn next_hop(&self) -> Ipv4Addr {
        self.next_hop
    }

    /// The sender's cost for this route.
    pub fn cost(&self) -> Metric {
        self.cost
    }
}

/// Advertisement TLV body: the sender's full routing table.
#[derive(Debug, Clone, PartialEq)]
pub struct Advertisement {
    routes: Vec<AdvertisedRoute>,
}

impl Advertisement {
    /// Create a new `Advertisement` from the given route tuples.
    pub fn new(routes: Vec<AdvertisedRoute>) -> Self {
        Self { routes }
    }

    /// The route tuples carried in this `Advertisement`.
    pub fn routes(&self) -> &[AdvertisedRoute] {
        &self.routes
    }

    /// Calculates the size on the wire of this `Advertisement`.
    pub fn wire_size(&self) -> u16 {
        self.routes.len() as u16 * ROUTE_WIRE_SIZE
    }

    /// Construct an `Advertisement` from wire bytes.
    ///
    /// # Panics
    ///
    /// This function will panic if there are insufficient bytes present in the
    /// provided buffer to decode `len` bytes.
    pub fn from_bytes(src: &mut bytes::BytesMut, len: u16) -> Option<Self> {
        if len % ROUTE_WIRE_SIZE != 0 {
            trace!("Invalid advertisement length, drop packet");
            src.advance(len as usize);
            return None;
        }

        let mut routes = Vec::with_capacity((len / ROUTE_WIRE_SIZE) as usize);
        for _ in 0..len / ROUTE_WIRE_SIZE {
            let destination = Ipv4Addr::from(src.get_u32());
            let source = Ipv4Addr::from(src.get_u32());
            let subnet_mask = Ipv4Addr::from(src.get_u32());
            let next_hop = Ipv4Addr::from(src.get_u32());
            let cost = Metric::new(src.get_u32());
            routes.push(AdvertisedRoute {
                destination,
                source,
                subnet_mask,
                next_hop,
                cost,
            });
        }

        trace!("Read advertisement tlv body");

        Some(Advertisement { routes })
    }

    /// Encode this `Advertisement` tlv as part of a packet.
    pub fn write_bytes(&self, dst: &mut bytes::BytesMut) {
        for route in &self.routes {
            dst.put_slice(&route.destination.octets());
            dst.put_slice(&route.source.octets());
            dst.put_slice(&route.subnet_mask.octets());
            dst.put_slice(&route.next_hop.octets());
            dst.put_u32(route.cost.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use bytes::Buf;

    use crate::metric::Metric;

    #[test]
    fn encoding() {
        let mut buf = bytes::BytesMut::new();

        let adv = super::Advertisement::new(vec![super::AdvertisedRoute::new(
            Ipv4Addr::new(10, 0, 0, 5),
            Ipv4Addr::new(10, 0, 1, 1),
            Ipv4Addr::new(255, 255, 255, 0),
            Ipv4Addr::new(10, 0, 0, 5),
            Metric::new(3),
        )]);

        adv.write_bytes(&mut buf);

        assert_eq!(buf.len(), 20);
        assert_eq!(
            buf[..20],
            [10, 0, 0, 5, 10, 0, 1, 1, 255, 255, 255, 0, 10, 0, 0, 5, 0, 0, 0, 3]
        );
    }

    #[test]
    fn decoding() {
        let mut buf = bytes::BytesMut::from(
            &[
                10, 0, 2, 9, 10, 0, 1, 1, 255, 255, 255, 0, 10, 0, 2, 9, 0, 0, 0, 7, //
                10, 0, 4, 4, 10, 0, 1, 1, 255, 255, 255, 0, 10, 0, 3, 3, 0, 0, 1, 0,
            ][..],
        );

        let buf_len = buf.len() as u16;
        let adv = super::Advertisement::from_bytes(&mut buf, buf_len)
            .expect("Can decode a well-formed advertisement");
        assert_eq!(buf.remaining(), 0);

        assert_eq!(adv.routes().len(), 2);
        assert_eq!(adv.routes()[0].destination(), Ipv4Addr::new(10, 0, 2, 9));
        assert_eq!(adv.routes()[0].next_hop(), Ipv4Addr::new(10, 0, 2, 9));
        assert_eq!(adv.routes()[0].cost(), Metric::new(7));
        assert_eq!(adv.routes()[1].destination(), Ipv4Addr::new(10, 0, 4, 4));
        assert_eq!(adv.routes()[1].next_hop(), Ipv4Addr::new(10, 0, 3, 3));
        assert_eq!(adv.routes()[1].cost(), Metric::new(256));
    }

    #[test]
    fn decode_rejects_partial_tuple() {
        // 25 bytes is not a whole number of tuples.
        let mut buf = bytes::BytesMut::from(&[0u8; 25][..]);
        let buf_len = buf.len() as u16;

        assert_eq!(super::Advertisement::from_bytes(&mut buf, buf_len), None);
        // The decode function still consumes the advertised length so the
        // parser is left in a good state.
        assert_eq!(buf.remaining(), 0);
    }
}
