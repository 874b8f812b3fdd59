//! Wire format of the routing protocol.
//!
//! A packet is a small header with a magic byte, the protocol version and a
//! body length, followed by a single tagged TLV: `2` for a routing table
//! advertisement (the RIP version tag) and ASCII `F` for a neighbour failure
//! notice.

use std::io;

use bytes::{Buf, BufMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

pub use self::{advertisement::Advertisement, advertisement::AdvertisedRoute};
pub use self::failure_notice::FailureNotice;
pub use self::tlv::Tlv;

mod advertisement;
mod failure_notice;
mod tlv;

/// Magic byte to identify a routing protocol packet.
const RIP_MAGIC: u8 = 0x52;
/// The version of the protocol we are currently using.
const RIP_VERSION: u8 = 2;

/// Size of a packet header on the wire.
const HEADER_WIRE_SIZE: usize = 4;

/// Size of a TLV preamble (type byte + u16 payload length).
const TLV_HEADER_WIRE_SIZE: usize = 3;

/// TLV type for the [`Advertisement`] tlv.
const TLV_TYPE_ADVERTISEMENT: u8 = 2;
/// TLV type for the [`FailureNotice`] tlv, the historical `F` tag.
const TLV_TYPE_FAILURE_NOTICE: u8 = 0x46;

/// A codec which can send and receive whole routing protocol packets on the
/// wire.
///
/// Decoding is datagram oriented: a packet must decode in full from the
/// buffer it arrived in, and a truncated packet is malformed and dropped.
/// There is no resumption once more bytes arrive, as a later datagram is a
/// different packet entirely.
#[derive(Debug, Clone, Default)]
pub struct Codec {}

impl Codec {
    /// Create a new `Codec`.
    pub fn new() -> Self {
        Codec {}
    }
}

/// The header of a protocol packet. This contains only hard-coded fields and
/// the length of the encoded body, so there is no need for users to construct
/// one manually; it only exists to make reading/writing the wire format
/// easier.
#[derive(Debug, Clone)]
struct Header {
    magic: u8,
    version: u8,
    /// Length of the whole body following this header.
    body_length: u16,
}

impl Decoder for Codec {
    type Item = Tlv;

    type Error = io::Error;

    fn decode(&mut self, src: &mut bytes::BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if !src.has_remaining() {
            return Ok(None);
        }

        if src.remaining() < HEADER_WIRE_SIZE {
            trace!("Dropping packet too short for a header");
            src.clear();
            return Ok(None);
        }

        let header = Header {
            magic: src.get_u8(),
            version: src.get_u8(),
            body_length: src.get_u16(),
        };

        // A body longer than the remaining bytes can never be completed, the
        // packet is truncated. Drop it without leaving leftover bytes, which
        // would otherwise poison decoding of the buffer.
        if src.remaining() < header.body_length as usize {
            trace!("Dropping packet shorter than its advertised body");
            src.clear();
            return Ok(None);
        }

        // Silently ignore packets which don't have the correct magic or
        // version. We do consume the advertised amount of bytes so the parser
        // is left in the correct state for the next packet.
        if header.magic != RIP_MAGIC || header.version != RIP_VERSION {
            trace!("Dropping packet with wrong magic or version");
            src.advance(header.body_length as usize);
            return self.decode(src);
        }

        if (header.body_length as usize) < TLV_HEADER_WIRE_SIZE {
            trace!("Dropping packet with truncated tlv preamble");
            src.advance(header.body_length as usize);
            return self.decode(src);
        }

        // TLV preamble.
        let tlv_type = src.get_u8();
        let body_len = src.get_u16();

        if body_len as usize != header.body_length as usize - TLV_HEADER_WIRE_SIZE {
            trace!("Dropping packet with inconsistent tlv length");
            src.advance(header.body_length as usize - TLV_HEADER_WIRE_SIZE);
            return self.decode(src);
        }

        let tlv = match tlv_type {
            TLV_TYPE_ADVERTISEMENT => Advertisement::from_bytes(src, body_len).map(From::from),
            TLV_TYPE_FAILURE_NOTICE => FailureNotice::from_bytes(src, body_len).map(From::from),
            _ => {
                // Unrecognized body type, silently drop.
                trace!("Dropping unrecognized tlv");
                src.advance(body_len as usize);
                return self.decode(src);
            }
        };

        match tlv {
            Some(tlv) => Ok(Some(tlv)),
            None => {
                // The body was consumed but did not yield a valid tlv, try
                // the next packet if one is already buffered.
                self.decode(src)
            }
        }
    }
}

impl Encoder<Tlv> for Codec {
    type Error = io::Error;

    fn encode(&mut self, item: Tlv, dst: &mut bytes::BytesMut) -> Result<(), Self::Error> {
        // Header.
        dst.put_u8(RIP_MAGIC);
        dst.put_u8(RIP_VERSION);
        dst.put_u16(item.wire_size() + TLV_HEADER_WIRE_SIZE as u16);

        // TLV preamble.
        match item {
            Tlv::Advertisement(_) => dst.put_u8(TLV_TYPE_ADVERTISEMENT),
            Tlv::FailureNotice(_) => dst.put_u8(TLV_TYPE_FAILURE_NOTICE),
        }
        dst.put_u16(item.wire_size());
        item.write_bytes(dst);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use futures::{SinkExt, StreamExt};
    use tokio_util::codec::Framed;

    use crate::{metric::Metric, subnet::ROUTE_MASK};

    use super::{Advertisement, AdvertisedRoute, FailureNotice};

    #[tokio::test]
    async fn codec_advertisement() {
        let (tx, rx) = tokio::io::duplex(1024);
        let mut sender = Framed::new(tx, super::Codec::new());
        let mut receiver = Framed::new(rx, super::Codec::new());

        let adv = Advertisement::new(vec![
            AdvertisedRoute::new(
                Ipv4Addr::new(10, 0, 0, 5),
                Ipv4Addr::new(10, 0, 1, 1),
                ROUTE_MASK,
                Ipv4Addr::new(10, 0, 0, 5),
                Metric::new(0),
            ),
            AdvertisedRoute::new(
                Ipv4Addr::new(10, 0, 2, 9),
                Ipv4Addr::new(10, 0, 1, 1),
                ROUTE_MASK,
                Ipv4Addr::new(10, 0, 2, 9),
                Metric::new(4),
            ),
        ]);

        sender
            .send(adv.clone().into())
            .await
            .expect("Send on a non-networked buffer can never fail; qed");
        let recv_adv = receiver
            .next()
            .await
            .expect("Buffer isn't closed so this is always `Some`; qed")
            .expect("Can decode the previously encoded value");
        assert_eq!(super::Tlv::from(adv), recv_adv);
    }

    #[tokio::test]
    async fn codec_failure_notice() {
        let (tx, rx) = tokio::io::duplex(1024);
        let mut sender = Framed::new(tx, super::Codec::new());
        let mut receiver = Framed::new(rx, super::Codec::new());

        let notice = FailureNotice::new(Ipv4Addr::new(10, 0, 3, 7));

        sender
            .send(notice.clone().into())
            .await
            .expect("Send on a non-networked buffer can never fail; qed");
        let recv_notice = receiver
            .next()
            .await
            .expect("Buffer isn't closed so this is always `Some`; qed")
            .expect("Can decode the previously encoded value");
        assert_eq!(super::Tlv::from(notice), recv_notice);
    }

    #[tokio::test]
    async fn truncated_datagram_does_not_wedge_receive_stream() {
        let receiver = tokio::net::UdpSocket::bind("127.0.0.1:0")
            .await
            .expect("Can bind receiver socket");
        let receiver_addr = receiver
            .local_addr()
            .expect("Bound socket has a local address");
        let sender = tokio::net::UdpSocket::bind("127.0.0.1:0")
            .await
            .expect("Can bind sender socket");

        // A datagram too short to hold a header, and one whose header
        // advertises more body than the datagram carries.
        sender
            .send_to(&[super::RIP_MAGIC, super::RIP_VERSION], receiver_addr)
            .await
            .expect("Can send datagram on loopback");
        sender
            .send_to(
                &[super::RIP_MAGIC, super::RIP_VERSION, 0xFF, 0xFF],
                receiver_addr,
            )
            .await
            .expect("Can send datagram on loopback");

        let notice = FailureNotice::new(Ipv4Addr::new(10, 0, 3, 7));
        let mut good = bytes::BytesMut::new();
        super::Encoder::encode(&mut super::Codec::new(), notice.clone().into(), &mut good)
            .expect("Encoding into a fresh buffer never fails; qed");
        sender
            .send_to(&good, receiver_addr)
            .await
            .expect("Can send datagram on loopback");

        let mut stream = tokio_util::udp::UdpFramed::new(receiver, super::Codec::new());
        // The truncated datagrams are dropped without surfacing an error, so
        // the first item on the stream is the valid notice.
        let (tlv, _) = tokio::time::timeout(std::time::Duration::from_secs(5), stream.next())
            .await
            .expect("Valid packet is decoded after the truncated datagrams")
            .expect("Socket stream never ends; qed")
            .expect("Truncated datagrams are dropped, not turned into errors");
        assert_eq!(super::Tlv::from(notice), tlv);
    }

    #[tokio::test]
    async fn wrong_magic_is_skipped() {
        let (tx, rx) = tokio::io::duplex(1024);
        let mut sender = Framed::new(tx, tokio_util::codec::BytesCodec::new());
        let mut receiver = Framed::new(rx, super::Codec::new());

        // A bogus packet with the right length fields but a wrong magic byte,
        // followed by a valid failure notice.
        let mut bogus = bytes::BytesMut::new();
        bogus.extend_from_slice(&[0xFF, 2, 0, 7, 0x46, 0, 4, 10, 0, 0, 1]);
        let mut good = bytes::BytesMut::new();
        super::Encoder::encode(
            &mut super::Codec::new(),
            FailureNotice::new(Ipv4Addr::new(10, 0, 3, 7)).into(),
            &mut good,
        )
        .expect("Encoding into a fresh buffer never fails; qed");
        bogus.extend_from_slice(&good);

        sender
            .send(bogus.freeze())
            .await
            .expect("Send on a non-networked buffer can never fail; qed");

        // The bogus packet is skipped, the valid one after it is decoded.
        let recv = receiver
            .next()
            .await
            .expect("Buffer isn't closed so this is always `Some`; qed")
            .expect("Can decode the valid packet after the bogus one");
        assert_eq!(
            super::Tlv::from(FailureNotice::new(Ipv4Addr::new(10, 0, 3, 7))),
            recv
        );
    }
}
