//! The neighbour failure notice TLV.

use std::net::Ipv4Addr;

use bytes::{Buf, BufMut};
use tracing::trace;

/// Wire size of a [`FailureNotice`]: a single IPv4 address.
const FAILURE_NOTICE_WIRE_SIZE: u16 = 4;

/// Notification that the sender declared a neighbour unreachable.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureNotice {
    /// The address of the unreachable node.
    address: Ipv4Addr,
}

impl FailureNotice {
    /// Create a new `FailureNotice` for the given address.
    pub fn new(address: Ipv4Addr) -> Self {
        Self { address }
    }

    /// The address of the node declared unreachable.
    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    /// Calculates the size on the wire of this `FailureNotice`.
    pub fn wire_size(&self) -> u16 {
        FAILURE_NOTICE_WIRE_SIZE
    }

    /// Construct a `FailureNotice` from wire bytes.
    ///
    /// # Panics
    ///
    /// This function will panic if there are insufficient bytes present in the
    /// provided buffer to decode `len` bytes.
    pub fn from_bytes(src: &mut bytes::BytesMut, len: u16) -> Option<Self> {
        if len != FAILURE_NOTICE_WIRE_SIZE {
            trace!("Invalid failure notice length, drop packet");
            src.advance(len as usize);
            return None;
        }

        let address = Ipv4Addr::from(src.get_u32());

        trace!("Read failure notice tlv body");

        Some(FailureNotice { address })
    }

    /// Encode this `FailureNotice` tlv as part of a packet.
    pub fn write_bytes(&self, dst: &mut bytes::BytesMut) {
        dst.put_slice(&self.address.octets());
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use bytes::Buf;

    #[test]
    fn encoding() {
        let mut buf = bytes::BytesMut::new();

        let notice = super::FailureNotice::new(Ipv4Addr::new(10, 0, 3, 7));
        notice.write_bytes(&mut buf);

        assert_eq!(buf.len(), 4);
        assert_eq!(buf[..4], [10, 0, 3, 7]);
    }

    #[test]
    fn decoding() {
        let mut buf = bytes::BytesMut::from(&[192, 168, 0, 40][..]);

        let buf_len = buf.len() as u16;
        assert_eq!(
            super::FailureNotice::from_bytes(&mut buf, buf_len),
            Some(super::FailureNotice::new(Ipv4Addr::new(192, 168, 0, 40)))
        );
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn decode_rejects_wrong_length() {
        let mut buf = bytes::BytesMut::from(&[1, 2, 3, 4, 5][..]);
        let buf_len = buf.len() as u16;

        assert_eq!(super::FailureNotice::from_bytes(&mut buf, buf_len), None);
        assert_eq!(buf.remaining(), 0);
    }
}
