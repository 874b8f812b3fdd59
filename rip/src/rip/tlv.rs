use super::{Advertisement, FailureNotice};

/// A single `Tlv` in a protocol packet body.
#[derive(Debug, Clone, PartialEq)]
pub enum Tlv {
    /// A full routing table advertisement.
    Advertisement(Advertisement),
    /// Notification that a neighbour was declared unreachable.
    FailureNotice(FailureNotice),
}

impl Tlv {
    /// Calculate the size on the wire for this `Tlv`, excluding the TLV
    /// preamble.
    pub fn wire_size(&self) -> u16 {
        match self {
            Self::Advertisement(adv) => adv.wire_size(),
            Self::FailureNotice(notice) => notice.wire_size(),
        }
    }

    /// Encode this `Tlv` as part of a packet.
    pub fn write_bytes(&self, dst: &mut bytes::BytesMut) {
        match self {
            Self::Advertisement(adv) => adv.write_bytes(dst),
            Self::FailureNotice(notice) => notice.write_bytes(dst),
        }
    }
}

impl From<Advertisement> for Tlv {
    fn from(adv: Advertisement) -> Self {
        Self::Advertisement(adv)
    }
}

impl From<FailureNotice> for Tlv {
    fn from(notice: FailureNotice) -> Self {
        Self::FailureNotice(notice)
    }
}
