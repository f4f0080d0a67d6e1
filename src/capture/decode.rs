use std::net::SocketAddr;
use pnet::util::MacAddr;
use crate::clock::Timestamp;
use crate::packet;

/// The parts of a captured frame that attribution needs.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Frame {
    pub timestamp: Timestamp,
    pub src_mac:   MacAddr,
    pub src:       SocketAddr,
    pub dst:       SocketAddr,
    pub bytes:     usize,
}

impl Frame {
    /// Port pair in wire order, as the correlation table is keyed.
    pub fn ports(&self) -> (u16, u16) {
        (self.src.port(), self.dst.port())
    }
}

pub fn capture(cap: pcap::Packet<'_>) -> Option<Frame> {
    decode(cap.data, cap.header.len as usize, cap.header.ts.into())
}

/// Decode an Ethernet frame whose length on the wire was `len`. Frames
/// without TCP or UDP ports yield None.
pub fn decode(data: &[u8], len: usize, ts: Timestamp) -> Option<Frame> {
    let (mac, packet) = packet::decode(data)?;
    let (src, dst)    = packet.endpoints()?;

    Some(Frame {
        timestamp: ts,
        src_mac:   mac,
        src:       src,
        dst:       dst,
        bytes:     len,
    })
}
