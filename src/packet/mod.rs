use std::net::{IpAddr, SocketAddr};
use pnet::packet::Packet as _;
use pnet::packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::ipv6::Ipv6Packet;
use pnet::packet::tcp::TcpPacket;
use pnet::packet::udp::UdpPacket;

pub use decode::decode;

mod decode;

/// Network layer of a captured Ethernet frame.
pub enum Packet<'a> {
    V4(Ipv4Packet<'a>),
    V6(Ipv6Packet<'a>),
}

impl<'a> Packet<'a> {
    /// Source and destination transport endpoints, for TCP and UDP only.
    pub fn endpoints(&self) -> Option<(SocketAddr, SocketAddr)> {
        let (src, dst, next, payload): (IpAddr, IpAddr, _, _) = match self {
            Packet::V4(ip) => (
                ip.get_source().into(),
                ip.get_destination().into(),
                ip.get_next_level_protocol(),
                ip.payload(),
            ),
            Packet::V6(ip) => (
                ip.get_source().into(),
                ip.get_destination().into(),
                ip.get_next_header(),
                ip.payload(),
            ),
        };

        let (sport, dport) = ports(next, payload)?;

        Some((SocketAddr::new(src, sport), SocketAddr::new(dst, dport)))
    }
}

fn ports(next: IpNextHeaderProtocol, payload: &[u8]) -> Option<(u16, u16)> {
    match next {
        IpNextHeaderProtocols::Tcp => TcpPacket::new(payload).map(|p| (p.get_source(), p.get_destination())),
        IpNextHeaderProtocols::Udp => UdpPacket::new(payload).map(|p| (p.get_source(), p.get_destination())),
        _                          => None,
    }
}
