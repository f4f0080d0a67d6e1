use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::ipv6::Ipv6Packet;
use pnet::packet::vlan::VlanPacket;
use pnet::util::MacAddr;
use super::Packet;

/// Split an Ethernet frame into its source hardware address and IP layer.
/// VLAN tags are skipped; anything other than IPv4 or IPv6 yields None.
pub fn decode(frame: &[u8]) -> Option<(MacAddr, Packet<'_>)> {
    let eth = EthernetPacket::new(frame)?;
    let mac = eth.get_source();

    let mut kind = eth.get_ethertype();
    let mut rest = frame.get(EthernetPacket::minimum_packet_size()..)?;

    while kind == EtherTypes::Vlan {
        kind = VlanPacket::new(rest)?.get_ethertype();
        rest = rest.get(VlanPacket::minimum_packet_size()..)?;
    }

    let packet = match kind {
        EtherTypes::Ipv4 => Packet::V4(ipv4(rest)?),
        EtherTypes::Ipv6 => Packet::V6(Ipv6Packet::new(rest)?),
        _                => return None,
    };

    Some((mac, packet))
}

// IP-in-IP: the inner header carries the ports
fn ipv4(data: &[u8]) -> Option<Ipv4Packet<'_>> {
    let outer = Ipv4Packet::new(data)?;
    match outer.get_next_level_protocol() {
        IpNextHeaderProtocols::Ipv4 => {
            let len = outer.get_header_length() as usize * 4;
            Ipv4Packet::new(data.get(len..)?)
        },
        _ => Some(outer),
    }
}

#[cfg(test)]
mod test {
    use super::{decode, Packet};

    fn ipv4(proto: u8) -> Vec<u8> {
        let mut ip = vec![0u8; 20];
        ip[0] = 0x45;
        ip[2..4].copy_from_slice(&40u16.to_be_bytes());
        ip[9] = proto;
        ip[12..16].copy_from_slice(&[10, 0, 0, 1]);
        ip[16..20].copy_from_slice(&[10, 0, 0, 2]);
        ip
    }

    #[test]
    fn vlan_tags_are_skipped() {
        let mut frame = vec![0u8; 12];
        frame.extend_from_slice(&[0x81, 0x00, 0x00, 0x07, 0x81, 0x00, 0x00, 0x08, 0x08, 0x00]);
        frame.extend(ipv4(17));
        frame.extend_from_slice(&53u16.to_be_bytes());
        frame.extend_from_slice(&4000u16.to_be_bytes());
        frame.extend_from_slice(&[0; 16]);

        let (_, packet) = decode(&frame).expect("packet");
        let (src, dst)  = packet.endpoints().expect("endpoints");
        assert!(matches!(packet, Packet::V4(_)));
        assert_eq!(src, "10.0.0.1:53".parse().unwrap());
        assert_eq!(dst, "10.0.0.2:4000".parse().unwrap());
    }

    #[test]
    fn truncated_vlan_tag_is_rejected() {
        let mut frame = vec![0u8; 12];
        frame.extend_from_slice(&[0x81, 0x00, 0x00]);
        assert!(decode(&frame).is_none());
    }
}
