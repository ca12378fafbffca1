//! IPv4 / TCP / UDP header fields → [`FeatureSet`].

use super::{names, FeatureSet};
use crate::capture::{LinkLayer, RawPacket};
use chrono::{DateTime, Local};
use etherparse::{
    IpNumber, LaxIpv4Slice, LaxNetSlice, LaxSlicedPacket, TcpHeader, TcpHeaderSlice,
    TransportSlice, UdpHeader, UdpHeaderSlice,
};
use std::net::Ipv4Addr;

/// Addressing and timing carried alongside the features into the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketMeta {
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    pub src_port: u16,
    pub dst_port: u16,
    pub protocol: u8,
    pub ttl: u8,
    /// Whole captured frame length
    pub length: usize,
    pub captured_at: DateTime<Local>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No IPv4 header (ARP, IPv6, truncated frame, ...)
    NoIpLayer,
    /// IPv4 but no readable TCP or UDP header on top (other protocol, truncated header,
    /// non-first fragment)
    UnsupportedTransport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Features { meta: PacketMeta, features: FeatureSet },
    Skip(SkipReason),
}

impl Extraction {
    pub fn is_skip(&self) -> bool {
        matches!(self, Extraction::Skip(_))
    }
}

const ETHERTYPE_IPV4: u16 = 0x0800;

/// Linux cooked capture v1 header length; protocol sits in the last two bytes.
const SLL_HEADER_LEN: usize = 16;
/// Linux cooked capture v2 header length; protocol sits in the first two bytes.
const SLL2_HEADER_LEN: usize = 20;

enum Transport {
    Tcp(TcpHeader),
    Udp(UdpHeader),
}

/// Slice the frame leniently: a short or inconsistent length field keeps whatever headers
/// could be read instead of discarding the packet.
fn slice(packet: &RawPacket) -> Option<LaxSlicedPacket<'_>> {
    let data = packet.data.as_slice();
    match packet.link {
        LinkLayer::Ethernet => LaxSlicedPacket::from_ethernet(data).ok(),
        LinkLayer::Ip => LaxSlicedPacket::from_ip(data).ok(),
        LinkLayer::LinuxSll => cooked_ipv4(data, 14, SLL_HEADER_LEN),
        LinkLayer::LinuxSll2 => cooked_ipv4(data, 0, SLL2_HEADER_LEN),
    }
}

fn cooked_ipv4(data: &[u8], proto_at: usize, header_len: usize) -> Option<LaxSlicedPacket<'_>> {
    let proto = data.get(proto_at..proto_at + 2)?;
    if u16::from_be_bytes([proto[0], proto[1]]) != ETHERTYPE_IPV4 {
        return None;
    }
    LaxSlicedPacket::from_ip(data.get(header_len..)?).ok()
}

/// TCP or UDP header on top of `ipv4`. A first fragment still starts with the transport
/// header, so it is read from the fragment payload when the slicer stopped short.
fn transport(sliced: &LaxSlicedPacket<'_>, ipv4: &LaxIpv4Slice<'_>) -> Option<Transport> {
    match &sliced.transport {
        Some(TransportSlice::Tcp(tcp)) => return Some(Transport::Tcp(tcp.to_header())),
        Some(TransportSlice::Udp(udp)) => return Some(Transport::Udp(udp.to_header())),
        Some(_) => return None,
        None => {}
    }
    if ipv4.header().fragments_offset().value() != 0 {
        return None;
    }
    let payload = ipv4.payload();
    match payload.ip_number {
        IpNumber::TCP => TcpHeaderSlice::from_slice(payload.payload)
            .ok()
            .map(|h| Transport::Tcp(h.to_header())),
        IpNumber::UDP => UdpHeaderSlice::from_slice(payload.payload)
            .ok()
            .map(|h| Transport::Udp(h.to_header())),
        _ => None,
    }
}

/// Extract features from one packet. Pure function of the packet bytes and stamp.
pub fn extract(packet: &RawPacket) -> Extraction {
    let Some(sliced) = slice(packet) else {
        return Extraction::Skip(SkipReason::NoIpLayer);
    };
    let Some(LaxNetSlice::Ipv4(ipv4)) = &sliced.net else {
        return Extraction::Skip(SkipReason::NoIpLayer);
    };

    let ip = ipv4.header();
    let mut features = FeatureSet::new();
    features.insert(names::IP_IHL, u32::from(ip.ihl()));
    features.insert(names::IP_TTL, u32::from(ip.ttl()));
    features.insert(names::IP_LEN, u32::from(ip.total_len()));
    features.insert(names::IP_FRAG, u32::from(ip_flags(ip.slice())));
    features.insert(names::PROTO, u32::from(ip.protocol().0));

    let (src_port, dst_port) = match transport(&sliced, ipv4) {
        Some(Transport::Tcp(tcp)) => {
            features.insert(names::WINDOW, u32::from(tcp.window_size));
            features.insert(names::FLAGS, u32::from(tcp_flags(&tcp)));
            (tcp.source_port, tcp.destination_port)
        }
        // UDP has no window or flags; they are defined as zero rather than left absent.
        Some(Transport::Udp(udp)) => {
            features.insert(names::WINDOW, 0);
            features.insert(names::FLAGS, 0);
            (udp.source_port, udp.destination_port)
        }
        None => return Extraction::Skip(SkipReason::UnsupportedTransport),
    };
    features.insert(names::SRC_PORT, u32::from(src_port));
    features.insert(names::DST_PORT, u32::from(dst_port));
    features.insert(names::PKT_LEN, packet.len() as u32);

    Extraction::Features {
        meta: PacketMeta {
            src_ip: ip.source_addr(),
            dst_ip: ip.destination_addr(),
            src_port,
            dst_port,
            protocol: ip.protocol().0,
            ttl: ip.ttl(),
            length: packet.len(),
            captured_at: packet.timestamp(),
        },
        features,
    }
}

/// The 3-bit IPv4 flags field: reserved, DF, MF.
fn ip_flags(header: &[u8]) -> u8 {
    header.get(6).map(|b| b >> 5).unwrap_or(0)
}

/// The 9-bit TCP flags field, NS in bit 8 down to FIN in bit 0.
fn tcp_flags(tcp: &TcpHeader) -> u16 {
    [
        (tcp.ns, 0x100),
        (tcp.cwr, 0x80),
        (tcp.ece, 0x40),
        (tcp.urg, 0x20),
        (tcp.ack, 0x10),
        (tcp.psh, 0x08),
        (tcp.rst, 0x04),
        (tcp.syn, 0x02),
        (tcp.fin, 0x01),
    ]
    .iter()
    .filter(|(set, _)| *set)
    .fold(0u16, |acc, (_, bit)| acc | bit)
}
