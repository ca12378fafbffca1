//! Shared fixtures: synthesized packets and stub classifiers.

#![allow(dead_code)]

use etherparse::PacketBuilder;
use ndarray::Array2;
use nids_agent::capture::{LinkLayer, RawPacket};
use nids_agent::error::ModelError;
use nids_agent::features::{names, FeatureOrder};
use nids_agent::model::{Classifier, Scorer, StandardScaler};

pub const SRC_MAC: [u8; 6] = [0x02, 0, 0, 0, 0, 0x01];
pub const DST_MAC: [u8; 6] = [0x02, 0, 0, 0, 0, 0x02];

/// TCP 192.168.1.10:443 → 10.0.0.5:51000, ttl 64, PSH|ACK, window 8192, IP total length 60.
pub fn tcp_frame() -> Vec<u8> {
    let builder = PacketBuilder::ethernet2(SRC_MAC, DST_MAC)
        .ipv4([192, 168, 1, 10], [10, 0, 0, 5], 64)
        .tcp(443, 51000, 1000, 8192)
        .psh()
        .ack(2000);
    let payload = [0u8; 20];
    let mut buf = Vec::with_capacity(builder.size(payload.len()));
    builder.write(&mut buf, &payload).unwrap();
    buf
}

/// UDP 10.0.0.53:53 → 10.0.0.7:40000, ttl 128.
pub fn udp_frame() -> Vec<u8> {
    let builder = PacketBuilder::ethernet2(SRC_MAC, DST_MAC)
        .ipv4([10, 0, 0, 53], [10, 0, 0, 7], 128)
        .udp(53, 40000);
    let payload = [0u8; 12];
    let mut buf = Vec::with_capacity(builder.size(payload.len()));
    builder.write(&mut buf, &payload).unwrap();
    buf
}

pub fn icmp_frame() -> Vec<u8> {
    let builder = PacketBuilder::ethernet2(SRC_MAC, DST_MAC)
        .ipv4([10, 0, 0, 1], [10, 0, 0, 2], 64)
        .icmpv4_echo_request(1, 1);
    let payload = [0u8; 8];
    let mut buf = Vec::with_capacity(builder.size(payload.len()));
    builder.write(&mut buf, &payload).unwrap();
    buf
}

pub fn ipv6_udp_frame() -> Vec<u8> {
    let builder = PacketBuilder::ethernet2(SRC_MAC, DST_MAC)
        .ipv6([0xfe; 16], [0xfd; 16], 64)
        .udp(5353, 5353);
    let payload = [0u8; 4];
    let mut buf = Vec::with_capacity(builder.size(payload.len()));
    builder.write(&mut buf, &payload).unwrap();
    buf
}

/// Ethernet II frame carrying an ARP request.
pub fn arp_frame() -> Vec<u8> {
    let mut buf = Vec::with_capacity(42);
    buf.extend_from_slice(&DST_MAC);
    buf.extend_from_slice(&SRC_MAC);
    buf.extend_from_slice(&[0x08, 0x06]);
    buf.extend_from_slice(&[0, 1, 0x08, 0, 6, 4, 0, 1]);
    buf.extend_from_slice(&[0u8; 20]);
    buf
}

/// Bare IPv4/TCP packet (no link header), same addressing as [`tcp_frame`].
pub fn ipv4_tcp_bytes() -> Vec<u8> {
    let builder = PacketBuilder::ipv4([192, 168, 1, 10], [10, 0, 0, 5], 64)
        .tcp(443, 51000, 1000, 8192)
        .psh()
        .ack(2000);
    let payload = [0u8; 20];
    let mut buf = Vec::with_capacity(builder.size(payload.len()));
    builder.write(&mut buf, &payload).unwrap();
    buf
}

/// Linux cooked capture (DLT 113) around [`ipv4_tcp_bytes`].
pub fn sll_tcp_packet() -> RawPacket {
    let mut data = vec![0, 0, 0, 1, 0, 6, 0x02, 0, 0, 0, 0, 0x01, 0, 0, 0x08, 0x00];
    data.extend(ipv4_tcp_bytes());
    RawPacket::new(data, LinkLayer::LinuxSll, std::time::SystemTime::now())
}

/// Linux cooked capture v2 (DLT 276) around [`ipv4_tcp_bytes`].
pub fn sll2_tcp_packet() -> RawPacket {
    let mut data = vec![0x08, 0x00, 0, 0, 0, 0, 0, 2, 0, 1, 0, 6];
    data.extend_from_slice(&[0x02, 0, 0, 0, 0, 0x01, 0, 0]);
    data.extend(ipv4_tcp_bytes());
    RawPacket::new(data, LinkLayer::LinuxSll2, std::time::SystemTime::now())
}

pub fn packet(frame: Vec<u8>) -> RawPacket {
    RawPacket::ethernet(frame)
}

/// Training column order used throughout the tests.
pub fn feature_order() -> FeatureOrder {
    FeatureOrder::new(names::ALL)
}

/// Always answers with the same class.
pub struct FixedClassifier(pub i64);

impl Classifier for FixedClassifier {
    fn predict(&self, batch: Array2<f32>) -> Result<Vec<i64>, ModelError> {
        Ok(vec![self.0; batch.nrows()])
    }
}

/// Class 1 when the first scaled column is positive.
pub struct ThresholdClassifier;

impl Classifier for ThresholdClassifier {
    fn predict(&self, batch: Array2<f32>) -> Result<Vec<i64>, ModelError> {
        Ok(batch.rows().into_iter().map(|r| i64::from(r[0] > 0.0)).collect())
    }
}

pub struct FailingClassifier;

impl Classifier for FailingClassifier {
    fn predict(&self, _batch: Array2<f32>) -> Result<Vec<i64>, ModelError> {
        Err(ModelError::Inference("backend unavailable".to_string()))
    }
}

pub fn scorer(classifier: impl Classifier + 'static) -> Scorer {
    let dim = feature_order().len();
    Scorer::new(
        Box::new(StandardScaler::identity(dim)),
        Box::new(classifier),
        dim,
    )
}
