//! Integration test: config, feature extraction, vectorization, scoring, events, audit log.

mod common;

use common::*;
use nids_agent::{
    config::{ModelConfig, NidsConfig},
    error::ModelError,
    event::{assemble, EventRecord, Verdict},
    features::{extract, names, Extraction, FeatureOrder, FeatureSet, SkipReason, Vectorizer},
    model::{ModelArtifacts, Scorer, StandardScaler},
    storage::EventLog,
};
use std::path::Path;

fn features_of(frame: Vec<u8>) -> (nids_agent::features::PacketMeta, FeatureSet) {
    match extract(&packet(frame)) {
        Extraction::Features { meta, features } => (meta, features),
        Extraction::Skip(reason) => panic!("unexpected skip: {:?}", reason),
    }
}

#[test]
fn config_load_default() {
    let c = NidsConfig::load(Path::new("nonexistent.json")).unwrap();
    assert_eq!(c.server.listen_addr, "127.0.0.1:8765");
    assert_eq!(c.capture.filter, "ip");
    assert!(c.capture.exit_on_error);
}

#[test]
fn config_malformed_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(NidsConfig::load(&path).is_err());
}

#[test]
fn non_ip_packets_are_skipped() {
    assert_eq!(
        extract(&packet(arp_frame())),
        Extraction::Skip(SkipReason::NoIpLayer)
    );
    assert_eq!(
        extract(&packet(ipv6_udp_frame())),
        Extraction::Skip(SkipReason::NoIpLayer)
    );
    assert_eq!(
        extract(&packet(vec![0u8; 6])),
        Extraction::Skip(SkipReason::NoIpLayer)
    );
}

#[test]
fn ip_without_tcp_or_udp_is_skipped() {
    assert_eq!(
        extract(&packet(icmp_frame())),
        Extraction::Skip(SkipReason::UnsupportedTransport)
    );
}

#[test]
fn tcp_features() {
    let frame = tcp_frame();
    let frame_len = frame.len() as u32;
    let (meta, f) = features_of(frame);
    assert_eq!(f.get(names::IP_IHL), Some(5));
    assert_eq!(f.get(names::IP_TTL), Some(64));
    assert_eq!(f.get(names::IP_LEN), Some(60));
    assert_eq!(f.get(names::PROTO), Some(6));
    assert_eq!(f.get(names::SRC_PORT), Some(443));
    assert_eq!(f.get(names::DST_PORT), Some(51000));
    assert_eq!(f.get(names::WINDOW), Some(8192));
    assert_eq!(f.get(names::FLAGS), Some(0x18));
    assert_eq!(f.get(names::PKT_LEN), Some(frame_len));
    assert!(f.contains(names::IP_FRAG));
    assert_eq!(meta.src_ip.to_string(), "192.168.1.10");
    assert_eq!(meta.dst_port, 51000);
}

/// Byte offsets of the IPv4 flags/fragment-offset word inside [`tcp_frame`].
const FRAG_HI: usize = 14 + 6;
const FRAG_LO: usize = 14 + 7;

#[test]
fn first_fragment_keeps_transport_features() {
    let mut frame = tcp_frame();
    frame[FRAG_HI] |= 0x20; // MF, offset 0
    let (meta, f) = features_of(frame);
    assert_eq!(f.get(names::IP_FRAG).map(|v| v & 1), Some(1));
    assert_eq!(f.get(names::SRC_PORT), Some(443));
    assert_eq!(f.get(names::DST_PORT), Some(51000));
    assert_eq!(f.get(names::WINDOW), Some(8192));
    assert_eq!(f.get(names::FLAGS), Some(0x18));
    assert_eq!(meta.protocol, 6);

    let builder = etherparse::PacketBuilder::ethernet2(SRC_MAC, DST_MAC)
        .ipv4([10, 0, 0, 53], [10, 0, 0, 7], 128)
        .udp(53, 40000);
    let mut udp = Vec::new();
    builder.write(&mut udp, &[0u8; 12]).unwrap();
    udp[FRAG_HI] |= 0x20;
    let (_, f) = features_of(udp);
    assert_eq!(f.get(names::SRC_PORT), Some(53));
    assert_eq!(f.get(names::FLAGS), Some(0));
}

#[test]
fn later_fragment_has_no_transport() {
    let mut frame = tcp_frame();
    frame[FRAG_HI] |= 0x20;
    frame[FRAG_LO] = 3; // offset 24 bytes
    assert_eq!(
        extract(&packet(frame)),
        Extraction::Skip(SkipReason::UnsupportedTransport)
    );
}

#[test]
fn truncated_transport_header_is_not_a_missing_ip_layer() {
    let mut frame = tcp_frame();
    frame.truncate(14 + 20 + 10);
    assert_eq!(
        extract(&packet(frame)),
        Extraction::Skip(SkipReason::UnsupportedTransport)
    );
}

#[test]
fn linux_cooked_captures_extract_like_ethernet() {
    let (_, from_eth) = features_of(tcp_frame());
    for raw in [sll_tcp_packet(), sll2_tcp_packet()] {
        let frame_len = raw.len() as u32;
        let Extraction::Features { meta, features } = extract(&raw) else {
            panic!("cooked frame should extract: {:?}", raw.link);
        };
        assert_eq!(meta.src_ip.to_string(), "192.168.1.10");
        assert_eq!(meta.src_port, 443);
        assert_eq!(features.get(names::FLAGS), Some(0x18));
        assert_eq!(features.get(names::IP_LEN), Some(60));
        assert_eq!(features.get(names::PKT_LEN), Some(frame_len));
        for name in [names::IP_TTL, names::WINDOW, names::DST_PORT, names::PROTO] {
            assert_eq!(features.get(name), from_eth.get(name), "{}", name);
        }
    }
}

#[test]
fn udp_window_and_flags_are_explicit_zero() {
    let (_, f) = features_of(udp_frame());
    assert!(f.contains(names::WINDOW));
    assert!(f.contains(names::FLAGS));
    assert_eq!(f.get(names::WINDOW), Some(0));
    assert_eq!(f.get(names::FLAGS), Some(0));
    assert_eq!(f.get(names::SRC_PORT), Some(53));
    assert_eq!(f.get(names::DST_PORT), Some(40000));
    assert_eq!(f.get(names::PROTO), Some(17));
}

#[test]
fn vectorize_follows_order_and_fills_missing_with_zero() {
    let mut set = FeatureSet::new();
    set.insert(names::IP_TTL, 64);
    set.insert(names::DST_PORT, 80);
    let order = FeatureOrder::new(["Dst_Port", "Unknown_Column", "IP_TTL", "Window"]);
    let v = Vectorizer::new(order.clone()).vectorize(&set);
    assert_eq!(v.len(), order.len());
    assert_eq!(v.values, vec![80.0, 0.0, 64.0, 0.0]);

    let empty = Vectorizer::new(FeatureOrder::new(Vec::<String>::new())).vectorize(&set);
    assert!(empty.is_empty());
}

#[test]
fn score_is_deterministic() {
    let order = feature_order();
    let mean = vec![32.0; order.len()];
    let scale = vec![4.0; order.len()];
    let scorer = Scorer::new(
        Box::new(StandardScaler::new(mean, scale).unwrap()),
        Box::new(ThresholdClassifier),
        order.len(),
    );
    let (_, f) = features_of(tcp_frame());
    let v = Vectorizer::new(order).vectorize(&f);
    let first = scorer.score(&v).unwrap();
    for _ in 0..10 {
        assert_eq!(scorer.score(&v).unwrap(), first);
    }
}

#[test]
fn score_rejects_bad_vectors() {
    let scorer = scorer(FixedClassifier(0));
    let short = nids_agent::FeatureVector { values: vec![1.0; 3] };
    assert!(matches!(
        scorer.score(&short),
        Err(ModelError::InvalidDimension { got: 3, .. })
    ));
    let mut values = vec![0.0; scorer.dim()];
    values[2] = f32::INFINITY;
    let bad = nids_agent::FeatureVector { values };
    assert!(matches!(scorer.score(&bad), Err(ModelError::NonFinite(2))));
}

#[test]
fn any_nonzero_class_is_attack() {
    assert_eq!(Verdict::from_prediction(0), Verdict::Normal);
    assert_eq!(Verdict::from_prediction(1), Verdict::Attack);
    assert_eq!(Verdict::from_prediction(4), Verdict::Attack);
    assert_eq!(Verdict::Attack.label(), "ATTACK");
}

#[test]
fn tcp_scenario_normal_and_attack() {
    let order = feature_order();
    let (meta, f) = features_of(tcp_frame());
    let v = Vectorizer::new(order).vectorize(&f);

    let normal = assemble(&meta, scorer(FixedClassifier(0)).score(&v).unwrap()).to_record();
    assert_eq!(normal.label, "Normal Traffic");
    assert_eq!(normal.prediction, 0);
    assert_eq!(normal.ttl, "64");
    assert_eq!(normal.protocol, "6");
    assert_eq!(normal.id, "192.168.1.10-10.0.0.5");
    assert_eq!(normal.src_ip, "192.168.1.10-443");
    assert_eq!(normal.dst_ip, "10.0.0.5-51000");

    let attack = assemble(&meta, scorer(FixedClassifier(1)).score(&v).unwrap()).to_record();
    assert_eq!(attack.label, "ATTACK");
    assert_eq!(attack.prediction, 1);
}

#[test]
fn event_record_round_trip_preserves_types() {
    let (meta, f) = features_of(udp_frame());
    let v = Vectorizer::new(feature_order()).vectorize(&f);
    let event = assemble(&meta, scorer(FixedClassifier(2)).score(&v).unwrap());

    let json = event.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(value["prediction"].is_i64());
    for key in ["id", "timestamp", "src_ip", "dst_ip", "protocol", "label", "packet_length", "ttl"] {
        assert!(value[key].is_string(), "{} should be a string", key);
    }
    let timestamp = value["timestamp"].as_str().unwrap();
    assert_eq!(timestamp.len(), "01-31 23:59:59".len());

    let parsed: EventRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, event.to_record());
}

#[test]
fn event_log_appends_one_line_per_event() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nids_logs.json");
    let (meta, f) = features_of(tcp_frame());
    let v = Vectorizer::new(feature_order()).vectorize(&f);
    let event = assemble(&meta, scorer(FixedClassifier(0)).score(&v).unwrap());

    let mut log = EventLog::open(&path);
    log.append(&event).unwrap();
    log.append(&event).unwrap();
    drop(log);
    let mut reopened = EventLog::open(&path);
    reopened.append(&event).unwrap();

    let data = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = data.lines().collect();
    assert_eq!(lines.len(), 3);
    for line in lines {
        let record: EventRecord = serde_json::from_str(line).unwrap();
        assert_eq!(record, event.to_record());
    }
}

#[test]
fn event_log_failure_is_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("nids_logs.json");
    let (meta, f) = features_of(tcp_frame());
    let v = Vectorizer::new(feature_order()).vectorize(&f);
    let event = assemble(&meta, scorer(FixedClassifier(0)).score(&v).unwrap());

    let mut log = EventLog::open(&path);
    assert!(log.append(&event).is_err());
    // Directory appears later: the sink recovers on the next append.
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    log.append(&event).unwrap();
}

fn write_feature_order(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("features.json");
    std::fs::write(&path, serde_json::to_string(&names::ALL).unwrap()).unwrap();
    path
}

#[test]
fn missing_scaler_is_fatal_at_startup() {
    let dir = tempfile::tempdir().unwrap();
    let config = ModelConfig {
        model_path: dir.path().join("model.onnx"),
        scaler_path: dir.path().join("scaler.json"),
        feature_order_path: write_feature_order(dir.path()),
    };
    match ModelArtifacts::load(&config) {
        Err(ModelError::Artifact { path, .. }) => assert_eq!(path, config.scaler_path),
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("load should fail without a scaler"),
    }
}

#[test]
fn malformed_scaler_is_fatal_at_startup() {
    let dir = tempfile::tempdir().unwrap();
    let scaler_path = dir.path().join("scaler.json");
    std::fs::write(&scaler_path, r#"{"mean": [0.0, "#).unwrap();
    let config = ModelConfig {
        model_path: dir.path().join("model.onnx"),
        scaler_path: scaler_path.clone(),
        feature_order_path: write_feature_order(dir.path()),
    };
    assert!(matches!(
        ModelArtifacts::load(&config),
        Err(ModelError::Artifact { path, .. }) if path == scaler_path
    ));
}

#[test]
fn scaler_width_must_match_feature_order() {
    let dir = tempfile::tempdir().unwrap();
    let scaler_path = dir.path().join("scaler.json");
    std::fs::write(&scaler_path, r#"{"mean": [0.0, 1.0], "scale": [1.0, 1.0]}"#).unwrap();
    let config = ModelConfig {
        model_path: dir.path().join("model.onnx"),
        scaler_path,
        feature_order_path: write_feature_order(dir.path()),
    };
    assert!(ModelArtifacts::load(&config).is_err());
}

#[test]
fn empty_feature_order_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("features.json");
    std::fs::write(&path, "[]").unwrap();
    assert!(FeatureOrder::load(&path).is_err());
}
