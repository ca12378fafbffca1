//! Verdicts and the immutable audit/broadcast event record.

use crate::features::PacketMeta;
use crate::model::Score;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

pub const TIMESTAMP_FORMAT: &str = "%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Normal,
    Attack,
}

impl Verdict {
    /// Class 0 is benign; every other class is some kind of attack.
    pub fn from_prediction(prediction: i64) -> Self {
        if prediction == 0 {
            Verdict::Normal
        } else {
            Verdict::Attack
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Normal => "Normal Traffic",
            Verdict::Attack => "ATTACK",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub ip: Ipv4Addr,
    pub port: u16,
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.ip, self.port)
    }
}

/// One classified packet. Built once, then shared read-only by the log sink and the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// `"{src_ip}-{dst_ip}"`
    pub id: String,
    pub timestamp: DateTime<Local>,
    pub src: Endpoint,
    pub dst: Endpoint,
    pub protocol: u8,
    pub prediction: i64,
    pub verdict: Verdict,
    pub packet_length: usize,
    pub ttl: u8,
}

/// Build the event for a scored packet. No I/O.
pub fn assemble(meta: &PacketMeta, score: Score) -> Event {
    Event {
        id: format!("{}-{}", meta.src_ip, meta.dst_ip),
        timestamp: meta.captured_at,
        src: Endpoint {
            ip: meta.src_ip,
            port: meta.src_port,
        },
        dst: Endpoint {
            ip: meta.dst_ip,
            port: meta.dst_port,
        },
        protocol: meta.protocol,
        prediction: score.prediction,
        verdict: score.verdict,
        packet_length: meta.length,
        ttl: meta.ttl,
    }
}

/// Wire and audit-log schema: one JSON object per event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub timestamp: String,
    pub src_ip: String,
    pub dst_ip: String,
    pub protocol: String,
    pub prediction: i64,
    pub label: String,
    pub packet_length: String,
    pub ttl: String,
}

impl From<&Event> for EventRecord {
    fn from(e: &Event) -> Self {
        Self {
            id: e.id.clone(),
            timestamp: e.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            src_ip: e.src.to_string(),
            dst_ip: e.dst.to_string(),
            protocol: e.protocol.to_string(),
            prediction: e.prediction,
            label: e.verdict.label().to_string(),
            packet_length: e.packet_length.to_string(),
            ttl: e.ttl.to_string(),
        }
    }
}

impl Event {
    pub fn to_record(&self) -> EventRecord {
        EventRecord::from(self)
    }

    /// Single-line JSON, as written to the log and sent to observers.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_record())
    }
}
