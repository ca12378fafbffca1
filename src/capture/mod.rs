//! Packet sources: pcap replay, and live interface capture behind `live-capture`.
//! Each source yields raw frames one at a time; the capture loop owns every frame only for
//! the duration of one extraction.

mod file;
#[cfg(feature = "live-capture")]
mod live;

pub use file::PcapFileSource;
#[cfg(feature = "live-capture")]
pub use live::LiveCapture;

use crate::config::CaptureConfig;
use crate::error::CaptureError;
use chrono::{DateTime, Local};
use std::time::SystemTime;

/// Framing of the bytes in a [`RawPacket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkLayer {
    /// Ethernet II frame
    Ethernet,
    /// Bare IP packet (DLT_RAW and friends)
    Ip,
    /// Linux cooked capture v1, 16-byte header (`-i any`)
    LinuxSll,
    /// Linux cooked capture v2, 20-byte header
    LinuxSll2,
}

impl LinkLayer {
    /// Map a pcap DLT number to a supported framing.
    pub fn from_dlt(dlt: u32) -> Result<Self, CaptureError> {
        match dlt {
            1 => Ok(LinkLayer::Ethernet),
            12 | 14 | 101 | 228 => Ok(LinkLayer::Ip),
            113 => Ok(LinkLayer::LinuxSll),
            276 => Ok(LinkLayer::LinuxSll2),
            other => Err(CaptureError::UnsupportedLink(format!("DLT {}", other))),
        }
    }
}

/// One captured frame with its capture time.
#[derive(Debug, Clone)]
pub struct RawPacket {
    pub data: Vec<u8>,
    pub link: LinkLayer,
    pub captured_at: SystemTime,
}

impl RawPacket {
    pub fn new(data: Vec<u8>, link: LinkLayer, captured_at: SystemTime) -> Self {
        Self {
            data,
            link,
            captured_at,
        }
    }

    /// Ethernet frame stamped with the current wall clock.
    pub fn ethernet(data: Vec<u8>) -> Self {
        Self::new(data, LinkLayer::Ethernet, SystemTime::now())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        DateTime::<Local>::from(self.captured_at)
    }
}

/// Outcome of one read from a [`PacketSource`].
#[derive(Debug)]
pub enum Captured {
    Packet(RawPacket),
    /// Read timeout on a quiet link; lets the caller check for shutdown
    Idle,
    /// No more packets will arrive
    Exhausted,
}

/// A blocking producer of raw packets.
pub trait PacketSource: Send {
    fn next_packet(&mut self) -> Result<Captured, CaptureError>;

    /// Human-readable description for logs.
    fn describe(&self) -> String;
}

/// Open the source selected by config: a pcap file wins over a live interface.
pub fn open_source(config: &CaptureConfig) -> Result<Box<dyn PacketSource>, CaptureError> {
    if let Some(path) = &config.pcap_file {
        return Ok(Box::new(PcapFileSource::open(path)?));
    }
    open_live(config)
}

#[cfg(feature = "live-capture")]
fn open_live(config: &CaptureConfig) -> Result<Box<dyn PacketSource>, CaptureError> {
    Ok(Box::new(LiveCapture::open(config)?))
}

#[cfg(not(feature = "live-capture"))]
fn open_live(_config: &CaptureConfig) -> Result<Box<dyn PacketSource>, CaptureError> {
    tracing::error!("built without `live-capture`; set capture.pcap_file to replay a capture");
    Err(CaptureError::NoSource)
}

/// In-memory source, drained front to back. Used for replaying synthesized traffic.
#[derive(Debug, Default)]
pub struct VecSource {
    packets: std::collections::VecDeque<RawPacket>,
}

impl VecSource {
    pub fn new(packets: Vec<RawPacket>) -> Self {
        Self {
            packets: packets.into(),
        }
    }
}

impl PacketSource for VecSource {
    fn next_packet(&mut self) -> Result<Captured, CaptureError> {
        Ok(self
            .packets
            .pop_front()
            .map_or(Captured::Exhausted, Captured::Packet))
    }

    fn describe(&self) -> String {
        format!("memory ({} queued)", self.packets.len())
    }
}
