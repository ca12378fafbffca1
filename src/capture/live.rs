//! Live interface capture through libpcap.

use super::{Captured, LinkLayer, PacketSource, RawPacket};
use crate::config::CaptureConfig;
use crate::error::CaptureError;
use std::time::{Duration, SystemTime};

pub struct LiveCapture {
    cap: pcap::Capture<pcap::Active>,
    link: LinkLayer,
    device: String,
}

fn pcap_err(e: pcap::Error) -> CaptureError {
    CaptureError::Pcap(e.to_string())
}

impl LiveCapture {
    /// Bind the configured interface (or the default device) and install the BPF filter.
    pub fn open(config: &CaptureConfig) -> Result<Self, CaptureError> {
        let device = match &config.interface {
            Some(name) => pcap::Device::from(name.as_str()),
            None => pcap::Device::lookup()
                .map_err(pcap_err)?
                .ok_or(CaptureError::NoSource)?,
        };
        let device_name = device.name.clone();

        let mut cap = pcap::Capture::from_device(device)
            .map_err(pcap_err)?
            .promisc(config.promiscuous)
            .snaplen(config.snaplen)
            .timeout(config.read_timeout_ms)
            .immediate_mode(true)
            .open()
            .map_err(pcap_err)?;
        cap.filter(&config.filter, true).map_err(pcap_err)?;

        let link = LinkLayer::from_dlt(cap.get_datalink().0 as u32)?;
        tracing::info!(device = %device_name, filter = %config.filter, ?link, "live capture started");

        Ok(Self {
            cap,
            link,
            device: device_name,
        })
    }
}

impl PacketSource for LiveCapture {
    fn next_packet(&mut self) -> Result<Captured, CaptureError> {
        match self.cap.next_packet() {
            Ok(packet) => {
                let ts = packet.header.ts;
                let captured_at = SystemTime::UNIX_EPOCH
                    + Duration::from_secs(ts.tv_sec as u64)
                    + Duration::from_micros(ts.tv_usec as u64);
                Ok(Captured::Packet(RawPacket::new(
                    packet.data.to_vec(),
                    self.link,
                    captured_at,
                )))
            }
            Err(pcap::Error::TimeoutExpired) => Ok(Captured::Idle),
            Err(pcap::Error::NoMorePackets) => Ok(Captured::Exhausted),
            Err(e) => Err(pcap_err(e)),
        }
    }

    fn describe(&self) -> String {
        format!("interface {}", self.device)
    }
}
