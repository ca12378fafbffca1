//! Offline replay of a pcap file.

use super::{Captured, LinkLayer, PacketSource, RawPacket};
use crate::error::CaptureError;
use pcap_file::pcap::PcapReader;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub struct PcapFileSource {
    reader: PcapReader<BufReader<File>>,
    link: LinkLayer,
    path: PathBuf,
}

impl PcapFileSource {
    pub fn open(path: &Path) -> Result<Self, CaptureError> {
        let file = File::open(path)?;
        let reader =
            PcapReader::new(BufReader::new(file)).map_err(|e| CaptureError::Pcap(e.to_string()))?;
        let dlt: u32 = reader.header().datalink.into();
        let link = LinkLayer::from_dlt(dlt)?;
        tracing::info!(path = %path.display(), ?link, "replaying pcap file");
        Ok(Self {
            reader,
            link,
            path: path.to_path_buf(),
        })
    }
}

impl PacketSource for PcapFileSource {
    fn next_packet(&mut self) -> Result<Captured, CaptureError> {
        match self.reader.next_packet() {
            None => Ok(Captured::Exhausted),
            Some(Err(e)) => Err(CaptureError::Pcap(e.to_string())),
            Some(Ok(packet)) => {
                let captured_at = SystemTime::UNIX_EPOCH + packet.timestamp;
                Ok(Captured::Packet(RawPacket::new(
                    packet.data.into_owned(),
                    self.link,
                    captured_at,
                )))
            }
        }
    }

    fn describe(&self) -> String {
        format!("pcap file {}", self.path.display())
    }
}
