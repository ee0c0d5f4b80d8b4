use std::collections::BTreeSet;

use etherparse::SlicedPacket;
use pcap_parser::Linktype;
use tracing::{debug, warn};

use super::{PacketStatus, Runtime, RuntimeError};
use crate::source::Packet;

/// Runtime that checks each frame's link and network framing.
///
/// It does no per-protocol work; the status only says whether `etherparse`
/// could slice the frame for its link type.
#[derive(Debug, Default)]
pub struct FrameCheckRuntime;

/// State owned by [`FrameCheckRuntime`] for the lifetime of a run.
#[derive(Debug, Default)]
pub struct FrameCheckHandle {
    processed: u64,
    unsupported: BTreeSet<i32>,
}

impl FrameCheckHandle {
    pub fn processed(&self) -> u64 {
        self.processed
    }
}

impl FrameCheckRuntime {
    pub fn new() -> Self {
        Self
    }
}

impl Runtime for FrameCheckRuntime {
    type Handle = FrameCheckHandle;

    fn initialize(&mut self) -> Result<FrameCheckHandle, RuntimeError> {
        Ok(FrameCheckHandle::default())
    }

    fn process_packet(
        &mut self,
        handle: &mut FrameCheckHandle,
        packet: &Packet<'_>,
    ) -> PacketStatus {
        handle.processed += 1;
        let status = classify_frame(packet.linktype, packet.data, packet.is_snapped());
        if status == PacketStatus::Unsupported && handle.unsupported.insert(packet.linktype.0) {
            warn!(linktype = packet.linktype.0, "unsupported link type");
        }
        status
    }

    fn cleanup(&mut self, handle: FrameCheckHandle) -> Result<(), RuntimeError> {
        debug!(processed = handle.processed, "frame check runtime released");
        Ok(())
    }
}

/// Classify a captured frame.
///
/// Snapped frames that fail to slice are reported as truncated rather than
/// malformed.
pub fn classify_frame(linktype: Linktype, data: &[u8], snapped: bool) -> PacketStatus {
    if data.is_empty() {
        return PacketStatus::Truncated;
    }
    let sliced = match linktype {
        Linktype::ETHERNET => SlicedPacket::from_ethernet(data).is_ok(),
        Linktype::RAW | Linktype::IPV4 | Linktype::IPV6 => SlicedPacket::from_ip(data).is_ok(),
        Linktype::LINUX_SLL => SlicedPacket::from_linux_sll(data).is_ok(),
        _ => return PacketStatus::Unsupported,
    };
    match (sliced, snapped) {
        (true, _) => PacketStatus::Ok,
        (false, true) => PacketStatus::Truncated,
        (false, false) => PacketStatus::Malformed,
    }
}
