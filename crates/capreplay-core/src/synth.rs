//! Synthetic capture files.
//!
//! Small, deterministic PCAP and PCAPNG writers carrying Ethernet/IPv4/UDP
//! frames. Used by the `capture_fixtures` binary and by tests; nothing in the
//! replay path depends on them.

use std::fs;
use std::io;
use std::path::Path;

use etherparse::PacketBuilder;

const SNAPLEN: u32 = 65535;
const LINKTYPE_ETHERNET: u16 = 1;
const MICROS: u64 = 1_000_000;

const PCAP_MAGIC_MICROS: u32 = 0xa1b2_c3d4;
const PCAP_VERSION: (u16, u16) = (2, 4);

const BLOCK_SECTION_HEADER: u32 = 0x0A0D_0D0A;
const BLOCK_INTERFACE_DESCRIPTION: u32 = 1;
const BLOCK_ENHANCED_PACKET: u32 = 6;
const BYTE_ORDER_MAGIC: u32 = 0x1A2B_3C4D;
const OPT_END: u16 = 0;
const OPT_IF_TSRESOL: u16 = 9;

/// One record to write: capture timestamp in microseconds and frame bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthPacket {
    pub ts_us: u64,
    pub data: Vec<u8>,
}

impl SynthPacket {
    pub fn new(ts_us: u64, data: Vec<u8>) -> Self {
        Self { ts_us, data }
    }
}

/// `count` UDP frames, one per second, each with a distinct payload.
pub fn udp_sequence(count: usize) -> io::Result<Vec<SynthPacket>> {
    (0..count)
        .map(|idx| {
            let payload: Vec<u8> = (0..(8 + idx % 5)).map(|b| (idx + b) as u8).collect();
            let frame = udp_frame(4000 + idx as u16, &payload)?;
            Ok(SynthPacket::new(idx as u64 * MICROS, frame))
        })
        .collect()
}

/// Ethernet II / IPv4 / UDP frame from 10.0.0.1:4000 to 10.0.0.2:`dst_port`.
pub fn udp_frame(dst_port: u16, payload: &[u8]) -> io::Result<Vec<u8>> {
    let builder = PacketBuilder::ethernet2([0x02, 0, 0, 0, 0, 0x01], [0x02, 0, 0, 0, 0, 0x02])
        .ipv4([10, 0, 0, 1], [10, 0, 0, 2], 64)
        .udp(4000, dst_port);
    let mut frame = Vec::with_capacity(builder.size(payload.len()));
    builder.write(&mut frame, payload).map_err(io::Error::other)?;
    Ok(frame)
}

/// Legacy little-endian, microsecond PCAP with an Ethernet link type.
pub fn pcap_bytes(packets: &[SynthPacket]) -> Vec<u8> {
    let header = [
        PCAP_MAGIC_MICROS,
        u32::from(PCAP_VERSION.0) | (u32::from(PCAP_VERSION.1) << 16),
        0,
        0,
        SNAPLEN,
        u32::from(LINKTYPE_ETHERNET),
    ];
    let mut output: Vec<u8> = header.iter().flat_map(|w| w.to_le_bytes()).collect();
    for packet in packets {
        let len = packet.data.len() as u32;
        let record = [
            (packet.ts_us / MICROS) as u32,
            (packet.ts_us % MICROS) as u32,
            len,
            len,
        ];
        output.extend(record.iter().flat_map(|w| w.to_le_bytes()));
        output.extend_from_slice(&packet.data);
    }
    output
}

/// Little-endian PCAPNG with one Ethernet interface at microsecond resolution.
pub fn pcapng_bytes(packets: &[SynthPacket]) -> Vec<u8> {
    let mut writer = PcapngWriter::new().interface(LINKTYPE_ETHERNET, None);
    for packet in packets {
        writer = writer.packet(0, packet.ts_us, &packet.data);
    }
    writer.finish()
}

pub fn write_pcap(path: &Path, packets: &[SynthPacket]) -> io::Result<()> {
    fs::write(path, pcap_bytes(packets))
}

pub fn write_pcapng(path: &Path, packets: &[SynthPacket]) -> io::Result<()> {
    fs::write(path, pcapng_bytes(packets))
}

/// Block-at-a-time PCAPNG builder for captures the fixed writers cannot
/// express, such as several interfaces or a non-default `if_tsresol`.
#[derive(Debug)]
pub struct PcapngWriter {
    buf: Vec<u8>,
}

impl Default for PcapngWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PcapngWriter {
    /// Start a section with an unknown section length.
    pub fn new() -> Self {
        let mut writer = Self { buf: Vec::new() };
        writer.block(BLOCK_SECTION_HEADER, |body| {
            body.extend_from_slice(&BYTE_ORDER_MAGIC.to_le_bytes());
            body.extend_from_slice(&1u16.to_le_bytes());
            body.extend_from_slice(&0u16.to_le_bytes());
            body.extend_from_slice(&(-1i64).to_le_bytes());
        });
        writer
    }

    /// Describe the next interface. `tsresol` is the raw `if_tsresol` option
    /// byte; `None` leaves the microsecond default.
    pub fn interface(mut self, linktype: u16, tsresol: Option<u8>) -> Self {
        self.block(BLOCK_INTERFACE_DESCRIPTION, |body| {
            body.extend_from_slice(&linktype.to_le_bytes());
            body.extend_from_slice(&0u16.to_le_bytes());
            body.extend_from_slice(&SNAPLEN.to_le_bytes());
            if let Some(resol) = tsresol {
                body.extend_from_slice(&OPT_IF_TSRESOL.to_le_bytes());
                body.extend_from_slice(&1u16.to_le_bytes());
                body.extend_from_slice(&[resol, 0, 0, 0]);
                body.extend_from_slice(&OPT_END.to_le_bytes());
                body.extend_from_slice(&0u16.to_le_bytes());
            }
        });
        self
    }

    /// Append an Enhanced Packet Block. `ts` is in the interface's units.
    pub fn packet(mut self, if_id: u32, ts: u64, data: &[u8]) -> Self {
        self.block(BLOCK_ENHANCED_PACKET, |body| {
            let len = data.len() as u32;
            for word in [if_id, (ts >> 32) as u32, ts as u32, len, len] {
                body.extend_from_slice(&word.to_le_bytes());
            }
            body.extend_from_slice(data);
        });
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    /// Frame a block body written by `fill`, padding it to 32 bits.
    fn block(&mut self, block_type: u32, fill: impl FnOnce(&mut Vec<u8>)) {
        let start = self.buf.len();
        self.buf.extend_from_slice(&block_type.to_le_bytes());
        self.buf.extend_from_slice(&[0; 4]);
        fill(&mut self.buf);
        let padded = (self.buf.len() - start).next_multiple_of(4);
        self.buf.resize(start + padded, 0);
        let total = (padded + 4) as u32;
        self.buf.extend_from_slice(&total.to_le_bytes());
        self.buf[start + 4..start + 8].copy_from_slice(&total.to_le_bytes());
    }
}
