use std::io::{Read, Seek, SeekFrom};

use super::error::PcapSourceError;
use super::layout;
use pcap_parser::{InterfaceDescriptionBlock, Linktype, build_ts_resolution};

/// Read the magic bytes and rewind the reader to the start.
///
/// # Examples
/// This helper is part of an internal module, so the example is marked as
/// text example.
/// ```text
/// use std::io::Cursor;
///
/// let bytes = [0x0a, 0x0d, 0x0d, 0x0a, 0x01];
/// let mut cursor = Cursor::new(bytes);
/// let magic = read_magic_and_rewind(&mut cursor).unwrap();
/// assert_eq!(magic, [0x0a, 0x0d, 0x0d, 0x0a]);
/// ```
///
/// # Errors
/// Returns `PcapSourceError::Io` when fewer than four bytes are available or
/// the reader cannot be rewound.
pub fn read_magic_and_rewind<R: Read + Seek>(reader: &mut R) -> Result<[u8; 4], PcapSourceError> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    reader.seek(SeekFrom::Start(0))?;
    Ok(magic)
}

pub fn is_pcapng_magic(magic: &[u8; 4]) -> bool {
    magic == &layout::PCAPNG_MAGIC
}

/// What packet blocks need to know about the interface they were captured on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcapngInterface {
    pub linktype: Linktype,
    /// Timestamp units per second.
    pub ts_resolution: u64,
    /// Seconds added to every timestamp on this interface.
    pub ts_offset: i64,
}

impl Default for PcapngInterface {
    fn default() -> Self {
        Self {
            linktype: Linktype::ETHERNET,
            ts_resolution: layout::PCAPNG_DEFAULT_TS_RESOLUTION,
            ts_offset: 0,
        }
    }
}

impl PcapngInterface {
    /// An unrepresentable `if_tsresol` falls back to microseconds.
    pub fn from_block(block: &InterfaceDescriptionBlock<'_>) -> Self {
        Self {
            linktype: block.linktype,
            ts_resolution: build_ts_resolution(block.if_tsresol)
                .unwrap_or(layout::PCAPNG_DEFAULT_TS_RESOLUTION),
            ts_offset: block.if_tsoffset,
        }
    }
}

/// Resolve the interface for a given interface id, defaulting to Ethernet
/// with microsecond timestamps.
pub fn interface_for_id(interfaces: &[PcapngInterface], if_id: u32) -> PcapngInterface {
    interfaces
        .get(if_id as usize)
        .copied()
        .unwrap_or_default()
}

/// Convert a PCAPNG high/low timestamp to seconds using the interface's
/// resolution and offset.
pub fn pcapng_ts_to_seconds(ts_high: u32, ts_low: u32, interface: &PcapngInterface) -> f64 {
    let ts = ((ts_high as u64) << 32) | (ts_low as u64);
    let resolution = interface.ts_resolution.max(1);
    let whole = ts / resolution;
    let frac = ts % resolution;
    interface.ts_offset as f64 + whole as f64 + frac as f64 / resolution as f64
}

/// Convert a legacy PCAP record timestamp to seconds.
///
/// The fractional part is in nanoseconds for nanosecond-precision files and
/// in microseconds otherwise.
pub fn legacy_ts_to_seconds(ts_sec: u32, ts_frac: u32, nanosecond: bool) -> f64 {
    let scale = if nanosecond {
        layout::SECONDS_PER_NANO
    } else {
        layout::SECONDS_PER_MICRO
    };
    ts_sec as f64 + ts_frac as f64 * scale
}

/// Trim block data down to the bytes that were actually captured.
///
/// PCAPNG packet bodies are padded to 32 bits; the padding must not leak into
/// the packet view.
pub fn captured_bytes(data: &[u8], caplen: u32) -> &[u8] {
    let len = (caplen as usize).min(data.len());
    &data[..len]
}

#[cfg(test)]
mod tests {
    use super::{
        PcapngInterface, captured_bytes, interface_for_id, is_pcapng_magic, legacy_ts_to_seconds,
        pcapng_ts_to_seconds, read_magic_and_rewind,
    };
    use crate::source::pcap::error::PcapSourceError;
    use pcap_parser::Linktype;
    use std::io::Cursor;
    use std::io::Read;

    #[test]
    fn detect_pcapng_magic() {
        assert!(is_pcapng_magic(&super::layout::PCAPNG_MAGIC));
        assert!(!is_pcapng_magic(&[0xd4, 0xc3, 0xb2, 0xa1]));
    }

    #[test]
    fn read_magic_rewinds() {
        let bytes = [0xd4, 0xc3, 0xb2, 0xa1, 0x02];
        let mut cursor = Cursor::new(bytes);
        let magic = read_magic_and_rewind(&mut cursor).unwrap();
        assert_eq!(magic, [0xd4, 0xc3, 0xb2, 0xa1]);
        let mut buf = [0u8; 1];
        cursor.read_exact(&mut buf).unwrap();
        assert_eq!(buf[0], 0xd4);
    }

    #[test]
    fn read_magic_too_short() {
        let mut cursor = Cursor::new([0x0a, 0x0d]);
        let err = read_magic_and_rewind(&mut cursor).unwrap_err();
        assert!(matches!(err, PcapSourceError::Io(_)));
    }

    #[test]
    fn interface_defaults_to_ethernet_when_missing() {
        let interfaces = [PcapngInterface {
            linktype: Linktype::RAW,
            ..PcapngInterface::default()
        }];
        assert_eq!(interface_for_id(&interfaces, 0).linktype, Linktype::RAW);
        let missing = interface_for_id(&interfaces, 3);
        assert_eq!(missing.linktype, Linktype::ETHERNET);
        assert_eq!(missing.ts_resolution, 1_000_000);
    }

    #[test]
    fn pcapng_ts_defaults_to_microseconds() {
        let seconds = pcapng_ts_to_seconds(0, 2_250_000, &PcapngInterface::default());
        assert!((seconds - 2.25).abs() < 1e-9);
    }

    #[test]
    fn pcapng_ts_honours_interface_resolution_and_offset() {
        let nanos = PcapngInterface {
            ts_resolution: 1_000_000_000,
            ..PcapngInterface::default()
        };
        let seconds = pcapng_ts_to_seconds(0, 1_500_000_000, &nanos);
        assert!((seconds - 1.5).abs() < 1e-9);

        let offset = PcapngInterface {
            ts_resolution: 1_000,
            ts_offset: 100,
            ..PcapngInterface::default()
        };
        let seconds = pcapng_ts_to_seconds(0, 2_500, &offset);
        assert!((seconds - 102.5).abs() < 1e-9);
    }

    #[test]
    fn legacy_ts_honours_precision() {
        let micros = legacy_ts_to_seconds(10, 500_000, false);
        assert!((micros - 10.5).abs() < 1e-9);
        let nanos = legacy_ts_to_seconds(10, 500_000_000, true);
        assert!((nanos - 10.5).abs() < 1e-9);
    }

    #[test]
    fn captured_bytes_strips_padding() {
        let data = [1u8, 2, 3, 0];
        assert_eq!(captured_bytes(&data, 3), &[1, 2, 3]);
        assert_eq!(captured_bytes(&data, 9), &data);
    }
}
