use std::fs::File;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use pcap_parser::{
    Block, LegacyPcapReader, Linktype, PcapBlockOwned, PcapNGReader, traits::PcapReaderIterator,
};

use crate::source::{Packet, PacketSource, Pass, SourceError, SourceOpener};

use super::error::PcapSourceError;
use super::layout;
use super::reader::{
    PcapngInterface, captured_bytes, interface_for_id, is_pcapng_magic, legacy_ts_to_seconds,
    pcapng_ts_to_seconds, read_magic_and_rewind,
};

/// Sequential reader over one PCAP or PCAPNG file.
///
/// Dropping the source closes the file.
pub struct PcapFileSource {
    inner: PcapReader,
}

enum PcapReader {
    Legacy {
        reader: LegacyPcapReader<File>,
        linktype: Option<Linktype>,
        nanosecond: bool,
    },
    Ng {
        reader: PcapNGReader<File>,
        interfaces: Vec<PcapngInterface>,
    },
}

enum Step {
    Dispatched(ControlFlow<()>),
    Eof,
}

impl PcapFileSource {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path).map_err(SourceError::from)?;
        let inner = create_reader(file).map_err(SourceError::from)?;
        Ok(Self { inner })
    }
}

impl PacketSource for PcapFileSource {
    fn for_each_packet<F>(&mut self, mut f: F) -> Result<Pass, SourceError>
    where
        F: FnMut(&Packet<'_>) -> ControlFlow<()>,
    {
        let mut packets = 0u64;
        loop {
            match dispatch_next(&mut self.inner, &mut f).map_err(SourceError::from)? {
                Step::Dispatched(ControlFlow::Continue(())) => packets += 1,
                Step::Dispatched(ControlFlow::Break(())) => {
                    return Ok(Pass::Stopped {
                        packets: packets + 1,
                    });
                }
                Step::Eof => return Ok(Pass::Exhausted { packets }),
            }
        }
    }
}

/// Opens [`PcapFileSource`]s for a fixed path.
#[derive(Debug, Clone)]
pub struct PcapFileOpener {
    path: PathBuf,
}

impl PcapFileOpener {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SourceOpener for PcapFileOpener {
    type Source = PcapFileSource;

    fn open(&self) -> Result<PcapFileSource, SourceError> {
        PcapFileSource::open(&self.path)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

fn create_reader(file: File) -> Result<PcapReader, PcapSourceError> {
    let mut file = file;
    let magic = read_magic_and_rewind(&mut file)?;

    if is_pcapng_magic(&magic) {
        let reader = PcapNGReader::new(layout::PCAP_READER_BUFFER_SIZE, file).map_err(|e| {
            PcapSourceError::Pcap {
                context: "pcapng reader init",
                message: e.to_string(),
            }
        })?;
        Ok(PcapReader::Ng {
            reader,
            interfaces: Vec::new(),
        })
    } else {
        let reader = LegacyPcapReader::new(layout::PCAP_READER_BUFFER_SIZE, file).map_err(|e| {
            PcapSourceError::Pcap {
                context: "pcap reader init",
                message: e.to_string(),
            }
        })?;
        Ok(PcapReader::Legacy {
            reader,
            linktype: None,
            nanosecond: false,
        })
    }
}

/// Lend the next packet to `f`, skipping non-packet blocks.
///
/// The packet borrows the reader buffer; the block is consumed only after
/// `f` has returned.
fn dispatch_next<F>(reader: &mut PcapReader, f: &mut F) -> Result<Step, PcapSourceError>
where
    F: FnMut(&Packet<'_>) -> ControlFlow<()>,
{
    loop {
        match reader {
            PcapReader::Legacy {
                reader,
                linktype,
                nanosecond,
            } => match reader.next() {
                Ok((offset, block)) => {
                    let flow = match block {
                        PcapBlockOwned::LegacyHeader(header) => {
                            *linktype = Some(header.network);
                            *nanosecond = header.is_nanosecond_precision();
                            None
                        }
                        PcapBlockOwned::Legacy(packet) => {
                            let view = Packet {
                                ts: Some(legacy_ts_to_seconds(
                                    packet.ts_sec,
                                    packet.ts_usec,
                                    *nanosecond,
                                )),
                                linktype: linktype.unwrap_or(Linktype::ETHERNET),
                                orig_len: packet.origlen,
                                data: captured_bytes(packet.data, packet.caplen),
                            };
                            Some(f(&view))
                        }
                        _ => None,
                    };
                    reader.consume(offset);
                    if let Some(flow) = flow {
                        return Ok(Step::Dispatched(flow));
                    }
                }
                Err(pcap_parser::PcapError::Eof) => return Ok(Step::Eof),
                Err(pcap_parser::PcapError::Incomplete(_)) => {
                    reader.refill().map_err(|e| PcapSourceError::Pcap {
                        context: "pcap reader refill",
                        message: e.to_string(),
                    })?;
                }
                Err(e) => {
                    return Err(PcapSourceError::Pcap {
                        context: "pcap reader next",
                        message: e.to_string(),
                    });
                }
            },
            PcapReader::Ng { reader, interfaces } => match reader.next() {
                Ok((offset, block)) => {
                    let flow = match block {
                        PcapBlockOwned::NG(Block::SectionHeader(_)) => {
                            interfaces.clear();
                            None
                        }
                        PcapBlockOwned::NG(Block::InterfaceDescription(intf)) => {
                            interfaces.push(PcapngInterface::from_block(&intf));
                            None
                        }
                        PcapBlockOwned::NG(Block::EnhancedPacket(packet)) => {
                            let interface = interface_for_id(interfaces, packet.if_id);
                            let view = Packet {
                                ts: Some(pcapng_ts_to_seconds(
                                    packet.ts_high,
                                    packet.ts_low,
                                    &interface,
                                )),
                                linktype: interface.linktype,
                                orig_len: packet.origlen,
                                data: captured_bytes(packet.data, packet.caplen),
                            };
                            Some(f(&view))
                        }
                        PcapBlockOwned::NG(Block::SimplePacket(packet)) => {
                            let view = Packet {
                                ts: None,
                                linktype: interface_for_id(interfaces, 0).linktype,
                                orig_len: packet.origlen,
                                data: captured_bytes(packet.data, packet.origlen),
                            };
                            Some(f(&view))
                        }
                        _ => None,
                    };
                    reader.consume(offset);
                    if let Some(flow) = flow {
                        return Ok(Step::Dispatched(flow));
                    }
                }
                Err(pcap_parser::PcapError::Eof) => return Ok(Step::Eof),
                Err(pcap_parser::PcapError::Incomplete(_)) => {
                    reader.refill().map_err(|e| PcapSourceError::Pcap {
                        context: "pcapng reader refill",
                        message: e.to_string(),
                    })?;
                }
                Err(e) => {
                    return Err(PcapSourceError::Pcap {
                        context: "pcapng reader next",
                        message: e.to_string(),
                    });
                }
            },
        }
    }
}
