//! Capture sources.
//!
//! A source yields borrowed [`Packet`] views one pass at a time. The views
//! point into the reader's buffer and are only valid for the duration of the
//! callback they are handed to. [`CaptureSource`] adds the open/close/reopen
//! lifecycle used by the dispatch loop.

mod capture;
mod pcap;

pub use capture::CaptureSource;
pub use pcap::{PcapFileOpener, PcapFileSource};

use std::ops::ControlFlow;

use pcap_parser::Linktype;
use thiserror::Error;

/// Borrowed view of one captured frame.
///
/// `data` holds exactly the captured bytes; `orig_len` is the length the
/// frame had on the wire, which is larger when the capture was snapped.
#[derive(Debug, Clone, Copy)]
pub struct Packet<'a> {
    pub ts: Option<f64>,
    pub linktype: Linktype,
    pub orig_len: u32,
    pub data: &'a [u8],
}

impl Packet<'_> {
    /// Number of captured bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True when fewer bytes were captured than were seen on the wire.
    pub fn is_snapped(&self) -> bool {
        (self.data.len() as u64) < u64::from(self.orig_len)
    }
}

/// Outcome of one iteration over a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// End of file reached after `packets` packets.
    Exhausted { packets: u64 },
    /// The callback broke out after `packets` packets (the last one included).
    Stopped { packets: u64 },
}

impl Pass {
    pub fn packets(&self) -> u64 {
        match self {
            Pass::Exhausted { packets } | Pass::Stopped { packets } => *packets,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Pass::Exhausted { .. })
    }
}

/// A finite, ordered sequence of stored packets.
pub trait PacketSource {
    /// Hand every remaining packet to `f`, in file order, until the source is
    /// exhausted or `f` returns [`ControlFlow::Break`].
    ///
    /// # Errors
    /// Returns `SourceError` when the underlying capture cannot be read or
    /// parsed. Packets dispatched before the failure are not reported.
    fn for_each_packet<F>(&mut self, f: F) -> Result<Pass, SourceError>
    where
        F: FnMut(&Packet<'_>) -> ControlFlow<()>;
}

/// Something that can (re)open the same packet source from its beginning.
pub trait SourceOpener {
    type Source: PacketSource;

    /// Open a fresh source positioned at the first packet.
    ///
    /// # Errors
    /// Returns `SourceError` when the backing capture is missing, unreadable
    /// or not a valid capture.
    fn open(&self) -> Result<Self::Source, SourceError>;

    /// Human readable name of the backing capture, used in logs.
    fn describe(&self) -> String;
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PCAP parse error: {0}")]
    Pcap(String),
}

impl From<pcap::error::PcapSourceError> for SourceError {
    fn from(value: pcap::error::PcapSourceError) -> Self {
        match value {
            pcap::error::PcapSourceError::Io(err) => SourceError::Io(err),
            pcap::error::PcapSourceError::Pcap { context, message } => {
                SourceError::Pcap(format!("{context}: {message}"))
            }
        }
    }
}
