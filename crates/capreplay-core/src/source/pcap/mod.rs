//! PCAP/PCAPNG source implementation.
//!
//! This module provides a `PacketSource` backed by PCAP or PCAPNG files. It
//! handles file I/O and low-level block parsing, lending each packet straight
//! out of the reader buffer without copying it.

pub mod error;
pub mod layout;
pub mod parser;
pub mod reader;

pub use parser::{PcapFileOpener, PcapFileSource};
