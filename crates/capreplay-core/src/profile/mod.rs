//! Per-packet profiling.
//!
//! The dispatch loop calls [`Profiler::record`] once per packet, right after
//! the runtime returned its status. Recording is infallible by contract.

mod stats;

pub use stats::{ProfileSummary, StatsProfiler, StatusCount};

use crate::runtime::PacketStatus;

pub trait Profiler {
    /// Begin accumulating. Called once, before the first packet.
    fn start(&mut self);

    /// Account for one dispatched packet of `len` captured bytes.
    fn record(&mut self, len: usize, status: PacketStatus);
}
