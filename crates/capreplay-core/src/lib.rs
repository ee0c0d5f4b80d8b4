//! capreplay core library: offline capture replay.
//!
//! A capture file is replayed packet by packet into a [`Runtime`], with every
//! outcome recorded by a [`Profiler`]. When the file is exhausted it is closed
//! and reopened, so a finite capture replays until an interrupt (or an
//! optional pass limit) stops the loop. Shutdown is cooperative at packet
//! granularity; a second interrupt kills the process.
//!
//! Layering:
//! - `source`: capture readers lending borrowed [`Packet`] views, plus the
//!   open/close/reopen lifecycle in [`CaptureSource`].
//! - `runtime` / `profile`: the collaborator interfaces and their default
//!   implementations.
//! - `shutdown`: the tri-state interrupt flag.
//! - `driver`: the dispatch loop tying them together.
//!
//! Invariants:
//! - A packet view never outlives the callback it is lent to.
//! - Runtime cleanup runs exactly once on every path except forced termination.
//! - No packet is dispatched after a shutdown request has been observed.
//!
//! # Examples
//! ```no_run
//! use std::sync::Arc;
//!
//! use capreplay_core::{
//!     DriverConfig, FrameCheckRuntime, PcapFileOpener, ShutdownController, StatsProfiler,
//!     install_interrupt_handler, run,
//! };
//!
//! let shutdown = Arc::new(ShutdownController::new());
//! install_interrupt_handler(Arc::clone(&shutdown))?;
//!
//! let mut runtime = FrameCheckRuntime::new();
//! let mut profiler = StatsProfiler::new();
//! let summary = run(
//!     PcapFileOpener::new("capture.pcapng"),
//!     &mut runtime,
//!     &mut profiler,
//!     shutdown.as_ref(),
//!     &DriverConfig::default(),
//! )?;
//! println!("{} packets over {} passes", summary.packets, summary.passes);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod driver;
mod profile;
mod runtime;
mod shutdown;
mod source;
#[doc(hidden)]
pub mod synth;

pub use driver::{DriverConfig, DriverError, DriverState, RunSummary, StopReason, run};
pub use profile::{ProfileSummary, Profiler, StatsProfiler, StatusCount};
pub use runtime::{
    FrameCheckHandle, FrameCheckRuntime, PacketStatus, Runtime, RuntimeError, classify_frame,
};
pub use shutdown::{
    FORCED_EXIT_CODE, NeverShutdown, ShutdownCheck, ShutdownController, ShutdownError,
    ShutdownState, install_interrupt_handler, on_interrupt,
};
pub use source::{
    CaptureSource, Packet, PacketSource, Pass, PcapFileOpener, PcapFileSource, SourceError,
    SourceOpener,
};

/// Re-exported so callers can name packet link types without a direct
/// `pcap-parser` dependency.
pub use pcap_parser::Linktype;
