//! Dispatch loop.
//!
//! ```text
//! Starting --init+open--> Looping --interrupt / pass limit / source failure--> Draining --> Stopped
//!                           ^   |
//!                           +---+ exhausted: close + reopen
//! ```
//!
//! Every packet goes to the runtime, then to the profiler, and only then is
//! the shutdown flag polled. An interrupt therefore never cuts a packet short
//! but no packet is dispatched after the poll that observed it.

use std::ops::ControlFlow;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::profile::Profiler;
use crate::runtime::{Runtime, RuntimeError};
use crate::shutdown::ShutdownCheck;
use crate::source::{CaptureSource, SourceError, SourceOpener};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Starting,
    Looping,
    Draining,
    Stopped,
}

#[derive(Debug, Clone, Default)]
pub struct DriverConfig {
    /// Stop cleanly after this many complete passes. `None` replays forever.
    pub max_passes: Option<u64>,
}

/// Why a run stopped cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Interrupted,
    PassLimit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Complete passes over the capture.
    pub passes: u64,
    /// Packets dispatched across all passes.
    pub packets: u64,
    /// Successful opens of the capture, the first one included.
    pub opens: u64,
    pub stop: StopReason,
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Init(RuntimeError),
    #[error("cannot open capture {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: SourceError,
    },
    #[error("capture {path} became unreadable: {source}")]
    Source {
        path: String,
        #[source]
        source: SourceError,
    },
    #[error(transparent)]
    Cleanup(RuntimeError),
}

enum Drain {
    Stop(StopReason),
    SourceFailed(SourceError),
}

/// Replay the capture behind `opener` through `runtime` until told to stop.
///
/// # Errors
/// - `DriverError::Init` when the runtime cannot start; nothing is opened.
/// - `DriverError::Open` when the first open fails; the runtime is cleaned up.
/// - `DriverError::Source` when the capture fails to read or reopen mid-run;
///   the loop drains normally first.
/// - `DriverError::Cleanup` when runtime teardown fails; takes precedence over
///   a source failure.
pub fn run<O, R, P, C>(
    opener: O,
    runtime: &mut R,
    profiler: &mut P,
    shutdown: &C,
    config: &DriverConfig,
) -> Result<RunSummary, DriverError>
where
    O: SourceOpener,
    R: Runtime,
    P: Profiler,
    C: ShutdownCheck + ?Sized,
{
    let mut state = DriverState::Starting;
    let path = opener.describe();

    let mut handle = runtime.initialize().map_err(DriverError::Init)?;
    let mut capture = match CaptureSource::open(opener) {
        Ok(capture) => capture,
        Err(source) => {
            if let Err(err) = runtime.cleanup(handle) {
                warn!(error = %err, "runtime cleanup after failed open also failed");
            }
            return Err(DriverError::Open { path, source });
        }
    };
    profiler.start();
    info!(capture = %path, max_passes = ?config.max_passes, "replay started");
    enter(&mut state, DriverState::Looping);

    let mut passes = 0u64;
    let mut packets = 0u64;
    let drain = loop {
        let pass = capture.for_each_packet(|packet| {
            let status = runtime.process_packet(&mut handle, packet);
            profiler.record(packet.len(), status);
            if shutdown.should_stop() {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        let pass = match pass {
            Ok(pass) => pass,
            Err(err) => break Drain::SourceFailed(err),
        };
        packets += pass.packets();
        if !pass.is_exhausted() || shutdown.should_stop() {
            break Drain::Stop(StopReason::Interrupted);
        }

        passes += 1;
        debug!(pass = passes, packets = pass.packets(), "pass complete");
        if config.max_passes.is_some_and(|max| passes >= max) {
            break Drain::Stop(StopReason::PassLimit);
        }
        if let Err(err) = capture.reopen() {
            break Drain::SourceFailed(err);
        }
    };

    enter(&mut state, DriverState::Draining);
    let opens = capture.opens();
    capture.close();
    let cleanup = runtime.cleanup(handle);
    enter(&mut state, DriverState::Stopped);

    if let Err(err) = cleanup {
        error!(error = %err, "runtime cleanup failed");
        return Err(DriverError::Cleanup(err));
    }
    match drain {
        Drain::Stop(stop) => {
            info!(passes, packets, opens, ?stop, "replay stopped");
            Ok(RunSummary {
                passes,
                packets,
                opens,
                stop,
            })
        }
        Drain::SourceFailed(source) => {
            error!(capture = %path, error = %source, "capture failed mid-run");
            Err(DriverError::Source { path, source })
        }
    }
}

fn enter(state: &mut DriverState, next: DriverState) {
    debug!(from = ?*state, to = ?next, "driver state");
    *state = next;
}
