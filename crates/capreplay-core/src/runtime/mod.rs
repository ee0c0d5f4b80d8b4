//! Packet-processing runtime interface.
//!
//! The dispatch loop treats the runtime as a black box: it initializes one
//! opaque handle, lends it every packet, and gives the handle back exactly
//! once for cleanup. [`FrameCheckRuntime`] is the runtime shipped with the
//! binary.

mod frames;

pub use frames::{FrameCheckHandle, FrameCheckRuntime, classify_frame};

use serde::Serialize;
use thiserror::Error;

use crate::source::Packet;

/// Per-packet result reported by a runtime. Never fatal to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketStatus {
    Ok,
    Truncated,
    Malformed,
    Unsupported,
}

impl PacketStatus {
    pub const ALL: [PacketStatus; 4] = [
        PacketStatus::Ok,
        PacketStatus::Truncated,
        PacketStatus::Malformed,
        PacketStatus::Unsupported,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PacketStatus::Ok => "ok",
            PacketStatus::Truncated => "truncated",
            PacketStatus::Malformed => "malformed",
            PacketStatus::Unsupported => "unsupported",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, PacketStatus::Ok)
    }
}

impl std::fmt::Display for PacketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime initialization failed: {0}")]
    Init(String),
    #[error("runtime cleanup failed: {0}")]
    Cleanup(String),
}

/// A packet-processing runtime.
///
/// `Handle` is owned by the runtime's caller but only ever inspected by the
/// runtime itself. `cleanup` takes it by value, so it cannot be used after
/// teardown.
pub trait Runtime {
    type Handle;

    /// Acquire the runtime state. Called once, before any packet.
    ///
    /// # Errors
    /// Returns `RuntimeError::Init` when required resources are unavailable.
    fn initialize(&mut self) -> Result<Self::Handle, RuntimeError>;

    /// Process one packet synchronously. The packet must not be retained.
    fn process_packet(&mut self, handle: &mut Self::Handle, packet: &Packet<'_>) -> PacketStatus;

    /// Release the runtime state. Called once, after the last packet.
    ///
    /// # Errors
    /// Returns `RuntimeError::Cleanup` when teardown cannot complete.
    fn cleanup(&mut self, handle: Self::Handle) -> Result<(), RuntimeError>;
}
