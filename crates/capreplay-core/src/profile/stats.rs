use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use super::Profiler;
use crate::runtime::PacketStatus;

/// Packet and byte totals for one status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub packets: u64,
    pub bytes: u64,
}

/// Profiler that keeps running totals and wall-clock throughput.
#[derive(Debug, Default)]
pub struct StatsProfiler {
    started: Option<Instant>,
    started_at: Option<String>,
    packets: u64,
    bytes: u64,
    statuses: BTreeMap<PacketStatus, StatusCount>,
}

/// Snapshot of a [`StatsProfiler`].
#[derive(Debug, Clone, Serialize)]
pub struct ProfileSummary {
    /// RFC3339 time at which profiling started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    pub elapsed_s: f64,
    pub packets: u64,
    pub bytes: u64,
    /// Packets per second; absent when no time has elapsed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pps: Option<f64>,
    /// Bits per second; absent when no time has elapsed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bps: Option<f64>,
    pub statuses: BTreeMap<PacketStatus, StatusCount>,
}

impl StatsProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn packets(&self) -> u64 {
        self.packets
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn status_count(&self, status: PacketStatus) -> StatusCount {
        self.statuses.get(&status).copied().unwrap_or_default()
    }

    pub fn summary(&self) -> ProfileSummary {
        let elapsed = self
            .started
            .map(|started| started.elapsed())
            .unwrap_or_default();
        self.summary_with_elapsed(elapsed)
    }

    fn summary_with_elapsed(&self, elapsed: Duration) -> ProfileSummary {
        let elapsed_s = elapsed.as_secs_f64();
        let (pps, bps) = if elapsed_s > 0.0 {
            (
                Some(self.packets as f64 / elapsed_s),
                Some(self.bytes as f64 * 8.0 / elapsed_s),
            )
        } else {
            (None, None)
        };
        ProfileSummary {
            started_at: self.started_at.clone(),
            elapsed_s,
            packets: self.packets,
            bytes: self.bytes,
            pps,
            bps,
            statuses: self.statuses.clone(),
        }
    }
}

impl Profiler for StatsProfiler {
    fn start(&mut self) {
        self.started = Some(Instant::now());
        self.started_at = OffsetDateTime::now_utc().format(&Rfc3339).ok();
    }

    fn record(&mut self, len: usize, status: PacketStatus) {
        let len = len as u64;
        self.packets += 1;
        self.bytes += len;
        let entry = self.statuses.entry(status).or_default();
        entry.packets += 1;
        entry.bytes += len;
    }
}

impl fmt::Display for ProfileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "packets: {} ({} bytes) in {:.3}s",
            self.packets, self.bytes, self.elapsed_s
        )?;
        if let (Some(pps), Some(bps)) = (self.pps, self.bps) {
            writeln!(f, "rate: {pps:.1} pkt/s, {:.3} Mbit/s", bps / 1e6)?;
        }
        for (status, count) in &self.statuses {
            writeln!(
                f,
                "  {:<12} {:>10} pkts {:>12} bytes",
                status.as_str(),
                count.packets,
                count.bytes
            )?;
        }
        Ok(())
    }
}
