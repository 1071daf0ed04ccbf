//! Process runtime statistics.
//!
//! The console renders these on the system-info endpoint but never
//! collects them itself; the host supplies an implementation of
//! [`RuntimeStats`]. The default reads `/proc/self` and degrades to
//! zeros on platforms without procfs.

use std::sync::Mutex;
use std::time::Instant;

/// Live process metrics consumed by the system-info snapshot.
pub trait RuntimeStats: Send + Sync {
    /// Process identifier.
    fn pid(&self) -> u32;
    /// Resident set size in megabytes.
    fn used_memory_mb(&self) -> u64;
    /// Process CPU usage since the previous sample, in percent.
    fn cpu_usage_percent(&self) -> f64;
    /// Number of OS threads in the process.
    fn thread_count(&self) -> usize;
}

/// Point-in-time CPU sample used to derive a usage percentage.
#[derive(Clone, Copy)]
struct CpuSample {
    ticks: u64,
    at: Instant,
}

/// procfs-backed [`RuntimeStats`] implementation.
pub struct ProcStats {
    // std::sync::Mutex: sampling is a short synchronous read-modify-write.
    last_cpu: Mutex<Option<CpuSample>>,
}

impl ProcStats {
    /// Creates a fresh sampler. The first CPU reading reports `0.0`
    /// because a usage percentage needs two samples.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_cpu: Mutex::new(None),
        }
    }

    /// Reads a whitespace-separated numeric field from `/proc/self/status`.
    fn status_field(name: &str) -> Option<u64> {
        let status = std::fs::read_to_string("/proc/self/status").ok()?;
        status
            .lines()
            .find(|line| line.starts_with(name))?
            .split_whitespace()
            .nth(1)?
            .parse()
            .ok()
    }

    /// Total CPU ticks (utime + stime) from `/proc/self/stat`.
    fn cpu_ticks() -> Option<u64> {
        let stat = std::fs::read_to_string("/proc/self/stat").ok()?;
        // The executable name (field 2) may contain spaces; skip past the
        // closing parenthesis before splitting.
        let rest = stat.rsplit_once(')')?.1;
        let fields: Vec<&str> = rest.split_whitespace().collect();
        // After the ')' the next field has index 0 = state, so utime is
        // field 11 and stime field 12 (overall fields 14 and 15).
        let utime: u64 = fields.get(11)?.parse().ok()?;
        let stime: u64 = fields.get(12)?.parse().ok()?;
        Some(utime + stime)
    }
}

impl Default for ProcStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeStats for ProcStats {
    fn pid(&self) -> u32 {
        std::process::id()
    }

    fn used_memory_mb(&self) -> u64 {
        Self::status_field("VmRSS:").map_or(0, |kb| kb / 1024)
    }

    fn cpu_usage_percent(&self) -> f64 {
        const TICKS_PER_SECOND: f64 = 100.0;

        let Some(ticks) = Self::cpu_ticks() else {
            return 0.0;
        };
        let now = Instant::now();
        let mut last = self.last_cpu.lock().expect("cpu sample lock poisoned");
        let previous = last.replace(CpuSample { ticks, at: now });
        drop(last);

        let Some(prev) = previous else {
            return 0.0;
        };
        let elapsed = now.duration_since(prev.at).as_secs_f64();
        if elapsed <= 0.0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let used = ticks.saturating_sub(prev.ticks) as f64 / TICKS_PER_SECOND;
        ((used / elapsed) * 10_000.0).round() / 100.0
    }

    fn thread_count(&self) -> usize {
        #[allow(clippy::cast_possible_truncation)]
        Self::status_field("Threads:").map_or(0, |n| n as usize)
    }
}
