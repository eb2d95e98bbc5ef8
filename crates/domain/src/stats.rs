//! Periodic device statistics published under `$stats/`.

use std::time::Duration;

/// Snapshot of device statistics, refreshed on the stats timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
    /// Time since boot.
    pub uptime: Duration,
    /// Interval between two stats publications.
    pub interval: Duration,
    /// Signal quality in percent, when the link reports one.
    pub signal: Option<u8>,
    /// Free memory in bytes, when the platform reports it.
    pub free_heap: Option<u64>,
}

impl Stats {
    /// `(suffix, payload)` pairs for every known statistic.
    #[must_use]
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let mut entries = vec![
            ("$stats/uptime", self.uptime.as_secs().to_string()),
            ("$stats/interval", self.interval.as_secs().to_string()),
        ];
        if let Some(signal) = self.signal {
            entries.push(("$stats/signal", signal.min(100).to_string()));
        }
        if let Some(free_heap) = self.free_heap {
            entries.push(("$stats/freeheap", free_heap.to_string()));
        }
        entries
    }
}
