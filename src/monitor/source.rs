//! The contract between the sampling engine and the kernel statistics it
//! consumes. Everything the engine derives (rates, deltas, liveness) is
//! computed from the raw counters exposed here.

/// Cumulative CPU time counters in clock ticks, one set per CPU line of the
/// kernel's scheduler accounting. Monotonically non-decreasing for the life
/// of the machine.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
    pub guest: u64,
    pub guest_nice: u64,
}

impl CpuTimes {
    /// Time spent doing nothing: idle plus waiting on I/O.
    pub fn idle_ticks(&self) -> u64 {
        self.idle + self.iowait
    }

    /// Time spent doing work. Guest time is already folded into user/nice by
    /// the kernel, so it is not added again here.
    pub fn active_ticks(&self) -> u64 {
        self.user + self.nice + self.system + self.irq + self.softirq + self.steal
    }

    pub fn total_ticks(&self) -> u64 {
        self.idle_ticks() + self.active_ticks()
    }
}

/// One fresh read of a live process.
///
/// `None` from [`MetricSource::process_counters`] means the process has
/// exited since it was enumerated. That absence is the only death signal the
/// engine gets.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProcessCounters {
    /// utime + stime, in clock ticks.
    pub active_ticks: u64,
    /// Seconds since the process started.
    pub uptime_secs: u64,
    pub ram_bytes: u64,
    pub state: char,
    pub user: String,
    pub command: String,
}

/// Accessors over the kernel's runtime statistics. Every call performs a
/// fresh read; nothing is cached here except values fixed at boot
/// (tick rate, core count).
pub trait MetricSource {
    /// `(total - available) / total`, or 0.0 when unreadable.
    fn memory_utilization(&self) -> f64;

    /// Seconds since boot.
    fn uptime_secs(&self) -> u64;

    /// The all-cores CPU counter line. `None` when the line is missing or
    /// malformed this instant; callers keep their previous derived value.
    fn aggregate_cpu(&self) -> Option<CpuTimes>;

    /// Counters for one core, 0-based.
    fn core_cpu(&self, core: usize) -> Option<CpuTimes>;

    /// Number of cores reported at startup. Hot-plug is not tracked.
    fn core_count(&self) -> usize;

    /// The set of currently schedulable pids. Inherently racy: any of these
    /// may be gone before it is probed again.
    fn live_pids(&self) -> Vec<u32>;

    fn process_counters(&self, pid: u32) -> Option<ProcessCounters>;

    /// Clock ticks per second (Hz), the conversion constant between raw tick
    /// counters and seconds. Always positive.
    fn ticks_per_second(&self) -> u64;

    fn kernel(&self) -> String;

    fn operating_system(&self) -> String;

    /// Processes forked since boot.
    fn total_processes(&self) -> u64;

    /// Processes currently in the run queue.
    fn running_processes(&self) -> u64;
}
