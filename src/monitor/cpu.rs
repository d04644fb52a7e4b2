use crate::monitor::source::CpuTimes;

/// Utilization of one CPU (the aggregate line or a single core), derived
/// from the delta between consecutive counter reads.
#[derive(Debug, Clone)]
pub struct CpuSample {
    core: Option<usize>,
    prev_total: u64,
    prev_idle: u64,
    utilization: f64,
}

impl CpuSample {
    /// Sample for the all-cores aggregate line.
    pub fn aggregate() -> Self {
        Self::with_core(None)
    }

    /// Sample for one core, 0-based.
    pub fn core(index: usize) -> Self {
        Self::with_core(Some(index))
    }

    fn with_core(core: Option<usize>) -> Self {
        Self {
            core,
            prev_total: 0,
            prev_idle: 0,
            utilization: 0.0,
        }
    }

    /// `None` for the aggregate, `Some(index)` for a core.
    pub fn id(&self) -> Option<usize> {
        self.core
    }

    /// Fraction of non-idle time over the last interval, in [0, 1].
    pub fn utilization(&self) -> f64 {
        self.utilization
    }

    /// Fold in a fresh counter read.
    ///
    /// The utilization is only recomputed when the total-time delta is
    /// strictly positive. A zero delta (sub-resolution tick, stalled clock)
    /// keeps the previous value rather than spuriously dropping to zero, and
    /// the baselines are not advanced either.
    pub fn update(&mut self, times: CpuTimes) {
        let total = times.total_ticks();
        let idle = times.idle_ticks();
        let total_delta = total.saturating_sub(self.prev_total);
        if total_delta == 0 {
            return;
        }
        let idle_delta = idle.saturating_sub(self.prev_idle).min(total_delta);
        self.utilization = (total_delta - idle_delta) as f64 / total_delta as f64;
        self.prev_total = total;
        self.prev_idle = idle;
    }
}
