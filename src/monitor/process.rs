use crate::monitor::source::{MetricSource, ProcessCounters};

/// State code shown once a process has vanished. Matches the kernel's own
/// "dead" code so it sorts with the other single-character states.
pub const DEAD_STATE: char = 'X';

/// One tracked process: stable identity plus the previous-sample baselines
/// needed to turn cumulative tick counters into a rate.
#[derive(Debug, Clone)]
pub struct Process {
    pid: u32,
    user: String,
    command: String,
    prev_active_ticks: u64,
    prev_uptime_secs: u64,
    cpu_utilization: f64,
    ram_bytes: u64,
    uptime_secs: u64,
    state: char,
    killed: bool,
}

impl Process {
    /// Seeds the delta baselines from the first read, so the first reported
    /// utilization is 0.0 and real rates appear from the second sample on.
    pub fn new(pid: u32, counters: &ProcessCounters) -> Self {
        Self {
            pid,
            user: counters.user.clone(),
            command: counters.command.clone(),
            prev_active_ticks: counters.active_ticks,
            prev_uptime_secs: counters.uptime_secs,
            cpu_utilization: 0.0,
            ram_bytes: counters.ram_bytes,
            uptime_secs: counters.uptime_secs,
            state: counters.state,
            killed: false,
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Fraction of its own lifetime this process spent on CPU over the last
    /// interval, in [0, 1].
    pub fn cpu_utilization(&self) -> f64 {
        self.cpu_utilization
    }

    pub fn ram_bytes(&self) -> u64 {
        self.ram_bytes
    }

    pub fn uptime_secs(&self) -> u64 {
        self.uptime_secs
    }

    /// Single-character scheduler state (R/S/D/Z/T...), or [`DEAD_STATE`].
    pub fn state(&self) -> char {
        self.state
    }

    /// True once a read for this pid has failed. The registry evicts such
    /// entries on its next reconcile pass; they are never updated again.
    pub fn killed(&self) -> bool {
        self.killed
    }

    /// Pull a fresh read and advance the derived values.
    ///
    /// An absent read marks the process killed and leaves every other field
    /// at its last-known value. The utilization is only recomputed when the
    /// uptime moved forward; a zero delta keeps the previous rate (and the
    /// baselines) instead of collapsing to zero on a sub-second tick.
    pub fn update(&mut self, source: &impl MetricSource) {
        if self.killed {
            return;
        }
        let Some(counters) = source.process_counters(self.pid) else {
            self.killed = true;
            self.state = DEAD_STATE;
            return;
        };
        let active_delta = counters.active_ticks.saturating_sub(self.prev_active_ticks);
        let uptime_delta = counters.uptime_secs.saturating_sub(self.prev_uptime_secs);
        if uptime_delta > 0 {
            let active_secs = active_delta as f64 / source.ticks_per_second() as f64;
            self.cpu_utilization = active_secs / uptime_delta as f64;
            self.prev_active_ticks = counters.active_ticks;
            self.prev_uptime_secs = counters.uptime_secs;
        }
        self.ram_bytes = counters.ram_bytes;
        self.state = counters.state;
        self.uptime_secs = counters.uptime_secs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::testing::FakeSource;

    fn counters(active_ticks: u64, uptime_secs: u64) -> ProcessCounters {
        ProcessCounters {
            active_ticks,
            uptime_secs,
            ram_bytes: 4096,
            state: 'S',
            user: "alice".into(),
            command: "/usr/bin/sleep 1000".into(),
        }
    }

    #[test]
    fn first_sample_is_zero() {
        let process = Process::new(10, &counters(100, 50));
        assert_eq!(process.cpu_utilization(), 0.0);
        assert_eq!(process.user(), "alice");
        assert_eq!(process.state(), 'S');
        assert!(!process.killed());
    }

    #[test]
    fn utilization_from_deltas() {
        let source = FakeSource::new();
        source.add(10, counters(100, 50));
        let mut process = Process::new(10, &counters(100, 50));

        // 200 ticks at 100 Hz is 2s of CPU over a 10s interval.
        source.add(10, counters(300, 60));
        process.update(&source);
        assert!((process.cpu_utilization() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn zero_uptime_delta_retains_rate_and_baselines() {
        let source = FakeSource::new();
        source.add(10, counters(100, 50));
        let mut process = Process::new(10, &counters(100, 50));

        source.add(10, counters(300, 60));
        process.update(&source);
        let rate = process.cpu_utilization();

        // Same uptime: rate must not move, and the baselines must not advance
        // (otherwise the next real delta would be undercounted).
        source.add(10, counters(320, 60));
        process.update(&source);
        assert_eq!(process.cpu_utilization(), rate);

        source.add(10, counters(400, 70));
        process.update(&source);
        // 100 ticks (300 -> 400) over 10s.
        assert!((process.cpu_utilization() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn ram_and_state_refresh_every_live_read() {
        let source = FakeSource::new();
        let mut process = Process::new(10, &counters(100, 50));

        let mut fresh = counters(100, 50);
        fresh.ram_bytes = 8192;
        fresh.state = 'R';
        source.add(10, fresh);
        process.update(&source);
        assert_eq!(process.ram_bytes(), 8192);
        assert_eq!(process.state(), 'R');
    }

    #[test]
    fn absent_read_marks_killed() {
        let source = FakeSource::new();
        let mut process = Process::new(10, &counters(100, 50));

        process.update(&source);
        assert!(process.killed());
        assert_eq!(process.state(), DEAD_STATE);
        // Other fields keep their last-known values.
        assert_eq!(process.ram_bytes(), 4096);
        assert_eq!(process.uptime_secs(), 50);
    }

    #[test]
    fn death_is_idempotent() {
        let source = FakeSource::new();
        let mut process = Process::new(10, &counters(100, 50));
        process.update(&source);
        assert!(process.killed());

        // Even if the pid reappears (recycled), a killed entry stays dead.
        source.add(10, counters(500, 90));
        process.update(&source);
        assert!(process.killed());
        assert_eq!(process.state(), DEAD_STATE);
        assert_eq!(process.uptime_secs(), 50);
    }
}
