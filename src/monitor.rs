//! The sampling and derivation engine: raw kernel counters in, a sorted
//! table of per-process and per-CPU rates out.

pub mod cpu;
pub mod process;
pub mod procfs;
pub mod registry;
pub mod source;

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    use super::source::{CpuTimes, MetricSource, ProcessCounters};

    #[derive(Debug)]
    struct FakeState {
        memory_utilization: f64,
        uptime_secs: u64,
        ticks_per_second: u64,
        aggregate: Option<CpuTimes>,
        cores: Vec<CpuTimes>,
        counters: BTreeMap<u32, Option<ProcessCounters>>,
        total_processes: u64,
        running_processes: u64,
    }

    /// Scriptable [`MetricSource`] for engine tests. Clones share state, so a
    /// test can keep one handle and mutate the world between ticks while the
    /// registry owns the other.
    #[derive(Debug, Clone)]
    pub struct FakeSource {
        state: Rc<RefCell<FakeState>>,
    }

    impl FakeSource {
        pub fn new() -> Self {
            Self {
                state: Rc::new(RefCell::new(FakeState {
                    memory_utilization: 0.0,
                    uptime_secs: 0,
                    ticks_per_second: 100,
                    aggregate: None,
                    cores: Vec::new(),
                    counters: BTreeMap::new(),
                    total_processes: 0,
                    running_processes: 0,
                })),
            }
        }

        /// Make `pid` live with the given counters.
        pub fn add(&self, pid: u32, counters: ProcessCounters) {
            self.state.borrow_mut().counters.insert(pid, Some(counters));
        }

        /// Enumerate `pid` but answer every detail probe with "absent".
        pub fn add_pid_only(&self, pid: u32) {
            self.state.borrow_mut().counters.insert(pid, None);
        }

        pub fn remove(&self, pid: u32) {
            self.state.borrow_mut().counters.remove(&pid);
        }

        pub fn set_cores(&self, cores: Vec<CpuTimes>) {
            self.state.borrow_mut().cores = cores;
        }

        pub fn set_memory_utilization(&self, ratio: f64) {
            self.state.borrow_mut().memory_utilization = ratio;
        }

        pub fn set_uptime(&self, secs: u64) {
            self.state.borrow_mut().uptime_secs = secs;
        }

        pub fn set_process_counts(&self, total: u64, running: u64) {
            let mut state = self.state.borrow_mut();
            state.total_processes = total;
            state.running_processes = running;
        }
    }

    impl MetricSource for FakeSource {
        fn memory_utilization(&self) -> f64 {
            self.state.borrow().memory_utilization
        }

        fn uptime_secs(&self) -> u64 {
            self.state.borrow().uptime_secs
        }

        fn aggregate_cpu(&self) -> Option<CpuTimes> {
            self.state.borrow().aggregate
        }

        fn core_cpu(&self, core: usize) -> Option<CpuTimes> {
            self.state.borrow().cores.get(core).copied()
        }

        fn core_count(&self) -> usize {
            self.state.borrow().cores.len()
        }

        fn live_pids(&self) -> Vec<u32> {
            self.state.borrow().counters.keys().copied().collect()
        }

        fn process_counters(&self, pid: u32) -> Option<ProcessCounters> {
            self.state.borrow().counters.get(&pid).cloned().flatten()
        }

        fn ticks_per_second(&self) -> u64 {
            self.state.borrow().ticks_per_second
        }

        fn kernel(&self) -> String {
            "6.0.0-fake".into()
        }

        fn operating_system(&self) -> String {
            "Fake Linux".into()
        }

        fn total_processes(&self) -> u64 {
            self.state.borrow().total_processes
        }

        fn running_processes(&self) -> u64 {
            self.state.borrow().running_processes
        }
    }
}
