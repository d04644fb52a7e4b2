use log::*;
use serde::{Deserialize, Serialize};

use crate::monitor::cpu::CpuSample;
use crate::monitor::process::Process;
use crate::monitor::source::MetricSource;

/// Column the process table is ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Pid,
    User,
    State,
    #[default]
    Cpu,
    Ram,
    UpTime,
    Command,
}

/// Owns the live set of tracked processes and CPU samples, and reconciles it
/// against the kernel's pid set once per tick.
///
/// A tick runs four phases in a fixed order: add processes that appeared,
/// update every sample and process, evict the ones whose reads failed, and
/// re-sort the table. The renderer only ever sees the result through the
/// borrow accessors, between ticks.
#[derive(Debug)]
pub struct Registry<S> {
    source: S,
    processes: Vec<Process>,
    aggregate: CpuSample,
    cores: Vec<CpuSample>,
    sort_key: SortKey,
    descending: bool,
    kernel: String,
    operating_system: String,
}

impl<S: MetricSource> Registry<S> {
    pub fn new(source: S) -> Self {
        let cores = (0..source.core_count()).map(CpuSample::core).collect();
        let kernel = source.kernel();
        let operating_system = source.operating_system();
        Self {
            source,
            processes: Vec::new(),
            aggregate: CpuSample::aggregate(),
            cores,
            sort_key: SortKey::default(),
            descending: true,
            kernel,
            operating_system,
        }
    }

    /// One full sample-update-sort cycle.
    pub fn tick(&mut self) {
        self.add_processes();
        self.update_all();
        self.remove_processes();
        self.sort_processes();
    }

    /// Track every pid that appeared since the last tick. A pid that is gone
    /// again by the time it is probed is simply skipped; it will not be
    /// missed, it is dead.
    fn add_processes(&mut self) {
        for pid in self.source.live_pids() {
            if self.processes.iter().any(|p| p.pid() == pid) {
                continue;
            }
            if let Some(counters) = self.source.process_counters(pid) {
                trace!(target: "registry", "tracking pid {pid} ({})", counters.command);
                self.processes.push(Process::new(pid, &counters));
            }
        }
    }

    fn update_all(&mut self) {
        if let Some(times) = self.source.aggregate_cpu() {
            self.aggregate.update(times);
        }
        for (core, sample) in self.cores.iter_mut().enumerate() {
            if let Some(times) = self.source.core_cpu(core) {
                sample.update(times);
            }
        }
        for process in &mut self.processes {
            process.update(&self.source);
        }
    }

    /// Evict by filtering, never by sorting dead entries to one end.
    fn remove_processes(&mut self) {
        self.processes.retain(|p| !p.killed());
    }

    /// Stable sort, so equal keys keep their relative order and the table
    /// does not jitter between ticks.
    fn sort_processes(&mut self) {
        let key = self.sort_key;
        let descending = self.descending;
        self.processes.sort_by(|a, b| {
            let ordering = match key {
                SortKey::Pid => a.pid().cmp(&b.pid()),
                SortKey::User => a.user().cmp(b.user()),
                SortKey::State => a.state().cmp(&b.state()),
                SortKey::Cpu => a.cpu_utilization().total_cmp(&b.cpu_utilization()),
                SortKey::Ram => a.ram_bytes().cmp(&b.ram_bytes()),
                SortKey::UpTime => a.uptime_secs().cmp(&b.uptime_secs()),
                SortKey::Command => a.command().cmp(b.command()),
            };
            if descending { ordering.reverse() } else { ordering }
        });
    }

    /// The tracked processes in the last-applied sort order.
    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    pub fn aggregate_cpu(&self) -> &CpuSample {
        &self.aggregate
    }

    pub fn core_cpus(&self) -> &[CpuSample] {
        &self.cores
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    pub fn set_sort(&mut self, key: SortKey) {
        self.sort_key = key;
    }

    pub fn descending(&self) -> bool {
        self.descending
    }

    pub fn set_descending(&mut self, descending: bool) {
        self.descending = descending;
    }

    pub fn memory_utilization(&self) -> f64 {
        self.source.memory_utilization()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.source.uptime_secs()
    }

    pub fn kernel(&self) -> &str {
        &self.kernel
    }

    pub fn operating_system(&self) -> &str {
        &self.operating_system
    }

    pub fn total_processes(&self) -> u64 {
        self.source.total_processes()
    }

    pub fn running_processes(&self) -> u64 {
        self.source.running_processes()
    }
}
