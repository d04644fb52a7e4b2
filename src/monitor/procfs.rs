//! [`MetricSource`] backed by the Linux procfs. Every accessor re-reads the
//! relevant file; only boot-time constants (tick rate, core count, the
//! uid-to-name table) are captured at construction.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use color_eyre::eyre::{Result, WrapErr};
use log::*;

use crate::monitor::source::{CpuTimes, MetricSource, ProcessCounters};

const PROC: &str = "/proc";
const OS_RELEASE: &str = "/etc/os-release";
const PASSWD: &str = "/etc/passwd";

// Field positions in /proc/<pid>/stat, counted after the "pid (comm)" prefix.
const STAT_STATE: usize = 0;
const STAT_UTIME: usize = 11;
const STAT_STIME: usize = 12;
const STAT_STARTTIME: usize = 19;

// Whitespace token index of the kernel release in /proc/version.
const VERSION_KERNEL: usize = 2;

#[derive(Debug)]
pub struct ProcSource {
    root: PathBuf,
    ticks_per_second: u64,
    core_count: usize,
    users: HashMap<u32, String>,
}

impl ProcSource {
    /// Fails when the procfs is not there to read; a monitor with nothing to
    /// sample has no reason to start.
    pub fn new() -> Result<Self> {
        Self::with_root(PathBuf::from(PROC))
    }

    fn with_root(root: PathBuf) -> Result<Self> {
        let stat = fs::read_to_string(root.join("stat"))
            .wrap_err("cannot read /proc/stat: ptop needs a mounted Linux procfs")?;
        let core_count = stat
            .lines()
            .filter(|line| {
                line.strip_prefix("cpu")
                    .and_then(|rest| rest.chars().next())
                    .is_some_and(|c| c.is_ascii_digit())
            })
            .count();
        let hz = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
        let ticks_per_second = if hz > 0 { hz as u64 } else { 100 };
        let users = parse_passwd(&fs::read_to_string(PASSWD).unwrap_or_default());
        debug!(
            target: "procfs",
            "sampling {root:?}: {core_count} cores at {ticks_per_second} Hz, {} known users",
            users.len()
        );
        Ok(Self {
            root,
            ticks_per_second,
            core_count,
            users,
        })
    }

    fn read(&self, name: &str) -> Option<String> {
        fs::read_to_string(self.root.join(name)).ok()
    }

    fn read_pid(&self, pid: u32, name: &str) -> Option<String> {
        fs::read_to_string(self.root.join(pid.to_string()).join(name)).ok()
    }

    fn stat_value(&self, key: &str) -> Option<u64> {
        let stat = self.read("stat")?;
        let line = line_with_prefix(&stat, key)?;
        nth_token(line, 1)?.parse().ok()
    }

    fn user_name(&self, uid: u32) -> String {
        self.users
            .get(&uid)
            .cloned()
            .unwrap_or_else(|| uid.to_string())
    }
}

impl MetricSource for ProcSource {
    fn memory_utilization(&self) -> f64 {
        self.read("meminfo")
            .as_deref()
            .and_then(parse_meminfo)
            .unwrap_or(0.0)
    }

    fn uptime_secs(&self) -> u64 {
        self.read("uptime")
            .as_deref()
            .and_then(|contents| nth_token(contents, 0)?.parse::<f64>().ok())
            .map(|secs| secs as u64)
            .unwrap_or(0)
    }

    fn aggregate_cpu(&self) -> Option<CpuTimes> {
        let stat = self.read("stat")?;
        parse_cpu_line(line_with_prefix(&stat, "cpu ")?)
    }

    fn core_cpu(&self, core: usize) -> Option<CpuTimes> {
        let stat = self.read("stat")?;
        parse_cpu_line(line_with_prefix(&stat, &format!("cpu{core} "))?)
    }

    fn core_count(&self) -> usize {
        self.core_count
    }

    fn live_pids(&self) -> Vec<u32> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };
        entries
            .flatten()
            .filter_map(|entry| entry.file_name().into_string().ok()?.parse().ok())
            .collect()
    }

    /// A stat line that cannot be read or parsed counts as an exited process.
    /// The softer per-field degradations (no VmSize, unknown uid) fall back
    /// to zero values instead, so kernel threads still show up.
    fn process_counters(&self, pid: u32) -> Option<ProcessCounters> {
        let stat = self.read_pid(pid, "stat")?;
        let (comm, fields) = split_stat_line(&stat)?;
        let state = fields.get(STAT_STATE)?.chars().next()?;
        let utime: u64 = fields.get(STAT_UTIME)?.parse().ok()?;
        let stime: u64 = fields.get(STAT_STIME)?.parse().ok()?;
        let starttime: u64 = fields.get(STAT_STARTTIME)?.parse().ok()?;
        let uptime_secs = self
            .uptime_secs()
            .saturating_sub(starttime / self.ticks_per_second);

        let status = self.read_pid(pid, "status").unwrap_or_default();
        let ram_kb: u64 = status_value(&status, "VmSize:").unwrap_or(0);
        let uid: u32 = status_value(&status, "Uid:").unwrap_or(0);

        let cmdline = self.read_pid(pid, "cmdline").unwrap_or_default();
        let command = parse_cmdline(&cmdline).unwrap_or_else(|| format!("[{comm}]"));

        Some(ProcessCounters {
            active_ticks: utime + stime,
            uptime_secs,
            ram_bytes: ram_kb * 1024,
            state,
            user: self.user_name(uid),
            command,
        })
    }

    fn ticks_per_second(&self) -> u64 {
        self.ticks_per_second
    }

    fn kernel(&self) -> String {
        self.read("version")
            .as_deref()
            .and_then(|contents| nth_token(contents, VERSION_KERNEL))
            .unwrap_or_default()
            .to_string()
    }

    fn operating_system(&self) -> String {
        fs::read_to_string(OS_RELEASE)
            .ok()
            .as_deref()
            .and_then(parse_os_release)
            .unwrap_or_else(|| "Linux".to_string())
    }

    fn total_processes(&self) -> u64 {
        self.stat_value("processes").unwrap_or(0)
    }

    fn running_processes(&self) -> u64 {
        self.stat_value("procs_running").unwrap_or(0)
    }
}

fn line_with_prefix<'a>(contents: &'a str, prefix: &str) -> Option<&'a str> {
    contents.lines().find(|line| line.starts_with(prefix))
}

fn nth_token(line: &str, index: usize) -> Option<&str> {
    line.split_whitespace().nth(index)
}

/// "cpu  100 2 300 ..." or "cpu7 100 2 300 ...": label then up to ten
/// counters. Older kernels omit the trailing guest columns, so anything past
/// steal defaults to zero.
fn parse_cpu_line(line: &str) -> Option<CpuTimes> {
    let mut tokens = line.split_whitespace().skip(1);
    let mut next = |required: bool| -> Option<u64> {
        match tokens.next() {
            Some(token) => token.parse().ok(),
            None if required => None,
            None => Some(0),
        }
    };
    Some(CpuTimes {
        user: next(true)?,
        nice: next(true)?,
        system: next(true)?,
        idle: next(true)?,
        iowait: next(true)?,
        irq: next(true)?,
        softirq: next(true)?,
        steal: next(false)?,
        guest: next(false)?,
        guest_nice: next(false)?,
    })
}

/// Splits "pid (comm) field0 field1 ..." into the comm name and the fields
/// after it. The comm may itself contain spaces and parentheses, so the
/// match runs to the last closing paren.
fn split_stat_line(line: &str) -> Option<(&str, Vec<&str>)> {
    let open = line.find('(')?;
    let close = line.rfind(')')?;
    if close < open {
        return None;
    }
    let comm = &line[open + 1..close];
    let fields: Vec<&str> = line[close + 1..].split_whitespace().collect();
    Some((comm, fields))
}

/// First numeric value on the status line with the given key, e.g.
/// "VmSize:   1024 kB" or "Uid:  1000 1000 1000 1000".
fn status_value<T: std::str::FromStr>(status: &str, key: &str) -> Option<T> {
    nth_token(line_with_prefix(status, key)?, 1)?.parse().ok()
}

/// The cmdline file is NUL-separated argv; kernel threads leave it empty.
fn parse_cmdline(cmdline: &str) -> Option<String> {
    let command = cmdline
        .split('\0')
        .filter(|arg| !arg.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    (!command.is_empty()).then_some(command)
}

fn parse_meminfo(contents: &str) -> Option<f64> {
    let total: f64 = status_value(contents, "MemTotal:")?;
    let available: f64 = status_value(contents, "MemAvailable:")?;
    (total > 0.0).then(|| (total - available) / total)
}

/// PRETTY_NAME="Ubuntu 24.04 LTS" from /etc/os-release.
fn parse_os_release(contents: &str) -> Option<String> {
    let line = contents
        .lines()
        .find(|line| line.starts_with("PRETTY_NAME="))?;
    let value = line.split_once('=')?.1.trim().trim_matches('"');
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_passwd(contents: &str) -> HashMap<u32, String> {
    contents
        .lines()
        .filter_map(|line| {
            let mut fields = line.split(':');
            let name = fields.next()?;
            let _password = fields.next()?;
            let uid = fields.next()?.parse().ok()?;
            Some((uid, name.to_string()))
        })
        .collect()
}
