use std::fs;
use std::io;

use nix::unistd::{Pid, SysconfVar, sysconf};

use crate::core::traits::probe::ProcessProbe;

const FALLBACK_TICKS_PER_SEC: u64 = 100;

/// Samples CPU accounting of a process from `/proc`.
///
/// CPU time comes from `utime + stime` in `/proc/<pid>/stat`. Progress is the
/// on-CPU nanoseconds of all threads from `/proc/<pid>/task/*/schedstat`,
/// falling back to CPU time when schedstat is unavailable.
#[derive(Debug, Clone)]
pub struct ProcProbe {
    pid: Pid,
    ticks_per_sec: u64,
}

impl ProcProbe {
    pub fn new(pid: Pid) -> Self {
        let ticks_per_sec = match sysconf(SysconfVar::CLK_TCK) {
            Ok(Some(ticks)) if ticks > 0 => ticks as u64,
            _ => FALLBACK_TICKS_PER_SEC,
        };
        Self { pid, ticks_per_sec }
    }

    fn cpu_ticks(&self) -> io::Result<u64> {
        let stat = fs::read_to_string(format!("/proc/{}/stat", self.pid))?;
        parse_stat_ticks(&stat).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "malformed /proc/<pid>/stat")
        })
    }

    fn scheduled_ns(&self) -> io::Result<u64> {
        let mut total = 0u64;
        let mut threads = 0usize;
        for entry in fs::read_dir(format!("/proc/{}/task", self.pid))? {
            let path = entry?.path().join("schedstat");
            // Threads may exit between listing and reading.
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            if let Some(ns) = parse_schedstat_ns(&content) {
                total = total.saturating_add(ns);
                threads += 1;
            }
        }
        if threads == 0 {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no schedstat"));
        }
        Ok(total)
    }
}

impl ProcessProbe for ProcProbe {
    fn cpu_time_ms(&self) -> io::Result<u64> {
        Ok(self.cpu_ticks()? * 1000 / self.ticks_per_sec)
    }

    fn cpu_progress(&self) -> io::Result<u64> {
        match self.scheduled_ns() {
            Ok(ns) => Ok(ns),
            Err(_) => Ok(self.cpu_ticks()? * 1_000_000_000 / self.ticks_per_sec),
        }
    }
}

/// Extracts `utime + stime` (fields 14 and 15) from a stat line. The command
/// name may contain spaces and parentheses, so fields are counted from the
/// last `)`.
fn parse_stat_ticks(stat: &str) -> Option<u64> {
    let (_, rest) = stat.rsplit_once(')')?;
    let mut fields = rest.split_whitespace().skip(11);
    let utime: u64 = fields.next()?.parse().ok()?;
    let stime: u64 = fields.next()?.parse().ok()?;
    Some(utime + stime)
}

fn parse_schedstat_ns(schedstat: &str) -> Option<u64> {
    schedstat.split_whitespace().next()?.parse().ok()
}
