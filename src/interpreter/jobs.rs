//! Job Control
//!
//! The job table shared by a shell and its subshells. A job is either an OS
//! process group (external commands started with `&`) or a thread running
//! an in-process command list against a cloned context. Thread jobs get a
//! virtual pid above the kernel's pid range.
//!
//! State machine: `Running -> Stopped | Done`, `Stopped -> Running` on
//! fg/bg. Finished jobs are reaped with non-blocking `waitpid` calls.

use std::collections::BTreeMap;
use std::io;
use std::process::Child;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use lazy_static::lazy_static;

use crate::interpreter::types::ExecResult;

/// Virtual pids start above the largest pid Linux can hand out (2^22)
pub const VIRTUAL_PID_BASE: u32 = 5_000_000;

// ============================================================================
// Signals
// ============================================================================

lazy_static! {
    static ref SIGNALS: Vec<(&'static str, i32)> = vec![
        ("HUP", libc::SIGHUP),
        ("INT", libc::SIGINT),
        ("QUIT", libc::SIGQUIT),
        ("KILL", libc::SIGKILL),
        ("USR1", libc::SIGUSR1),
        ("USR2", libc::SIGUSR2),
        ("PIPE", libc::SIGPIPE),
        ("ALRM", libc::SIGALRM),
        ("TERM", libc::SIGTERM),
        ("CHLD", libc::SIGCHLD),
        ("CONT", libc::SIGCONT),
        ("STOP", libc::SIGSTOP),
        ("TSTP", libc::SIGTSTP),
        ("TTIN", libc::SIGTTIN),
        ("TTOU", libc::SIGTTOU),
        ("WINCH", libc::SIGWINCH),
    ];
}

/// Resolve `TERM`, `SIGTERM`, `term` or `15` to a signal number.
/// `EXIT` and `0` resolve to 0.
pub fn signal_number(spec: &str) -> Option<i32> {
    if let Ok(n) = spec.parse::<i32>() {
        return if n == 0 || SIGNALS.iter().any(|(_, num)| *num == n) {
            Some(n)
        } else {
            None
        };
    }
    let upper = spec.to_ascii_uppercase();
    let name = upper.strip_prefix("SIG").unwrap_or(&upper);
    if name == "EXIT" {
        return Some(0);
    }
    SIGNALS.iter().find(|(n, _)| *n == name).map(|(_, num)| *num)
}

pub fn signal_name(number: i32) -> Option<&'static str> {
    if number == 0 {
        return Some("EXIT");
    }
    SIGNALS.iter().find(|(_, n)| *n == number).map(|(name, _)| *name)
}

/// Signal names in table order, for `kill -l`
pub fn signal_names() -> Vec<&'static str> {
    SIGNALS.iter().map(|(n, _)| *n).collect()
}

// ============================================================================
// Jobs
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Stopped,
    Done(i32),
}

impl JobStatus {
    pub fn label(&self) -> String {
        match self {
            JobStatus::Running => "running".to_string(),
            JobStatus::Stopped => "suspended".to_string(),
            JobStatus::Done(0) => "done".to_string(),
            JobStatus::Done(code) => format!("exit {}", code),
        }
    }
}

/// What backs a job
pub enum JobHandle {
    Process {
        child: Child,
        stdout: Option<JoinHandle<String>>,
        stderr: Option<JoinHandle<String>>,
    },
    Thread {
        handle: Option<JoinHandle<ExecResult>>,
        cancel: Arc<AtomicBool>,
        /// OS processes the thread has spawned, signalled along with it
        children: Arc<Mutex<Vec<u32>>>,
    },
}

impl std::fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobHandle::Process { child, .. } => write!(f, "Process({})", child.id()),
            JobHandle::Thread { .. } => write!(f, "Thread"),
        }
    }
}

#[derive(Debug)]
pub struct Job {
    pub id: usize,
    pub pid: u32,
    pub pgid: u32,
    pub command: String,
    pub status: JobStatus,
    pub start_time: DateTime<Local>,
    handle: JobHandle,
    stdout: String,
    stderr: String,
}

impl Job {
    pub fn is_done(&self) -> bool {
        matches!(self.status, JobStatus::Done(_))
    }
}

/// Snapshot of a job for listings
#[derive(Debug, Clone, PartialEq)]
pub struct JobInfo {
    pub id: usize,
    pub pid: u32,
    pub pgid: u32,
    pub command: String,
    pub status: JobStatus,
    pub start_time: DateTime<Local>,
    pub current: bool,
    pub previous: bool,
}

/// Returned when `wait` gives up before the job finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTimeout;

#[derive(Debug)]
pub struct JobTable {
    jobs: BTreeMap<usize, Job>,
    next_virtual_pid: u32,
}

impl Default for JobTable {
    fn default() -> Self {
        Self {
            jobs: BTreeMap::new(),
            next_virtual_pid: VIRTUAL_PID_BASE,
        }
    }
}

pub type SharedJobTable = Arc<Mutex<JobTable>>;

/// Decode a raw `waitpid` status
fn decode_wait_status(status: i32) -> JobStatus {
    if libc::WIFEXITED(status) {
        JobStatus::Done(libc::WEXITSTATUS(status))
    } else if libc::WIFSIGNALED(status) {
        JobStatus::Done(128 + libc::WTERMSIG(status))
    } else if libc::WIFSTOPPED(status) {
        JobStatus::Stopped
    } else {
        JobStatus::Running
    }
}

/// Run a syscall wrapper again while it fails with `EINTR`
fn retry_on_interrupt<T>(mut call: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    loop {
        match call() {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

/// `waitpid` on our own child; returns the pid reported (0 under `WNOHANG`
/// when nothing changed) and the raw status
fn wait_child(child: &Child, flags: i32) -> io::Result<(i32, i32)> {
    retry_on_interrupt(|| {
        let mut status = 0;
        // SAFETY: waitpid on our own child pid with a valid status pointer
        let rc = unsafe { libc::waitpid(child.id() as libc::pid_t, &mut status, flags) };
        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok((rc, status))
        }
    })
}

/// Status for a job whose `waitpid` failed: `ECHILD` means it was
/// already reaped elsewhere
fn wait_error_status(err: &io::Error) -> JobStatus {
    if err.raw_os_error() == Some(libc::ECHILD) {
        JobStatus::Done(0)
    } else {
        JobStatus::Done(1)
    }
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate_virtual_pid(&mut self) -> u32 {
        let pid = self.next_virtual_pid;
        self.next_virtual_pid += 1;
        pid
    }

    /// Register a job; ids reuse the lowest free slot as zsh does
    pub fn add_job(&mut self, pid: u32, pgid: u32, command: impl Into<String>, handle: JobHandle) -> usize {
        let mut id = 1;
        while self.jobs.contains_key(&id) {
            id += 1;
        }
        self.jobs.insert(
            id,
            Job {
                id,
                pid,
                pgid,
                command: command.into(),
                status: JobStatus::Running,
                start_time: Local::now(),
                handle,
                stdout: String::new(),
                stderr: String::new(),
            },
        );
        id
    }

    pub fn get(&self, id: usize) -> Option<&Job> {
        self.jobs.get(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Most recently started job (`%+`)
    pub fn current_id(&self) -> Option<usize> {
        self.jobs.keys().next_back().copied()
    }

    /// The job before the current one (`%-`)
    pub fn previous_id(&self) -> Option<usize> {
        self.jobs.keys().rev().nth(1).copied()
    }

    pub fn find_by_pid(&self, pid: u32) -> Option<usize> {
        self.jobs.values().find(|j| j.pid == pid).map(|j| j.id)
    }

    /// Resolve a job spec: `%n`, `%%`, `%+`, `%-`, `%string`, `%?string`
    pub fn resolve_spec(&self, spec: &str) -> Option<usize> {
        let body = spec.strip_prefix('%')?;
        match body {
            "" | "%" | "+" => self.current_id(),
            "-" => self.previous_id(),
            _ => {
                if let Ok(n) = body.parse::<usize>() {
                    return self.jobs.contains_key(&n).then_some(n);
                }
                if let Some(needle) = body.strip_prefix('?') {
                    return self.jobs.values().rev().find(|j| j.command.contains(needle)).map(|j| j.id);
                }
                self.jobs.values().rev().find(|j| j.command.starts_with(body)).map(|j| j.id)
            }
        }
    }

    /// Poll one job without blocking
    fn poll(job: &mut Job) {
        if job.is_done() {
            return;
        }
        match &mut job.handle {
            JobHandle::Process { child, .. } => {
                let flags = libc::WNOHANG | libc::WUNTRACED | libc::WCONTINUED;
                match wait_child(child, flags) {
                    Ok((0, _)) => {}
                    Ok((_, status)) if libc::WIFCONTINUED(status) => job.status = JobStatus::Running,
                    Ok((_, status)) => job.status = decode_wait_status(status),
                    Err(e) => job.status = wait_error_status(&e),
                }
            }
            JobHandle::Thread { handle, .. } => {
                if handle.as_ref().map_or(true, |h| h.is_finished()) {
                    let result = handle.take().map(|h| h.join());
                    job.status = match result {
                        Some(Ok(r)) => {
                            job.stdout.push_str(&r.stdout);
                            job.stderr.push_str(&r.stderr);
                            JobStatus::Done(r.exit_code)
                        }
                        _ => JobStatus::Done(1),
                    };
                }
            }
        }
        if job.is_done() {
            Self::collect_output(job);
        }
    }

    fn collect_output(job: &mut Job) {
        if let JobHandle::Process { stdout, stderr, .. } = &mut job.handle {
            if let Some(h) = stdout.take() {
                job.stdout.push_str(&h.join().unwrap_or_default());
            }
            if let Some(h) = stderr.take() {
                job.stderr.push_str(&h.join().unwrap_or_default());
            }
        }
    }

    /// Refresh every job's status
    pub fn update(&mut self) {
        for job in self.jobs.values_mut() {
            Self::poll(job);
        }
    }

    /// Remove finished jobs, returning their output and status
    pub fn reap(&mut self) -> Vec<(JobInfo, String, String)> {
        self.update();
        let done: Vec<usize> = self.jobs.values().filter(|j| j.is_done()).map(|j| j.id).collect();
        let mut out = Vec::new();
        for id in done {
            if let Some(info) = self.info(id) {
                if let Some(job) = self.jobs.remove(&id) {
                    out.push((info, job.stdout, job.stderr));
                }
            }
        }
        out
    }

    fn info(&self, id: usize) -> Option<JobInfo> {
        let current = self.current_id();
        let previous = self.previous_id();
        self.jobs.get(&id).map(|j| JobInfo {
            id: j.id,
            pid: j.pid,
            pgid: j.pgid,
            command: j.command.clone(),
            status: j.status,
            start_time: j.start_time,
            current: Some(j.id) == current,
            previous: Some(j.id) == previous,
        })
    }

    pub fn list(&mut self) -> Vec<JobInfo> {
        self.update();
        let ids: Vec<usize> = self.jobs.keys().copied().collect();
        ids.into_iter().filter_map(|id| self.info(id)).collect()
    }

    /// Drop a job from the table without touching the process (`disown`)
    pub fn disown(&mut self, id: usize) -> bool {
        self.jobs.remove(&id).is_some()
    }

    /// Block until a job finishes, or until `timeout` elapses.
    /// Returns the exit status together with the job's captured output,
    /// and removes the job from the table.
    pub fn wait(&mut self, id: usize, timeout: Option<Duration>) -> Result<(i32, String, String), WaitTimeout> {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            let job = match self.jobs.get_mut(&id) {
                Some(j) => j,
                None => return Ok((127, String::new(), String::new())),
            };
            if deadline.is_none() {
                Self::wait_blocking(job);
            } else {
                Self::poll(job);
            }
            match job.status {
                JobStatus::Done(code) => {
                    let job = self.jobs.remove(&id);
                    return Ok(job.map_or((code, String::new(), String::new()), |j| (code, j.stdout, j.stderr)));
                }
                // A stopped job would never finish; report it like zsh does
                JobStatus::Stopped => return Ok((128 + libc::SIGTSTP, String::new(), String::new())),
                JobStatus::Running => {}
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(WaitTimeout);
                }
                std::thread::sleep(Duration::from_millis(10));
            }
        }
    }

    fn wait_blocking(job: &mut Job) {
        match &mut job.handle {
            JobHandle::Process { child, .. } => {
                job.status = match wait_child(child, libc::WUNTRACED) {
                    Ok((_, status)) => decode_wait_status(status),
                    Err(e) => wait_error_status(&e),
                };
                if job.is_done() {
                    Self::collect_output(job);
                }
            }
            JobHandle::Thread { .. } => {
                if let JobHandle::Thread { handle, .. } = &mut job.handle {
                    if let Some(h) = handle.take() {
                        job.status = match h.join() {
                            Ok(r) => {
                                job.stdout.push_str(&r.stdout);
                                job.stderr.push_str(&r.stderr);
                                JobStatus::Done(r.exit_code)
                            }
                            Err(_) => JobStatus::Done(1),
                        };
                    }
                }
            }
        }
    }

    /// Wait for every job; returns the status of the last one waited on
    pub fn wait_all(&mut self, timeout: Option<Duration>) -> Result<(i32, String, String), WaitTimeout> {
        let ids: Vec<usize> = self.jobs.keys().copied().collect();
        let mut last = (0, String::new(), String::new());
        for id in ids {
            let (code, out, err) = self.wait(id, timeout)?;
            last.0 = code;
            last.1.push_str(&out);
            last.2.push_str(&err);
        }
        Ok(last)
    }

    /// Send a signal to a job's process group or thread.
    pub fn kill(&mut self, id: usize, signal: i32) -> Result<(), String> {
        let job = self.jobs.get_mut(&id).ok_or_else(|| format!("%{}: no such job", id))?;
        match &job.handle {
            JobHandle::Process { .. } => {
                // SAFETY: signalling a process group we created
                let rc = unsafe { libc::kill(-(job.pgid as libc::pid_t), signal) };
                if rc != 0 {
                    return Err(std::io::Error::last_os_error().to_string());
                }
            }
            JobHandle::Thread { cancel, children, .. } => {
                if signal == libc::SIGSTOP || signal == libc::SIGTSTP || signal == libc::SIGCONT || signal == 0 {
                    return Ok(());
                }
                cancel.store(true, Ordering::SeqCst);
                if let Ok(pids) = children.lock() {
                    for pid in pids.iter() {
                        // SAFETY: signalling processes this job spawned
                        unsafe {
                            libc::kill(*pid as libc::pid_t, signal);
                        }
                    }
                }
            }
        }
        match signal {
            s if s == libc::SIGSTOP || s == libc::SIGTSTP => job.status = JobStatus::Stopped,
            s if s == libc::SIGCONT => job.status = JobStatus::Running,
            _ => {}
        }
        Ok(())
    }

    /// Continue a stopped job (`bg`, and the first half of `fg`)
    pub fn resume(&mut self, id: usize) -> Result<(), String> {
        self.kill(id, libc::SIGCONT)
    }
}

/// Format one `jobs` line
pub fn format_job(info: &JobInfo, long: bool, pids_only: bool) -> String {
    if pids_only {
        return format!("{}\n", info.pid);
    }
    let marker = if info.current {
        '+'
    } else if info.previous {
        '-'
    } else {
        ' '
    };
    if long {
        format!("[{}]  {} {} {}  {}\n", info.id, marker, info.pid, info.status.label(), info.command)
    } else {
        format!("[{}]  {} {}  {}\n", info.id, marker, info.status.label(), info.command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::CommandExt;
    use std::process::{Command, Stdio};

    fn thread_job(table: &mut JobTable, result: ExecResult) -> usize {
        let pid = table.allocate_virtual_pid();
        let handle = std::thread::spawn(move || result);
        table.add_job(
            pid,
            pid,
            "echo hi",
            JobHandle::Thread {
                handle: Some(handle),
                cancel: Arc::new(AtomicBool::new(false)),
                children: Arc::new(Mutex::new(Vec::new())),
            },
        )
    }

    #[test]
    fn test_signal_table() {
        assert_eq!(signal_number("TERM"), Some(libc::SIGTERM));
        assert_eq!(signal_number("SIGKILL"), Some(libc::SIGKILL));
        assert_eq!(signal_number("int"), Some(libc::SIGINT));
        assert_eq!(signal_number("9"), Some(9));
        assert_eq!(signal_number("EXIT"), Some(0));
        assert_eq!(signal_number("BOGUS"), None);
        assert_eq!(signal_name(libc::SIGHUP), Some("HUP"));
    }

    #[test]
    fn test_thread_job_wait_collects_output() {
        let mut table = JobTable::new();
        let id = thread_job(&mut table, ExecResult::new("hi\n".into(), String::new(), 3));
        assert!(table.get(id).map_or(false, |j| j.pid >= VIRTUAL_PID_BASE));
        let (code, out, _) = table.wait(id, None).unwrap();
        assert_eq!(code, 3);
        assert_eq!(out, "hi\n");
        assert!(table.is_empty());
    }

    #[test]
    fn test_job_specs() {
        let mut table = JobTable::new();
        let a = thread_job(&mut table, ExecResult::ok());
        let b = thread_job(&mut table, ExecResult::ok());
        assert_eq!(table.resolve_spec("%1"), Some(a));
        assert_eq!(table.resolve_spec("%%"), Some(b));
        assert_eq!(table.resolve_spec("%-"), Some(a));
        assert_eq!(table.resolve_spec("%echo"), Some(b));
        assert_eq!(table.resolve_spec("%9"), None);
        table.wait_all(None).unwrap();
    }

    #[test]
    fn test_process_job_and_timeout() {
        let mut table = JobTable::new();
        let child = Command::new("sleep")
            .arg("5")
            .stdout(Stdio::null())
            .process_group(0)
            .spawn()
            .unwrap();
        let pid = child.id();
        let id = table.add_job(pid, pid, "sleep 5", JobHandle::Process { child, stdout: None, stderr: None });
        assert_eq!(table.wait(id, Some(Duration::from_millis(50))), Err(WaitTimeout));
        table.kill(id, libc::SIGTERM).unwrap();
        let (code, _, _) = table.wait(id, None).unwrap();
        assert_eq!(code, 128 + libc::SIGTERM);
    }

    #[test]
    fn test_interrupted_wait_is_retried() {
        let mut calls = 0;
        let rc = retry_on_interrupt(|| {
            calls += 1;
            if calls < 3 {
                Err(io::Error::from(io::ErrorKind::Interrupted))
            } else {
                Ok(calls)
            }
        });
        assert_eq!(rc.unwrap(), 3);
        let err = retry_on_interrupt::<()>(|| Err(io::Error::from_raw_os_error(libc::EINVAL)));
        assert_eq!(wait_error_status(&err.unwrap_err()), JobStatus::Done(1));
        assert_eq!(wait_error_status(&io::Error::from_raw_os_error(libc::ECHILD)), JobStatus::Done(0));
    }

    #[test]
    fn test_format_job() {
        let info = JobInfo {
            id: 1,
            pid: 42,
            pgid: 42,
            command: "sleep 10".into(),
            status: JobStatus::Running,
            start_time: Local::now(),
            current: true,
            previous: false,
        };
        assert_eq!(format_job(&info, false, false), "[1]  + running  sleep 10\n");
        assert_eq!(format_job(&info, true, false), "[1]  + 42 running  sleep 10\n");
        assert_eq!(format_job(&info, false, true), "42\n");
    }
}
