//! Runs the solution once per sample and measures it.
//!
//! The child is reaped with `wait4` so the peak RSS belongs to this one run.
//! Reaping happens in two steps (`waitid` with `WNOWAIT`, then `wait4`) so a
//! timeout kill can never hit a recycled pid. The child leads its own
//! process group so a kill also takes down anything it spawned.

use crate::error::ProcessError;
use std::{
    io::{ErrorKind, Read, Write},
    os::unix::process::{CommandExt, ExitStatusExt},
    path::Path,
    process::{Child, Command, ExitStatus, Stdio},
    sync::{Arc, Mutex},
    thread,
    time::{Duration, Instant},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct RunOutcome {
    pub status: ExitStatus,
    pub timed_out: bool,
    pub stdout: Vec<u8>,
    pub elapsed: Duration,
    /// Peak resident set size in KiB.
    pub peak_memory_kib: u64,
}

#[derive(Debug)]
struct Finished {
    status: ExitStatus,
    stdout: Vec<u8>,
    elapsed: Duration,
    peak_memory_kib: u64,
}

enum Stop {
    Finished(Result<Result<Finished, ProcessError>, tokio::task::JoinError>),
    TimedOut,
    Cancelled,
}

/// Feed `input` to `program` on stdin and collect what it prints.
///
/// The child is killed once `time_limit` elapses or `cancel` fires.
pub async fn run(
    program: &Path,
    input: &[u8],
    time_limit: Duration,
    cancel: &CancellationToken,
) -> Result<RunOutcome, ProcessError> {
    let child = Command::new(program)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .process_group(0)
        .spawn()
        .map_err(|source| ProcessError::Spawn {
            program: program.to_path_buf(),
            source,
        })?;

    let started = Instant::now();
    let reaper = Reaper::new(child.id());
    let input = input.to_vec();
    let mut handle = {
        let reaper = reaper.clone();
        tokio::task::spawn_blocking(move || collect(child, input, started, &reaper))
    };

    let stop = tokio::select! {
        res = &mut handle => Stop::Finished(res),
        _ = tokio::time::sleep(time_limit) => Stop::TimedOut,
        _ = cancel.cancelled() => Stop::Cancelled,
    };

    let (finished, timed_out) = match stop {
        Stop::Finished(res) => (res, false),
        Stop::TimedOut => {
            debug!(limit = ?time_limit, "time limit exceeded, killing solution");
            reaper.kill();
            (handle.await, true)
        }
        Stop::Cancelled => {
            reaper.kill();
            if let Err(e) = handle.await {
                warn!(error = %e, "solution runner did not shut down cleanly");
            }
            return Err(ProcessError::Cancelled);
        }
    };

    let finished = finished
        .map_err(|e| ProcessError::Wait(std::io::Error::new(ErrorKind::Other, e.to_string())))??;
    Ok(RunOutcome {
        status: finished.status,
        timed_out,
        stdout: finished.stdout,
        elapsed: finished.elapsed,
        peak_memory_kib: finished.peak_memory_kib,
    })
}

fn collect(
    mut child: Child,
    input: Vec<u8>,
    started: Instant,
    reaper: &Reaper,
) -> Result<Finished, ProcessError> {
    let writer = child.stdin.take().map(|mut stdin| {
        thread::spawn(move || match stdin.write_all(&input) {
            Err(e) if e.kind() != ErrorKind::BrokenPipe => Err(e),
            _ => Ok(()),
        })
    });

    let mut stdout = vec![];
    let read = match child.stdout.take() {
        Some(mut pipe) => pipe.read_to_end(&mut stdout).map(|_| ()),
        None => Ok(()),
    };

    let (status, peak_memory_kib) = reaper.reap()?;
    let elapsed = started.elapsed();

    read.map_err(ProcessError::Pipe)?;
    if let Some(writer) = writer {
        writer
            .join()
            .unwrap_or_else(|_| Err(std::io::Error::new(ErrorKind::Other, "stdin writer panicked")))
            .map_err(ProcessError::Pipe)?;
    }

    Ok(Finished {
        status,
        stdout,
        elapsed,
        peak_memory_kib,
    })
}

#[derive(Debug, Clone)]
struct Reaper {
    pid: libc::pid_t,
    reaped: Arc<Mutex<bool>>,
}

impl Reaper {
    fn new(pid: u32) -> Self {
        Self {
            pid: pid as libc::pid_t,
            reaped: Arc::new(Mutex::new(false)),
        }
    }

    fn kill(&self) {
        let reaped = self.reaped.lock().unwrap_or_else(|e| e.into_inner());
        if !*reaped {
            // SAFETY: the leader is not reaped yet, so the group is still ours.
            unsafe {
                libc::kill(-self.pid, libc::SIGKILL);
            }
        }
    }

    fn reap(&self) -> Result<(ExitStatus, u64), ProcessError> {
        self.wait_exited()?;

        let mut reaped = self.reaped.lock().unwrap_or_else(|e| e.into_inner());
        let mut status: libc::c_int = 0;
        // SAFETY: rusage is plain old data; wait4 fills it in.
        let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
        loop {
            // SAFETY: valid pointers to locals, pid is our own child.
            let ret = unsafe { libc::wait4(self.pid, &mut status, 0, &mut usage) };
            if ret == self.pid {
                break;
            }
            let err = std::io::Error::last_os_error();
            if err.kind() != ErrorKind::Interrupted {
                return Err(ProcessError::Wait(err));
            }
        }
        *reaped = true;

        Ok((ExitStatus::from_raw(status), max_rss_kib(&usage)))
    }

    /// Block until the child has exited, leaving it waitable.
    fn wait_exited(&self) -> Result<(), ProcessError> {
        loop {
            // SAFETY: siginfo_t is plain old data; waitid fills it in.
            let mut info: libc::siginfo_t = unsafe { std::mem::zeroed() };
            // SAFETY: valid pointer to a local, pid is our own child.
            let ret = unsafe {
                libc::waitid(
                    libc::P_PID,
                    self.pid as libc::id_t,
                    &mut info,
                    libc::WEXITED | libc::WNOWAIT,
                )
            };
            if ret == 0 {
                return Ok(());
            }
            let err = std::io::Error::last_os_error();
            if err.kind() != ErrorKind::Interrupted {
                return Err(ProcessError::Wait(err));
            }
        }
    }
}

fn max_rss_kib(usage: &libc::rusage) -> u64 {
    let rss = usage.ru_maxrss.max(0) as u64;
    // macOS reports bytes, Linux KiB.
    if cfg!(target_os = "macos") {
        rss / 1024
    } else {
        rss
    }
}
