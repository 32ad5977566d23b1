//! # External engine invocation.
//!
//! The engine is an opaque program. For each segment it is launched as
//!
//! ```text
//! <engine> [engine_args...] <range_start> <range_end> <checkpoint_path> <checkpoint_interval_secs>
//! ```
//!
//! with stdin closed. On unix stdout and stderr share one pipe, so the worker sees
//! both streams interleaved in the order the engine wrote them. The engine resumes
//! from `checkpoint_path` when it exists and exits after printing `SUCCESS:` or on a
//! termination request (SIGTERM on unix).

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::AsyncRead;
use tokio::process::{Child, Command};

use crate::config::Config;
use crate::partition::Segment;

/// Readable end of an engine output pipe.
pub type OutputStream = Box<dyn AsyncRead + Unpin + Send>;

/// A launched engine and the pipes carrying its output.
pub struct EngineProcess {
    pub child: Child,
    /// One combined stream on unix; stdout then stderr elsewhere.
    pub output: Vec<OutputStream>,
}

/// How to launch the engine for a segment.
#[derive(Clone, Debug)]
pub struct EngineCommand {
    program: PathBuf,
    prefix: Vec<String>,
    checkpoint_interval_secs: u64,
    kill_on_drop: bool,
}

impl EngineCommand {
    /// Builds the command from the run configuration.
    ///
    /// Processes are killed when their handle is dropped only if forced kills are enabled.
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            program: cfg.engine.clone(),
            prefix: cfg.engine_args.clone(),
            checkpoint_interval_secs: cfg.checkpoint_interval.as_secs(),
            kill_on_drop: cfg.force_kill,
        }
    }

    /// Full argument list for a segment.
    pub fn args(&self, seg: &Segment) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.prefix.iter().map(OsString::from).collect();
        args.push(seg.extended_start.to_string().into());
        args.push(seg.extended_end.to_string().into());
        args.push(seg.checkpoint_path.clone().into_os_string());
        args.push(self.checkpoint_interval_secs.to_string().into());
        args
    }

    fn command(&self, seg: &Segment) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args(seg))
            .stdin(Stdio::null())
            .kill_on_drop(self.kill_on_drop);
        cmd
    }

    /// Launches the engine for a segment with stdout and stderr on one pipe.
    #[cfg(unix)]
    pub fn spawn(&self, seg: &Segment) -> io::Result<EngineProcess> {
        use std::os::fd::OwnedFd;
        use tokio::net::unix::pipe;

        let (reader, writer) = io::pipe()?;
        let child = {
            let mut cmd = self.command(seg);
            cmd.stdout(writer.try_clone()?).stderr(writer);
            // the command holds our copies of the write end; they close when it drops
            cmd.spawn()?
        };
        let output = pipe::Receiver::from_owned_fd(OwnedFd::from(reader))?;
        Ok(EngineProcess {
            child,
            output: vec![Box::new(output) as OutputStream],
        })
    }

    /// Launches the engine for a segment with stdout and stderr piped separately.
    #[cfg(not(unix))]
    pub fn spawn(&self, seg: &Segment) -> io::Result<EngineProcess> {
        let mut child = self
            .command(seg)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        let mut output: Vec<OutputStream> = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            output.push(Box::new(stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            output.push(Box::new(stderr));
        }
        Ok(EngineProcess { child, output })
    }
}

/// Asks a running engine to stop (SIGTERM), letting it flush its checkpoint.
///
/// A process that is already gone is not an error.
#[cfg(unix)]
pub fn request_termination(child: &mut Child) -> io::Result<()> {
    let Some(pid) = child.id() else {
        return Ok(());
    };
    let pid = libc::pid_t::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;

    // SAFETY: kill(2) has no memory-safety preconditions.
    if unsafe { libc::kill(pid, libc::SIGTERM) } != 0 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            return Err(err);
        }
    }
    Ok(())
}

/// Asks a running engine to stop. Without signals this is a kill.
#[cfg(not(unix))]
pub fn request_termination(child: &mut Child) -> io::Result<()> {
    child.start_kill()
}
