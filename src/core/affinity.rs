//! Best-effort CPU pinning of worker processes.
//!
//! On Linux the process is bound with `sched_setaffinity(2)`; elsewhere pinning
//! reports [`std::io::ErrorKind::Unsupported`]. Callers treat every error as a
//! warning and keep the worker running unpinned.

use std::io;

/// Binds process `pid` to the single CPU `cpu`.
#[cfg(target_os = "linux")]
pub fn pin_process(pid: u32, cpu: usize) -> io::Result<()> {
    if cpu >= libc::CPU_SETSIZE as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("cpu {cpu} is outside the cpu set"),
        ));
    }
    let pid = libc::pid_t::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;

    // SAFETY: `set` is a plain bitmask fully initialised by CPU_ZERO before use,
    // and the size passed matches its type.
    let rc = unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut set);
        libc::CPU_SET(cpu, &mut set);
        libc::sched_setaffinity(pid, std::mem::size_of::<libc::cpu_set_t>(), &set)
    };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Binds process `pid` to the single CPU `cpu`.
#[cfg(not(target_os = "linux"))]
pub fn pin_process(_pid: u32, _cpu: usize) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "cpu pinning is only supported on linux",
    ))
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_outside_set_is_rejected() {
        let err = pin_process(std::process::id(), libc::CPU_SETSIZE as usize).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_reaped_process_cannot_be_pinned() {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();
        assert!(pin_process(pid, 0).is_err());
    }
}
