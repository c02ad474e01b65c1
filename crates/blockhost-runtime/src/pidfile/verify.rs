//! Process liveness checks by PID.

/// Check if a PID exists.
///
/// Uses `kill` with the null signal, which doesn't send anything but reports
/// whether the process could be signalled.
#[cfg(unix)]
pub fn pid_exists(pid: u32) -> bool {
    use nix::sys::signal;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };

    match signal::kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        Err(nix::errno::Errno::ESRCH) => false, // No such process
        Err(_) => true,                         // Process exists but we lack permission
    }
}

/// Check if a PID exists using the system process table.
#[cfg(not(unix))]
pub fn pid_exists(pid: u32) -> bool {
    use sysinfo::{Pid, ProcessesToUpdate, System};

    let pid = Pid::from_u32(pid);
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    sys.process(pid).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pid_exists_for_self() {
        assert!(pid_exists(std::process::id()));
    }

    #[test]
    #[cfg(unix)]
    fn pid_exists_false_for_impossible_pid() {
        // Above the Linux pid_max ceiling (2^22)
        assert!(!pid_exists(999_999_999));
    }
}
