//! Platform hooks for worker threads.

use tracing::debug;

/// Lowers the scheduling priority of the calling thread.
///
/// Best effort: failures and unsupported platforms are logged at debug level.
pub(crate) fn make_current_thread_low_priority() {
    #[cfg(target_os = "linux")]
    {
        // The nice value is per thread on Linux; `who == 0` is the calling thread.
        // SAFETY: setpriority has no memory-safety preconditions.
        let result = unsafe { libc::setpriority(libc::PRIO_PROCESS, 0, 19) };
        if result != 0 {
            debug!(
                error = %std::io::Error::last_os_error(),
                "Failed to lower thread priority"
            );
        }
    }

    #[cfg(not(target_os = "linux"))]
    {
        debug!("Lowering thread priority is not supported on this platform");
    }
}
