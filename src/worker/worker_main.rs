//! Worker body, run in the forked child.
//!
//! The child never returns into the coordinator's code: it scans its
//! partition, publishes the extent, and leaves through `_exit` so that no
//! destructor, atexit handler or stdio flush inherited from the parent
//! runs in the copy. Nothing here logs.

use super::ipc::ResultChannel;
use super::signals::{EXIT_EMPTY_PARTITION, EXIT_OK, EXIT_PANICKED, EXIT_TRANSPORT_FAILED};
use crate::plan::Partition;
use crate::scan::{ScanError, scan_extent};
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

/// Exit status when the scan itself is rejected (range outside the array).
pub const EXIT_SCAN_FAILED: i32 = 4;

/// Everything one worker needs, borrowed from the coordinator at fork time.
#[derive(Debug, Clone, Copy)]
pub struct WorkerJob<'a> {
    pub partition: Partition,
    pub array: &'a [i32],
    /// Artificial pause before scanning.
    pub scan_delay: Option<Duration>,
}

/// Scan the partition and publish the result. Returns the exit status.
pub fn run_worker(job: &WorkerJob<'_>, channel: &mut dyn ResultChannel) -> i32 {
    if let Some(delay) = job.scan_delay {
        std::thread::sleep(delay);
    }

    let extent = match scan_extent(job.array, job.partition.range()) {
        Ok(extent) => extent,
        Err(ScanError::RangeEmpty { .. }) => return EXIT_EMPTY_PARTITION,
        Err(ScanError::OutOfBounds { .. }) => return EXIT_SCAN_FAILED,
    };

    match channel.write_result(extent) {
        Ok(()) => EXIT_OK,
        Err(_) => EXIT_TRANSPORT_FAILED,
    }
}

/// Entry point of a freshly forked worker. Never returns.
///
/// `channels` is the full channel table inherited across fork; every
/// entry except the worker's own is detached first so the child holds no
/// descriptor that belongs to a sibling.
pub fn worker_entry(job: WorkerJob<'_>, channels: &mut [Box<dyn ResultChannel>]) -> ! {
    // Pipe errors surface as io::Error instead of killing the worker.
    // Safety: SIG_IGN installs no handler code.
    unsafe {
        nix::sys::signal::signal(
            nix::sys::signal::Signal::SIGPIPE,
            nix::sys::signal::SigHandler::SigIgn,
        )
        .ok();
    }

    let own = job.partition.index as usize;
    let code = panic::catch_unwind(AssertUnwindSafe(|| {
        for (i, channel) in channels.iter_mut().enumerate() {
            if i != own {
                channel.detach();
            }
        }
        match channels.get_mut(own) {
            Some(channel) => {
                channel.enter_worker();
                run_worker(&job, channel.as_mut())
            }
            None => EXIT_TRANSPORT_FAILED,
        }
    }))
    .unwrap_or(EXIT_PANICKED);

    // Safety: _exit is async-signal-safe and skips everything the parent
    // registered for its own shutdown.
    unsafe { libc::_exit(code) }
}
