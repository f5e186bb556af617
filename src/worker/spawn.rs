//! Worker process spawning.
//!
//! Workers are plain `fork()` children: each inherits the coordinator's
//! view of the array and the full channel table, runs
//! [`worker_entry`](super::worker_main::worker_entry) and exits. There is
//! no exec, so no re-parsing of arguments and no second copy of the data
//! pipeline.

use super::ipc::ResultChannel;
use super::proc::Proc;
use super::worker_main::{WorkerJob, worker_entry};
use crate::error::{PminmaxError, Result};
use nix::unistd::{ForkResult, fork};

/// Fork one worker for `job`.
///
/// `channels` must be the table opened for this run, indexed by partition.
pub fn spawn_worker(job: WorkerJob<'_>, channels: &mut [Box<dyn ResultChannel>]) -> Result<Proc> {
    // Safety: the child only scans a borrowed slice, writes through its
    // channel and leaves via `_exit`; it never returns into this frame.
    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => {
            tracing::debug!(
                worker = job.partition.index,
                pid = child.as_raw(),
                start = job.partition.start,
                end = job.partition.end,
                "Forked worker"
            );
            Ok(Proc::new(child))
        }
        Ok(ForkResult::Child) => worker_entry(job, channels),
        Err(e) => Err(PminmaxError::Fork(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::Partition;
    use crate::scan::Extent;
    use crate::worker::ipc::{Transport, open_channel};
    use crate::worker::signals::EXIT_EMPTY_PARTITION;

    #[test]
    fn test_spawned_worker_reports_through_pipe() {
        let array: Vec<i32> = (0..100).map(|v| (v * 37) % 101 - 50).collect();
        let mut channels = vec![open_channel(&Transport::Pipe, 0).unwrap()];
        let job = WorkerJob {
            partition: Partition {
                index: 0,
                start: 10,
                end: 60,
            },
            array: &array,
            scan_delay: None,
        };

        let mut proc = spawn_worker(job, &mut channels).unwrap();
        channels[0].release_writer();

        assert!(proc.wait().unwrap().is_success());
        let expected = Extent {
            min: *array[10..60].iter().min().unwrap(),
            max: *array[10..60].iter().max().unwrap(),
        };
        assert_eq!(channels[0].read_result().unwrap(), expected);
    }

    #[test]
    fn test_spawned_worker_with_empty_partition() {
        let array = vec![1, 2, 3];
        let mut channels = vec![
            open_channel(&Transport::Pipe, 0).unwrap(),
            open_channel(&Transport::Pipe, 1).unwrap(),
        ];
        let job = WorkerJob {
            partition: Partition {
                index: 1,
                start: 3,
                end: 3,
            },
            array: &array,
            scan_delay: None,
        };

        let mut proc = spawn_worker(job, &mut channels).unwrap();
        for channel in channels.iter_mut() {
            channel.release_writer();
        }
        assert_eq!(
            proc.wait().unwrap(),
            crate::worker::signals::TerminationReason::Exited(EXIT_EMPTY_PARTITION)
        );
        assert!(channels[1].read_result().is_err());
    }
}
