//! The set of workers for one run.
//!
//! Owns the per-partition channels and process handles from channel
//! creation to the end of the wait loop, then hands them over as
//! [`WorkerHandle`]s for result collection. Dropping a `WorkerSet` at any
//! point kills and reaps every live worker and closes or unlinks every
//! channel, so a failed launch leaves nothing behind.

use super::deadline::Deadline;
use super::ipc::{ResultChannel, Transport, open_channel};
use super::proc::Proc;
use super::signals::TerminationReason;
use super::spawn::spawn_worker;
use super::worker_main::WorkerJob;
use crate::error::Result;
use crate::plan::Partition;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Default idle sleep between wait-loop polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A worker after its wait loop: partition, reaped process, and channel.
pub struct WorkerHandle {
    pub partition: Partition,
    pub proc: Proc,
    pub channel: Box<dyn ResultChannel>,
}

impl WorkerHandle {
    pub fn index(&self) -> u32 {
        self.partition.index
    }

    /// Termination reason, or `Unknown` if the process was never reaped.
    pub fn termination(&self) -> TerminationReason {
        self.proc
            .termination()
            .cloned()
            .unwrap_or(TerminationReason::Unknown)
    }
}

/// How the wait loop ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WaitSummary {
    /// The deadline fired before every worker exited.
    pub timed_out: bool,
    /// Workers reaped after exiting on their own.
    pub exited: usize,
    /// Workers force-terminated after the deadline.
    pub killed: usize,
}

/// Workers for one run, indexed by partition.
pub struct WorkerSet {
    // Field order is drop order: workers are killed before their files go.
    procs: Vec<Proc>,
    partitions: Vec<Partition>,
    channels: Vec<Box<dyn ResultChannel>>,
}

impl WorkerSet {
    /// Open one channel per partition. Nothing is forked yet.
    pub fn prepare(partitions: Vec<Partition>, transport: &Transport) -> Result<Self> {
        let channels = partitions
            .iter()
            .map(|p| open_channel(transport, p.index))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            workers = partitions.len(),
            transport = %transport.kind(),
            "Opened result channels"
        );

        Ok(Self {
            procs: Vec::with_capacity(partitions.len()),
            partitions,
            channels,
        })
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// Fork one worker per partition, then close the coordinator's write ends.
    ///
    /// On a fork failure the error is returned and already-forked workers
    /// are killed when the set is dropped.
    #[instrument(level = "debug", skip_all, fields(workers = self.partitions.len()))]
    pub fn spawn_all(&mut self, array: &[i32], scan_delay: Option<Duration>) -> Result<()> {
        self.spawn_all_with(array, |_| scan_delay)
    }

    /// Like [`spawn_all`](Self::spawn_all), with the scan delay chosen per partition.
    pub fn spawn_all_with<F>(&mut self, array: &[i32], delay_for: F) -> Result<()>
    where
        F: Fn(&Partition) -> Option<Duration>,
    {
        for partition in &self.partitions {
            let job = WorkerJob {
                partition: *partition,
                array,
                scan_delay: delay_for(partition),
            };
            let proc = spawn_worker(job, &mut self.channels)?;
            self.procs.push(proc);
        }

        for channel in self.channels.iter_mut() {
            channel.release_writer();
        }
        Ok(())
    }

    /// Number of workers not yet reaped.
    pub fn outstanding(&self) -> usize {
        self.procs.iter().filter(|p| !p.is_reaped()).count()
    }

    /// Poll until every worker is reaped or the deadline fires.
    ///
    /// Each pass reaps whatever has exited with per-pid `WNOHANG` waits;
    /// a pass that reaps nothing sleeps for `poll_interval`. When the
    /// deadline has fired, every remaining worker is sent SIGKILL and
    /// reaped, and the loop stops.
    #[instrument(level = "debug", skip_all)]
    pub fn wait_all(&mut self, deadline: &Deadline, poll_interval: Duration) -> WaitSummary {
        let mut summary = WaitSummary::default();

        while self.outstanding() > 0 {
            if deadline.has_fired() {
                summary.timed_out = true;
                summary.killed = self.kill_outstanding();
                break;
            }

            let mut progressed = false;
            for (proc, partition) in self.procs.iter_mut().zip(&self.partitions) {
                if proc.is_reaped() {
                    continue;
                }
                match proc.try_wait() {
                    Ok(Some(reason)) => {
                        progressed = true;
                        summary.exited += 1;
                        if reason.exited_normally() {
                            info!(
                                worker = partition.index,
                                pid = proc.pid().as_raw(),
                                reason = %reason,
                                "Worker finished"
                            );
                        } else {
                            warn!(
                                worker = partition.index,
                                pid = proc.pid().as_raw(),
                                reason = %reason,
                                "Worker died before finishing"
                            );
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        progressed = true;
                        warn!(worker = partition.index, error = %e, "Lost track of worker");
                    }
                }
            }

            if !progressed && self.outstanding() > 0 {
                std::thread::sleep(poll_interval);
            }
        }

        summary
    }

    /// SIGKILL and reap every worker still running. Returns how many were killed.
    fn kill_outstanding(&mut self) -> usize {
        let outstanding = self.outstanding();
        warn!(
            outstanding,
            "Timeout reached, sending SIGKILL to remaining workers"
        );

        let mut killed = 0;
        for (proc, partition) in self.procs.iter_mut().zip(&self.partitions) {
            if proc.is_reaped() {
                continue;
            }
            match proc.kill() {
                Ok(reason) => {
                    if reason.was_killed() {
                        killed += 1;
                    }
                    info!(
                        worker = partition.index,
                        pid = proc.pid().as_raw(),
                        reason = %reason,
                        "Worker terminated"
                    );
                }
                Err(e) => warn!(worker = partition.index, error = %e, "Failed to kill worker"),
            }
        }
        killed
    }

    /// Hand over partition, process and channel per worker.
    pub fn into_handles(self) -> Vec<WorkerHandle> {
        let Self {
            procs,
            partitions,
            channels,
        } = self;
        partitions
            .into_iter()
            .zip(procs)
            .zip(channels)
            .map(|((partition, proc), channel)| WorkerHandle {
                partition,
                proc,
                channel,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::{WorkerOutcome, collect_results};
    use crate::plan::plan_partitions;
    use crate::scan::Extent;
    use std::time::Instant;
    use tempfile::tempdir;

    fn array() -> Vec<i32> {
        (0..200).map(|v| (v * 7919) % 263 - 100).collect()
    }

    #[test]
    fn test_spawn_and_wait_all_pipe() {
        let array = array();
        let partitions = plan_partitions(array.len(), 4).unwrap();
        let mut set = WorkerSet::prepare(partitions, &Transport::Pipe).unwrap();
        set.spawn_all(&array, None).unwrap();

        let summary = set.wait_all(&Deadline::disarmed(), DEFAULT_POLL_INTERVAL);
        assert_eq!(
            summary,
            WaitSummary {
                timed_out: false,
                exited: 4,
                killed: 0
            }
        );

        let mut handles = set.into_handles();
        assert_eq!(handles.len(), 4);
        for handle in handles.iter_mut() {
            assert!(handle.termination().is_success());
            let range = handle.partition.range();
            let expected = Extent {
                min: *array[range.clone()].iter().min().unwrap(),
                max: *array[range].iter().max().unwrap(),
            };
            assert_eq!(handle.channel.read_result().unwrap(), expected);
        }
    }

    #[test]
    fn test_spawn_and_wait_all_file() {
        let dir = tempdir().unwrap();
        let transport = Transport::File {
            dir: dir.path().to_path_buf(),
        };
        let array = array();
        let partitions = plan_partitions(array.len(), 3).unwrap();
        let mut set = WorkerSet::prepare(partitions, &transport).unwrap();
        set.spawn_all(&array, None).unwrap();
        set.wait_all(&Deadline::disarmed(), DEFAULT_POLL_INTERVAL);

        for mut handle in set.into_handles() {
            assert!(handle.channel.read_result().is_ok());
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_deadline_kills_slow_workers() {
        let array = array();
        let partitions = plan_partitions(array.len(), 2).unwrap();
        let mut set = WorkerSet::prepare(partitions, &Transport::Pipe).unwrap();

        let deadline = Deadline::arm(Duration::from_millis(50)).unwrap();
        set.spawn_all(&array, Some(Duration::from_secs(30))).unwrap();

        let start = Instant::now();
        let summary = set.wait_all(&deadline, DEFAULT_POLL_INTERVAL);
        assert!(start.elapsed() < Duration::from_secs(10));
        assert!(summary.timed_out);
        assert_eq!(summary.killed, 2);
        assert_eq!(set.outstanding(), 0);

        for mut handle in set.into_handles() {
            assert!(handle.termination().was_killed());
            assert!(handle.channel.read_result().is_err());
        }
    }

    #[test]
    fn test_deadline_keeps_results_of_finished_workers() {
        let array: Vec<i32> = (0..100).map(|v| v - 50).collect();
        let partitions = plan_partitions(array.len(), 2).unwrap();
        let mut set = WorkerSet::prepare(partitions, &Transport::Pipe).unwrap();

        let deadline = Deadline::arm(Duration::from_millis(300)).unwrap();
        set.spawn_all_with(&array, |p| {
            (p.index == 1).then_some(Duration::from_secs(30))
        })
        .unwrap();

        let summary = set.wait_all(&deadline, DEFAULT_POLL_INTERVAL);
        assert_eq!(
            summary,
            WaitSummary {
                timed_out: true,
                exited: 1,
                killed: 1
            }
        );

        let collection = collect_results(set.into_handles());
        assert_eq!(collection.completed, 1);
        assert_eq!(collection.extent, Some(Extent { min: -50, max: -1 }));
        assert_eq!(
            collection.workers[0].outcome,
            WorkerOutcome::Contributed { min: -50, max: -1 }
        );
        assert_eq!(collection.workers[1].outcome, WorkerOutcome::Killed);
        assert!(collection.workers[1].termination.was_killed());
    }

    #[test]
    fn test_drop_before_wait_reaps_workers() {
        let array = array();
        let partitions = plan_partitions(array.len(), 2).unwrap();
        let mut set = WorkerSet::prepare(partitions, &Transport::Pipe).unwrap();
        set.spawn_all(&array, Some(Duration::from_secs(30))).unwrap();
        assert_eq!(set.outstanding(), 2);

        let start = Instant::now();
        drop(set);
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_prepare_fails_for_missing_dir() {
        let dir = tempdir().unwrap();
        let transport = Transport::File {
            dir: dir.path().join("missing"),
        };
        let partitions = plan_partitions(10, 2).unwrap();
        assert!(WorkerSet::prepare(partitions, &transport).is_err());
    }
}
