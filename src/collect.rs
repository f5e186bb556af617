//! Result collection and the global fold.
//!
//! Runs after the wait loop. Only workers reaped with a clean exit are
//! read; everything else is classified without touching its channel. Each
//! handle is dropped right after classification, which closes its pipe or
//! unlinks its result file.

use crate::scan::Extent;
use crate::worker::{EXIT_EMPTY_PARTITION, TerminationReason, WorkerHandle};
use serde::Serialize;
use tracing::debug;

/// What one worker contributed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkerOutcome {
    /// Complete result read from the channel.
    Contributed { min: i32, max: i32 },
    /// Partition had no elements.
    EmptyPartition,
    /// Force-terminated after the deadline.
    Killed,
    /// Exited or died without a usable result.
    Failed { reason: String },
    /// Exited cleanly but its channel held no complete pair.
    Incomplete { detail: String },
}

impl WorkerOutcome {
    /// The partial result, if available.
    pub fn extent(&self) -> Option<Extent> {
        match *self {
            Self::Contributed { min, max } => Some(Extent { min, max }),
            _ => None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.extent().is_some()
    }
}

/// Per-worker line of the run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerReport {
    pub index: u32,
    pub pid: i32,
    pub start: usize,
    pub end: usize,
    pub termination: TerminationReason,
    #[serde(flatten)]
    pub outcome: WorkerOutcome,
}

/// Everything the collector produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    /// Fold of every available result; `None` when nothing contributed.
    pub extent: Option<Extent>,
    /// Number of workers whose result was folded in.
    pub completed: usize,
    pub workers: Vec<WorkerReport>,
}

/// Componentwise min/max over the available results.
pub fn fold_extents<I>(extents: I) -> Option<Extent>
where
    I: IntoIterator<Item = Extent>,
{
    extents.into_iter().reduce(Extent::merge)
}

/// Classify one reaped worker, reading its channel only on a clean exit.
pub fn classify(handle: &mut WorkerHandle) -> WorkerOutcome {
    let termination = handle.termination();
    if termination.is_success() {
        return match handle.channel.read_result() {
            Ok(extent) => WorkerOutcome::Contributed {
                min: extent.min,
                max: extent.max,
            },
            Err(e) => {
                debug!(worker = handle.index(), error = %e, "Worker result unavailable");
                WorkerOutcome::Incomplete {
                    detail: e.to_string(),
                }
            }
        };
    }

    match termination {
        TerminationReason::Exited(EXIT_EMPTY_PARTITION) => WorkerOutcome::EmptyPartition,
        ref t if t.was_killed() => WorkerOutcome::Killed,
        t => WorkerOutcome::Failed {
            reason: t.description(),
        },
    }
}

/// Drain every handle and fold the available results.
pub fn collect_results(handles: Vec<WorkerHandle>) -> Collection {
    let mut workers = Vec::with_capacity(handles.len());

    for mut handle in handles {
        let outcome = classify(&mut handle);
        workers.push(WorkerReport {
            index: handle.index(),
            pid: handle.proc.pid().as_raw(),
            start: handle.partition.start,
            end: handle.partition.end,
            termination: handle.termination(),
            outcome,
        });
    }

    let extent = fold_extents(workers.iter().filter_map(|w| w.outcome.extent()));
    let completed = workers.iter().filter(|w| w.outcome.is_available()).count();

    debug!(
        completed,
        total = workers.len(),
        min = extent.map(|e| e.min),
        max = extent.map(|e| e.max),
        "Collected worker results"
    );

    Collection {
        extent,
        completed,
        workers,
    }
}
