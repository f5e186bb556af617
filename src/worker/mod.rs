//! Forked worker processes for the parallel scan.
//!
//! # Architecture
//!
//! ```text
//!                     ┌──────────────────┐
//!                     │   Coordinator    │
//!                     │ (deadline, wait) │
//!                     └────────┬─────────┘
//!                      fork    │    pipe / file
//!               ┌──────────────┼──────────────┐
//!               │              │              │
//!         ┌─────▼─────┐  ┌─────▼─────┐  ┌─────▼─────┐
//!         │ Worker 0  │  │ Worker 1  │  │ Worker N  │
//!         │ [0, k)    │  │ [k, 2k)   │  │ [.., n)   │
//!         └───────────┘  └───────────┘  └───────────┘
//! ```
//!
//! - **Process isolation**: each worker scans its own copy of the array
//! - **One-shot transport**: one `{min, max}` per worker, pipe or file
//! - **Deadline**: stragglers are killed once the timer fires

mod deadline;
mod ipc;
mod pool;
mod proc;
mod signals;
mod spawn;
mod worker_main;

pub use deadline::{Deadline, DeadlineState};
pub use ipc::{
    FileChannel, PIPE_RESULT_LEN, PipeChannel, RESULT_FILE_PREFIX, ResultChannel, Transport,
    TransportIncomplete, TransportKind, open_channel, result_file_path,
};
pub use pool::{DEFAULT_POLL_INTERVAL, WaitSummary, WorkerHandle, WorkerSet};
pub use proc::Proc;
pub use signals::{
    EXIT_EMPTY_PARTITION, EXIT_OK, EXIT_PANICKED, EXIT_TRANSPORT_FAILED, TerminationReason,
    analyze_wait_status,
};
pub use worker_main::{EXIT_SCAN_FAILED, WorkerJob};
