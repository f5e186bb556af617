//! pminmax - process-parallel min/max reduction.
//!
//! The array is generated in the parent, split into contiguous partitions,
//! and each partition is scanned by a forked worker that reports its extent
//! through a pipe or a result file. An optional deadline kills workers that
//! have not finished; whatever arrived in time is folded into the answer.
//!
//! ```no_run
//! use pminmax::coordinator::{RunConfig, run};
//!
//! let report = run(RunConfig::new(42, 1000, 4)).unwrap();
//! println!("{:?} {:?}", report.min, report.max);
//! ```

pub mod array;
pub mod cli;
pub mod collect;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod output;
pub mod plan;
pub mod scan;
pub mod theme;
pub mod version;
pub mod worker;
