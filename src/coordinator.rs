//! Run orchestration.
//!
//! A run goes through two phases so the caller can report between them:
//!
//! 1. [`Coordinator::prepare`]: validate, generate the array, plan partitions.
//! 2. [`PreparedRun::execute`]: open channels, arm the deadline, fork,
//!    wait, disarm, collect, report.
//!
//! Only setup failures (allocation, channel creation, fork) are errors. A
//! timeout is reported through [`RunReport::timed_out`].

use crate::array::generate_array;
use crate::collect::{WorkerReport, collect_results};
use crate::error::{PminmaxError, Result};
use crate::plan::{Partition, plan_partitions};
use crate::worker::{DEFAULT_POLL_INTERVAL, Deadline, Transport, TransportKind, WorkerSet};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{info, instrument};

/// Parameters of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub seed: u64,
    pub array_size: usize,
    pub pnum: u32,
    /// `None` waits for every worker indefinitely.
    pub timeout: Option<Duration>,
    pub transport: Transport,
    /// Pause each worker before it scans.
    pub scan_delay: Option<Duration>,
    /// Idle sleep between wait-loop polls.
    pub poll_interval: Duration,
}

impl RunConfig {
    /// Pipe transport, no timeout, no delay.
    pub fn new(seed: u64, array_size: usize, pnum: u32) -> Self {
        Self {
            seed,
            array_size,
            pnum,
            timeout: None,
            transport: Transport::Pipe,
            scan_delay: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the deadline; a zero duration means none.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_scan_delay(mut self, delay: Duration) -> Self {
        self.scan_delay = (!delay.is_zero()).then_some(delay);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Reject values no run can start with.
    pub fn validate(&self) -> Result<()> {
        if self.seed == 0 {
            return Err(PminmaxError::InvalidConfig(
                "seed must be a positive number".into(),
            ));
        }
        if self.array_size == 0 {
            return Err(PminmaxError::InvalidConfig(
                "array_size must be a positive number".into(),
            ));
        }
        if self.pnum == 0 {
            return Err(PminmaxError::InvalidConfig(
                "pnum must be a positive number".into(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(PminmaxError::InvalidConfig(
                "poll interval must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Elapsed time per phase, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Timings {
    pub argument_handling_ms: f64,
    pub array_generation_ms: f64,
    pub parallel_ms: f64,
    pub collection_ms: f64,
    pub total_ms: f64,
}

impl Timings {
    pub fn preparation_ms(&self) -> f64 {
        self.argument_handling_ms + self.array_generation_ms
    }

    /// Share of total time spent generating and scanning, in percent.
    pub fn efficiency_percent(&self) -> Option<f64> {
        (self.parallel_ms > 0.0 && self.total_ms > 0.0)
            .then(|| (self.array_generation_ms + self.parallel_ms) / self.total_ms * 100.0)
    }
}

/// Summary printed before workers are forked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Preparation {
    pub argument_handling_ms: f64,
    pub array_generation_ms: f64,
    pub array_size: usize,
    pub pnum: u32,
    pub timeout_secs: Option<f64>,
}

impl Preparation {
    pub fn total_ms(&self) -> f64 {
        self.argument_handling_ms + self.array_generation_ms
    }
}

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Global minimum; `None` when no worker contributed.
    pub min: Option<i32>,
    pub max: Option<i32>,
    pub workers_completed: usize,
    pub workers_total: usize,
    pub timed_out: bool,
    pub timeout_secs: Option<f64>,
    pub transport: TransportKind,
    pub array_size: usize,
    pub timings: Timings,
    pub workers: Vec<WorkerReport>,
}

impl RunReport {
    /// Every worker contributed and the deadline never fired.
    pub fn is_complete(&self) -> bool {
        !self.timed_out && self.workers_completed == self.workers_total
    }
}

/// Entry point for a run.
pub struct Coordinator {
    config: RunConfig,
    program_start: Instant,
}

impl Coordinator {
    /// Validate `config`; argument-handling time is measured from now.
    pub fn new(config: RunConfig) -> Result<Self> {
        Self::with_program_start(config, Instant::now())
    }

    /// Validate `config`, measuring argument handling from `program_start`.
    pub fn with_program_start(config: RunConfig, program_start: Instant) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            program_start,
        })
    }

    /// Generate the array and plan the partitions.
    #[instrument(level = "debug", skip_all, fields(seed = self.config.seed, array_size = self.config.array_size))]
    pub fn prepare(self) -> Result<PreparedRun> {
        let before_generation = Instant::now();
        let argument_handling = before_generation.duration_since(self.program_start);

        let array = generate_array(self.config.seed, self.config.array_size)?;
        let array_generation = before_generation.elapsed();

        let partitions = plan_partitions(self.config.array_size, self.config.pnum)?;

        Ok(PreparedRun {
            config: self.config,
            program_start: self.program_start,
            argument_handling,
            array_generation,
            array,
            partitions,
        })
    }
}

/// A run with its array generated, ready to fork.
pub struct PreparedRun {
    config: RunConfig,
    program_start: Instant,
    argument_handling: Duration,
    array_generation: Duration,
    array: Vec<i32>,
    partitions: Vec<Partition>,
}

impl PreparedRun {
    pub fn array(&self) -> &[i32] {
        &self.array
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub fn preparation(&self) -> Preparation {
        Preparation {
            argument_handling_ms: millis(self.argument_handling),
            array_generation_ms: millis(self.array_generation),
            array_size: self.config.array_size,
            pnum: self.config.pnum,
            timeout_secs: self.config.timeout.map(|t| t.as_secs_f64()),
        }
    }

    /// Fork, wait, collect.
    #[instrument(level = "debug", skip_all, fields(pnum = self.config.pnum, transport = %self.config.transport.kind()))]
    pub fn execute(self) -> Result<RunReport> {
        let Self {
            config,
            program_start,
            argument_handling,
            array_generation,
            array,
            partitions,
        } = self;

        let mut workers = WorkerSet::prepare(partitions, &config.transport)?;

        let parallel_start = Instant::now();
        let mut deadline = Deadline::from_timeout(config.timeout)?;
        workers.spawn_all(&array, config.scan_delay)?;
        let summary = workers.wait_all(&deadline, config.poll_interval);
        let deadline_state = deadline.disarm();
        let parallel_end = Instant::now();

        let total_workers = workers.len();
        let collection = collect_results(workers.into_handles());
        drop(array);

        let collection_time = parallel_end.elapsed();
        let total = program_start.elapsed();

        if summary.timed_out {
            info!(
                completed = collection.completed,
                killed = summary.killed,
                deadline = ?deadline_state,
                "Run finished after timeout"
            );
        } else {
            info!(
                completed = collection.completed,
                deadline = ?deadline_state,
                "Run finished"
            );
        }

        Ok(RunReport {
            min: collection.extent.map(|e| e.min),
            max: collection.extent.map(|e| e.max),
            workers_completed: collection.completed,
            workers_total: total_workers,
            timed_out: summary.timed_out,
            timeout_secs: config.timeout.map(|t| t.as_secs_f64()),
            transport: config.transport.kind(),
            array_size: config.array_size,
            timings: Timings {
                argument_handling_ms: millis(argument_handling),
                array_generation_ms: millis(array_generation),
                parallel_ms: millis(parallel_end.duration_since(parallel_start)),
                collection_ms: millis(collection_time),
                total_ms: millis(total),
            },
            workers: collection.workers,
        })
    }
}

/// Prepare and execute in one call.
pub fn run(config: RunConfig) -> Result<RunReport> {
    Coordinator::new(config)?.prepare()?.execute()
}
