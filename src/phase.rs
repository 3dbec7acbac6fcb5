//! Phase markers and run reporting.

use std::time::{Duration, Instant};

use log;

/// Scoped markers bracketing the setup and measured phases of a run.
/// Markers have no effect on sorting.
pub trait PhaseMarkers {
    fn begin_setup_phase(&mut self) {}

    fn end_setup_phase(&mut self) {}

    fn begin_measured_phase(&mut self, _iteration: usize) {}

    fn end_measured_phase(&mut self, _iteration: usize) {}
}

/// Markers doing nothing.
pub struct NoopMarkers;

impl PhaseMarkers for NoopMarkers {}

/// Markers recording and logging phase durations.
#[derive(Default)]
pub struct TimingMarkers {
    started: Option<Instant>,
    setup: Option<Duration>,
    measured: Vec<Duration>,
}

impl TimingMarkers {
    pub fn new() -> Self {
        TimingMarkers::default()
    }

    /// Returns the setup phase duration if the phase has finished.
    pub fn setup_elapsed(&self) -> Option<Duration> {
        self.setup
    }

    /// Returns the duration of every finished measured phase.
    pub fn measured_elapsed(&self) -> &[Duration] {
        &self.measured
    }
}

impl PhaseMarkers for TimingMarkers {
    fn begin_setup_phase(&mut self) {
        self.started = Some(Instant::now());
    }

    fn end_setup_phase(&mut self) {
        if let Some(started) = self.started.take() {
            let elapsed = started.elapsed();
            log::info!("setup phase finished in {:?}", elapsed);
            self.setup = Some(elapsed);
        }
    }

    fn begin_measured_phase(&mut self, _iteration: usize) {
        self.started = Some(Instant::now());
    }

    fn end_measured_phase(&mut self, iteration: usize) {
        if let Some(started) = self.started.take() {
            let elapsed = started.elapsed();
            log::info!("measured phase {} finished in {:?}", iteration, elapsed);
            self.measured.push(elapsed);
        }
    }
}

/// Outcome of one measured iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Iteration index, starting from 0.
    pub iteration: usize,
    /// Number of records in every output shard, ordered by range index.
    pub shard_sizes: Vec<usize>,
    /// Time spent between sampling start and the last merge completion.
    pub elapsed: Duration,
}

impl RunReport {
    pub fn total_records(&self) -> usize {
        self.shard_sizes.iter().sum()
    }
}

/// Description of a full benchmark run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub benchmark_name: String,
    pub implementation: String,
    pub iterations: usize,
    pub workers: usize,
    pub partitions: usize,
    /// Name of the first input source.
    pub input_source_base: Option<String>,
    pub inputs_number: usize,
}

/// Sink receiving final run results.
pub trait ReportSink {
    fn report(&mut self, summary: &RunSummary, reports: &[RunReport]);
}

/// Sink writing results to the log.
pub struct LogReportSink;

impl ReportSink for LogReportSink {
    fn report(&mut self, summary: &RunSummary, reports: &[RunReport]) {
        log::info!(
            "{} ({}): {} iteration(s), {} worker(s), {} partition(s), {} input(s) starting at {}",
            summary.benchmark_name,
            summary.implementation,
            summary.iterations,
            summary.workers,
            summary.partitions,
            summary.inputs_number,
            summary.input_source_base.as_deref().unwrap_or("-"),
        );

        for report in reports {
            log::info!(
                "iteration {}: {} records in {:?}, shard sizes: {:?}",
                report.iteration,
                report.total_records(),
                report.elapsed,
                report.shard_sizes
            );
        }
    }
}
