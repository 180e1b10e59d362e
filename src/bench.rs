// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The benchmark harness.  It times full-grid passes with one worker
//! and then with many, over the same grid and the same fixed
//! iteration budget, and hands the two averages to the score model.
//!
//! All single-worker runs finish before the first multi-worker run
//! starts.  That keeps the two configurations from interleaving, but
//! the second configuration still inherits whatever cache and thermal
//! state the first left behind.
//!
//! Both the clock and the engine sit behind traits so the arithmetic
//! can be tested without a real stopwatch.

use engine::GridEngine;
use error::AlmondError;
use params::ViewParameters;
use score::ScoreReport;
use std::time::{Duration, Instant};

/// The iteration budget every benchmark pass runs with, whatever the
/// caller's view asks for.
pub const BENCHMARK_ITERATIONS: i32 = 512;

/// Repetitions per configuration unless the caller asks otherwise.
pub const DEFAULT_RUNS: usize = 3;

/// Anything that can recompute a full grid.
pub trait GridCompute {
    /// Fills the whole grid for `params` using `workers` threads.
    fn compute(&mut self, params: &ViewParameters, workers: usize) -> Result<(), AlmondError>;
}

impl GridCompute for GridEngine {
    fn compute(&mut self, params: &ViewParameters, workers: usize) -> Result<(), AlmondError> {
        GridEngine::compute(self, params, workers)
    }
}

/// A monotonic time source.  Only differences between readings are
/// meaningful.
pub trait Clock {
    /// Time elapsed since some fixed origin.
    fn now(&self) -> Duration;
}

/// The wall clock, read through `Instant`.
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        MonotonicClock {
            origin: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// The timings for one worker configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct BenchmarkResult {
    /// Workers used for every run.
    pub workers: usize,
    /// Elapsed milliseconds for each run, in order.
    pub samples: Vec<f64>,
    /// Arithmetic mean of `samples`.
    pub average_ms: f64,
}

impl BenchmarkResult {
    /// How many passes were timed.
    pub fn runs(&self) -> usize {
        self.samples.len()
    }
}

/// The outcome of a full benchmark: both configurations and the score
/// derived from them.
#[derive(Clone, Debug, PartialEq)]
pub struct Comparison {
    /// The serial baseline.
    pub single: BenchmarkResult,
    /// The parallel configuration.
    pub multi: BenchmarkResult,
    /// Speedup, efficiency and score.
    pub report: ScoreReport,
}

/// Drives a `GridCompute` through repeated timed passes.
#[derive(Debug)]
pub struct Benchmark<C: Clock = MonotonicClock> {
    clock: C,
    runs: usize,
    iterations: i32,
}

impl Benchmark<MonotonicClock> {
    /// A harness on the wall clock with the default run count and
    /// iteration budget.
    pub fn new() -> Self {
        Benchmark::with_clock(MonotonicClock::default())
    }
}

impl Default for Benchmark<MonotonicClock> {
    fn default() -> Self {
        Benchmark::new()
    }
}

impl<C: Clock> Benchmark<C> {
    /// A harness reading time from `clock`.
    pub fn with_clock(clock: C) -> Self {
        Benchmark {
            clock,
            runs: DEFAULT_RUNS,
            iterations: BENCHMARK_ITERATIONS,
        }
    }

    /// Sets the number of timed passes per configuration.  Checked when
    /// the benchmark runs.
    pub fn runs(mut self, runs: usize) -> Self {
        self.runs = runs;
        self
    }

    /// Overrides the fixed iteration budget.
    pub fn iterations(mut self, iterations: i32) -> Self {
        self.iterations = iterations;
        self
    }

    /// The caller's view with the benchmark's iteration budget
    /// substituted in.
    pub fn normalize(&self, params: &ViewParameters) -> ViewParameters {
        ViewParameters {
            max_iterations: self.iterations,
            ..*params
        }
    }

    /// Times `runs` consecutive passes with `workers` threads and
    /// returns the individual and average times.  Nothing is timed
    /// unless every argument is valid, and an average of zero is
    /// reported as `DegenerateTiming` rather than returned.
    pub fn measure<G: GridCompute>(
        &self,
        engine: &mut G,
        params: &ViewParameters,
        workers: usize,
    ) -> Result<BenchmarkResult, AlmondError> {
        let params = self.check(params, workers)?;
        let mut samples = Vec::with_capacity(self.runs);
        for run in 0..self.runs {
            let start = self.clock.now();
            engine.compute(&params, workers)?;
            let elapsed = self.clock.now().checked_sub(start).unwrap_or_default();
            let ms = duration_ms(elapsed);
            debug!(workers, run, ms, "benchmark pass");
            samples.push(ms);
        }
        let average_ms = samples.iter().sum::<f64>() / samples.len() as f64;
        if !average_ms.is_finite() || average_ms <= 0.0 {
            return Err(AlmondError::DegenerateTiming(average_ms));
        }
        Ok(BenchmarkResult {
            workers,
            samples,
            average_ms,
        })
    }

    /// Runs the single-worker baseline, then the `workers`-thread
    /// configuration, and scores the pair.
    pub fn compare<G: GridCompute>(
        &self,
        engine: &mut G,
        params: &ViewParameters,
        workers: usize,
    ) -> Result<Comparison, AlmondError> {
        self.check(params, workers)?;
        let single = self.measure(engine, params, 1)?;
        let multi = self.measure(engine, params, workers)?;
        let report = ScoreReport::new(single.average_ms, multi.average_ms, workers)?;
        info!(
            single_ms = single.average_ms,
            multi_ms = multi.average_ms,
            workers,
            speedup = report.speedup,
            score = report.score,
            "benchmark complete"
        );
        Ok(Comparison {
            single,
            multi,
            report,
        })
    }

    fn check(&self, params: &ViewParameters, workers: usize) -> Result<ViewParameters, AlmondError> {
        if self.runs < 1 {
            return Err(AlmondError::InvalidRunCount(self.runs));
        }
        if workers < 1 {
            return Err(AlmondError::InvalidWorkerCount(workers));
        }
        let params = self.normalize(params);
        params.validate()?;
        Ok(params)
    }
}

fn duration_ms(elapsed: Duration) -> f64 {
    elapsed.as_secs() as f64 * 1000.0 + f64::from(elapsed.subsec_nanos()) / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use score::Rating;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    // Replays a fixed list of readings, one per call.
    struct ScriptedClock {
        readings: RefCell<VecDeque<u64>>,
    }

    impl ScriptedClock {
        fn new(readings: &[u64]) -> Self {
            ScriptedClock {
                readings: RefCell::new(readings.iter().cloned().collect()),
            }
        }
    }

    impl Clock for ScriptedClock {
        fn now(&self) -> Duration {
            let ms = self
                .readings
                .borrow_mut()
                .pop_front()
                .expect("clock read too often");
            Duration::from_millis(ms)
        }
    }

    #[derive(Default)]
    struct RecordingEngine {
        calls: Vec<(ViewParameters, usize)>,
    }

    impl GridCompute for RecordingEngine {
        fn compute(&mut self, params: &ViewParameters, workers: usize) -> Result<(), AlmondError> {
            self.calls.push((*params, workers));
            Ok(())
        }
    }

    #[test]
    fn measure_averages_each_run() {
        let clock = ScriptedClock::new(&[0, 10, 10, 30, 30, 60]);
        let bench = Benchmark::with_clock(clock);
        let mut engine = RecordingEngine::default();
        let result = bench
            .measure(&mut engine, &ViewParameters::default(), 2)
            .unwrap();
        assert_eq!(result.samples, vec![10.0, 20.0, 30.0]);
        assert_eq!(result.average_ms, 20.0);
        assert_eq!(result.runs(), 3);
        assert_eq!(result.workers, 2);
    }

    #[test]
    fn compare_runs_each_configuration_in_turn() {
        let clock = ScriptedClock::new(&[
            0, 200, 200, 400, 400, 600, // single
            600, 650, 650, 700, 700, 750, // multi
        ]);
        let bench = Benchmark::with_clock(clock);
        let mut engine = RecordingEngine::default();
        let params = ViewParameters {
            max_iterations: 40,
            ..ViewParameters::with_size(320, 200)
        };
        let comparison = bench.compare(&mut engine, &params, 4).unwrap();

        let workers: Vec<usize> = engine.calls.iter().map(|c| c.1).collect();
        assert_eq!(workers, vec![1, 1, 1, 4, 4, 4]);
        for &(ref seen, _) in &engine.calls {
            assert_eq!(seen.max_iterations, BENCHMARK_ITERATIONS);
            assert_eq!(seen.width, 320);
            assert_eq!(seen.height, 200);
        }

        assert_eq!(comparison.single.average_ms, 200.0);
        assert_eq!(comparison.multi.average_ms, 50.0);
        assert_eq!(comparison.report.score, 1200);
        assert_eq!(comparison.report.rating, Rating::Excellent);
    }

    #[test]
    fn zero_runs_is_rejected_before_timing() {
        let bench = Benchmark::with_clock(ScriptedClock::new(&[])).runs(0);
        let mut engine = RecordingEngine::default();
        assert_eq!(
            bench.measure(&mut engine, &ViewParameters::default(), 2),
            Err(AlmondError::InvalidRunCount(0))
        );
        assert!(engine.calls.is_empty());
    }

    #[test]
    fn zero_workers_is_rejected_before_timing() {
        let bench = Benchmark::with_clock(ScriptedClock::new(&[]));
        let mut engine = RecordingEngine::default();
        assert_eq!(
            bench.compare(&mut engine, &ViewParameters::default(), 0),
            Err(AlmondError::InvalidWorkerCount(0))
        );
        assert!(engine.calls.is_empty());
    }

    #[test]
    fn invalid_view_is_rejected_before_timing() {
        let bench = Benchmark::with_clock(ScriptedClock::new(&[]));
        let mut engine = RecordingEngine::default();
        let params = ViewParameters::with_size(0, 100);
        match bench.compare(&mut engine, &params, 2) {
            Err(AlmondError::InvalidDimension { .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert!(engine.calls.is_empty());
    }

    #[test]
    fn a_frozen_clock_is_degenerate() {
        let bench = Benchmark::with_clock(ScriptedClock::new(&[5, 5, 5, 5])).runs(2);
        let mut engine = RecordingEngine::default();
        assert_eq!(
            bench.measure(&mut engine, &ViewParameters::default(), 1),
            Err(AlmondError::DegenerateTiming(0.0))
        );
    }

    #[test]
    fn custom_run_count_and_budget() {
        let bench = Benchmark::with_clock(ScriptedClock::new(&[0, 1, 1, 2, 2, 3, 3, 4, 4, 5]))
            .runs(5)
            .iterations(64);
        let mut engine = RecordingEngine::default();
        let result = bench
            .measure(&mut engine, &ViewParameters::default(), 3)
            .unwrap();
        assert_eq!(result.runs(), 5);
        assert_eq!(engine.calls.len(), 5);
        assert!(engine.calls.iter().all(|c| c.0.max_iterations == 64));
    }

    #[test]
    fn wall_clock_measures_a_real_grid() {
        let params = ViewParameters::with_size(48, 32);
        let mut engine = GridEngine::for_view(&params).unwrap();
        let result = Benchmark::new()
            .runs(2)
            .measure(&mut engine, &params, 2)
            .unwrap();
        assert!(result.average_ms > 0.0);
        assert_eq!(engine.generation(), 2);
    }

    #[test]
    fn duration_conversion_keeps_fractions() {
        assert_eq!(duration_ms(Duration::from_micros(1500)), 1.5);
        assert_eq!(duration_ms(Duration::from_secs(2)), 2000.0);
    }
}
