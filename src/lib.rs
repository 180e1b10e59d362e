#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Almond: a Mandelbrot evaluator and multi-core benchmark
//!
//! The Mandelbrot set is the set of complex numbers `c` for which the
//! orbit of zero under `z = z*z + c` stays bounded.  For every cell of
//! a grid laid over a region of the complex plane we count how many
//! steps the orbit takes to leave the circle of radius 2, giving up
//! after a fixed budget.  Those counts are what a renderer colors.
//!
//! Each cell is independent of every other, which makes the grid an
//! embarrassingly parallel workload and a decent yardstick for how
//! well a machine scales across cores.  The benchmark times the same
//! grid with one worker and with many and boils the ratio down to a
//! single score.
//!
//! The pieces, leaf first:
//!
//! * `planes` maps grid cells to complex points,
//! * `escape` counts iterations for one point,
//! * `workers` splits a fill across scoped threads,
//! * `engine` owns the iteration buffer and fills it,
//! * `bench` and `score` time the engine and rate the result.

extern crate crossbeam;
#[macro_use]
extern crate failure;
extern crate itertools;
extern crate num;
extern crate num_cpus;
#[macro_use]
extern crate tracing;

pub mod bench;
pub mod engine;
pub mod error;
pub mod escape;
pub mod params;
pub mod planes;
pub mod score;
pub mod workers;

pub use bench::{Benchmark, BenchmarkResult, Comparison, BENCHMARK_ITERATIONS, DEFAULT_RUNS};
pub use engine::{default_workers, Frame, GridEngine};
pub use error::AlmondError;
pub use escape::escape_time;
pub use params::ViewParameters;
pub use planes::{Pixel, PlaneMapper};
pub use score::{Rating, ScoreReport};
