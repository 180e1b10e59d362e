// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The single error type shared by every stage of the evaluator.  All
//! of these are raised at the call that receives the bad value, before
//! any arithmetic or timing takes place.

/// Everything that can go wrong while validating parameters, filling
/// a grid, or timing a benchmark.
#[derive(Debug, Fail, Clone, PartialEq)]
pub enum AlmondError {
    /// The grid must be at least one cell wide and one cell tall.
    #[fail(display = "grid dimensions must be positive, got {}x{}", width, height)]
    InvalidDimension {
        /// Requested grid width.
        width: i64,
        /// Requested grid height.
        height: i64,
    },

    /// Zoom must be a finite, strictly positive number.
    #[fail(display = "zoom must be finite and greater than zero, got {}", _0)]
    InvalidZoom(f64),

    /// The center of the view must be a finite point.
    #[fail(display = "center must be a finite point, got ({}, {})", _0, _1)]
    InvalidCenter(f64, f64),

    /// A negative iteration budget.  Zero is allowed.
    #[fail(display = "iteration budget must not be negative, got {}", _0)]
    InvalidIterationBudget(i64),

    /// At least one worker is required.
    #[fail(display = "worker count must be at least 1, got {}", _0)]
    InvalidWorkerCount(usize),

    /// At least one benchmark run is required.
    #[fail(display = "run count must be at least 1, got {}", _0)]
    InvalidRunCount(usize),

    /// The clock could not resolve the work being measured.
    #[fail(display = "measured average time of {} ms cannot be scored", _0)]
    DegenerateTiming(f64),

    /// A worker died before finishing its share of the grid.
    #[fail(display = "worker failed during grid evaluation: {}", _0)]
    WorkerFault(String),
}
