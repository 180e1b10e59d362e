// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The grid engine owns the iteration buffer and fills it, either on
//! the calling thread or across a set of workers.  Every cell depends
//! only on its own coordinate and the parameter snapshot, so the
//! result is the same however the work is divided.
//!
//! The engine keeps two buffers.  A pass always writes into the back
//! buffer and the two are swapped only once the pass has succeeded,
//! so readers either see the last complete frame or nothing at all.

use error::AlmondError;
use escape::escape_time;
use itertools::iproduct;
use num_cpus;
use params::{grid_cells, ViewParameters};
use planes::{Pixel, PlaneMapper};
use std::mem;
use workers;

/// The number of workers used when the caller does not ask for a
/// specific count: one per logical CPU.
pub fn default_workers() -> usize {
    num_cpus::get()
}

/// A completed pass: the buffer, and the snapshot that produced it.
#[derive(Debug)]
pub struct Frame<'a> {
    /// The parameters the buffer was computed from.
    pub params: &'a ViewParameters,
    /// Incremented on every successful pass.
    pub generation: u64,
    /// Row-major iteration counts, `width * height` of them.
    pub iterations: &'a [u32],
}

/// Owns the iteration buffer for one grid and recomputes it on
/// request.
#[derive(Debug)]
pub struct GridEngine {
    width: usize,
    height: usize,
    front: Vec<u32>,
    back: Vec<u32>,
    // None until the first pass, and again after `invalidate`.
    snapshot: Option<ViewParameters>,
    generation: u64,
}

impl GridEngine {
    /// Allocates the buffers for a `width` x `height` grid.  Nothing is
    /// computed yet; the engine starts out stale.
    pub fn new(width: i32, height: i32) -> Result<GridEngine, AlmondError> {
        let len = grid_cells(width, height)?;
        Ok(GridEngine {
            width: width as usize,
            height: height as usize,
            front: zeroed(len, width, height)?,
            back: zeroed(len, width, height)?,
            snapshot: None,
            generation: 0,
        })
    }

    /// An engine sized for the grid described by `params`.
    pub fn for_view(params: &ViewParameters) -> Result<GridEngine, AlmondError> {
        GridEngine::new(params.width, params.height)
    }

    /// Width of the grid currently allocated.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height of the grid currently allocated.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Recomputes the whole grid on the calling thread.
    pub fn compute_single(&mut self, params: &ViewParameters) -> Result<(), AlmondError> {
        self.compute(params, 1)
    }

    /// Recomputes the whole grid with one worker per logical CPU.
    pub fn compute_parallel(&mut self, params: &ViewParameters) -> Result<(), AlmondError> {
        self.compute(params, default_workers())
    }

    /// Recomputes the whole grid using `workers` threads.  One worker
    /// means the serial path on the calling thread.
    ///
    /// Parameters are validated before anything is touched.  If the
    /// snapshot describes a grid of a different size the buffers are
    /// reallocated.  On any failure the previous frame stays
    /// published.
    pub fn compute(&mut self, params: &ViewParameters, workers: usize) -> Result<(), AlmondError> {
        params.validate()?;
        if workers < 1 {
            return Err(AlmondError::InvalidWorkerCount(workers));
        }

        let len = params.cell_count();
        if self.back.len() != len {
            self.back = zeroed(len, params.width, params.height)?;
        }

        let mapper = PlaneMapper::new(params);
        let budget = params.budget();
        if budget == 0 {
            for cell in self.back.iter_mut() {
                *cell = 0;
            }
        } else if workers == 1 {
            render_serial(&mapper, params, budget, &mut self.back);
        } else {
            workers::fill(&mut self.back, params.grid_width(), workers, |offset| {
                escape_time(mapper.offset_to_point(offset), budget)
            })?;
        }

        mem::swap(&mut self.front, &mut self.back);
        self.width = params.grid_width();
        self.height = params.grid_height();
        self.snapshot = Some(*params);
        self.generation += 1;
        debug!(
            width = self.width,
            height = self.height,
            budget,
            workers,
            generation = self.generation,
            "grid pass complete"
        );
        Ok(())
    }

    /// The published iteration counts, or None if nothing valid has
    /// been computed.
    pub fn iterations(&self) -> Option<&[u32]> {
        self.frame().map(|frame| frame.iterations)
    }

    /// The published frame, or None if nothing valid has been
    /// computed.
    pub fn frame(&self) -> Option<Frame> {
        match self.snapshot {
            Some(ref params) => Some(Frame {
                params,
                generation: self.generation,
                iterations: &self.front,
            }),
            None => None,
        }
    }

    /// True if the published frame was computed from exactly these
    /// parameters.
    pub fn is_current(&self, params: &ViewParameters) -> bool {
        self.snapshot.as_ref() == Some(params)
    }

    /// Marks the published frame stale.  The buffers are kept for the
    /// next pass.
    pub fn invalidate(&mut self) {
        self.snapshot = None;
    }

    /// The number of successful passes so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

// A buffer of `len` zeros, or `InvalidDimension` if the allocator
// cannot provide one.
fn zeroed(len: usize, width: i32, height: i32) -> Result<Vec<u32>, AlmondError> {
    let mut buffer = Vec::new();
    if buffer.try_reserve_exact(len).is_err() {
        return Err(AlmondError::InvalidDimension {
            width: i64::from(width),
            height: i64::from(height),
        });
    }
    buffer.resize(len, 0);
    Ok(buffer)
}

/// The serial baseline: walk the grid row by row.
fn render_serial(mapper: &PlaneMapper, params: &ViewParameters, budget: u32, out: &mut [u32]) {
    let cells = iproduct!(0..params.grid_height(), 0..params.grid_width());
    for ((row, column), cell) in cells.zip(out.iter_mut()) {
        *cell = escape_time(mapper.pixel_to_point(&Pixel(column, row)), budget);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(width: i32, height: i32) -> ViewParameters {
        ViewParameters {
            max_iterations: 64,
            ..ViewParameters::with_size(width, height)
        }
    }

    #[test]
    fn new_engine_is_stale() {
        let engine = GridEngine::new(8, 8).unwrap();
        assert!(engine.iterations().is_none());
        assert!(engine.frame().is_none());
        assert_eq!(engine.generation(), 0);
    }

    #[test]
    fn new_rejects_empty_grids() {
        assert_eq!(
            GridEngine::new(0, 10).unwrap_err(),
            AlmondError::InvalidDimension {
                width: 0,
                height: 10
            }
        );
        assert!(GridEngine::new(10, -1).is_err());
    }

    #[test]
    fn unaddressable_grids_are_rejected_without_allocating() {
        let max = ::std::i32::MAX;
        assert_eq!(
            GridEngine::new(max, max).unwrap_err(),
            AlmondError::InvalidDimension {
                width: i64::from(max),
                height: i64::from(max),
            }
        );

        let params = view(8, 8);
        let mut engine = GridEngine::for_view(&params).unwrap();
        engine.compute(&params, 2).unwrap();
        let huge = ViewParameters {
            width: max,
            height: max,
            ..params
        };
        match engine.compute(&huge, 2) {
            Err(AlmondError::InvalidDimension { .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(engine.iterations().unwrap().len(), 64);
        assert!(engine.is_current(&params));
    }

    #[test]
    fn absurd_worker_counts_still_fill_the_grid() {
        let params = view(4, 4);
        let mut engine = GridEngine::for_view(&params).unwrap();
        engine.compute_single(&params).unwrap();
        let serial = engine.iterations().unwrap().to_vec();
        engine.compute(&params, 1_000_000).unwrap();
        assert_eq!(engine.iterations().unwrap(), &serial[..]);
        assert_eq!(engine.generation(), 2);
    }

    #[test]
    fn cells_match_mapper_and_evaluator() {
        let params = view(32, 24);
        let mut engine = GridEngine::for_view(&params).unwrap();
        engine.compute(&params, 3).unwrap();
        let mapper = PlaneMapper::new(&params);
        let iterations = engine.iterations().unwrap();
        assert_eq!(iterations.len(), 32 * 24);
        for row in 0..24 {
            for column in 0..32 {
                let expected = escape_time(mapper.pixel_to_point(&Pixel(column, row)), 64);
                assert_eq!(iterations[row * 32 + column], expected);
            }
        }
    }

    #[test]
    fn serial_and_parallel_agree() {
        let params = view(97, 61);
        let mut engine = GridEngine::for_view(&params).unwrap();
        engine.compute_single(&params).unwrap();
        let serial = engine.iterations().unwrap().to_vec();
        for workers in &[2, 4, 8] {
            engine.compute(&params, *workers).unwrap();
            assert_eq!(engine.iterations().unwrap(), &serial[..]);
        }
    }

    #[test]
    fn center_of_the_default_view_is_in_the_set() {
        let params = view(20, 20);
        let mut engine = GridEngine::for_view(&params).unwrap();
        engine.compute_parallel(&params).unwrap();
        // Cell (10, 10) samples -0.5 + 0i, deep inside the main cardioid.
        assert_eq!(engine.iterations().unwrap()[10 * 20 + 10], 64);
        // The corner samples -2.5 - 2i, well outside.
        assert!(engine.iterations().unwrap()[0] < 64);
    }

    #[test]
    fn zero_budget_gives_all_zero() {
        let params = ViewParameters {
            max_iterations: 0,
            ..view(16, 16)
        };
        let mut engine = GridEngine::for_view(&params).unwrap();
        engine.compute(&params, 4).unwrap();
        assert!(engine.iterations().unwrap().iter().all(|&n| n == 0));
    }

    #[test]
    fn bad_parameters_leave_prior_frame_untouched() {
        let params = view(16, 12);
        let mut engine = GridEngine::for_view(&params).unwrap();
        engine.compute(&params, 2).unwrap();
        let before = engine.iterations().unwrap().to_vec();

        let zero_width = ViewParameters { width: 0, ..params };
        assert_eq!(
            engine.compute(&zero_width, 2),
            Err(AlmondError::InvalidDimension {
                width: 0,
                height: 12
            })
        );
        let bad_zoom = ViewParameters {
            zoom: 0.0,
            ..params
        };
        assert_eq!(engine.compute(&bad_zoom, 2), Err(AlmondError::InvalidZoom(0.0)));
        assert_eq!(
            engine.compute(&params, 0),
            Err(AlmondError::InvalidWorkerCount(0))
        );

        let frame = engine.frame().unwrap();
        assert_eq!(frame.iterations, &before[..]);
        assert_eq!(*frame.params, params);
        assert_eq!(frame.generation, 1);
    }

    #[test]
    fn resizing_reallocates_and_tracks_dimensions() {
        let small = view(8, 8);
        let large = view(40, 30);
        let mut engine = GridEngine::for_view(&small).unwrap();
        engine.compute(&large, 2).unwrap();
        assert_eq!(engine.iterations().unwrap().len(), 40 * 30);
        assert_eq!((engine.width(), engine.height()), (40, 30));
        engine.compute(&small, 2).unwrap();
        assert_eq!(engine.iterations().unwrap().len(), 64);
        assert_eq!(engine.generation(), 2);
    }

    #[test]
    fn snapshot_tracks_parameters() {
        let params = view(8, 8);
        let mut engine = GridEngine::for_view(&params).unwrap();
        assert!(!engine.is_current(&params));
        engine.compute(&params, 1).unwrap();
        assert!(engine.is_current(&params));
        assert!(!engine.is_current(&params.zoom_in()));
        engine.invalidate();
        assert!(!engine.is_current(&params));
        assert!(engine.iterations().is_none());
    }
}
