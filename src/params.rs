// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The view parameters describe which part of the complex plane is
//! being looked at, how finely it is sampled, and how hard each
//! sample is worked.  A `ViewParameters` is a plain snapshot: the
//! caller builds one, hands it to the engine, and builds a new one
//! whenever the view changes.  The navigation helpers at the bottom
//! of this file never mutate; they return the next snapshot.

use error::AlmondError;
use num::clamp;
use planes::{Pixel, PlaneMapper};
use std::mem;

/// Default real coordinate of the view center.
pub const DEFAULT_CENTER_X: f64 = -0.5;
/// Default imaginary coordinate of the view center.
pub const DEFAULT_CENTER_Y: f64 = 0.0;
/// Default zoom; the whole set fits comfortably at 1.0.
pub const DEFAULT_ZOOM: f64 = 1.0;
/// Default per-point iteration budget.
pub const DEFAULT_ITERATIONS: i32 = 256;
/// Default grid width in cells.
pub const DEFAULT_WIDTH: i32 = 800;
/// Default grid height in cells.
pub const DEFAULT_HEIGHT: i32 = 600;

/// Lower bound enforced by `with_iterations_step`.
pub const MIN_STEPPED_ITERATIONS: i32 = 32;
/// Upper bound enforced by `with_iterations_step`.
pub const MAX_STEPPED_ITERATIONS: i32 = 2048;

const PAN_STEP: f64 = 0.1;
const ZOOM_STEP: f64 = 1.5;
const ZOOM_AT_FACTOR: f64 = 2.0;
const AUTO_ZOOM_STEP: f64 = 1.02;

/// The number of cells in a `width` x `height` grid of iteration
/// counts.  Fails with `InvalidDimension` if either side is not
/// positive, or if the buffer would not fit in the address space.
pub fn grid_cells(width: i32, height: i32) -> Result<usize, AlmondError> {
    let invalid = AlmondError::InvalidDimension {
        width: i64::from(width),
        height: i64::from(height),
    };
    if width <= 0 || height <= 0 {
        return Err(invalid);
    }
    let cells = match (width as usize).checked_mul(height as usize) {
        Some(cells) => cells,
        None => return Err(invalid),
    };
    match cells.checked_mul(mem::size_of::<u32>()) {
        Some(bytes) if bytes <= isize::max_value() as usize => Ok(cells),
        _ => Err(invalid),
    }
}

/// One immutable description of a view.  The fields are public and
/// unchecked; every consumer calls `validate` before trusting them.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ViewParameters {
    /// Real coordinate of the center of the view.
    pub center_x: f64,
    /// Imaginary coordinate of the center of the view.
    pub center_y: f64,
    /// Magnification.  The view spans `4.0 / zoom` units horizontally.
    pub zoom: f64,
    /// Iteration budget per point.
    pub max_iterations: i32,
    /// Grid width in cells.
    pub width: i32,
    /// Grid height in cells.
    pub height: i32,
}

impl Default for ViewParameters {
    fn default() -> Self {
        ViewParameters {
            center_x: DEFAULT_CENTER_X,
            center_y: DEFAULT_CENTER_Y,
            zoom: DEFAULT_ZOOM,
            max_iterations: DEFAULT_ITERATIONS,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

impl ViewParameters {
    /// The default view resized to a `width` x `height` grid.
    pub fn with_size(width: i32, height: i32) -> Self {
        ViewParameters {
            width,
            height,
            ..ViewParameters::default()
        }
    }

    /// Checks every precondition the mapper and evaluator rely on.
    /// Dimensions are checked first, since nothing else matters if
    /// there is no grid to fill.
    pub fn validate(&self) -> Result<(), AlmondError> {
        grid_cells(self.width, self.height)?;
        if !self.zoom.is_finite() || self.zoom <= 0.0 {
            return Err(AlmondError::InvalidZoom(self.zoom));
        }
        if !self.center_x.is_finite() || !self.center_y.is_finite() {
            return Err(AlmondError::InvalidCenter(self.center_x, self.center_y));
        }
        if self.max_iterations < 0 {
            return Err(AlmondError::InvalidIterationBudget(i64::from(
                self.max_iterations,
            )));
        }
        Ok(())
    }

    /// Grid width as an index type.  Only meaningful after `validate`.
    #[inline]
    pub fn grid_width(&self) -> usize {
        self.width.max(0) as usize
    }

    /// Grid height as an index type.  Only meaningful after `validate`.
    #[inline]
    pub fn grid_height(&self) -> usize {
        self.height.max(0) as usize
    }

    /// The number of cells in the grid.  Only meaningful after
    /// `validate`.
    pub fn cell_count(&self) -> usize {
        self.grid_width() * self.grid_height()
    }

    /// The iteration budget in the evaluator's unsigned form.
    #[inline]
    pub fn budget(&self) -> u32 {
        self.max_iterations.max(0) as u32
    }

    /// Moves the center by `steps_x`, `steps_y` pan steps.  A step is
    /// a tenth of a unit at zoom 1.0 and shrinks as the zoom grows, so
    /// panning feels the same at every depth.
    pub fn pan(&self, steps_x: f64, steps_y: f64) -> Self {
        let step = PAN_STEP / self.zoom;
        ViewParameters {
            center_x: self.center_x + steps_x * step,
            center_y: self.center_y + steps_y * step,
            ..*self
        }
    }

    /// One frame of the continuous zoom: a small, fixed step closer.
    pub fn auto_zoom_step(&self) -> Self {
        ViewParameters {
            zoom: self.zoom * AUTO_ZOOM_STEP,
            ..*self
        }
    }

    /// One step closer.
    pub fn zoom_in(&self) -> Self {
        ViewParameters {
            zoom: self.zoom * ZOOM_STEP,
            ..*self
        }
    }

    /// One step further away.
    pub fn zoom_out(&self) -> Self {
        ViewParameters {
            zoom: self.zoom / ZOOM_STEP,
            ..*self
        }
    }

    /// Recentres the view on the point under grid cell (`x`, `y`) and
    /// doubles the zoom.
    pub fn zoom_at(&self, x: usize, y: usize) -> Self {
        let point = PlaneMapper::new(self).pixel_to_point(&Pixel(x, y));
        ViewParameters {
            center_x: point.re,
            center_y: point.im,
            zoom: self.zoom * ZOOM_AT_FACTOR,
            ..*self
        }
    }

    /// Adjusts the iteration budget by `delta`, keeping it between
    /// `MIN_STEPPED_ITERATIONS` and `MAX_STEPPED_ITERATIONS`.
    pub fn with_iterations_step(&self, delta: i32) -> Self {
        let stepped = self.max_iterations.saturating_add(delta);
        ViewParameters {
            max_iterations: clamp(stepped, MIN_STEPPED_ITERATIONS, MAX_STEPPED_ITERATIONS),
            ..*self
        }
    }

    /// Back to the default center, zoom and budget on the same grid.
    pub fn reset(&self) -> Self {
        ViewParameters::with_size(self.width, self.height)
    }
}
