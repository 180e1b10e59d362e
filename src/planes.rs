// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Contains the PlaneMapper struct, which relates the integral grid
//! of cells (origin at 0,0, rows growing downward) to a rectangle on
//! the complex plane described by a center and a zoom.
//!
//! The horizontal extent of the view is `4.0 / zoom`.  The vertical
//! extent follows from the aspect ratio of the grid: both axes step
//! by the same amount, `scale / width`, so cells stay square.
use num::Complex;
use params::ViewParameters;

/// The column and row of a cell in the grid.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pixel(pub usize, pub usize);

/// Maps grid cells to points on the complex plane and back.  Built
/// once per pass from a parameter snapshot; all of the division is
/// done here so the per-cell mapping is two multiply-adds.
#[derive(Copy, Clone, Debug)]
pub struct PlaneMapper {
    width: usize,
    height: usize,
    scale: f64,
    // The complex coordinate of cell (0, 0).
    origin: Complex<f64>,
    // The distance between neighbouring cells, identical on both axes.
    step: f64,
}

impl PlaneMapper {
    /// Derives the mapping for a parameter snapshot.  The snapshot is
    /// assumed to have passed `ViewParameters::validate`.
    pub fn new(params: &ViewParameters) -> PlaneMapper {
        let width = params.grid_width();
        let height = params.grid_height();
        let scale = 4.0 / params.zoom;
        let aspect = height as f64 / width as f64;
        PlaneMapper {
            width,
            height,
            scale,
            origin: Complex::new(
                params.center_x - scale * 0.5,
                params.center_y - scale * 0.5 * aspect,
            ),
            step: scale / width as f64,
        }
    }

    /// The width of the sampled region of the complex plane.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// The distance between neighbouring cells on either axis.
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Given the column and row of a cell, return the complex number
    /// sampled for it.
    #[inline]
    pub fn pixel_to_point(&self, pixel: &Pixel) -> Complex<f64> {
        Complex::new(
            self.origin.re + (pixel.0 as f64) * self.step,
            self.origin.im + (pixel.1 as f64) * self.step,
        )
    }

    /// The same mapping addressed by the cell's row-major offset.
    #[inline]
    pub fn offset_to_point(&self, offset: usize) -> Complex<f64> {
        self.pixel_to_point(&Pixel(offset % self.width, offset / self.width))
    }

    /// Given a point on the complex plane, return the cell it falls
    /// in, or None if the point lies outside the grid.
    pub fn point_to_pixel(&self, point: &Complex<f64>) -> Option<Pixel> {
        let left = ((point.re - self.origin.re) / self.step).floor();
        let top = ((point.im - self.origin.im) / self.step).floor();
        if left < 0.0 || top < 0.0 || left >= self.width as f64 || top >= self.height as f64 {
            return None;
        }
        Some(Pixel(left as usize, top as usize))
    }
}
