// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The escape-time iterator.  This is the hot loop: it is called once
//! per cell per pass and must not allocate.

use num::Complex;

/// The square of the escape radius.  Once |z| exceeds 2 the orbit is
/// guaranteed to diverge.
pub const ESCAPE_RADIUS_SQR: f64 = 4.0;

/// Counts how many times `z = z*z + c` can be applied, starting from
/// zero, before |z| exceeds 2 or the budget runs out.
///
/// The magnitude is tested before each step, so a point that starts
/// outside the radius still takes one step: `c = 3` returns 1.  A
/// result equal to `max_iterations` means the point is in the set.
/// A budget of zero returns zero without touching the recurrence.
#[inline]
pub fn escape_time(c: Complex<f64>, max_iterations: u32) -> u32 {
    let (mut re, mut im) = (0.0_f64, 0.0_f64);
    let (mut re2, mut im2) = (0.0_f64, 0.0_f64);
    let mut count = 0;
    while count < max_iterations && re2 + im2 <= ESCAPE_RADIUS_SQR {
        im = 2.0 * re * im + c.im;
        re = re2 - im2 + c.re;
        re2 = re * re;
        im2 = im * im;
        count += 1;
    }
    count
}

/// True if the point never escaped within the budget.
#[inline]
pub fn in_set(count: u32, max_iterations: u32) -> bool {
    count == max_iterations
}
