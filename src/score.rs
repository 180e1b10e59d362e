// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Turns a pair of benchmark timings into a single number.  The score
//! rewards raw multi-worker speed (10000 / ms) and adds a bonus for
//! how close the machine comes to linear scaling (efficiency x 1000).

use error::AlmondError;
use std::fmt;

/// A coarse verdict on a score, ordered from worst to best.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rating {
    /// Below 100.
    NeedsImprovement,
    /// 100 to 199.
    Average,
    /// 200 to 299.
    Good,
    /// 300 to 499.
    VeryGood,
    /// 500 and up.
    Excellent,
}

impl Rating {
    /// Buckets a score.  Anything under 100, negative included, is
    /// `NeedsImprovement`.
    pub fn from_score(score: i64) -> Rating {
        match score {
            s if s >= 500 => Rating::Excellent,
            s if s >= 300 => Rating::VeryGood,
            s if s >= 200 => Rating::Good,
            s if s >= 100 => Rating::Average,
            _ => Rating::NeedsImprovement,
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match *self {
            Rating::Excellent => "EXCELLENT",
            Rating::VeryGood => "VERY GOOD",
            Rating::Good => "GOOD",
            Rating::Average => "AVERAGE",
            Rating::NeedsImprovement => "NEEDS IMPROVEMENT",
        };
        f.write_str(label)
    }
}

/// Everything derived from one single-worker/multi-worker timing pair.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ScoreReport {
    /// Single-worker time over multi-worker time.
    pub speedup: f64,
    /// Speedup per worker; 1.0 is perfect scaling.
    pub efficiency: f64,
    /// The headline number.
    pub score: i64,
    /// The bucket the score falls into.
    pub rating: Rating,
    /// The multi-worker count the efficiency was normalised by.
    pub workers: usize,
}

impl ScoreReport {
    /// Scores a pair of average timings in milliseconds.  Both must be
    /// strictly positive; a zero time means the clock could not see
    /// the work and there is nothing meaningful to divide by.
    pub fn new(
        single_avg_ms: f64,
        multi_avg_ms: f64,
        workers: usize,
    ) -> Result<ScoreReport, AlmondError> {
        if workers < 1 {
            return Err(AlmondError::InvalidWorkerCount(workers));
        }
        for &ms in &[single_avg_ms, multi_avg_ms] {
            if !ms.is_finite() || ms <= 0.0 {
                return Err(AlmondError::DegenerateTiming(ms));
            }
        }
        let speedup = single_avg_ms / multi_avg_ms;
        let efficiency = speedup / workers as f64;
        let score = (10000.0 / multi_avg_ms + efficiency * 1000.0).floor() as i64;
        Ok(ScoreReport {
            speedup,
            efficiency,
            score,
            rating: Rating::from_score(score),
            workers,
        })
    }
}
