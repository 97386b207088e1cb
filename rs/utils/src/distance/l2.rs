use strum::EnumIter;

use crate::DistanceCalculator;

#[derive(Debug, EnumIter, PartialEq, Clone)]
pub enum L2DistanceCalculatorImpl {
    Scalar,
    Unrolled,
}

/// Euclidean distance: square root of the summed squared per-dimension differences.
///
/// Both implementations visit every dimension, so callers comparing distances between
/// vectors of different lengths get a prefix comparison. Dimensions are validated upstream.
#[derive(Debug, Default, Clone, Copy)]
pub struct L2DistanceCalculator {}

impl L2DistanceCalculator {
    pub fn new() -> Self {
        Self {}
    }

    pub fn calculate_scalar(a: &[f64], b: &[f64]) -> f64 {
        Self::calculate_squared(a, b).sqrt()
    }

    pub fn calculate_squared(a: &[f64], b: &[f64]) -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(&x, &y)| (x - y).powi(2))
            .sum::<f64>()
    }

    /// Four independent accumulators, then a tail loop. Gives the compiler room to vectorize
    /// on stable without `std::simd`.
    pub fn calculate_unrolled(a: &[f64], b: &[f64]) -> f64 {
        let len = a.len().min(b.len());
        let mut acc = [0.0f64; 4];
        let mut i = 0;
        while i + 4 <= len {
            for lane in 0..4 {
                let diff = a[i + lane] - b[i + lane];
                acc[lane] += diff * diff;
            }
            i += 4;
        }
        let mut tail = 0.0;
        for j in i..len {
            tail += (a[j] - b[j]).powi(2);
        }
        (acc[0] + acc[1] + acc[2] + acc[3] + tail).sqrt()
    }
}

impl DistanceCalculator for L2DistanceCalculator {
    fn calculate(&self, a: &[f64], b: &[f64]) -> f64 {
        Self::calculate_scalar(a, b)
    }
}
