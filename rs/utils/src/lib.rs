pub mod distance;
pub mod sampling;
pub mod test_utils;

pub trait DistanceCalculator {
    fn calculate(&self, a: &[f64], b: &[f64]) -> f64;
}
