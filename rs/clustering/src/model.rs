use anyhow::{anyhow, Result};
use utils::distance::l2::L2DistanceCalculator;
use utils::DistanceCalculator;

/// Fixed-dimension numeric attributes of one record.
///
/// Arithmetic never mutates in place: `add` and `div_scalar` return new vectors.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn zeros(dimension: usize) -> Self {
        Self {
            values: vec![0.0; dimension],
        }
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Componentwise sum.
    pub fn add(&self, other: &FeatureVector) -> FeatureVector {
        debug_assert_eq!(self.dimension(), other.dimension());
        FeatureVector {
            values: self
                .values
                .iter()
                .zip(other.values.iter())
                .map(|(a, b)| a + b)
                .collect(),
        }
    }

    pub fn div_scalar(&self, divisor: f64) -> FeatureVector {
        FeatureVector {
            values: self.values.iter().map(|v| v / divisor).collect(),
        }
    }

    /// Euclidean distance.
    pub fn distance(&self, other: &FeatureVector) -> f64 {
        L2DistanceCalculator::new().calculate(&self.values, &other.values)
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

/// A feature vector plus its cluster assignment. `cluster_id` is `None` until the first
/// assignment round labels it.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub features: FeatureVector,
    pub cluster_id: Option<usize>,
}

impl Record {
    pub fn new(features: FeatureVector) -> Self {
        Self {
            features,
            cluster_id: None,
        }
    }
}

/// The full set of k cluster means. Replaced wholesale every round.
#[derive(Debug, Clone, PartialEq)]
pub struct Centroids {
    vectors: Vec<FeatureVector>,
}

impl Centroids {
    pub fn new(vectors: Vec<FeatureVector>) -> Result<Self> {
        let first = vectors
            .first()
            .ok_or_else(|| anyhow!("A centroid set needs at least one centroid"))?;
        let dimension = first.dimension();
        if let Some(bad) = vectors.iter().position(|v| v.dimension() != dimension) {
            return Err(anyhow!(
                "Centroid {} has dimension {}, expected {}",
                bad,
                vectors[bad].dimension(),
                dimension
            ));
        }
        Ok(Self { vectors })
    }

    pub fn k(&self) -> usize {
        self.vectors.len()
    }

    pub fn dimension(&self) -> usize {
        self.vectors[0].dimension()
    }

    pub fn get(&self, cluster_id: usize) -> Option<&FeatureVector> {
        self.vectors.get(cluster_id)
    }

    pub fn as_slice(&self) -> &[FeatureVector] {
        &self.vectors
    }

    pub fn into_inner(self) -> Vec<FeatureVector> {
        self.vectors
    }
}

/// Check that every record has `dimension` features.
pub fn validate_dimension(records: &[Record], dimension: usize) -> Result<()> {
    if let Some(bad) = records
        .iter()
        .position(|r| r.features.dimension() != dimension)
    {
        return Err(anyhow!(
            "Record {} has dimension {}, expected {}",
            bad,
            records[bad].features.dimension(),
            dimension
        ));
    }
    Ok(())
}
