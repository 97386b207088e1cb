use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::enums::RemainderPolicy;

/// Config for a distributed k-means run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Number of clusters (k). Fixed for the whole run.
    /// Default: 4
    pub num_clusters: usize,

    /// Iteration cap. The round loop runs at most `max_iterations + 1` assignment rounds.
    /// Default: 100
    pub max_iterations: usize,

    /// Number of cooperating workers. Rank 0 is the coordinator.
    /// Default: 4
    pub num_workers: usize,

    /// Threads each worker fans its assignment step out to. 0 splits the available
    /// parallelism evenly across the workers (at least one each).
    /// Default: 0
    pub num_threads: usize,

    /// How rows left over by integer-division chunking are distributed.
    /// Default: Coordinator
    pub remainder_policy: RemainderPolicy,

    /// Seed for centroid seeding and empty-cluster reseeding. Unset means entropy.
    /// Default: None
    pub seed: Option<u64>,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            num_clusters: 4,
            max_iterations: 100,
            num_workers: 4,
            num_threads: 0,
            remainder_policy: RemainderPolicy::Coordinator,
            seed: None,
        }
    }
}

impl ClusteringConfig {
    /// Load a config from a YAML (`.yaml`/`.yml`) or JSON (`.json`) file. Missing fields keep
    /// their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: ClusteringConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config {}", path.display()))?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config {}", path.display()))?,
            _ => {
                return Err(anyhow!(
                    "Unsupported config file extension: {} (expected .yaml, .yml or .json)",
                    path.display()
                ))
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_clusters == 0 {
            return Err(anyhow!("num_clusters must be at least 1"));
        }
        if self.num_workers == 0 {
            return Err(anyhow!("num_workers must be at least 1"));
        }
        Ok(())
    }

    /// Thread count for a worker's local assignment fan-out.
    pub fn effective_num_threads(&self) -> usize {
        if self.num_threads > 0 {
            return self.num_threads;
        }
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        threads_per_worker(available, self.num_workers)
    }
}

/// Share of `available` threads for each of `num_workers` workers, never below one.
fn threads_per_worker(available: usize, num_workers: usize) -> usize {
    (available / num_workers.max(1)).max(1)
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ClusteringConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.num_clusters, 4);
        assert_eq!(config.remainder_policy, RemainderPolicy::Coordinator);
        assert!(config.effective_num_threads() >= 1);
    }

    #[test]
    fn test_validate_rejects_zero() {
        let config = ClusteringConfig {
            num_clusters: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ClusteringConfig {
            num_workers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_threads_split_across_workers() {
        assert_eq!(threads_per_worker(16, 4), 4);
        assert_eq!(threads_per_worker(10, 4), 2);
        assert_eq!(threads_per_worker(2, 4), 1);
        assert_eq!(threads_per_worker(8, 1), 8);
        assert_eq!(threads_per_worker(8, 0), 8);

        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let config = ClusteringConfig {
            num_workers: 4,
            ..Default::default()
        };
        assert_eq!(config.effective_num_threads(), (available / 4).max(1));
    }

    #[test]
    fn test_explicit_threads() {
        let config = ClusteringConfig {
            num_threads: 3,
            ..Default::default()
        };
        assert_eq!(config.effective_num_threads(), 3);
    }

    #[test]
    fn test_from_yaml_file_partial() {
        let temp_dir = TempDir::new("test_clustering_config").unwrap();
        let path = temp_dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "num_clusters: 7\nmax_iterations: 20\nremainder_policy: round_robin\nseed: 11\n",
        )
        .unwrap();

        let config = ClusteringConfig::from_file(&path).unwrap();
        assert_eq!(config.num_clusters, 7);
        assert_eq!(config.max_iterations, 20);
        assert_eq!(config.remainder_policy, RemainderPolicy::RoundRobin);
        assert_eq!(config.seed, Some(11));
        // Unspecified fields keep defaults
        assert_eq!(config.num_workers, 4);
        assert_eq!(config.num_threads, 0);
    }

    #[test]
    fn test_from_json_file() {
        let temp_dir = TempDir::new("test_clustering_config").unwrap();
        let path = temp_dir.path().join("config.json");
        let expected = ClusteringConfig {
            num_clusters: 3,
            max_iterations: 50,
            num_workers: 2,
            num_threads: 1,
            remainder_policy: RemainderPolicy::Coordinator,
            seed: None,
        };
        std::fs::write(&path, serde_json::to_string(&expected).unwrap()).unwrap();

        assert_eq!(ClusteringConfig::from_file(&path).unwrap(), expected);
    }

    #[test]
    fn test_from_file_errors() {
        let temp_dir = TempDir::new("test_clustering_config").unwrap();

        let missing = temp_dir.path().join("missing.yaml");
        assert!(ClusteringConfig::from_file(&missing).is_err());

        let unsupported = temp_dir.path().join("config.toml");
        std::fs::write(&unsupported, "num_clusters = 3").unwrap();
        assert!(ClusteringConfig::from_file(&unsupported).is_err());

        let invalid = temp_dir.path().join("invalid.yaml");
        std::fs::write(&invalid, "num_clusters: 0\n").unwrap();
        assert!(ClusteringConfig::from_file(&invalid).is_err());
    }
}
