use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct WorkerLabel {
    pub rank: String,
}

#[derive(Default)]
pub struct RunMetrics {
    pub rounds: Counter<u64>,
    pub clusters_reseeded: Counter<u64>,
    pub converged: Gauge<i64>,
    pub num_records: Gauge<i64>,
    pub partition_size: Family<WorkerLabel, Gauge>,
}

impl RunMetrics {
    pub fn register_metrics(&self, metrics_registry: &mut Registry) {
        metrics_registry.register(
            "rounds",
            "Number of assignment rounds executed",
            self.rounds.clone(),
        );
        metrics_registry.register(
            "clusters_reseeded",
            "Number of empty clusters replaced by a sampled record",
            self.clusters_reseeded.clone(),
        );
        metrics_registry.register(
            "converged",
            "1 if the last run converged, 0 if it hit the iteration cap",
            self.converged.clone(),
        );
        metrics_registry.register(
            "num_records",
            "Number of records in the dataset",
            self.num_records.clone(),
        );
        metrics_registry.register(
            "partition_size",
            "Number of records owned by each worker",
            self.partition_size.clone(),
        );
    }

    pub fn rounds_inc(&self) {
        self.rounds.inc();
    }

    pub fn clusters_reseeded_inc_by(&self, num_clusters: u64) {
        self.clusters_reseeded.inc_by(num_clusters);
    }

    pub fn converged_set(&self, converged: bool) {
        self.converged.set(if converged { 1 } else { 0 });
    }

    pub fn num_records_set(&self, num_records: i64) {
        self.num_records.set(num_records);
    }

    pub fn partition_size_set(&self, rank: usize, size: i64) {
        let label = WorkerLabel {
            rank: rank.to_string(),
        };
        self.partition_size.get_or_create(&label).set(size);
    }

    pub fn partition_size_get(&self, rank: usize) -> i64 {
        let label = WorkerLabel {
            rank: rank.to_string(),
        };
        self.partition_size
            .get(&label)
            .map(|metric| metric.get())
            .unwrap_or(0)
    }
}
