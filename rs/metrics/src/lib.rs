use anyhow::Result;
use lazy_static::lazy_static;
use prometheus_client::encoding::text::encode;
use prometheus_client::registry::Registry;

mod run;
pub use run::RunMetrics;

lazy_static! {
    pub static ref RUN_METRICS: RunMetrics = RunMetrics::default();
}

/// Register the metrics with the provided registry.
pub fn register_metrics(metrics_registry: &mut Registry) {
    RUN_METRICS.register_metrics(metrics_registry);
}

/// Render a registry in the prometheus text exposition format.
pub fn encode_metrics(metrics_registry: &Registry) -> Result<String> {
    let mut buffer = String::new();
    encode(&mut buffer, metrics_registry)?;
    Ok(buffer)
}
