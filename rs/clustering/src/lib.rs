pub mod aggregation;
pub mod assignment;
pub mod comm;
pub mod convergence;
pub mod model;
pub mod orchestrator;
pub mod partition;
pub mod sampler;
pub mod worker;
