use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Where the rows left over by `N / P` integer division go.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, EnumIter, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RemainderPolicy {
    /// All remainder rows are appended to the coordinator's own chunk.
    #[default]
    Coordinator,
    /// The first `remainder` ranks each take one extra contiguous row.
    RoundRobin,
}
