//! Cache partition statistics models.

// Author: kelexine (https://github.com/kelexine)

use serde::Serialize;

/// Entry count of a single partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionStats {
    /// Partition name, `<kind>-<version>`.
    pub name: String,
    /// Number of stored entries.
    pub entries: usize,
}

/// Snapshot of every partition in storage.
#[derive(Debug, Default, Clone, Serialize)]
pub struct CacheStats {
    pub partitions: Vec<PartitionStats>,
}

impl CacheStats {
    /// Total number of entries across partitions.
    pub fn total_entries(&self) -> usize {
        self.partitions.iter().map(|p| p.entries).sum()
    }

    pub fn names(&self) -> Vec<&str> {
        self.partitions.iter().map(|p| p.name.as_str()).collect()
    }
}
