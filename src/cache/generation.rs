// Cache generation naming
// Author: kelexine (https://github.com/kelexine)

use std::fmt;

/// The two partitions every generation owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionKind {
    /// Filled from the manifest at install time.
    Static,
    /// Filled from runtime traffic.
    Dynamic,
}

impl PartitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionKind::Static => "static",
            PartitionKind::Dynamic => "dynamic",
        }
    }
}

/// A cache generation, identified by its version token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    version: String,
}

impl Generation {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// `<kind>-<version>`
    pub fn partition(&self, kind: PartitionKind) -> String {
        format!("{}-{}", kind.as_str(), self.version)
    }

    pub fn static_name(&self) -> String {
        self.partition(PartitionKind::Static)
    }

    pub fn dynamic_name(&self) -> String {
        self.partition(PartitionKind::Dynamic)
    }

    /// Exact membership: `v1` does not own `static-v10`.
    pub fn owns(&self, partition: &str) -> bool {
        partition == self.static_name() || partition == self.dynamic_name()
    }

    /// Lookup order for cached responses. Runtime writes land in the dynamic
    /// partition, so it is searched first.
    pub fn lookup_order(&self) -> [String; 2] {
        [self.dynamic_name(), self.static_name()]
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.version)
    }
}
