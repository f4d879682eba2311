// Cache storage and generation naming
// Author: kelexine (https://github.com/kelexine)

pub mod disk;
pub mod generation;
pub mod models;
pub mod storage;

pub use disk::DiskStorage;
pub use generation::{Generation, PartitionKind};
pub use models::{CacheStats, PartitionStats};
pub use storage::{CacheStorage, MemoryStorage};
