//! Partition selection strategies injected into producers

use crate::error::MetaClientError;
use crate::Result;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Strategy mapping a message key onto one of `partition_count` partitions
pub trait PartitionSelector: Send + Sync + fmt::Debug {
    fn select_partition(&self, key: Option<&[u8]>, partition_count: usize) -> Result<usize>;
}

/// Cycles through partitions regardless of the key
#[derive(Debug, Default)]
pub struct RoundRobinPartitionSelector {
    counter: AtomicUsize,
}

impl RoundRobinPartitionSelector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PartitionSelector for RoundRobinPartitionSelector {
    fn select_partition(&self, _key: Option<&[u8]>, partition_count: usize) -> Result<usize> {
        if partition_count == 0 {
            return Err(MetaClientError::NoPartitionAvailable);
        }
        Ok(self.counter.fetch_add(1, Ordering::Relaxed) % partition_count)
    }
}

/// Pins each key to a partition with FNV-1a; keyless messages go to partition 0
#[derive(Debug, Default, Clone, Copy)]
pub struct HashPartitionSelector;

impl PartitionSelector for HashPartitionSelector {
    fn select_partition(&self, key: Option<&[u8]>, partition_count: usize) -> Result<usize> {
        if partition_count == 0 {
            return Err(MetaClientError::NoPartitionAvailable);
        }
        let Some(key) = key else {
            return Ok(0);
        };

        let mut hash = 2166136261u32;
        for byte in key {
            hash ^= *byte as u32;
            hash = hash.wrapping_mul(16777619);
        }
        Ok((hash as usize) % partition_count)
    }
}

/// The selector a producer was created with
#[derive(Debug, Clone)]
pub enum Partitioner {
    RoundRobin(Arc<RoundRobinPartitionSelector>),
    Custom(Arc<dyn PartitionSelector>),
}

impl Partitioner {
    pub fn round_robin() -> Self {
        Partitioner::RoundRobin(Arc::new(RoundRobinPartitionSelector::new()))
    }

    pub fn custom(selector: Arc<dyn PartitionSelector>) -> Self {
        Partitioner::Custom(selector)
    }

    pub fn is_round_robin(&self) -> bool {
        matches!(self, Partitioner::RoundRobin(_))
    }
}

impl Default for Partitioner {
    fn default() -> Self {
        Self::round_robin()
    }
}

impl PartitionSelector for Partitioner {
    fn select_partition(&self, key: Option<&[u8]>, partition_count: usize) -> Result<usize> {
        match self {
            Partitioner::RoundRobin(selector) => selector.select_partition(key, partition_count),
            Partitioner::Custom(selector) => selector.select_partition(key, partition_count),
        }
    }
}
