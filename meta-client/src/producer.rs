//! Producer sessions created by the session factory

use crate::partition::{PartitionSelector, Partitioner};
use crate::registry::{SessionId, SessionLink, SessionRegistry};
use crate::Result;
use std::sync::Arc;
use tracing::info;

#[derive(Debug)]
struct ProducerInner {
    link: SessionLink,
    partitioner: Partitioner,
    ordered: bool,
}

/// Handle to a producer session; clones share the same session
#[derive(Debug, Clone)]
pub struct MessageProducer {
    inner: Arc<ProducerInner>,
}

impl MessageProducer {
    pub(crate) fn new(
        id: SessionId,
        registry: &Arc<SessionRegistry>,
        partitioner: Partitioner,
        ordered: bool,
    ) -> Self {
        Self {
            inner: Arc::new(ProducerInner {
                link: SessionLink::new(id, registry),
                partitioner,
                ordered,
            }),
        }
    }

    /// Id of this session within its factory
    pub fn id(&self) -> SessionId {
        self.inner.link.id()
    }

    /// Selector this producer routes messages with
    pub fn partition_selector(&self) -> &Partitioner {
        &self.inner.partitioner
    }

    /// Whether messages must keep their send order within a partition
    pub fn is_ordered(&self) -> bool {
        self.inner.ordered
    }

    /// Pick the partition for a message key
    pub fn select_partition(&self, key: Option<&[u8]>, partition_count: usize) -> Result<usize> {
        self.inner.partitioner.select_partition(key, partition_count)
    }

    /// Whether `shutdown` has run
    pub fn is_closed(&self) -> bool {
        self.inner.link.is_closed()
    }

    /// Close the producer and leave the factory. Repeated calls do nothing.
    pub fn shutdown(&self) {
        if self.inner.link.close() {
            info!(session = %self.id(), ordered = self.inner.ordered, "Producer closed");
        }
    }
}

impl PartialEq for MessageProducer {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for MessageProducer {}
