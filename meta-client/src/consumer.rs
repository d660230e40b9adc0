//! Consumer sessions created by the session factory

use crate::config::ConsumerConfig;
use crate::registry::{SessionId, SessionLink, SessionRegistry};
use std::sync::Arc;
use tracing::info;

#[derive(Debug)]
struct ConsumerInner {
    link: SessionLink,
    config: ConsumerConfig,
}

/// Handle to a consumer session; clones share the same session
#[derive(Debug, Clone)]
pub struct MessageConsumer {
    inner: Arc<ConsumerInner>,
}

impl MessageConsumer {
    /// `config` must already have passed validation
    pub(crate) fn new(id: SessionId, registry: &Arc<SessionRegistry>, config: ConsumerConfig) -> Self {
        Self {
            inner: Arc::new(ConsumerInner {
                link: SessionLink::new(id, registry),
                config,
            }),
        }
    }

    /// Id of this session within its factory
    pub fn id(&self) -> SessionId {
        self.inner.link.id()
    }

    /// Validated configuration of this consumer
    pub fn config(&self) -> &ConsumerConfig {
        &self.inner.config
    }

    /// Consumer group this session belongs to
    pub fn group(&self) -> &str {
        self.inner.config.group.as_deref().unwrap_or_default()
    }

    /// Whether `shutdown` has run
    pub fn is_closed(&self) -> bool {
        self.inner.link.is_closed()
    }

    /// Close the consumer and leave the factory. Repeated calls do nothing.
    pub fn shutdown(&self) {
        if self.inner.link.close() {
            info!(session = %self.id(), group = self.group(), "Consumer closed");
        }
    }
}

impl PartialEq for MessageConsumer {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for MessageConsumer {}
