//! Registry of the live sessions a factory has created

use crate::consumer::MessageConsumer;
use crate::error::MetaClientError;
use crate::producer::MessageProducer;
use crate::Result;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Identifier of a session, unique within one factory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Raw numeric id
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// A registered child session of either kind
#[derive(Debug, Clone)]
pub enum SessionHandle {
    Producer(MessageProducer),
    Consumer(MessageConsumer),
}

impl SessionHandle {
    /// Id of the wrapped session
    pub fn id(&self) -> SessionId {
        match self {
            SessionHandle::Producer(producer) => producer.id(),
            SessionHandle::Consumer(consumer) => consumer.id(),
        }
    }

    /// Shut down the wrapped session
    pub fn shutdown(&self) {
        match self {
            SessionHandle::Producer(producer) => producer.shutdown(),
            SessionHandle::Consumer(consumer) => consumer.shutdown(),
        }
    }

    /// Whether the wrapped session is closed
    pub fn is_closed(&self) -> bool {
        match self {
            SessionHandle::Producer(producer) => producer.is_closed(),
            SessionHandle::Consumer(consumer) => consumer.is_closed(),
        }
    }
}

#[derive(Debug)]
struct RegistryState {
    open: bool,
    sessions: HashMap<SessionId, SessionHandle>,
}

/// Thread-safe set of child sessions.
///
/// Register, deregister and the final drain all take the same lock, so a
/// session is either drained by `close` or rejected, never leaked.
#[derive(Debug)]
pub struct SessionRegistry {
    state: RwLock<RegistryState>,
    next_id: AtomicU64,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState {
                open: true,
                sessions: HashMap::new(),
            }),
            next_id: AtomicU64::new(1),
        }
    }

    /// Reserve an id for a session about to be registered
    pub fn next_id(&self) -> SessionId {
        SessionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Add a session; fails once the registry has been closed
    pub fn register(&self, session: SessionHandle) -> Result<()> {
        let mut state = self.state.write();
        if !state.open {
            return Err(MetaClientError::FactoryShutdown);
        }
        debug!(session = %session.id(), "registered session");
        state.sessions.insert(session.id(), session);
        Ok(())
    }

    /// Remove a session, returning whether it was present
    pub fn deregister(&self, id: SessionId) -> bool {
        let removed = self.state.write().sessions.remove(&id).is_some();
        if removed {
            debug!(session = %id, "deregistered session");
        }
        removed
    }

    /// Whether a session with `id` is registered
    pub fn contains(&self, id: SessionId) -> bool {
        self.state.read().sessions.contains_key(&id)
    }

    /// Number of registered sessions
    pub fn len(&self) -> usize {
        self.state.read().sessions.len()
    }

    /// Whether no session is registered
    pub fn is_empty(&self) -> bool {
        self.state.read().sessions.is_empty()
    }

    /// Whether new sessions are still accepted
    pub fn is_open(&self) -> bool {
        self.state.read().open
    }

    /// Snapshot of the registered sessions
    pub fn sessions(&self) -> Vec<SessionHandle> {
        self.state.read().sessions.values().cloned().collect()
    }

    /// Refuse further registrations and hand back everything still registered.
    /// Only the first call returns sessions.
    pub fn close(&self) -> Vec<SessionHandle> {
        let mut state = self.state.write();
        state.open = false;
        state.sessions.drain().map(|(_, session)| session).collect()
    }
}

/// A session's tie back to its factory's registry
#[derive(Debug)]
pub(crate) struct SessionLink {
    id: SessionId,
    registry: Weak<SessionRegistry>,
    closed: AtomicBool,
}

impl SessionLink {
    pub(crate) fn new(id: SessionId, registry: &Arc<SessionRegistry>) -> Self {
        Self {
            id,
            registry: Arc::downgrade(registry),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn id(&self) -> SessionId {
        self.id
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Mark closed and leave the registry. Returns true only for the call
    /// that performed the transition.
    pub(crate) fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.deregister(self.id);
        }
        true
    }
}
