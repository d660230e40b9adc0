//! Error types for the meta client library

use crate::address::BrokerAddress;

/// Main error type for session factory operations
#[derive(Debug, thiserror::Error)]
pub enum MetaClientError {
    /// Consumer configuration is missing a structural prerequisite
    #[error("Invalid consumer config: {message}")]
    InvalidConsumerConfig { message: String },

    /// A numeric range or argument format was violated
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// No live connection exists for the requested broker
    #[error("Broker {address} is unreachable")]
    BrokerUnreachable { address: BrokerAddress },

    /// Broker answered a stats request with a failure code
    #[error("Stats request to {address} failed with code {code}: {message}")]
    StatsRequestFailed {
        address: BrokerAddress,
        code: u16,
        message: String,
    },

    /// Connection-related errors
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// Protocol-related errors
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout errors
    #[error("Operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The factory was shut down and accepts no new sessions
    #[error("Session factory has been shut down")]
    FactoryShutdown,

    /// A partition was requested from an empty partition list
    #[error("No partition available")]
    NoPartitionAvailable,
}

impl MetaClientError {
    /// Create a new invalid consumer config error
    pub fn invalid_consumer_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConsumerConfig {
            message: message.into(),
        }
    }

    /// Create a new invalid argument error
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a new connection error
    pub fn connection<S: Into<String>>(message: S) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a new protocol error
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(timeout_ms: u64) -> Self {
        Self::Timeout { timeout_ms }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection { .. } => true,
            Self::Timeout { .. } => true,
            Self::BrokerUnreachable { .. } => true,
            Self::Io(_) => true,
            _ => false,
        }
    }

    /// Check if this error was raised by configuration validation
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConsumerConfig { .. } | Self::InvalidArgument { .. }
        )
    }

    /// Check if this error is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::Io(_) | Self::BrokerUnreachable { .. }
        )
    }

    /// Check if this error is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
