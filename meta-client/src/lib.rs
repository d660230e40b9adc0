//! # Meta Client Library
//!
//! Client-side session layer for a cluster of MetaQ-style brokers.
//!
//! ## Features
//!
//! - **Session Factory**: One entry point owning broker connections and every
//!   producer and consumer it creates
//! - **Broker Stats**: Text stats protocol fanned out to all connected brokers
//!   in parallel, with per-broker timeouts and failure isolation
//! - **Validated Sessions**: Consumer configs are checked at creation time
//! - **Lifecycle Tracking**: Sessions deregister on shutdown; factory shutdown
//!   tears down all children and connections exactly once
//! - **Pluggable Transport**: Any `RemotingClient`, TCP provided
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use meta_client::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ClientConfigBuilder::new()
//!         .brokers(vec!["localhost:8123"])
//!         .build();
//!     let factory = MessageSessionFactory::new(config)?;
//!     factory.connect_brokers().await;
//!
//!     for (broker, stats) in factory.stats().await {
//!         println!("{} uptime={:?}", broker, stats.value("uptime"));
//!     }
//!
//!     let producer = factory.create_producer()?;
//!     let consumer = factory.create_consumer(ConsumerConfig::with_group("my-group"))?;
//!
//!     producer.shutdown();
//!     consumer.shutdown();
//!     factory.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod address;
pub mod config;
pub mod connection;
pub mod consumer;
pub mod error;
pub mod factory;
pub mod metrics;
pub mod partition;
pub mod producer;
pub mod protocol;
pub mod registry;
pub mod remoting;
pub mod stats;

pub use address::BrokerAddress;
pub use config::*;
pub use connection::TcpRemotingClient;
pub use consumer::MessageConsumer;
pub use error::*;
pub use factory::MessageSessionFactory;
pub use metrics::{ClientMetrics, MetricsSnapshot};
pub use partition::*;
pub use producer::MessageProducer;
pub use protocol::{Command, Response, StatsCommand};
pub use registry::{SessionHandle, SessionId};
pub use remoting::RemotingClient;
pub use stats::{StatsResult, StatsResultMap};

/// Client library result type
pub type Result<T> = std::result::Result<T, MetaClientError>;

/// Client library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
