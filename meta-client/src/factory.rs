//! Message session factory: broker stats and session lifecycle

use crate::address::BrokerAddress;
use crate::config::{validate_consumer_config, ClientConfig, ConsumerConfig};
use crate::connection::TcpRemotingClient;
use crate::consumer::MessageConsumer;
use crate::error::MetaClientError;
use crate::metrics::{ClientMetrics, Timer};
use crate::partition::{PartitionSelector, Partitioner};
use crate::producer::MessageProducer;
use crate::protocol::{Command, StatsCommand};
use crate::registry::{SessionHandle, SessionId, SessionRegistry};
use crate::remoting::RemotingClient;
use crate::stats::{StatsResult, StatsResultMap};
use crate::Result;
use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug)]
struct FactoryInner {
    config: ClientConfig,
    remoting: Arc<dyn RemotingClient>,
    registry: Arc<SessionRegistry>,
    metrics: Arc<ClientMetrics>,
    shutdown: AtomicBool,
}

/// Entry point for producers, consumers and broker stats.
///
/// Cloning yields another handle to the same factory.
#[derive(Debug, Clone)]
pub struct MessageSessionFactory {
    inner: Arc<FactoryInner>,
}

impl MessageSessionFactory {
    /// Create a factory backed by TCP connections. No broker is dialed
    /// until `connect_brokers` or `remoting_client().connect(..)` is called.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let metrics = Arc::new(ClientMetrics::default());
        let remoting = Arc::new(TcpRemotingClient::with_metrics(
            config.connection_timeout,
            metrics.clone(),
        ));
        Self::build(config, remoting, metrics)
    }

    /// Create a factory on top of an existing remoting client
    pub fn with_remoting_client(
        config: ClientConfig,
        remoting: Arc<dyn RemotingClient>,
    ) -> Result<Self> {
        Self::build(config, remoting, Arc::new(ClientMetrics::default()))
    }

    fn build(
        config: ClientConfig,
        remoting: Arc<dyn RemotingClient>,
        metrics: Arc<ClientMetrics>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(FactoryInner {
                config,
                remoting,
                registry: Arc::new(SessionRegistry::new()),
                metrics,
                shutdown: AtomicBool::new(false),
            }),
        })
    }

    /// Dial every configured broker concurrently; returns how many are connected.
    /// Unparseable or unreachable brokers are logged and skipped.
    pub async fn connect_brokers(&self) -> usize {
        let remoting = &self.inner.remoting;
        let attempts = self.inner.config.brokers.iter().filter_map(|broker| {
            match broker.parse::<BrokerAddress>() {
                Ok(address) => Some(async move {
                    let outcome = remoting.connect(address.clone()).await;
                    (address, outcome)
                }),
                Err(e) => {
                    warn!(broker = %broker, "Skipping broker: {}", e);
                    None
                }
            }
        });

        let mut connected = 0;
        for (address, outcome) in join_all(attempts).await {
            match outcome {
                Ok(()) => connected += 1,
                Err(e) => warn!(broker = %address, "Failed to connect to broker: {}", e),
            }
        }
        connected
    }

    /// Create an unordered producer with a round-robin partition selector
    pub fn create_producer(&self) -> Result<MessageProducer> {
        self.create_producer_with(false)
    }

    /// Create a round-robin producer, ordered or not
    pub fn create_producer_with(&self, ordered: bool) -> Result<MessageProducer> {
        self.register_producer(Partitioner::round_robin(), ordered)
    }

    /// Create a producer that routes messages with `selector`
    pub fn create_producer_with_selector(
        &self,
        selector: Arc<dyn PartitionSelector>,
        ordered: bool,
    ) -> Result<MessageProducer> {
        self.register_producer(Partitioner::custom(selector), ordered)
    }

    fn register_producer(&self, partitioner: Partitioner, ordered: bool) -> Result<MessageProducer> {
        self.ensure_running()?;

        let registry = &self.inner.registry;
        let producer = MessageProducer::new(registry.next_id(), registry, partitioner, ordered);
        registry.register(SessionHandle::Producer(producer.clone()))?;

        self.inner.metrics.record_producer_created();
        info!(session = %producer.id(), ordered, "Created producer");
        Ok(producer)
    }

    /// Validate `config` and create a consumer. Nothing is registered when
    /// validation fails.
    pub fn create_consumer(&self, config: ConsumerConfig) -> Result<MessageConsumer> {
        self.ensure_running()?;

        if let Err(e) = validate_consumer_config(&config) {
            self.inner.metrics.record_consumer_config_rejected();
            return Err(e);
        }

        let registry = &self.inner.registry;
        let consumer = MessageConsumer::new(registry.next_id(), registry, config);
        registry.register(SessionHandle::Consumer(consumer.clone()))?;

        self.inner.metrics.record_consumer_created();
        info!(session = %consumer.id(), group = consumer.group(), "Created consumer");
        Ok(consumer)
    }

    /// Stats of every connected broker. Brokers that fail or time out are
    /// left out of the map.
    pub async fn stats(&self) -> StatsResultMap {
        self.collect_stats(None).await
    }

    /// Stats of every connected broker, scoped to `item`. An item that is not
    /// a single token is logged and yields an empty map.
    pub async fn stats_for_item(&self, item: &str) -> StatsResultMap {
        self.collect_stats(Some(item)).await
    }

    /// Stats of one broker; `BrokerUnreachable` without a live connection
    pub async fn broker_stats(&self, address: &BrokerAddress) -> Result<StatsResult> {
        self.single_broker_stats(address, None).await
    }

    /// Stats of one broker, scoped to `item`; `InvalidArgument` when the item
    /// is not a single token
    pub async fn broker_stats_for_item(
        &self,
        address: &BrokerAddress,
        item: &str,
    ) -> Result<StatsResult> {
        self.single_broker_stats(address, Some(item)).await
    }

    async fn single_broker_stats(
        &self,
        address: &BrokerAddress,
        item: Option<&str>,
    ) -> Result<StatsResult> {
        let command = StatsCommand::new(item)?;
        if !self.inner.remoting.is_connected(address) {
            return Err(MetaClientError::BrokerUnreachable {
                address: address.clone(),
            });
        }

        match self.request_stats(address, &command).await {
            Ok(stats) => Ok(stats),
            Err(e) => {
                self.inner.metrics.record_stats_failure();
                Err(e)
            }
        }
    }

    async fn collect_stats(&self, item: Option<&str>) -> StatsResultMap {
        let command = match StatsCommand::new(item) {
            Ok(command) => command,
            Err(e) => {
                warn!(item = ?item, "Skipping stats request: {}", e);
                return StatsResultMap::new();
            }
        };

        let addresses = self.inner.remoting.connected_addresses();
        debug!(brokers = addresses.len(), item = ?item, "Collecting stats");

        let command = &command;
        let requests = addresses.into_iter().map(|address| async move {
            let outcome = self.request_stats(&address, command).await;
            (address, outcome)
        });

        let mut results = StatsResultMap::new();
        for (address, outcome) in join_all(requests).await {
            match outcome {
                Ok(stats) => {
                    results.insert(address, stats);
                }
                Err(e) => {
                    self.inner.metrics.record_stats_failure();
                    warn!(broker = %address, "Stats request failed: {}", e);
                }
            }
        }
        results
    }

    async fn request_stats(
        &self,
        address: &BrokerAddress,
        command: &StatsCommand,
    ) -> Result<StatsResult> {
        let request_timeout = self.inner.config.request_timeout;
        let timer = Timer::start();

        let response = tokio::time::timeout(
            request_timeout,
            self.inner
                .remoting
                .send(address, Command::from(command.clone())),
        )
        .await
        .map_err(|_| MetaClientError::timeout(request_timeout.as_millis() as u64))??;

        if !response.is_success() {
            return Err(MetaClientError::StatsRequestFailed {
                address: address.clone(),
                code: response.code,
                message: response.message,
            });
        }

        self.inner.metrics.record_stats(timer.elapsed());
        Ok(StatsResult::parse(&response.message))
    }

    /// Shut down every remaining session, then the remoting client.
    /// Later calls return immediately.
    pub async fn shutdown(&self) {
        if self.inner.shutdown.swap(true, Ordering::AcqRel) {
            debug!("Session factory already shut down");
            return;
        }

        let children = self.inner.registry.close();
        let count = children.len();
        for child in children {
            child.shutdown();
        }

        self.inner.remoting.shutdown().await;
        info!(sessions = count, "Session factory shut down");
    }

    /// Whether `shutdown` has been called
    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown.load(Ordering::Acquire)
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_shutdown() {
            return Err(MetaClientError::FactoryShutdown);
        }
        Ok(())
    }

    /// Sessions created by this factory that are still open
    pub fn children(&self) -> Vec<SessionHandle> {
        self.inner.registry.sessions()
    }

    /// Whether the session with `id` is still registered
    pub fn has_child(&self, id: SessionId) -> bool {
        self.inner.registry.contains(id)
    }

    /// Transport used to reach the brokers
    pub fn remoting_client(&self) -> &Arc<dyn RemotingClient> {
        &self.inner.remoting
    }

    /// Counters for this factory
    pub fn metrics(&self) -> &Arc<ClientMetrics> {
        &self.inner.metrics
    }

    /// Configuration the factory was created with
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }
}
