//! Configuration types for the session factory and its sessions

use crate::error::MetaClientError;
use crate::Result;
use std::time::Duration;

/// Factory-level client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Broker addresses dialed by `connect_brokers`
    pub brokers: Vec<String>,
    /// Connection timeout
    pub connection_timeout: Duration,
    /// Per-broker request timeout, applied to every stats RPC
    pub request_timeout: Duration,
    /// Client identifier
    pub client_id: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            brokers: Vec::new(),
            connection_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(10),
            client_id: None,
        }
    }
}

impl ClientConfig {
    /// Reject timeouts the remoting layer cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.connection_timeout.is_zero() {
            return Err(MetaClientError::invalid_argument(
                "connection timeout must be greater than zero",
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(MetaClientError::invalid_argument(
                "request timeout must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Consumer session configuration.
///
/// Fields may hold out-of-range values; nothing is checked until the config
/// is handed to `MessageSessionFactory::create_consumer`.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Consumer group, required
    pub group: Option<String>,
    /// Consumer identifier inside the group, generated by the broker when absent
    pub consumer_id: Option<String>,
    /// Number of fetch runner threads
    pub fetch_runner_count: i32,
    /// Period between offset commits in milliseconds
    pub commit_offset_period_ms: i64,
    /// Fetch request timeout in milliseconds
    pub fetch_timeout_ms: i64,
    /// Upper bound of the back-off delay between empty fetches in milliseconds
    pub max_delay_fetch_time_ms: i64,
    /// Retries for a message before it is skipped
    pub max_fetch_retries: i32,
    /// Retries before the fetch size is increased
    pub max_increase_fetch_data_retries: i32,
    /// Offset to start from when the group has no committed offset
    pub offset: i64,
    /// Ignore committed offsets and start from the latest message
    pub always_consume_from_max_offset: bool,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            group: None,
            consumer_id: None,
            fetch_runner_count: default_fetch_runner_count(),
            commit_offset_period_ms: 5000,
            fetch_timeout_ms: 10000,
            max_delay_fetch_time_ms: 5000,
            max_fetch_retries: 5,
            max_increase_fetch_data_retries: 5,
            offset: 0,
            always_consume_from_max_offset: false,
        }
    }
}

impl ConsumerConfig {
    /// Config for the given group with every other field defaulted
    pub fn with_group<S: Into<String>>(group: S) -> Self {
        Self {
            group: Some(group.into()),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_consumer_config(self)
    }
}

fn default_fetch_runner_count() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as i32)
        .unwrap_or(1)
}

/// Validate a consumer config. The first violated rule is reported:
/// group and fetch runner count are structural and fail with
/// `InvalidConsumerConfig`, the timing fields fail with `InvalidArgument`.
pub fn validate_consumer_config(config: &ConsumerConfig) -> Result<()> {
    let group_present = config
        .group
        .as_deref()
        .is_some_and(|group| !group.trim().is_empty());
    if !group_present {
        return Err(MetaClientError::invalid_consumer_config("group required"));
    }

    if config.fetch_runner_count <= 0 {
        return Err(MetaClientError::invalid_consumer_config(format!(
            "thread count must be greater than zero, got {}",
            config.fetch_runner_count
        )));
    }

    if config.commit_offset_period_ms < 0 {
        return Err(MetaClientError::invalid_argument(format!(
            "commit offset period must not be negative, got {}ms",
            config.commit_offset_period_ms
        )));
    }

    if config.fetch_timeout_ms <= 0 {
        return Err(MetaClientError::invalid_argument(format!(
            "fetch timeout must be greater than zero, got {}ms",
            config.fetch_timeout_ms
        )));
    }

    Ok(())
}

/// Builder for ClientConfig
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn brokers<I, S>(mut self, brokers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.brokers = brokers.into_iter().map(|s| s.into()).collect();
        self
    }

    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.config.connection_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn client_id<S: Into<String>>(mut self, client_id: S) -> Self {
        self.config.client_id = Some(client_id.into());
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

/// Builder for ConsumerConfig
#[derive(Debug, Default)]
pub struct ConsumerConfigBuilder {
    config: ConsumerConfig,
}

impl ConsumerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group<S: Into<String>>(mut self, group: S) -> Self {
        self.config.group = Some(group.into());
        self
    }

    pub fn consumer_id<S: Into<String>>(mut self, consumer_id: S) -> Self {
        self.config.consumer_id = Some(consumer_id.into());
        self
    }

    pub fn fetch_runner_count(mut self, count: i32) -> Self {
        self.config.fetch_runner_count = count;
        self
    }

    pub fn commit_offset_period_ms(mut self, period_ms: i64) -> Self {
        self.config.commit_offset_period_ms = period_ms;
        self
    }

    pub fn fetch_timeout_ms(mut self, timeout_ms: i64) -> Self {
        self.config.fetch_timeout_ms = timeout_ms;
        self
    }

    pub fn max_delay_fetch_time_ms(mut self, delay_ms: i64) -> Self {
        self.config.max_delay_fetch_time_ms = delay_ms;
        self
    }

    pub fn max_fetch_retries(mut self, retries: i32) -> Self {
        self.config.max_fetch_retries = retries;
        self
    }

    pub fn max_increase_fetch_data_retries(mut self, retries: i32) -> Self {
        self.config.max_increase_fetch_data_retries = retries;
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.config.offset = offset;
        self
    }

    pub fn always_consume_from_max_offset(mut self, enabled: bool) -> Self {
        self.config.always_consume_from_max_offset = enabled;
        self
    }

    pub fn build(self) -> ConsumerConfig {
        self.config
    }
}
