//! TCP connection management for broker remoting

use crate::address::BrokerAddress;
use crate::error::MetaClientError;
use crate::metrics::ClientMetrics;
use crate::protocol::{Command, MetaCodec, Opaque, Response};
use crate::remoting::RemotingClient;
use crate::Result;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{self, BoxFuture};
use futures::{FutureExt, SinkExt, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::{debug, error, info, warn};

type PendingReply = oneshot::Sender<Result<Response>>;

/// Remoting client holding one multiplexed TCP connection per broker
#[derive(Debug)]
pub struct TcpRemotingClient {
    connections: DashMap<BrokerAddress, Arc<Connection>>,
    connection_timeout: Duration,
    metrics: Arc<ClientMetrics>,
}

impl TcpRemotingClient {
    /// Client with its own metrics
    pub fn new(connection_timeout: Duration) -> Self {
        Self::with_metrics(connection_timeout, Arc::new(ClientMetrics::default()))
    }

    /// Client reporting into shared `metrics`
    pub fn with_metrics(connection_timeout: Duration, metrics: Arc<ClientMetrics>) -> Self {
        Self {
            connections: DashMap::new(),
            connection_timeout,
            metrics,
        }
    }

    async fn create_connection(&self, address: &BrokerAddress) -> Result<Connection> {
        debug!(broker = %address, "Creating connection");

        let stream = match timeout(self.connection_timeout, TcpStream::connect(address.to_string()))
            .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                self.metrics.record_connection_failed();
                return Err(MetaClientError::connection(format!(
                    "Failed to connect to {}: {}",
                    address, e
                )));
            }
            Err(_) => {
                self.metrics.record_connection_failed();
                return Err(MetaClientError::timeout(
                    self.connection_timeout.as_millis() as u64,
                ));
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            warn!(broker = %address, "Failed to set TCP_NODELAY: {}", e);
        }

        Ok(Connection::new(address.clone(), stream))
    }
}

impl RemotingClient for TcpRemotingClient {
    fn connect(&self, address: BrokerAddress) -> BoxFuture<'_, Result<()>> {
        async move {
            if self.is_connected(&address) {
                return Ok(());
            }

            let connection = Arc::new(self.create_connection(&address).await?);

            // Another connect may have finished while we were dialing.
            match self.connections.entry(address.clone()) {
                Entry::Occupied(entry) if entry.get().is_healthy() => {
                    connection.close();
                    debug!(broker = %address, "Dropped duplicate connection");
                    return Ok(());
                }
                Entry::Occupied(mut entry) => {
                    entry.insert(connection).close();
                }
                Entry::Vacant(entry) => {
                    entry.insert(connection);
                }
            }

            self.metrics.record_connection_created();
            info!(broker = %address, "Connected to broker");
            Ok(())
        }
        .boxed()
    }

    fn is_connected(&self, address: &BrokerAddress) -> bool {
        self.connections
            .get(address)
            .map(|conn| conn.is_healthy())
            .unwrap_or(false)
    }

    fn connected_addresses(&self) -> HashSet<BrokerAddress> {
        self.connections.retain(|_, conn| conn.is_healthy());
        self.connections
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    fn send(&self, address: &BrokerAddress, command: Command) -> BoxFuture<'static, Result<Response>> {
        match self.connections.get(address) {
            Some(conn) if conn.is_healthy() => conn.send(command),
            _ => future::ready(Err(MetaClientError::BrokerUnreachable {
                address: address.clone(),
            }))
            .boxed(),
        }
    }

    fn close(&self, address: &BrokerAddress) -> BoxFuture<'_, ()> {
        if let Some((_, connection)) = self.connections.remove(address) {
            connection.close();
            info!(broker = %address, "Closed connection");
        }
        future::ready(()).boxed()
    }

    fn shutdown(&self) -> BoxFuture<'_, ()> {
        let addresses: Vec<BrokerAddress> = self
            .connections
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        for address in addresses {
            if let Some((_, connection)) = self.connections.remove(&address) {
                connection.close();
            }
        }
        info!("Remoting client shut down");
        future::ready(()).boxed()
    }
}

/// Individual connection to a broker
#[derive(Debug)]
pub struct Connection {
    broker: BrokerAddress,
    opaque_counter: AtomicI32,
    request_tx: mpsc::UnboundedSender<(Command, PendingReply)>,
    handle: JoinHandle<()>,
}

impl Connection {
    /// Wrap an established stream and start its I/O task
    pub fn new(broker: BrokerAddress, stream: TcpStream) -> Self {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let framed = Framed::new(stream, MetaCodec::new());
        let handle = tokio::spawn(Self::connection_loop(broker.clone(), framed, request_rx));

        Self {
            broker,
            opaque_counter: AtomicI32::new(1),
            request_tx,
            handle,
        }
    }

    /// Broker this connection talks to
    pub fn broker(&self) -> &BrokerAddress {
        &self.broker
    }

    /// Stamp `command` with a fresh opaque and resolve with the reply carrying it
    pub fn send(&self, mut command: Command) -> BoxFuture<'static, Result<Response>> {
        command.set_opaque(self.opaque_counter.fetch_add(1, Ordering::Relaxed));

        let (reply_tx, reply_rx) = oneshot::channel();
        let queued = self.request_tx.send((command, reply_tx));
        let broker = self.broker.clone();

        async move {
            queued.map_err(|_| {
                MetaClientError::connection(format!("Connection to {} is closed", broker))
            })?;
            reply_rx.await.map_err(|_| {
                MetaClientError::connection(format!("Connection to {} closed before reply", broker))
            })?
        }
        .boxed()
    }

    /// The I/O task is still running
    pub fn is_healthy(&self) -> bool {
        !self.request_tx.is_closed()
    }

    /// Stop the I/O task; pending requests fail with a connection error
    pub fn close(&self) {
        self.handle.abort();
    }

    async fn connection_loop(
        broker: BrokerAddress,
        mut framed: Framed<TcpStream, MetaCodec>,
        mut request_rx: mpsc::UnboundedReceiver<(Command, PendingReply)>,
    ) {
        let mut pending: HashMap<Opaque, PendingReply> = HashMap::new();

        loop {
            tokio::select! {
                request = request_rx.recv() => {
                    match request {
                        Some((command, reply_tx)) => {
                            // Callers that timed out dropped their receiver.
                            pending.retain(|_, tx| !tx.is_closed());

                            let opaque = command.opaque();
                            debug!(broker = %broker, opaque, "Sending command");

                            if let Err(e) = framed.send(command).await {
                                error!(broker = %broker, "Failed to send command: {}", e);
                                let _ = reply_tx.send(Err(MetaClientError::connection(format!(
                                    "Send to {} failed: {}",
                                    broker, e
                                ))));
                                break;
                            }

                            pending.insert(opaque, reply_tx);
                        }
                        None => {
                            debug!(broker = %broker, "Request channel closed");
                            break;
                        }
                    }
                }

                response = framed.next() => {
                    match response {
                        Some(Ok(response)) => {
                            debug!(broker = %broker, opaque = response.opaque, code = response.code, "Received response");

                            match pending.remove(&response.opaque) {
                                Some(reply_tx) => {
                                    let _ = reply_tx.send(Ok(response));
                                }
                                None => {
                                    warn!(broker = %broker, opaque = response.opaque, "Received response with no pending request");
                                }
                            }
                        }
                        Some(Err(e)) => {
                            error!(broker = %broker, "Error receiving response: {}", e);
                            break;
                        }
                        None => {
                            debug!(broker = %broker, "Response stream closed");
                            break;
                        }
                    }
                }
            }
        }

        for (_, reply_tx) in pending.drain() {
            let _ = reply_tx.send(Err(MetaClientError::connection(format!(
                "Connection to {} closed",
                broker
            ))));
        }

        info!(broker = %broker, "Connection closed");
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
