//! In-memory remoting client used by the integration tests

#![allow(dead_code)]

use futures::future::{self, BoxFuture};
use futures::FutureExt;
use meta_client::{BrokerAddress, Command, MetaClientError, RemotingClient, Response, Result};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const STATS_BODY: &str = "pid 34947\r\nport 8123\r\nuptime 3168\r\n\
version 1.4.0.3-SNAPSHOT\r\ncurr_connections 1\r\nthreads 34\r\ncmd_put 0\r\n\
cmd_get 0\r\ncmd_offset 0\r\ntx_begin 0\r\ntx_xa_begin 0\r\ntx_commit 0\r\n\
tx_rollback 0\r\nget_miss 0\r\nput_failed 0\r\ntotal_messages 100051\r\ntopics 1";

/// Broker reply to a stats command, echoing its item filter
pub fn stats_reply(item: Option<&str>) -> String {
    format!("{}\r\nitem {}\r\n", STATS_BODY, item.unwrap_or("null"))
}

/// How a simulated broker reacts to commands
#[derive(Debug, Clone)]
pub enum BrokerBehavior {
    /// Answer with the standard stats reply
    Healthy,
    /// Answer after a delay
    Slow(Duration),
    /// Never answer
    Silent,
    /// Answer with a non-success code
    Failing(u16),
    /// The transport fails the request
    Broken,
}

#[derive(Debug, Default)]
pub struct MockRemotingClient {
    brokers: Mutex<HashMap<BrokerAddress, BrokerBehavior>>,
    sent: AtomicUsize,
    shutdowns: AtomicUsize,
}

impl MockRemotingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connected broker with the given behavior
    pub fn add_broker(&self, address: BrokerAddress, behavior: BrokerBehavior) {
        self.brokers.lock().insert(address, behavior);
    }

    pub fn sent(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

impl RemotingClient for MockRemotingClient {
    fn connect(&self, address: BrokerAddress) -> BoxFuture<'_, Result<()>> {
        self.add_broker(address, BrokerBehavior::Healthy);
        future::ready(Ok(())).boxed()
    }

    fn is_connected(&self, address: &BrokerAddress) -> bool {
        self.brokers.lock().contains_key(address)
    }

    fn connected_addresses(&self) -> HashSet<BrokerAddress> {
        self.brokers.lock().keys().cloned().collect()
    }

    fn send(&self, address: &BrokerAddress, command: Command) -> BoxFuture<'static, Result<Response>> {
        self.sent.fetch_add(1, Ordering::SeqCst);

        let behavior = self.brokers.lock().get(address).cloned();
        let opaque = command.opaque();
        let Command::Stats(stats) = command;
        let reply = stats_reply(stats.item());

        match behavior {
            None => future::ready(Err(MetaClientError::BrokerUnreachable {
                address: address.clone(),
            }))
            .boxed(),
            Some(BrokerBehavior::Healthy) => future::ready(Ok(Response::new(200, reply, opaque))).boxed(),
            Some(BrokerBehavior::Slow(delay)) => async move {
                tokio::time::sleep(delay).await;
                Ok(Response::new(200, reply, opaque))
            }
            .boxed(),
            Some(BrokerBehavior::Silent) => future::pending().boxed(),
            Some(BrokerBehavior::Failing(code)) => {
                future::ready(Ok(Response::new(code, "internal error", opaque))).boxed()
            }
            Some(BrokerBehavior::Broken) => {
                future::ready(Err(MetaClientError::connection("connection reset"))).boxed()
            }
        }
    }

    fn close(&self, address: &BrokerAddress) -> BoxFuture<'_, ()> {
        self.brokers.lock().remove(address);
        future::ready(()).boxed()
    }

    fn shutdown(&self) -> BoxFuture<'_, ()> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        self.brokers.lock().clear();
        future::ready(()).boxed()
    }
}

/// Address of the n-th simulated broker
pub fn broker(n: u16) -> BrokerAddress {
    BrokerAddress::new("127.0.0.1", 8120 + n)
}
