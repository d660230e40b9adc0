//! Transport contract the session factory talks to brokers through

use crate::address::BrokerAddress;
use crate::protocol::{Command, Response};
use crate::Result;
use futures::future::BoxFuture;
use std::collections::HashSet;
use std::fmt;

/// Named connections to brokers with asynchronous request/response.
///
/// `send` returns an owned future so callers can fan requests out to many
/// brokers and join them without holding a borrow of the client.
pub trait RemotingClient: Send + Sync + fmt::Debug {
    /// Open a connection to `address`; connecting twice is not an error
    fn connect(&self, address: BrokerAddress) -> BoxFuture<'_, Result<()>>;

    /// Whether a live connection to `address` exists
    fn is_connected(&self, address: &BrokerAddress) -> bool;

    /// Addresses with a live connection right now
    fn connected_addresses(&self) -> HashSet<BrokerAddress>;

    /// Send `command` and resolve with the correlated response
    fn send(&self, address: &BrokerAddress, command: Command) -> BoxFuture<'static, Result<Response>>;

    /// Drop the connection to a single broker
    fn close(&self, address: &BrokerAddress) -> BoxFuture<'_, ()>;

    /// Close every connection
    fn shutdown(&self) -> BoxFuture<'_, ()>;
}
