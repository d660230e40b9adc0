//! Broker endpoint addressing

use crate::error::MetaClientError;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

/// URI scheme brokers advertise their connect address with
pub const BROKER_URI_SCHEME: &str = "meta://";

/// Host and port of a single broker connection endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BrokerAddress {
    host: String,
    port: u16,
}

impl BrokerAddress {
    pub fn new<S: Into<String>>(host: S, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Host name or IP literal, without brackets
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for BrokerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for BrokerAddress {
    type Err = MetaClientError;

    /// Accepts `host:port`, `[v6]:port` and the `meta://host:port` URI form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let authority = trimmed
            .strip_prefix(BROKER_URI_SCHEME)
            .unwrap_or(trimmed)
            .trim_end_matches('/');

        let (host, port) = authority.rsplit_once(':').ok_or_else(|| {
            MetaClientError::invalid_argument(format!("broker address '{}' has no port", s))
        })?;

        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(MetaClientError::invalid_argument(format!(
                "broker address '{}' has no host",
                s
            )));
        }

        let port = port.parse::<u16>().map_err(|_| {
            MetaClientError::invalid_argument(format!("broker address '{}' has an invalid port", s))
        })?;

        Ok(Self::new(host, port))
    }
}

impl From<SocketAddr> for BrokerAddress {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host_port() {
        let addr: BrokerAddress = "broker1:8123".parse().unwrap();
        assert_eq!(addr.host(), "broker1");
        assert_eq!(addr.port(), 8123);
        assert_eq!(addr.to_string(), "broker1:8123");
    }

    #[test]
    fn test_parse_broker_uri() {
        let addr: BrokerAddress = "meta://10.0.0.7:8199".parse().unwrap();
        assert_eq!(addr, BrokerAddress::new("10.0.0.7", 8199));
    }

    #[test]
    fn test_parse_ipv6() {
        let addr: BrokerAddress = "[::1]:8123".parse().unwrap();
        assert_eq!(addr.host(), "::1");
        assert_eq!(addr.to_string(), "[::1]:8123");
    }

    #[test]
    fn test_parse_invalid() {
        assert!("localhost".parse::<BrokerAddress>().is_err());
        assert!(":8123".parse::<BrokerAddress>().is_err());
        assert!("localhost:port".parse::<BrokerAddress>().is_err());
        assert!("localhost:70000".parse::<BrokerAddress>().is_err());
    }

    #[test]
    fn test_from_socket_addr() {
        let socket: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let addr = BrokerAddress::from(socket);
        assert_eq!(addr, BrokerAddress::new("127.0.0.1", 9000));
    }
}
