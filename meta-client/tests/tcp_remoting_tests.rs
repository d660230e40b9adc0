mod common;

use common::stats_reply;
use futures::future::join_all;
use meta_client::{
    BrokerAddress, ClientConfigBuilder, ClientMetrics, Command, MessageSessionFactory,
    MetaClientError, RemotingClient, StatsCommand, TcpRemotingClient,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// How the stub broker answers stats commands
#[derive(Debug, Clone, Copy)]
enum Reply {
    Stats,
    /// Hold replies until `n` requests arrived, then answer newest first
    Reversed(usize),
    Error(u16),
    Silent,
    Hangup,
}

async fn spawn_broker(reply: Reply) -> BrokerAddress {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = BrokerAddress::from(listener.local_addr().unwrap());

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(serve(stream, reply));
        }
    });

    address
}

async fn serve(stream: TcpStream, reply: Reply) {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();
    let mut held = Vec::new();

    while let Ok(Some(line)) = lines.next_line().await {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let (item, opaque) = match parts.as_slice() {
            ["stats", opaque] => (None, *opaque),
            ["stats", item, opaque] => (Some(*item), *opaque),
            _ => break,
        };

        let frame = match reply {
            Reply::Stats | Reply::Reversed(_) => {
                let body = stats_reply(item);
                format!("result 200 {} {}\r\n{}", body.len(), opaque, body)
            }
            Reply::Error(code) => {
                let body = "internal error";
                format!("result {} {} {}\r\n{}", code, body.len(), opaque, body)
            }
            Reply::Silent => continue,
            Reply::Hangup => break,
        };

        held.push(frame);
        if let Reply::Reversed(n) = reply {
            if held.len() < n {
                continue;
            }
        }

        while let Some(frame) = held.pop() {
            if write.write_all(frame.as_bytes()).await.is_err() {
                return;
            }
        }
    }
}

fn stats_command(item: Option<&str>) -> Command {
    Command::from(StatsCommand::new(item).unwrap())
}

async fn wait_disconnected(client: &TcpRemotingClient, address: &BrokerAddress) -> bool {
    for _ in 0..50 {
        if !client.is_connected(address) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn test_connect_and_send_stats() {
    let address = spawn_broker(Reply::Stats).await;
    let client = TcpRemotingClient::new(Duration::from_secs(1));

    client.connect(address.clone()).await.unwrap();
    assert!(client.is_connected(&address));
    assert!(client.connected_addresses().contains(&address));

    let response = client.send(&address, stats_command(None)).await.unwrap();
    assert!(response.is_success());
    assert!(response.message.starts_with("pid 34947\r\n"));
    assert!(response.message.ends_with("item null\r\n"));

    let response = client
        .send(&address, stats_command(Some("topics")))
        .await
        .unwrap();
    assert!(response.message.ends_with("item topics\r\n"));

    // Reconnecting an established broker keeps the connection.
    client.connect(address.clone()).await.unwrap();
    assert_eq!(client.connected_addresses().len(), 1);

    client.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_connects_share_one_connection() {
    let address = spawn_broker(Reply::Reversed(2)).await;
    let metrics = Arc::new(ClientMetrics::default());
    let client = TcpRemotingClient::with_metrics(Duration::from_secs(1), metrics.clone());

    let attempts = (0..4).map(|_| client.connect(address.clone()));
    for outcome in join_all(attempts).await {
        outcome.unwrap();
    }
    assert_eq!(metrics.snapshot().connections_created, 1);
    assert_eq!(client.connected_addresses().len(), 1);

    // The first request is held by the broker until the second arrives, so
    // it is in flight while another connect runs.
    let pending = client.send(&address, stats_command(Some("topics")));
    client.connect(address.clone()).await.unwrap();
    let second = client.send(&address, stats_command(None));

    let (first, second) = futures::join!(pending, second);
    assert!(first.unwrap().message.ends_with("item topics\r\n"));
    assert!(second.unwrap().message.ends_with("item null\r\n"));
    assert_eq!(metrics.snapshot().connections_created, 1);

    client.shutdown().await;
}

#[tokio::test]
async fn test_replies_matched_by_opaque() {
    let address = spawn_broker(Reply::Reversed(4)).await;
    let client = TcpRemotingClient::new(Duration::from_secs(1));
    client.connect(address.clone()).await.unwrap();

    let items = ["topics", "offsets", "groups", "realtime"];
    let requests = items
        .iter()
        .map(|item| client.send(&address, stats_command(Some(*item))));
    let responses = join_all(requests).await;

    for (item, response) in items.iter().zip(responses) {
        let response = response.unwrap();
        assert!(
            response.message.ends_with(&format!("item {}\r\n", item)),
            "reply for {} was {:?}",
            item,
            response.message
        );
    }

    client.shutdown().await;
}

#[tokio::test]
async fn test_close_removes_connection() {
    let address = spawn_broker(Reply::Stats).await;
    let client = TcpRemotingClient::new(Duration::from_secs(1));
    client.connect(address.clone()).await.unwrap();

    client.close(&address).await;
    assert!(!client.is_connected(&address));
    assert!(matches!(
        client.send(&address, stats_command(None)).await,
        Err(MetaClientError::BrokerUnreachable { .. })
    ));
}

#[tokio::test]
async fn test_broker_hangup_fails_pending_request() {
    let address = spawn_broker(Reply::Hangup).await;
    let client = TcpRemotingClient::new(Duration::from_secs(1));
    client.connect(address.clone()).await.unwrap();

    let result = client.send(&address, stats_command(None)).await;
    assert!(matches!(result, Err(MetaClientError::Connection { .. })));
    assert!(wait_disconnected(&client, &address).await);
    assert!(client.connected_addresses().is_empty());
}

#[tokio::test]
async fn test_factory_stats_over_tcp() {
    let healthy = spawn_broker(Reply::Stats).await;
    let failing = spawn_broker(Reply::Error(500)).await;
    let silent = spawn_broker(Reply::Silent).await;

    let config = ClientConfigBuilder::new()
        .brokers(vec![
            healthy.to_string(),
            format!("meta://{}", failing),
            silent.to_string(),
        ])
        .request_timeout(Duration::from_millis(300))
        .build();
    let factory = MessageSessionFactory::new(config).unwrap();
    assert_eq!(factory.connect_brokers().await, 3);

    let stats = factory.stats_for_item("topics").await;
    assert_eq!(stats.len(), 1);
    let result = &stats[&healthy];
    assert_eq!(result.len(), 18);
    assert_eq!(result.value("total_messages"), Some("100051"));
    assert_eq!(result.item(), Some("topics"));

    let result = factory.broker_stats(&healthy).await.unwrap();
    assert_eq!(result.item(), Some("null"));

    assert!(matches!(
        factory.broker_stats(&failing).await,
        Err(MetaClientError::StatsRequestFailed { code: 500, .. })
    ));
    assert!(matches!(
        factory.broker_stats(&silent).await,
        Err(MetaClientError::Timeout { .. })
    ));

    let snapshot = factory.metrics().snapshot();
    assert_eq!(snapshot.connections_created, 3);
    assert_eq!(snapshot.stats_failures, 4);

    factory.shutdown().await;
    assert!(factory.remoting_client().connected_addresses().is_empty());
    assert!(matches!(
        factory.broker_stats(&healthy).await,
        Err(MetaClientError::BrokerUnreachable { .. })
    ));
}

#[tokio::test]
async fn test_factory_close_single_broker() {
    let first = spawn_broker(Reply::Stats).await;
    let second = spawn_broker(Reply::Stats).await;

    let factory = MessageSessionFactory::new(
        ClientConfigBuilder::new()
            .brokers(vec![first.to_string(), second.to_string()])
            .build(),
    )
    .unwrap();
    assert_eq!(factory.connect_brokers().await, 2);
    assert_eq!(factory.stats().await.len(), 2);

    let remoting: Arc<dyn RemotingClient> = factory.remoting_client().clone();
    remoting.close(&first).await;

    let stats = factory.stats().await;
    assert_eq!(stats.len(), 1);
    assert!(stats.contains_key(&second));

    factory.shutdown().await;
}
