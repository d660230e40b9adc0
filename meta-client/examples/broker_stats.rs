//! Broker stats and session lifecycle example
//!
//! Usage: cargo run --example broker_stats -- localhost:8123 meta://localhost:8124

use meta_client::*;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    println!("📊 Meta Client - Broker Stats Example");
    println!("=====================================");

    let mut brokers: Vec<String> = std::env::args().skip(1).collect();
    if brokers.is_empty() {
        brokers.push("localhost:8123".to_string());
    }

    let config = ClientConfigBuilder::new()
        .brokers(brokers)
        .connection_timeout(Duration::from_secs(5))
        .request_timeout(Duration::from_secs(3))
        .client_id("broker-stats-example")
        .build();
    let factory = MessageSessionFactory::new(config)?;

    let connected = factory.connect_brokers().await;
    println!("✅ Connected to {} broker(s)", connected);

    // Example 1: stats of every broker
    for (broker, stats) in factory.stats().await {
        println!("\n🖥  {}", broker);
        for (key, value) in stats.all_values() {
            println!("   {:<20} {}", key, value);
        }
    }

    // Example 2: stats scoped to one item
    for (broker, stats) in factory.stats_for_item("topics").await {
        println!("\n📂 {} topics: {:?}", broker, stats.value("topics"));
    }

    // Example 3: sessions
    let producer = factory.create_producer()?;
    let ordered = factory.create_producer_with(true)?;
    let keyed = factory.create_producer_with_selector(Arc::new(HashPartitionSelector), false)?;
    let consumer = factory.create_consumer(ConsumerConfig::with_group("stats-example"))?;
    println!("\n✅ Created {} sessions", factory.children().len());

    for key in ["order-1", "order-2", "order-1"] {
        let partition = keyed.select_partition(Some(key.as_bytes()), 8)?;
        println!("   key {} -> partition {}", key, partition);
    }

    match factory.create_consumer(ConsumerConfig::default()) {
        Ok(_) => println!("❌ Consumer without a group was accepted"),
        Err(e) => println!("✅ Rejected consumer without a group: {}", e),
    }

    producer.shutdown();
    ordered.shutdown();
    println!("\n🔒 {} session(s) left after closing producers", factory.children().len());

    factory.shutdown().await;
    println!("🔒 Factory shut down, consumer closed: {}", consumer.is_closed());

    println!("\n📈 {:?}", factory.metrics().snapshot());
    Ok(())
}
