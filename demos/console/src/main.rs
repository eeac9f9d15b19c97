//! Runs the scheduler against an in-memory store, printing deliveries to the
//! log instead of a chat transport.
//!
//! Usage: `adcast-demo-console [config.json]`
use std::sync::Arc;

use adcast::config::Config;
use adcast::prelude::*;
use adcast::store::InMemoryStore;
use async_trait::async_trait;

struct LogDelivery;

#[async_trait]
impl Delivery for LogDelivery {
    async fn send(&self, destination: ChatId, text: &str) -> Result<(), DeliveryError> {
        tracing::info!("-> chat {destination}: {text}");
        Ok(())
    }
}

#[tokio::main]
pub async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => match Config::from_file(&path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("Error: {err}");
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };

    let handle = Adcast::new(InMemoryStore::new(), LogDelivery, SystemClock)
        .with_poll_interval(config.poll_interval())
        .start()
        .await
        .unwrap();

    let service = handle.service();
    seed_adverts(&service).await;

    tracing::info!("Server starts working; press ctrl-c to stop");
    tokio::signal::ctrl_c().await.unwrap();

    tracing::info!("Server stops working");
    handle.graceful_shutdown().await.unwrap();
}

async fn seed_adverts(service: &Arc<AdvertService<InMemoryStore, SystemClock>>) {
    let id = service
        .create_advert("alice", 100.into(), "Fresh bagels every minute!", "minute :00")
        .await
        .unwrap();
    tracing::info!("Seeded advert {id}");

    let id = service
        .create_advert("bob", 200.into(), "Hourly news roundup", "hour :00")
        .await
        .unwrap();
    tracing::info!("Seeded advert {id}");
}
