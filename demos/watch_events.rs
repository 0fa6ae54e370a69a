//! # Example: watch_events
//!
//! Registers one listener for deployment and task status events and prints
//! them until Ctrl-C.
//!
//! Demonstrates how to:
//! - Configure the client from environment variables.
//! - Pick the callback or stream transport by name.
//! - Shut down cleanly, deregistering the callback URL.
//!
//! ## Flow
//! ```text
//! EventsConfig ──► EventsClient::new()
//!     ├─► add_events_listener(handle, DEPLOYMENTS | StatusUpdate)
//!     │     └─► transport activation (subscribe / connect)
//!     ├─► events.recv() ──► print
//!     └─► Ctrl-C ──► shutdown()
//! ```
//!
//! ## Run
//! ```bash
//! MARATHON_MEMBERS=http://127.0.0.1:8080 MARATHON_TRANSPORT=stream \
//!     RUST_LOG=marathon_events=debug cargo run --example watch_events
//! ```

use anyhow::Context;
use marathon_events::{
    DEFAULT_LISTENER_CAPACITY, EventKind, EventPayload, EventsClient, EventsConfig, filter,
    listener,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut cfg = EventsConfig::default();
    if let Ok(members) = std::env::var("MARATHON_MEMBERS") {
        cfg.members = members.split(',').map(str::to_string).collect();
    }
    if let Ok(interface) = std::env::var("MARATHON_EVENTS_INTERFACE") {
        cfg.interface = interface;
    }
    let transport = std::env::var("MARATHON_TRANSPORT").unwrap_or_else(|_| "callback".into());
    let cfg = cfg.with_transport(&transport)?;

    let client = EventsClient::new(cfg).context("building events client")?;
    let (handle, mut events) = listener(DEFAULT_LISTENER_CAPACITY);
    client
        .add_events_listener(&handle, filter::DEPLOYMENTS | EventKind::StatusUpdate.bit())
        .await
        .context("registering listener")?;

    if let Some(url) = client.subscription_url().await {
        println!("[watch] callback registered at {url}");
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => {
                let Some(event) = event else { break };
                match event.payload() {
                    EventPayload::StatusUpdate(update) => println!(
                        "[#{}] {} {} -> {}",
                        event.seq(), update.app_id, update.task_id, update.task_status
                    ),
                    other => println!("[#{}] {} at {}", event.seq(), event.kind(), other.timestamp()),
                }
            }
        }
    }

    client.shutdown().await?;
    let stats = client.dispatch_stats();
    println!(
        "[watch] delivered={} dropped={} discarded={}",
        stats.delivered,
        stats.dropped_full + stats.dropped_closed,
        stats.discarded
    );
    Ok(())
}
