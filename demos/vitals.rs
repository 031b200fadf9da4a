use careflow_realtime::{AppState, ConnectionConfig, ConnectionManager};
use std::time::Duration;
use tokio::sync::watch;

/// Streams simulated vitals to a realtime endpoint and prints task assignments.
///
/// Reads `REALTIME_URL` (and optional `REALTIME_*` tuning) from the environment or `.env`.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "careflow_realtime=debug,info".into()),
        )
        .init();

    let config = ConnectionConfig::from_env()?;
    println!("📡 Connecting to: {}\n", config.address);

    // Composition root: the one manager for this process
    let manager = ConnectionManager::websocket();

    let _status = manager.on_status_change(|status| println!("🔌 Status: {status}"));
    let _tasks = manager.subscribe("task-assigned", |message| {
        println!("📋 Task assigned: {}", message.payload);
    });

    // Stand-in for the host's foreground/background notifications
    let (_lifecycle_tx, lifecycle_rx) = watch::channel(AppState::Active);
    manager.attach_lifecycle(lifecycle_rx).await;

    manager.connect(config).await?;

    let mut ticker = tokio::time::interval(Duration::from_secs(5));
    let mut heart_rate = 70;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                heart_rate = if heart_rate >= 80 { 68 } else { heart_rate + 2 };
                let sent = manager
                    .send("vitals-update", serde_json::json!({ "hr": heart_rate }))
                    .await;
                if !sent {
                    println!("⏳ Offline, queued ({} pending)", manager.queue_len().await);
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    println!("\nCleaning up...");
    manager.cleanup().await;

    Ok(())
}
