use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;
use uuid::Uuid;

use elicit::channel::{self, ChannelEvent};
use elicit::config::SessionConfig;
use elicit::kernel::event::{Command, Effect};
use elicit::SurveyStore;

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging/tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut config = SessionConfig::default();
    if let Ok(url) = std::env::var("ELICIT_WS_URL") {
        config.ws_url = url;
    }
    tracing::info!(url = %config.ws_url, "Elicitation driver booting...");

    // Channel to the analysis backend
    let (events_tx, mut events_rx) = mpsc::channel(100);
    let handle = channel::client::spawn(
        config.ws_url.clone(),
        config.reconnect_base_ms,
        config.max_reconnect_attempts,
        events_tx,
    );

    let mut store = SurveyStore::new(config);

    // Fresh headless session; the UI layer would normally drive this.
    let session_id = Uuid::new_v4().to_string();
    let effects = store.apply(
        Command::StartSession {
            session_id,
            context: "headless".to_string(),
        },
        now_ms(),
    );
    run_effects(effects, &handle).await;

    let mut cadence = tokio::time::interval(Duration::from_millis(100));
    cadence.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    tracing::info!("Elicitation driver active. Press Ctrl+C to stop.");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown requested");
                handle.disconnect();
                break;
            }
            _ = cadence.tick() => {}
        }

        // 1. Drain channel events
        while let Ok(event) = events_rx.try_recv() {
            match event {
                ChannelEvent::Connected => {
                    // Re-establish backend context before anything else.
                    handle.send(store.sync_message()).await;
                }
                ChannelEvent::Inbound(msg) => {
                    let effects = store.handle_server(msg, now_ms());
                    run_effects(effects, &handle).await;
                }
                ChannelEvent::Exhausted(err) => {
                    tracing::error!(error = %err, "backend unreachable; stopping");
                    return Err(err.into());
                }
            }
        }

        // 2. Fire due timers
        let effects = store.tick(now_ms());
        run_effects(effects, &handle).await;
    }

    Ok(())
}

async fn run_effects(effects: Vec<Effect>, handle: &channel::ChannelHandle) {
    for effect in effects {
        match effect {
            Effect::Send(msg) => handle.send(msg).await,
            Effect::Status(text) => tracing::info!(status = %text),
            Effect::SessionReset => tracing::info!("session reset"),
        }
    }
}
