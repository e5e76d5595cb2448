//! Reconnecting duplex channel to the analysis backend.
//!
//! Exactly one logical connection: outgoing messages either go straight to
//! the open transport or wait in FIFO order until it opens. Unintentional
//! closes retry with linear backoff (attempt x base delay) up to a ceiling;
//! session teardown cancels the token, which suppresses reconnection.

use std::collections::VecDeque;
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::protocol::{ClientMessage, ServerMessage};
use crate::error::ElicitError;

/// Events the channel task reports back to the driver.
#[derive(Debug)]
pub enum ChannelEvent {
    /// Transport open and queue drained; the driver should follow with a
    /// `sync_state` snapshot.
    Connected,
    Inbound(ServerMessage),
    /// Reconnect ceiling exceeded. Terminal until an external restart.
    Exhausted(ElicitError),
}

/// Handle held by the driver. Dropping it does not close the connection;
/// call `disconnect` for an intentional teardown.
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    out_tx: mpsc::Sender<ClientMessage>,
    shutdown: CancellationToken,
}

impl ChannelHandle {
    pub async fn send(&self, message: ClientMessage) {
        if self.out_tx.send(message).await.is_err() {
            warn!("channel task gone; message dropped");
        }
    }

    pub fn disconnect(&self) {
        self.shutdown.cancel();
    }
}

/// Linear backoff: attempt 1 waits base, attempt 2 waits 2x base, ...
pub fn backoff_delay(attempt: u32, base_ms: u64) -> Duration {
    Duration::from_millis(base_ms * attempt as u64)
}

pub fn spawn(
    url: String,
    base_ms: u64,
    max_attempts: u32,
    events_tx: mpsc::Sender<ChannelEvent>,
) -> ChannelHandle {
    let (out_tx, out_rx) = mpsc::channel(256);
    let shutdown = CancellationToken::new();
    tokio::spawn(run(
        url,
        base_ms,
        max_attempts,
        out_rx,
        events_tx,
        shutdown.clone(),
    ));
    ChannelHandle { out_tx, shutdown }
}

async fn run(
    url: String,
    base_ms: u64,
    max_attempts: u32,
    mut out_rx: mpsc::Receiver<ClientMessage>,
    events_tx: mpsc::Sender<ChannelEvent>,
    shutdown: CancellationToken,
) {
    // Messages that could not be put on the wire; drained FIFO before
    // anything newer once a connection opens.
    let mut queue: VecDeque<ClientMessage> = VecDeque::new();
    let mut attempts: u32 = 0;

    loop {
        if shutdown.is_cancelled() {
            return;
        }

        let ws = tokio::select! {
            _ = shutdown.cancelled() => return,
            conn = connect_async(url.as_str()) => conn,
        };

        match ws {
            Ok((stream, _)) => {
                info!(%url, "channel connected");
                attempts = 0;
                let (mut sink, mut source) = stream.split();

                if events_tx.send(ChannelEvent::Connected).await.is_err() {
                    return;
                }

                // Drain the retry queue first so overall order stays FIFO;
                // the mpsc buffer holds everything newer.
                let mut send_failed = false;
                while let Some(msg) = queue.pop_front() {
                    if let Err(e) = send_json(&mut sink, &msg).await {
                        let err = ElicitError::Transport(e.to_string());
                        warn!(error = %err, "send failed while draining queue");
                        queue.push_front(msg);
                        send_failed = true;
                        break;
                    }
                }

                if !send_failed {
                    loop {
                        tokio::select! {
                            _ = shutdown.cancelled() => {
                                let _ = sink.send(Message::Close(None)).await;
                                return;
                            }
                            outgoing = out_rx.recv() => {
                                let Some(msg) = outgoing else { return };
                                if let Err(e) = send_json(&mut sink, &msg).await {
                                    let err = ElicitError::Transport(e.to_string());
                                    warn!(error = %err, "send failed; queueing and reconnecting");
                                    queue.push_back(msg);
                                    break;
                                }
                            }
                            inbound = source.next() => {
                                match inbound {
                                    Some(Ok(Message::Text(text))) => {
                                        match serde_json::from_str::<ServerMessage>(&text) {
                                            Ok(msg) => {
                                                if events_tx.send(ChannelEvent::Inbound(msg)).await.is_err() {
                                                    return;
                                                }
                                            }
                                            // Malformed or unknown payloads never
                                            // take the connection down.
                                            Err(e) => {
                                                let err = ElicitError::MessageParse(e);
                                                warn!(error = %err, "dropping unparseable message");
                                            }
                                        }
                                    }
                                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                                    Some(Ok(Message::Close(frame))) => {
                                        debug!(?frame, "server closed connection");
                                        break;
                                    }
                                    Some(Ok(_)) => {}
                                    Some(Err(e)) => {
                                        let err = ElicitError::Transport(e.to_string());
                                        warn!(error = %err, "transport error; reconnecting");
                                        break;
                                    }
                                    None => break,
                                }
                            }
                        }
                    }
                }
            }
            Err(e) => {
                let err = ElicitError::Transport(e.to_string());
                warn!(error = %err, "channel connect failed");
            }
        }

        if shutdown.is_cancelled() {
            return;
        }

        attempts += 1;
        if attempts > max_attempts {
            let err = ElicitError::ReconnectExhausted {
                attempts: attempts - 1,
            };
            error!(error = %err, "staying disconnected");
            let _ = events_tx.send(ChannelEvent::Exhausted(err)).await;
            return;
        }

        let delay = backoff_delay(attempts, base_ms);
        info!(attempt = attempts, max_attempts, ?delay, "reconnecting");
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

async fn send_json<S>(
    sink: &mut S,
    msg: &ClientMessage,
) -> Result<(), tokio_tungstenite::tungstenite::Error>
where
    S: Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    let text = serde_json::to_string(msg).unwrap_or_default();
    sink.send(Message::Text(text)).await
}
