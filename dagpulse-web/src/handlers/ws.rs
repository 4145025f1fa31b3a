//! WebSocket push endpoint.
//!
//! A new connection is registered with the hub first, then sent a catch-up
//! burst (current stats plus recent network samples), then live frames.
//! Registering before the burst means nothing published in between is lost;
//! a point may arrive twice, which clients already tolerate.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use dagpulse_core::broadcast::BroadcastEnvelope;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};

use crate::server::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let subscription = state.hub.subscribe();
    let id = subscription.id;
    let mut frames = subscription.frames;
    let (mut sender, mut receiver) = socket.split();

    tracing::info!(
        %id,
        subscribers = state.hub.subscriber_count(),
        "WebSocket client connected"
    );

    if let Err(e) = send_catch_up(&mut sender, &state).await {
        tracing::debug!(%id, error = %e, "Catch-up burst failed");
        state.hub.unsubscribe(id);
        return;
    }

    loop {
        tokio::select! {
            frame = frames.recv() => {
                let Some(frame) = frame else {
                    // hub dropped us: stalled queue or shutdown
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                };
                if let Err(e) = sender.send(Message::Text(frame.to_string().into())).await {
                    tracing::debug!(%id, error = %e, "Send failed");
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(%id, error = %e, "Receive failed");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.hub.unsubscribe(id);
    tracing::info!(%id, "WebSocket client disconnected");
}

async fn send_catch_up(
    sender: &mut SplitSink<WebSocket, Message>,
    state: &AppState,
) -> Result<(), axum::Error> {
    let mut burst = vec![BroadcastEnvelope::StatsUpdate(state.store.stats())];
    burst.extend(
        state
            .store
            .time_series(state.config.broadcast.catch_up_points)
            .into_iter()
            .map(BroadcastEnvelope::TimeSeriesPoint),
    );

    for envelope in &burst {
        match envelope.to_json() {
            Ok(frame) => sender.send(Message::Text(frame.into())).await?,
            Err(e) => {
                tracing::warn!(
                    kind = envelope.kind(),
                    error = %e,
                    "Skipping unencodable catch-up frame"
                );
            }
        }
    }
    Ok(())
}
