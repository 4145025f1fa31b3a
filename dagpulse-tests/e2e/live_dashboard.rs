//! Live server, live simulation, real WebSocket clients.

use std::time::Duration;

use dagpulse_client::{NotificationKind, Subscriber};
use dagpulse_core::broadcast::BroadcastEnvelope;
use dagpulse_core::config::DagPulseConfig;
use dagpulse_web::{RunningServer, spawn_server};
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

async fn start() -> (RunningServer, String) {
    let running = spawn_server(DagPulseConfig::for_testing()).await.unwrap();
    let url = format!("ws://{}/ws", running.local_addr());
    (running, url)
}

async fn next_envelope(socket: &mut Socket) -> BroadcastEnvelope {
    loop {
        let message = timeout(WAIT, socket.next())
            .await
            .expect("no frame within timeout")
            .expect("stream ended")
            .expect("receive failed");
        if let Message::Text(text) = message {
            return BroadcastEnvelope::from_json(text.as_str()).unwrap();
        }
    }
}

#[tokio::test]
async fn test_client_gets_catch_up_then_live_blocks() {
    let (running, url) = start().await;
    let (mut socket, _) = connect_async(url.as_str()).await.unwrap();

    let first = next_envelope(&mut socket).await;
    assert!(matches!(first, BroadcastEnvelope::StatsUpdate(_)));

    let mut block = None;
    for _ in 0..500 {
        if let BroadcastEnvelope::NewBlock(record) = next_envelope(&mut socket).await {
            block = Some(record);
            break;
        }
    }
    let block = block.expect("no block pushed");
    assert!(block.number > 100_000);
    assert_eq!(running.state().store.block(block.number), Some(block));

    drop(socket);
    running.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_closes_open_streams() {
    let (running, url) = start().await;
    let (mut socket, _) = connect_async(url.as_str()).await.unwrap();
    next_envelope(&mut socket).await;

    running.shutdown().await.unwrap();

    let ended = timeout(WAIT, async {
        loop {
            match socket.next().await {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(ended.is_ok());
}

#[tokio::test]
async fn test_subscriber_folds_the_live_stream() {
    let (running, url) = start().await;
    let config = DagPulseConfig::for_testing();
    let mut subscriber = Subscriber::new(url, &config.client, &config.forecast);
    let (stop, stop_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        subscriber.run(stop_rx).await;
        subscriber
    });
    tokio::time::sleep(Duration::from_millis(500)).await;
    stop.send(true).unwrap();

    let subscriber = timeout(WAIT, task).await.unwrap().unwrap();
    let server_height = running.state().store.stats().block_height;
    running.shutdown().await.unwrap();

    assert_eq!(subscriber.connections(), 1);
    let view = subscriber.view();
    let height = view.stats().map(|stats| stats.block_height).unwrap();
    assert!(height > 100_000 && height <= server_height);
    assert!(view.latest_block().is_some());
    assert!(!view.history().is_empty());
    assert!(view.forecast().is_ok());
    assert!(
        subscriber
            .notifications()
            .iter()
            .any(|n| n.kind == NotificationKind::BlockFound)
    );
}
