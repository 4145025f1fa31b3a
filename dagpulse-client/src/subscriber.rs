//! WebSocket subscriber with automatic reconnect.

use std::time::Duration;

use dagpulse_core::config::{ClientConfig, ForecastConfig};
use futures::{SinkExt, StreamExt};
use tokio::sync::watch;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::ClientError;
use crate::backoff::Backoff;
use crate::notifications::NotificationLog;
use crate::view::{ViewSignal, ViewState};

/// Why a connection ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Shutdown was requested
    Shutdown,
    /// The server closed the stream
    Disconnected,
}

/// Follows a DAGPulse push endpoint and folds it into a [`ViewState`].
#[derive(Debug)]
pub struct Subscriber {
    url: String,
    view: ViewState,
    notifications: NotificationLog,
    backoff: Backoff,
    connections: u64,
}

impl Subscriber {
    pub fn new(url: impl Into<String>, client: &ClientConfig, forecast: &ForecastConfig) -> Self {
        Self {
            url: url.into(),
            view: ViewState::new(client, forecast),
            notifications: NotificationLog::new(client.notification_capacity),
            backoff: Backoff::from_config(client),
            connections: 0,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn notifications(&self) -> &NotificationLog {
        &self.notifications
    }

    pub fn notifications_mut(&mut self) -> &mut NotificationLog {
        &mut self.notifications
    }

    /// Successful connections so far.
    pub fn connections(&self) -> u64 {
        self.connections
    }

    /// Follows the endpoint until `shutdown` flips to `true` or its sender is
    /// dropped, reconnecting with backoff whenever the stream ends.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.run_once(&mut shutdown).await {
                Ok(SessionEnd::Shutdown) => break,
                Ok(SessionEnd::Disconnected) => {
                    tracing::info!(url = %self.url, "Disconnected from server");
                }
                Err(e) => {
                    tracing::warn!(url = %self.url, error = %e, "Connection failed");
                }
            }

            let delay = self.backoff.next_delay();
            tracing::debug!(delay_ms = delay.as_millis() as u64, "Reconnecting after delay");
            if wait_or_shutdown(delay, &mut shutdown).await {
                break;
            }
        }
    }

    /// Connects once and folds frames until the stream ends.
    ///
    /// # Errors
    ///
    /// - `ClientError::WebSocket` - Connect or receive failed
    pub async fn run_once(
        &mut self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<SessionEnd, ClientError> {
        let (stream, _response) = connect_async(self.url.as_str()).await?;
        self.backoff.reset();
        self.connections += 1;
        tracing::info!(url = %self.url, "Connected");

        let (mut write, mut read) = stream.split();

        loop {
            tokio::select! {
                message = read.next() => match message {
                    Some(Ok(Message::Text(text))) => self.handle_frame(text.as_str()),
                    Some(Ok(Message::Close(_))) | None => return Ok(SessionEnd::Disconnected),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        let _ = write.send(Message::Close(None)).await;
                        return Ok(SessionEnd::Shutdown);
                    }
                }
            }
        }
    }

    fn handle_frame(&mut self, frame: &str) {
        let signals = match self.view.apply_frame(frame) {
            Ok(signals) => signals,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping undecodable frame");
                return;
            }
        };

        let now = self.view.stats().map(|stats| stats.timestamp).unwrap_or(0);
        for signal in &signals {
            match signal {
                ViewSignal::NewBlockFound { height, .. } => {
                    tracing::info!(height, "New block found");
                }
                ViewSignal::PriceMilestone { previous, price } => {
                    tracing::info!(previous, price, "Price milestone reached");
                }
            }
            self.notifications.record(signal, now);
        }
    }
}

/// Sleeps for `delay`. Returns true if shutdown was requested meanwhile.
async fn wait_or_shutdown(delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscriber(url: &str) -> Subscriber {
        let client = ClientConfig {
            reconnect_initial: Duration::from_millis(5),
            reconnect_max: Duration::from_millis(20),
            ..ClientConfig::default()
        };
        Subscriber::new(url, &client, &ForecastConfig::default())
    }

    #[test]
    fn test_frames_fold_into_view_and_notifications() {
        let mut sub = subscriber("ws://127.0.0.1:1/ws");
        let stats = |height: u64| {
            format!(
                r#"{{"type":"stats_update","data":{{"minersOnline":1,"currentLuck":100.0,"poolHashrate":1.0,"networkHashrate":2.0,"blockHeight":{height},"blockDifficulty":1.0,"algorithm":"Scrypt","payoutInterval":3600,"blockReward":50.0,"price":0.005,"timestamp":{height}}}}}"#
            )
        };

        sub.handle_frame(&stats(10));
        sub.handle_frame("garbage");
        sub.handle_frame(&stats(11));

        assert_eq!(sub.view().stats().map(|s| s.block_height), Some(11));
        assert_eq!(sub.notifications().len(), 1);
        assert_eq!(sub.notifications().unread_count(), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_is_an_error() {
        let mut sub = subscriber("ws://127.0.0.1:1/ws");
        let (_tx, mut rx) = watch::channel(false);

        assert!(sub.run_once(&mut rx).await.is_err());
        assert_eq!(sub.connections(), 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_while_retrying() {
        let mut sub = subscriber("ws://127.0.0.1:1/ws");
        let (tx, rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            sub.run(rx).await;
            sub
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        let sub = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sub.connections(), 0);
    }
}
