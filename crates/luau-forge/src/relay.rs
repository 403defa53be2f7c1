//! Publishing finished scripts to the relay.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use luau_forge_core::markup::ScriptDescriptor;
use reqwest::Client;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::sleep;

/// How long [`RelayStatus::Sent`] and [`RelayStatus::Failed`] stay visible.
pub const STATUS_RESET_DELAY: Duration = Duration::from_secs(3);

/// State of the last publish attempt, meant for a transient indicator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RelayStatus {
    /// Nothing was published recently.
    #[default]
    Idle,
    /// A publish request is in flight.
    Sending,
    /// The relay accepted the script.
    Sent,
    /// The relay could not be reached or rejected the script.
    Failed,
}

/// Error returned by [`RelayClient::publish`].
#[derive(Debug, Error)]
pub enum RelayError {
    /// The request could not be sent or the connection broke.
    #[error("cannot reach the relay: {0}")]
    Network(#[from] reqwest::Error),
    /// The relay answered with a non-success status code.
    #[error("relay responded with status {0}")]
    Status(u16),
}

/// Publishes finished scripts to a topic on an ntfy-style relay, where the
/// Studio connector picks them up.
#[derive(Clone, Debug)]
pub struct RelayClient {
    client: Client,
    topic_url: String,
    status_tx: Arc<watch::Sender<RelayStatus>>,
    attempts: Arc<AtomicU64>,
}

impl RelayClient {
    /// Creates a client publishing to `topic` on the relay at `relay_url`.
    #[inline]
    pub fn new(relay_url: &str, topic: &str) -> Self {
        Self::with_client(Client::new(), relay_url, topic)
    }

    /// Like [`RelayClient::new`], with a preconfigured HTTP client.
    pub fn with_client(client: Client, relay_url: &str, topic: &str) -> Self {
        let (status_tx, _) = watch::channel(RelayStatus::Idle);
        Self {
            client,
            topic_url: format!("{}/{topic}", relay_url.trim_end_matches('/')),
            status_tx: Arc::new(status_tx),
            attempts: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Returns the URL scripts are posted to.
    #[inline]
    pub fn topic_url(&self) -> &str {
        &self.topic_url
    }

    /// Returns the current status.
    #[inline]
    pub fn status(&self) -> RelayStatus {
        *self.status_tx.borrow()
    }

    /// Subscribes to status changes.
    #[inline]
    pub fn subscribe(&self) -> watch::Receiver<RelayStatus> {
        self.status_tx.subscribe()
    }

    /// Posts `script` to the topic. The status moves to `Sending`, then
    /// to `Sent` or `Failed`, and falls back to `Idle` after
    /// [`STATUS_RESET_DELAY`] unless another attempt started meanwhile.
    ///
    /// Nothing is retried.
    pub async fn publish(
        &self,
        script: &ScriptDescriptor,
    ) -> Result<(), RelayError> {
        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        self.status_tx.send_replace(RelayStatus::Sending);

        let result = self.post(script).await;
        let status = match &result {
            Ok(()) => {
                info!("published {:?} to the relay", script.title);
                RelayStatus::Sent
            }
            Err(err) => {
                warn!("failed to publish {:?}: {err}", script.title);
                RelayStatus::Failed
            }
        };
        self.status_tx.send_replace(status);
        self.schedule_reset(attempt);
        result
    }

    async fn post(&self, script: &ScriptDescriptor) -> Result<(), RelayError> {
        let resp = self
            .client
            .post(&self.topic_url)
            .header("Title", format!("New Script: {}", script.title))
            .header("Tags", "robot,computer")
            .json(script)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RelayError::Status(status.as_u16()));
        }
        Ok(())
    }

    fn schedule_reset(&self, attempt: u64) {
        let status_tx = Arc::clone(&self.status_tx);
        let attempts = Arc::clone(&self.attempts);
        tokio::spawn(async move {
            sleep(STATUS_RESET_DELAY).await;
            if attempts.load(Ordering::Relaxed) == attempt {
                status_tx.send_replace(RelayStatus::Idle);
            }
        });
    }
}
