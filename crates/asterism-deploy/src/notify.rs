//! Webhook notifications for deploy progress.
//!
//! Notifications are strictly fire-and-forget: a dead webhook must never
//! fail or slow a deployment, so the first delivery failure logs a warning
//! and latches the notifier off for the rest of the run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts progress messages to an optional webhook.
#[derive(Debug)]
pub struct Notifier {
    client: Option<(reqwest::Client, String)>,
    disabled: AtomicBool,
}

impl Notifier {
    /// A notifier for the given webhook URL; `None` disables it entirely.
    #[must_use]
    pub fn new(url: Option<&str>) -> Self {
        let client = url.map(|url| {
            let client = reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default();
            (client, url.to_owned())
        });
        Self {
            client,
            disabled: AtomicBool::new(false),
        }
    }

    /// Deployment is starting.
    pub async fn starting(&self, prefix: &str) {
        self.post(&format!("Deploy of *{prefix}* starting")).await;
    }

    /// Deployment finished; include where it is reachable.
    pub async fn completed(&self, prefix: &str, url: &str) {
        self.post(&format!("Deploy of *{prefix}* completed: {url}"))
            .await;
    }

    /// Deployment failed.
    pub async fn failed(&self, prefix: &str, reason: &str) {
        self.post(&format!("Deploy of *{prefix}* FAILED: {reason}"))
            .await;
    }

    async fn post(&self, text: &str) {
        let Some((client, url)) = &self.client else {
            return;
        };
        if self.disabled.load(Ordering::Relaxed) {
            return;
        }

        let payload = serde_json::json!({ "text": text });
        let sent = client.post(url).json(&payload).send().await;
        match sent.and_then(reqwest::Response::error_for_status) {
            Ok(_) => debug!(%text, "notification delivered"),
            Err(e) => {
                warn!(error = %e, "webhook notification failed; disabling notifications");
                self.disabled.store(true, Ordering::Relaxed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_url_means_no_op() {
        let notifier = Notifier::new(None);
        notifier.starting("ow").await;
        notifier.completed("ow", "http://localhost:8888").await;
        assert!(!notifier.disabled.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn first_failure_latches_the_notifier_off() {
        // Unroutable address: delivery fails fast and must not error out.
        let notifier = Notifier::new(Some("http://127.0.0.1:1/hook"));
        notifier.starting("ow").await;
        assert!(notifier.disabled.load(Ordering::Relaxed));
        // Still safe to call.
        notifier.failed("ow", "boom").await;
    }
}
