//! HTTP webhook dispatcher
//!
//! Delivers settlement events as a JSON POST to one configured endpoint.
//! Delivery runs on its own task with a short fixed timeout; the caller
//! never waits for it, and a failed delivery only bumps a counter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, warn};

use core_kernel::PortError;
use domain_payables::WebhookDispatcher;

#[derive(Debug, Clone)]
pub struct HttpWebhookDispatcher {
    client: reqwest::Client,
    url: Option<String>,
    timeout: Duration,
    failures: Arc<AtomicU64>,
}

impl HttpWebhookDispatcher {
    /// A dispatcher posting to `url`; `None` disables delivery
    pub fn new(url: Option<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.filter(|u| !u.trim().is_empty()),
            timeout,
            failures: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.url.is_some()
    }

    /// Deliveries that failed or timed out since startup
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl WebhookDispatcher for HttpWebhookDispatcher {
    async fn fire(&self, event: &str, payload: Value) -> Result<(), PortError> {
        let Some(url) = self.url.clone() else {
            return Ok(());
        };

        let body = json!({
            "event": event,
            "payload": payload,
            "sent_at": Utc::now(),
        });
        let request = self.client.post(url).timeout(self.timeout).json(&body);
        let failures = self.failures.clone();
        let event = event.to_string();

        tokio::spawn(async move {
            match request.send().await.and_then(|r| r.error_for_status()) {
                Ok(response) => debug!(event = %event, status = %response.status(), "Webhook delivered"),
                Err(e) => {
                    let total = failures.fetch_add(1, Ordering::Relaxed) + 1;
                    warn!(event = %event, error = %e, failures = total, "Webhook delivery failed");
                }
            }
        });
        Ok(())
    }
}
