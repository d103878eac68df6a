//! Outbound notifications
//!
//! Delivery is best-effort: no retry, and a failure never affects the
//! settlement that triggered it.

use async_trait::async_trait;
use serde_json::Value;

use core_kernel::PortError;

pub const PAYMENT_COMPLETED: &str = "payment.completed";
pub const PAYMENT_FAILED: &str = "payment.failed";
pub const BATCH_COMPLETED: &str = "batch.completed";

#[async_trait]
pub trait WebhookDispatcher: Send + Sync + 'static {
    /// Hands `payload` off for delivery under `event`
    async fn fire(&self, event: &str, payload: Value) -> Result<(), PortError>;
}

/// Dispatcher used when no webhook endpoint is configured
#[derive(Debug, Default, Clone)]
pub struct NoopWebhookDispatcher;

#[async_trait]
impl WebhookDispatcher for NoopWebhookDispatcher {
    async fn fire(&self, _event: &str, _payload: Value) -> Result<(), PortError> {
        Ok(())
    }
}

#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::RwLock;

    /// Records fired events; can be told to fail every delivery
    #[derive(Debug, Default)]
    pub struct RecordingWebhookDispatcher {
        fired: RwLock<Vec<(String, Value)>>,
        failing: AtomicBool,
    }

    impl RecordingWebhookDispatcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing() -> Self {
            let dispatcher = Self::default();
            dispatcher.failing.store(true, Ordering::SeqCst);
            dispatcher
        }

        pub async fn events(&self) -> Vec<String> {
            self.fired.read().await.iter().map(|(e, _)| e.clone()).collect()
        }
    }

    #[async_trait]
    impl WebhookDispatcher for RecordingWebhookDispatcher {
        async fn fire(&self, event: &str, payload: Value) -> Result<(), PortError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(PortError::Timeout {
                    operation: format!("webhook {}", event),
                    duration_ms: 3000,
                });
            }
            self.fired.write().await.push((event.to_string(), payload));
            Ok(())
        }
    }
}
