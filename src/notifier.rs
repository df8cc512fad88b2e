// File: ./src/notifier.rs
use crate::error::DeliveryError;
use async_trait::async_trait;

/// Delivers one text to one subscriber. No acknowledgement beyond the result.
#[async_trait]
pub trait Notifier: Send + Sync + std::fmt::Debug {
    async fn send(&self, subscriber: &str, text: &str) -> Result<(), DeliveryError>;
}

/// Writes every message to the log instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, subscriber: &str, text: &str) -> Result<(), DeliveryError> {
        log::info!("[dry-run] -> {}: {}", subscriber, text.replace('\n', " | "));
        Ok(())
    }
}
