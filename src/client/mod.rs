// File: ./src/client/mod.rs
pub mod core;
pub mod telegram;

pub use crate::client::core::{HttpsClient, build_https_client};
pub use crate::client::telegram::TelegramNotifier;
