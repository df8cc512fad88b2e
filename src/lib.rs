// Crate root library declaration and module exports.
pub mod cli;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod model;
pub mod notifier;
pub mod scheduler;
pub mod source;
pub mod storage;
pub mod store;

pub use error::{DeliveryError, Error, ParseError, StoreError};
pub use scheduler::{CycleReport, Scheduler, SchedulerSettings, SchedulerState};
