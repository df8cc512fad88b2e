// File: ./src/model/mod.rs
pub mod adapter;
pub mod display;
pub mod item;
pub mod matcher;

pub use adapter::parse;
pub use display::DueItem;
pub use item::{EventRecord, TriggerOffset};
pub use matcher::{due_items, due_today};
