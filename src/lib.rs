#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod catalog;
pub mod config;
pub mod error;
pub mod event;
pub mod filter;
pub mod health;
pub mod normalizer;
pub mod notification;
pub mod queue;
pub mod scope;
pub mod sink;
pub mod stream;
pub mod telemetry;
pub mod types;
pub mod util;
pub mod watcher;

pub use normalizer::{BatchReport, EventNormalizer, Rejection};
pub use notification::Notification;
pub use watcher::Watcher;

pub type Result<T> = std::result::Result<T, error::Error>;
