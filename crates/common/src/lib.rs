//! Shared error machinery and clock helpers used across all clipwatch crates.

pub mod error;
pub mod time;

pub use {
    error::FromMessage,
    time::{now_ms, secs_to_ms},
};
