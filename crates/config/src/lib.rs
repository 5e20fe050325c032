//! Environment-based configuration for the clipwatch bot.
//!
//! Everything is loaded once at startup and immutable thereafter. A missing
//! monitored channel list or missing client credentials is the only class of
//! error that aborts the process (see `validate`).

pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{from_vars, load_from_env},
    schema::Config,
    validate::validate,
};
