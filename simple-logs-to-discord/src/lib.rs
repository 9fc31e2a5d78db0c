//! simple-logs-to-discord library crate.
//!
//! Follows one log source, matches each line against an ordered list of
//! patterns and posts an expanded message to a Discord webhook for every
//! match. The binary in `main.rs` only wires configuration, logging and
//! signals around [`pipeline::Pipeline`].

pub mod config;
pub mod error;
pub mod logging;
pub mod matcher;
pub mod notification;
pub mod pipeline;
pub mod source;
pub mod utils;

pub use error::{Error, Result};
