//! Core types, errors, and constants for the taskstore locking and caching
//! layers.
//!
//! ## Key Components
//!
//! - **`errors`**: the shared `Error` enum and `Result` alias. Lock timeouts,
//!   forced releases, malformed cache keys and bad configuration all surface
//!   through it.
//! - **`constants`**: defaults and environment variable names.
//! - **`env`**: typed environment variable overrides for config structs.
//! - **`serde_helpers`**: millisecond encodings for durations in config files.

pub mod constants;
pub mod env;
pub mod errors;
pub mod serde_helpers;

pub use self::{
    constants::*,
    env::{env_flag, env_override},
    errors::{Error, Result},
};
