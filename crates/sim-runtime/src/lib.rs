#![deny(warnings)]

//! Session runtime for Brick Tycoon.
//!
//! A [`Session`] owns the simulation state, a random source and a snapshot
//! store. Time advances in whole ticks through [`Session::step`]; player
//! actions are methods on the session. Every state change is computed on a
//! copy and installed only when it succeeds.

pub mod config;
mod error;
mod notify;
mod session;
mod state;

pub use config::{load_config, parse_config, ConfigError};
pub use error::ActionError;
pub use notify::{Level, Notification};
pub use session::Session;
pub use state::{Clock, SimState};
