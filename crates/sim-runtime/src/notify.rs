//! Player-facing notifications.

use serde::Serialize;
use std::fmt;
use tracing::{debug, error, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Info => "info",
            Level::Success => "success",
            Level::Warning => "warning",
            Level::Error => "error",
        };
        f.write_str(s)
    }
}

impl Level {
    /// Level at which a notification is mirrored to the log.
    ///
    /// Info and Success are routine player feedback and stay at debug.
    pub fn log_level(self) -> tracing::Level {
        match self {
            Level::Info | Level::Success => tracing::Level::DEBUG,
            Level::Warning => tracing::Level::WARN,
            Level::Error => tracing::Level::ERROR,
        }
    }
}

/// A message for the player, stamped with the tick it was raised on.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Notification {
    pub tick: u64,
    pub level: Level,
    pub message: String,
}

/// Notifications raised by a handler, published only if it commits.
#[derive(Debug, Default)]
pub(crate) struct Outbox(Vec<(Level, String)>);

impl Outbox {
    pub(crate) fn push(&mut self, level: Level, message: impl Into<String>) {
        self.0.push((level, message.into()));
    }

    pub(crate) fn stamp(self, tick: u64) -> impl Iterator<Item = Notification> {
        self.0.into_iter().map(move |(level, message)| {
            match level.log_level() {
                tracing::Level::WARN => warn!(tick, %level, %message, "notification"),
                tracing::Level::ERROR => error!(tick, %level, %message, "notification"),
                _ => debug!(tick, %level, %message, "notification"),
            }
            Notification {
                tick,
                level,
                message,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_and_errors_log_at_their_own_level() {
        assert_eq!(Level::Info.log_level(), tracing::Level::DEBUG);
        assert_eq!(Level::Success.log_level(), tracing::Level::DEBUG);
        assert_eq!(Level::Warning.log_level(), tracing::Level::WARN);
        assert_eq!(Level::Error.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn outbox_stamps_in_push_order() {
        let mut out = Outbox::default();
        out.push(Level::Warning, "low clay");
        out.push(Level::Error, "production halted");
        let stamped: Vec<_> = out.stamp(42).collect();
        assert_eq!(stamped.len(), 2);
        assert!(stamped.iter().all(|n| n.tick == 42));
        assert_eq!(stamped[0].level, Level::Warning);
        assert_eq!(stamped[1].message, "production halted");
    }
}
