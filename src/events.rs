//! Event log emitted by [`crate::step::step`].

use serde::{Deserialize, Serialize};

/// Severity of a single event, in increasing order of how much the caller
/// should care.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A single human-readable occurrence during a step, in causal order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub severity: Severity,
    pub message: String,
    pub id: Option<String>,
    pub timestamp: Option<i64>,
}

impl Event {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            id: None,
            timestamp: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    /// Build a `warning` event and mirror it to the `log` facade.
    pub fn warning(message: impl Into<String>) -> Self {
        let message = message.into();
        log::warn!("{message}");
        Self::new(Severity::Warning, message)
    }

    /// Build an `error` event and mirror it to the `log` facade.
    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        log::error!("{message}");
        Self::new(Severity::Error, message)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_event_has_no_id_or_timestamp() {
        let e = Event::info("hello");
        assert_eq!(e.severity, Severity::Info);
        assert!(e.id.is_none());
        assert!(e.timestamp.is_none());
    }
}
