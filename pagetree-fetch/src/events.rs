//! Run events delivered to observers.

use chrono::{DateTime, Utc};
use pagetree_core::{LogLevel, NodeId, RunState, RunSummary};
use std::fmt;
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;

/// Something observers of a run should know about.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// A timestamped log line.
    Log {
        /// When the message was produced.
        timestamp: DateTime<Utc>,
        /// Severity.
        level: LogLevel,
        /// Message text.
        message: String,
    },
    /// Updated counters.
    Progress(RunSummary),
    /// The node received children and may be expanded in a tree view.
    Expand(NodeId),
    /// The run ended. Sent exactly once per run.
    Finished {
        /// Terminal state.
        state: RunState,
        /// Final counters.
        summary: RunSummary,
    },
}

impl fmt::Display for RunEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Log {
                timestamp,
                level,
                message,
            } => write!(f, "{} {level:<5} {message}", timestamp.format("%Y-%m-%d %H:%M:%S")),
            Self::Progress(summary) => write!(f, "progress: {summary}"),
            Self::Expand(node_id) => write!(f, "expand node {node_id}"),
            Self::Finished { state, summary } => write!(f, "finished ({state}): {summary}"),
        }
    }
}

/// Fan-out of run events to every subscriber.
///
/// Each subscriber has its own unbounded channel, so a slow observer never
/// blocks a worker. Closed receivers are dropped on the next send.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<RunEvent>>>,
}

impl EventBus {
    /// Creates a bus without subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<RunEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Sends an event to every live subscriber.
    pub fn emit(&self, event: &RunEvent) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Returns the number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_subscriber_gets_every_event() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.emit(&RunEvent::Expand(1));
        bus.emit(&RunEvent::Expand(2));

        for rx in [&mut a, &mut b] {
            assert_eq!(rx.recv().await, Some(RunEvent::Expand(1)));
            assert_eq!(rx.recv().await, Some(RunEvent::Expand(2)));
        }
    }

    #[test]
    fn test_closed_subscribers_dropped() {
        let bus = EventBus::new();
        let rx = bus.subscribe();
        let _keep = bus.subscribe();
        drop(rx);

        bus.emit(&RunEvent::Expand(1));
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_log_line_format() {
        let event = RunEvent::Log {
            timestamp: DateTime::parse_from_rfc3339("2024-05-01T12:30:00Z")
                .unwrap()
                .with_timezone(&Utc),
            level: LogLevel::Warn,
            message: "node 3 skipped".to_string(),
        };
        assert_eq!(event.to_string(), "2024-05-01 12:30:00 WARN  node 3 skipped");
    }
}
