//! Bounded, newest-first log of user-facing notifications.

use std::collections::VecDeque;

use serde::Serialize;

use crate::view::ViewSignal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BlockFound,
    Milestone,
    RiskAlert,
}

/// Notification identity, unique within one log.
pub type NotificationId = u64;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub timestamp: u64,
    pub read: bool,
}

#[derive(Debug, Clone)]
pub struct NotificationLog {
    entries: VecDeque<Notification>,
    capacity: usize,
    next_id: NotificationId,
}

impl NotificationLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
        }
    }

    /// Adds an unread notification at the front, dropping the oldest past
    /// capacity.
    pub fn push(
        &mut self,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        timestamp: u64,
    ) -> NotificationId {
        let id = self.next_id;
        self.next_id += 1;

        self.entries.push_front(Notification {
            id,
            kind,
            title: title.into(),
            message: message.into(),
            timestamp,
            read: false,
        });
        self.entries.truncate(self.capacity);
        id
    }

    /// Turns a view signal into a notification.
    pub fn record(&mut self, signal: &ViewSignal, timestamp: u64) -> NotificationId {
        match signal {
            ViewSignal::NewBlockFound { height, reward } => self.push(
                NotificationKind::BlockFound,
                "New Block Found!",
                format!("Block #{height} with {reward:.2} reward"),
                timestamp,
            ),
            ViewSignal::PriceMilestone { price, .. } => self.push(
                NotificationKind::Milestone,
                "Price Milestone Reached!",
                format!("Price increased to ${price:.4}"),
                timestamp,
            ),
        }
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter()
    }

    pub fn unread_count(&self) -> usize {
        self.entries.iter().filter(|entry| !entry.read).count()
    }

    /// Returns false if `id` is not in the log.
    pub fn mark_read(&mut self, id: NotificationId) -> bool {
        match self.entries.iter_mut().find(|entry| entry.id == id) {
            Some(entry) => {
                entry.read = true;
                true
            }
            None => false,
        }
    }

    pub fn mark_all_read(&mut self) {
        for entry in &mut self.entries {
            entry.read = true;
        }
    }

    /// Returns false if `id` is not in the log.
    pub fn remove(&mut self, id: NotificationId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newest_first_and_capped() {
        let mut log = NotificationLog::new(50);
        for i in 0..60 {
            log.push(NotificationKind::Milestone, "t", format!("m{i}"), i);
        }

        assert_eq!(log.len(), 50);
        let messages: Vec<&str> = log.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages.first(), Some(&"m59"));
        assert_eq!(messages.last(), Some(&"m10"));
    }

    #[test]
    fn test_read_tracking() {
        let mut log = NotificationLog::new(10);
        let first = log.push(NotificationKind::BlockFound, "a", "a", 1);
        log.push(NotificationKind::RiskAlert, "b", "b", 2);
        assert_eq!(log.unread_count(), 2);

        assert!(log.mark_read(first));
        assert!(!log.mark_read(999));
        assert_eq!(log.unread_count(), 1);

        log.mark_all_read();
        assert_eq!(log.unread_count(), 0);
    }

    #[test]
    fn test_remove() {
        let mut log = NotificationLog::new(10);
        let id = log.push(NotificationKind::BlockFound, "a", "a", 1);

        assert!(log.remove(id));
        assert!(!log.remove(id));
        assert!(log.is_empty());
    }

    #[test]
    fn test_record_signals() {
        let mut log = NotificationLog::new(10);
        log.record(
            &ViewSignal::NewBlockFound {
                height: 100_001,
                reward: 50.0,
            },
            5,
        );

        let entry = log.iter().next().unwrap();
        assert_eq!(entry.kind, NotificationKind::BlockFound);
        assert_eq!(entry.message, "Block #100001 with 50.00 reward");
        assert!(!entry.read);
    }
}
