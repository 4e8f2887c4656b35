//! Shared event store between the webhook receiver and the operator console.
//!
//! Two append-only buffers, each behind its own lock. The receiver appends from
//! request handlers; the console drains. Locks are held only for a push or a take,
//! never across I/O or an `.await`, and no path holds both at once.

use crate::channels::{InboundMessage, StatusUpdate};
use std::sync::{Mutex, MutexGuard};

/// In-memory buffers for inbound messages and status updates.
#[derive(Default)]
pub struct EventStore {
    messages: Mutex<Vec<InboundMessage>>,
    statuses: Mutex<Vec<StatusUpdate>>,
}

/// Lock, recovering from poison: a panic elsewhere cannot leave a `Vec` half-pushed.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_message(&self, message: InboundMessage) {
        lock(&self.messages).push(message);
    }

    pub fn append_status(&self, status: StatusUpdate) {
        lock(&self.statuses).push(status);
    }

    /// Take every buffered message in arrival order, leaving the buffer empty.
    pub fn drain_messages(&self) -> Vec<InboundMessage> {
        std::mem::take(&mut *lock(&self.messages))
    }

    /// Take every buffered status update in arrival order, leaving the buffer empty.
    pub fn drain_statuses(&self) -> Vec<StatusUpdate> {
        std::mem::take(&mut *lock(&self.statuses))
    }

    /// (messages, statuses) currently buffered.
    pub fn pending(&self) -> (usize, usize) {
        let messages = lock(&self.messages).len();
        let statuses = lock(&self.statuses).len();
        (messages, statuses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{DeliveryStatus, MessageKind};
    use std::sync::{mpsc, Arc};
    use std::thread;
    use std::time::Duration;

    fn message(n: usize) -> InboundMessage {
        InboundMessage {
            from: format!("sender-{n}"),
            sender_name: None,
            kind: MessageKind::Text,
            body: format!("body-{n}"),
            timestamp: n as i64,
            id: None,
        }
    }

    fn status(n: usize) -> StatusUpdate {
        StatusUpdate {
            recipient: format!("recipient-{n}"),
            status: DeliveryStatus::Sent,
            timestamp: n as i64,
            message_id: None,
        }
    }

    #[test]
    fn drain_returns_appends_in_order_then_empty() {
        let store = EventStore::new();
        for n in 0..5 {
            store.append_message(message(n));
        }
        store.append_status(status(0));
        store.append_status(status(1));
        assert_eq!(store.pending(), (5, 2));

        let drained = store.drain_messages();
        assert_eq!(drained, (0..5).map(message).collect::<Vec<_>>());
        assert!(store.drain_messages().is_empty());

        assert_eq!(store.drain_statuses(), vec![status(0), status(1)]);
        assert!(store.drain_statuses().is_empty());
        assert_eq!(store.pending(), (0, 0));
    }

    #[test]
    fn buffers_use_independent_locks() {
        let store = Arc::new(EventStore::new());
        let held = lock(&store.messages);

        let (tx, rx) = mpsc::channel();
        let s = store.clone();
        thread::spawn(move || {
            s.append_status(status(1));
            let drained = s.drain_statuses();
            let _ = tx.send(drained.len());
        });
        let got = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("status path blocked by messages lock");
        assert_eq!(got, 1);
        drop(held);
    }

    #[test]
    fn concurrent_appends_and_drains_lose_and_duplicate_nothing() {
        const WRITERS: usize = 4;
        const PER_WRITER: usize = 500;

        let store = Arc::new(EventStore::new());
        let writers: Vec<_> = (0..WRITERS)
            .map(|w| {
                let s = store.clone();
                thread::spawn(move || {
                    for i in 0..PER_WRITER {
                        s.append_message(message(w * PER_WRITER + i));
                    }
                })
            })
            .collect();

        let mut seen = Vec::new();
        while writers.iter().any(|h| !h.is_finished()) {
            seen.extend(store.drain_messages());
        }
        for h in writers {
            h.join().unwrap();
        }
        seen.extend(store.drain_messages());

        assert_eq!(seen.len(), WRITERS * PER_WRITER);
        let mut ids: Vec<i64> = seen.iter().map(|m| m.timestamp).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), WRITERS * PER_WRITER);
        for m in &seen {
            assert_eq!(m.body, format!("body-{}", m.timestamp));
        }

        // Per-writer order survives: appends from one thread drain in order.
        for w in 0..WRITERS {
            let lo = (w * PER_WRITER) as i64;
            let hi = lo + PER_WRITER as i64;
            let mine: Vec<i64> = seen
                .iter()
                .map(|m| m.timestamp)
                .filter(|t| (lo..hi).contains(t))
                .collect();
            assert!(mine.windows(2).all(|p| p[0] < p[1]));
        }
    }
}
