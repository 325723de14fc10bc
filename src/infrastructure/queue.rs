use crate::types::StreamMessage;
use std::collections::VecDeque;

/// Bounded FIFO of not-yet-delivered outbound messages.
///
/// When full, the oldest entry is evicted before appending: recent control
/// messages (a fresh project selection) are worth more than stale ones.
/// Contents are not persisted anywhere; messages still queued at process
/// exit are lost.
pub struct OutboundQueue {
    entries: VecDeque<StreamMessage>,
    capacity: usize,
}

impl OutboundQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a message, evicting the oldest entry if at capacity.
    /// Returns the evicted message, if any.
    pub fn push(&mut self, message: StreamMessage) -> Option<StreamMessage> {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(message);
        evicted
    }

    /// Pop the oldest queued message.
    pub fn pop(&mut self) -> Option<StreamMessage> {
        self.entries.pop_front()
    }

    /// Put back a message whose transmission failed mid-drain, preserving
    /// submission order.
    pub fn requeue_front(&mut self, message: StreamMessage) {
        self.entries.push_front(message);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FrameKind;

    fn msg(n: u64) -> StreamMessage {
        StreamMessage::new(FrameKind::SettingsUpdate, serde_json::json!({ "seq": n }))
    }

    fn seq(m: &StreamMessage) -> u64 {
        m.payload.get("seq").and_then(|v| v.as_u64()).unwrap()
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut queue = OutboundQueue::new(3);
        for n in 0..10 {
            queue.push(msg(n));
            assert!(queue.len() <= 3);
        }
    }

    #[test]
    fn evicts_oldest_keeps_newest_in_order() {
        let mut queue = OutboundQueue::new(3);
        let mut evicted = Vec::new();
        for n in 1..=5 {
            if let Some(old) = queue.push(msg(n)) {
                evicted.push(seq(&old));
            }
        }
        assert_eq!(evicted, vec![1, 2]);

        let remaining: Vec<u64> = std::iter::from_fn(|| queue.pop()).map(|m| seq(&m)).collect();
        assert_eq!(remaining, vec![3, 4, 5]);
    }

    #[test]
    fn requeue_front_preserves_order() {
        let mut queue = OutboundQueue::new(5);
        for n in 1..=3 {
            queue.push(msg(n));
        }

        let first = queue.pop().unwrap();
        assert_eq!(seq(&first), 1);
        queue.requeue_front(first);

        let drained: Vec<u64> = std::iter::from_fn(|| queue.pop()).map(|m| seq(&m)).collect();
        assert_eq!(drained, vec![1, 2, 3]);
    }
}
