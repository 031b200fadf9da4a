use crate::types::Message;
use std::collections::VecDeque;

/// Bounded FIFO of messages waiting for a connection.
///
/// When full, pushing evicts the oldest entry (drop-oldest).
#[derive(Debug)]
pub struct OutboundQueue {
    messages: VecDeque<Message>,
    capacity: usize,
}

impl OutboundQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `message`, returning the evicted oldest entry if the queue was full
    pub fn push(&mut self, message: Message) -> Option<Message> {
        if self.capacity == 0 {
            return Some(message);
        }
        let evicted = if self.messages.len() >= self.capacity {
            self.messages.pop_front()
        } else {
            None
        };
        self.messages.push_back(message);
        evicted
    }

    pub fn pop_front(&mut self) -> Option<Message> {
        self.messages.pop_front()
    }

    /// Puts a message back at the head after a failed write.
    pub fn requeue_front(&mut self, message: Message) {
        if self.messages.len() >= self.capacity {
            self.messages.pop_back();
        }
        self.messages.push_front(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }
}
