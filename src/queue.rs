//! Per-mailbox message queue (`spec.md` §4.3).

use std::collections::VecDeque;

use yams_proto::{Message, MessageType, Priority, SenderFilter};

/// A FIFO queue of messages belonging to one mailbox.
///
/// The reference daemon keeps this as an intrusive doubly-linked list so
/// that unlinking a mid-queue match is O(1) without shifting any other
/// node (`original_source/ipc_messaging.c`'s `fetch_first_message`). A
/// safe-Rust `VecDeque` makes the head/middle/tail unlink cases collapse
/// into a single `remove`, at the cost of an O(n) shift instead of O(1),
/// an explicit, intentional trade documented in `DESIGN.md` rather than a
/// silent regression, since `spec.md` §9 leaves the underlying structure
/// up to the reimplementation as long as head-biased first-match
/// semantics are preserved.
#[derive(Debug, Default)]
pub struct MessageQueue {
    messages: VecDeque<Message>,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self {
            messages: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Appends a message to the tail of the queue.
    pub fn push_back(&mut self, message: Message) {
        self.messages.push_back(message);
    }

    /// Counts messages matching `(priority, message_type, sender)`,
    /// where each filter may be a wildcard.
    pub fn count_matching(
        &self,
        priority: Priority,
        message_type: MessageType,
        sender: &SenderFilter,
    ) -> usize {
        self.messages
            .iter()
            .filter(|m| {
                priority.matches(m.priority)
                    && message_type.matches(m.message_type)
                    && sender.matches(&m.sender)
            })
            .count()
    }

    /// Removes and returns the first message matching the filter,
    /// head-biased (first queued, first returned).
    pub fn fetch_first_matching(
        &mut self,
        priority: Priority,
        message_type: MessageType,
        sender: &SenderFilter,
    ) -> Option<Message> {
        let index = self.messages.iter().position(|m| {
            priority.matches(m.priority)
                && message_type.matches(m.message_type)
                && sender.matches(&m.sender)
        })?;
        self.messages.remove(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(priority: Priority, message_type: MessageType, sender: &str) -> Message {
        Message::new(priority, message_type, sender)
    }

    #[test]
    fn count_matching_respects_wildcards() {
        let mut q = MessageQueue::new();
        q.push_back(msg(Priority::SPAM, MessageType::INFO, "alice"));
        q.push_back(msg(Priority::NORMAL, MessageType::INFO, "bob"));
        q.push_back(msg(Priority::NORMAL, MessageType::REQUEST, "alice"));

        assert_eq!(
            q.count_matching(Priority::ALL, MessageType::ALL, &SenderFilter("*".into())),
            3
        );
        assert_eq!(
            q.count_matching(Priority::NORMAL, MessageType::ALL, &SenderFilter("*".into())),
            2
        );
        assert_eq!(
            q.count_matching(
                Priority::ALL,
                MessageType::ALL,
                &SenderFilter("alice".into())
            ),
            2
        );
    }

    #[test]
    fn fetch_first_matching_is_head_biased_and_unlinks() {
        let mut q = MessageQueue::new();
        q.push_back(msg(Priority::NORMAL, MessageType::INFO, "alice"));
        q.push_back(msg(Priority::NORMAL, MessageType::INFO, "bob"));
        q.push_back(msg(Priority::NORMAL, MessageType::INFO, "carol"));

        let got = q
            .fetch_first_matching(Priority::ALL, MessageType::ALL, &SenderFilter("*".into()))
            .unwrap();
        assert_eq!(got.sender, "alice");
        assert_eq!(q.len(), 2);

        // Remaining queue is still a valid chain in order.
        let got = q
            .fetch_first_matching(Priority::ALL, MessageType::ALL, &SenderFilter("*".into()))
            .unwrap();
        assert_eq!(got.sender, "bob");
        let got = q
            .fetch_first_matching(Priority::ALL, MessageType::ALL, &SenderFilter("*".into()))
            .unwrap();
        assert_eq!(got.sender, "carol");
        assert!(q.is_empty());
    }

    #[test]
    fn fetch_first_matching_unlinks_a_middle_node_cleanly() {
        let mut q = MessageQueue::new();
        q.push_back(msg(Priority::SPAM, MessageType::INFO, "a"));
        q.push_back(msg(Priority::NORMAL, MessageType::INFO, "b"));
        q.push_back(msg(Priority::SPAM, MessageType::INFO, "c"));

        let got = q
            .fetch_first_matching(Priority::NORMAL, MessageType::ALL, &SenderFilter("*".into()))
            .unwrap();
        assert_eq!(got.sender, "b");
        assert_eq!(q.len(), 2);

        // "a" is still the head, "c" is still the tail.
        let got = q
            .fetch_first_matching(Priority::ALL, MessageType::ALL, &SenderFilter("*".into()))
            .unwrap();
        assert_eq!(got.sender, "a");
        let got = q
            .fetch_first_matching(Priority::ALL, MessageType::ALL, &SenderFilter("*".into()))
            .unwrap();
        assert_eq!(got.sender, "c");
    }

    #[test]
    fn no_match_returns_none_and_leaves_queue_intact() {
        let mut q = MessageQueue::new();
        q.push_back(msg(Priority::SPAM, MessageType::INFO, "a"));

        assert!(q
            .fetch_first_matching(
                Priority::INTERRUPT,
                MessageType::ALL,
                &SenderFilter("*".into())
            )
            .is_none());
        assert_eq!(q.len(), 1);
    }
}
