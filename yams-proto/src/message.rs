//! The queued-message data type (`spec.md` §3).

use crate::priority::{MessageType, Priority};

/// A single line of message text.
///
/// In the reference daemon this is a node in a singly-linked list owned
/// exclusively by its message (`original_source/ipc_messaging.c`'s
/// `struct Line`). Since a message's lines are never shared or aliased,
/// `Vec<String>` reproduces the same ownership with no loss of fidelity,
/// and `Message::num_lines` below is computed instead of hand-counted,
/// so invariant 6 of `spec.md` §3 ("line list length equals `num_lines`")
/// is then true by construction rather than by bookkeeping.
pub type Line = String;

/// A queued message: a priority/type tag, the sender's mailbox name, and
/// its lines of text.
///
/// A `Message` exists only while queued or in flight to a recipient; it
/// has no identity once delivered (`spec.md` §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub priority: Priority,
    pub message_type: MessageType,
    pub sender: String,
    pub lines: Vec<Line>,
}

impl Message {
    pub fn new(priority: Priority, message_type: MessageType, sender: impl Into<String>) -> Self {
        Self {
            priority,
            message_type,
            sender: sender.into(),
            lines: Vec::new(),
        }
    }

    /// Number of lines in the message, i.e. `spec.md`'s `num_lines`.
    pub fn num_lines(&self) -> usize {
        self.lines.len()
    }
}
