//! Message priority and type tags, and the sender filter used by
//! `CHECK`/`RECV`.
//!
//! None of these travel on the wire as anything other than a raw
//! native-width integer (`spec.md` §4.1), and the reference daemon never
//! rejects an out-of-range value, it only ever compares it for equality
//! against a filter. `Priority`/`MessageType` are therefore thin newtypes
//! over `i32`, not validated enums: a `Priority` you get off the wire is
//! whatever the client sent, wildcard or not.

use std::fmt;

/// A message priority, or (when used as a filter) the wildcard `ALL`.
///
/// Priority is a filter on delivery, never a scheduling key: `spec.md` §1
/// non-goals explicitly rule out priority-based preemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Priority(pub i32);

impl Priority {
    pub const SPAM: Priority = Priority(0);
    pub const BATCH: Priority = Priority(1);
    pub const NORMAL: Priority = Priority(4);
    pub const INTERRUPT: Priority = Priority(7);
    pub const ALL: Priority = Priority(-1);

    /// True if `self`, used as a filter, accepts a message of `value`.
    pub fn matches(self, value: Priority) -> bool {
        self == Self::ALL || self == value
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Self::SPAM => "SPAM",
            Self::BATCH => "BATCH",
            Self::NORMAL => "NORMAL",
            Self::INTERRUPT => "INTERRUPT",
            Self::ALL => "ANY/ALL",
            _ => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// A message type, or (when used as a filter) the wildcard `ALL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageType(pub i32);

impl MessageType {
    pub const INFO: MessageType = MessageType(0);
    pub const REQUEST: MessageType = MessageType(1);
    pub const STATUS: MessageType = MessageType(2);
    pub const RESULT: MessageType = MessageType(3);
    pub const SYSTEM: MessageType = MessageType(7);
    pub const ALL: MessageType = MessageType(-1);

    /// True if `self`, used as a filter, accepts a message of `value`.
    pub fn matches(self, value: MessageType) -> bool {
        self == Self::ALL || self == value
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Self::INFO => "INFO",
            Self::REQUEST => "REQUEST",
            Self::STATUS => "STATUS",
            Self::RESULT => "RESULT",
            Self::SYSTEM => "SYSTEM",
            Self::ALL => "ANY/ALL",
            _ => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// Sender-mailbox filter used by `CHECK`/`RECV`: either an exact mailbox
/// name or the wildcard `"*"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SenderFilter(pub String);

impl SenderFilter {
    pub const WILDCARD: &'static str = "*";

    pub fn matches(&self, sender: &str) -> bool {
        self.0 == Self::WILDCARD || self.0 == sender
    }
}

impl From<String> for SenderFilter {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_wildcard_matches_everything() {
        assert!(Priority::ALL.matches(Priority::SPAM));
        assert!(Priority::ALL.matches(Priority::INTERRUPT));
        assert!(!Priority::BATCH.matches(Priority::NORMAL));
        assert!(Priority::NORMAL.matches(Priority::NORMAL));
    }

    #[test]
    fn message_type_wildcard_matches_everything() {
        assert!(MessageType::ALL.matches(MessageType::SYSTEM));
        assert!(!MessageType::INFO.matches(MessageType::REQUEST));
    }

    #[test]
    fn sender_filter_wildcard_and_exact() {
        let wildcard = SenderFilter("*".to_string());
        assert!(wildcard.matches("alice"));
        assert!(wildcard.matches(""));

        let exact = SenderFilter("alice".to_string());
        assert!(exact.matches("alice"));
        assert!(!exact.matches("bob"));
    }
}
