//! The mailbox registry (`spec.md` §4.2).

use yams_proto::constants::LIST_SIZE;

use crate::queue::MessageQueue;

/// A named mailbox and its message queue.
///
/// `spec.md` §3 lists `first_message`/`prev`/`next` pointers on this
/// record; those exist in the C original purely to thread the bucket
/// chain and the message queue through raw memory. The registry below
/// owns `Mailbox` by value inside a `Vec` per bucket, so the chain
/// pointers become "position in the bucket's `Vec`" and the queue
/// pointers become `MessageQueue`'s own `VecDeque`, so no pointer fields
/// survive into this type.
#[derive(Debug)]
pub struct Mailbox {
    pub name: String,
    pub queue: MessageQueue,
}

impl Mailbox {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            queue: MessageQueue::new(),
        }
    }
}

/// Fixed-size open-hashing registry of mailboxes by name.
///
/// `LIST_SIZE` buckets, hash = sum of the name's bytes mod `LIST_SIZE`.
/// A bucket is a `Vec<Mailbox>` in FIFO insertion order, standing in for
/// the chain the C original threads through `prev`/`next` pointers.
/// Never resized, never shrunk: a mailbox registered once lives for the
/// daemon's lifetime (`spec.md` §3's "never destroyed").
#[derive(Debug)]
pub struct MailboxRegistry {
    buckets: Vec<Vec<Mailbox>>,
}

impl MailboxRegistry {
    pub fn new() -> Self {
        Self {
            buckets: (0..LIST_SIZE).map(|_| Vec::new()).collect(),
        }
    }

    fn hash(name: &str) -> usize {
        let sum: usize = name.bytes().map(|b| b as usize).sum();
        sum % LIST_SIZE
    }

    /// Finds or creates the mailbox named `name`, returning a mutable
    /// reference to it. Ties within a bucket are broken by FIFO
    /// insertion order, matching the C `register`'s "find by name within
    /// the bucket; if not present, append to the tail" contract.
    ///
    /// This always advances fully through the bucket on a miss before
    /// appending, the Design Note (a) fix in `spec.md` §9 for the
    /// non-advancing `get_mbox` bug in the C original (see `DESIGN.md`).
    pub fn register(&mut self, name: &str) -> &mut Mailbox {
        let bucket = &mut self.buckets[Self::hash(name)];
        if let Some(index) = bucket.iter().position(|m| m.name == name) {
            &mut bucket[index]
        } else {
            bucket.push(Mailbox::new(name));
            bucket.last_mut().expect("just pushed")
        }
    }

    /// Looks up a mailbox by name without creating it.
    pub fn find(&self, name: &str) -> Option<&Mailbox> {
        self.buckets[Self::hash(name)]
            .iter()
            .find(|m| m.name == name)
    }

    /// Looks up a mailbox by name without creating it, mutably.
    pub fn find_mut(&mut self, name: &str) -> Option<&mut Mailbox> {
        self.buckets[Self::hash(name)]
            .iter_mut()
            .find(|m| m.name == name)
    }

    /// Zero-based index of `name` within its bucket chain, or `None` if
    /// the bucket has no mailbox of that name.
    pub fn find_position(&self, name: &str) -> Option<usize> {
        self.buckets[Self::hash(name)]
            .iter()
            .position(|m| m.name == name)
    }

    /// The `index`-th mailbox within the bucket chain that `name` hashes
    /// to, or `None` if the index is out of range for that bucket.
    pub fn at(&self, name: &str, index: usize) -> Option<&Mailbox> {
        self.buckets[Self::hash(name)].get(index)
    }
}

impl Default for MailboxRegistry {
    fn default() -> Self {
        Self::new()
    }
}
