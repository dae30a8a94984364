//! The client table (`spec.md` §4, client record; §9 on identifier reuse).

use std::time::Instant;

use tokio::sync::mpsc::UnboundedSender;

use yams_proto::{MessageType, Priority, Response, SenderFilter};

use crate::error::DaemonError;

/// A client's local PID: its index into the client table.
pub type LocalPid = usize;

/// What a client is currently blocked on, if anything.
///
/// `spec.md` invariant 3 says a client record has at most one of
/// `join_target`, `wait_target`, `pending_recv` set at any time. The C
/// original keeps three separate fields (two PID-or-sentinel ints plus a
/// pending-RECV triple) and relies on every handler to keep them mutually
/// exclusive by convention. Representing this as a single sum type
/// removes the possibility of ever recording two of them at once, a
/// deliberate, spec-sanctioned redesign (`spec.md` "REDESIGN FLAGS",
/// `SPEC_FULL.md` §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockingState {
    Idle,
    JoinPid(LocalPid),
    WaitPid(LocalPid),
    PendingRecv {
        priority: Priority,
        message_type: MessageType,
        sender: SenderFilter,
    },
}

impl BlockingState {
    pub fn is_idle(&self) -> bool {
        matches!(self, BlockingState::Idle)
    }
}

/// One live client.
#[derive(Debug)]
pub struct ClientRecord {
    pub local_pid: LocalPid,
    pub host_pid: u32,
    pub started_at: Instant,
    pub mailbox_name: String,
    /// The sending half of this client's private-FIFO writer task.
    /// Every response, immediate or deferred, goes out through here;
    /// see `SPEC_FULL.md` §5 for why this doubles as the blocking
    /// coordinator's wake-up mechanism.
    pub outbound: UnboundedSender<Response>,
    pub blocking: BlockingState,
}

impl ClientRecord {
    /// Seconds elapsed since CONNECT, for GETAGE.
    pub fn age_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Sends a response on this client's private FIFO. The only failure
    /// mode is the client's connection task having already gone away,
    /// which the dispatcher treats as "this slot is about to be freed",
    /// not a fatal daemon error (`spec.md` §7, channel I/O errors).
    pub fn respond(&self, response: Response) {
        let _ = self.outbound.send(response);
    }
}

/// Fixed-size `LIST_SIZE` array of client slots, indexed by local PID.
///
/// Admission follows `spec.md` §4.4 exactly: a `next_pid` cursor that
/// advances modulo `LIST_SIZE` only when a CONNECT is actually admitted,
/// and never searches for a free slot. `spec.md` §9 requires that this
/// identifier-reuse behavior survive even if the underlying storage
/// changes, because clients cite PIDs by number in JOIN/WAIT/SIGNAL.
#[derive(Debug)]
pub struct ClientTable {
    slots: Vec<Option<ClientRecord>>,
    next_pid: LocalPid,
    connections: usize,
}

impl ClientTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            next_pid: 0,
            connections: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn connections(&self) -> usize {
        self.connections
    }

    pub fn get(&self, pid: LocalPid) -> Option<&ClientRecord> {
        self.slots.get(pid)?.as_ref()
    }

    pub fn get_mut(&mut self, pid: LocalPid) -> Option<&mut ClientRecord> {
        self.slots.get_mut(pid)?.as_mut()
    }

    pub fn is_live(&self, pid: LocalPid) -> bool {
        self.get(pid).is_some()
    }

    /// The slot the next CONNECT will attempt to claim, without
    /// mutating anything. Used to implement the admission check ahead of
    /// reading a CONNECT's parameters (`spec.md` §4.4).
    pub fn next_pid_preview(&self) -> LocalPid {
        self.next_pid
    }

    /// Attempts to admit a new client at the current `next_pid` cursor.
    ///
    /// Returns [`DaemonError::TableFull`] if that slot is occupied; the
    /// cursor does not search for a free slot (`spec.md` §4.4's CONNECT
    /// admission rule). On success, the cursor advances modulo
    /// `LIST_SIZE` and the new client's PID is returned.
    pub fn connect(
        &mut self,
        host_pid: u32,
        mailbox_name: String,
        outbound: UnboundedSender<Response>,
    ) -> Result<LocalPid, DaemonError> {
        let pid = self.next_pid;
        if self.slots[pid].is_some() {
            return Err(DaemonError::TableFull);
        }
        self.slots[pid] = Some(ClientRecord {
            local_pid: pid,
            host_pid,
            started_at: Instant::now(),
            mailbox_name,
            outbound,
            blocking: BlockingState::Idle,
        });
        self.next_pid = (self.next_pid + 1) % self.slots.len();
        self.connections += 1;
        Ok(pid)
    }

    /// Frees a client's slot (EXIT, or SHUTDOWN-as-EXIT). Returns the
    /// freed record so the caller can act on its blocking state (e.g. a
    /// departing JOIN target waking its joiners).
    pub fn disconnect(&mut self, pid: LocalPid) -> Option<ClientRecord> {
        let record = self.slots.get_mut(pid)?.take()?;
        self.connections -= 1;
        Some(record)
    }

    /// Iterates all live client records along with their PIDs.
    pub fn iter(&self) -> impl Iterator<Item = (LocalPid, &ClientRecord)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(pid, slot)| slot.as_ref().map(|record| (pid, record)))
    }

    /// Iterates all live client records mutably along with their PIDs.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (LocalPid, &mut ClientRecord)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(pid, slot)| slot.as_mut().map(|record| (pid, record)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    fn sender() -> UnboundedSender<Response> {
        unbounded_channel().0
    }

    #[test]
    fn connect_assigns_sequential_pids_and_advances_the_cursor() {
        let mut table = ClientTable::new(4);
        assert_eq!(table.connect(100, "a".into(), sender()).unwrap(), 0);
        assert_eq!(table.connect(101, "b".into(), sender()).unwrap(), 1);
        assert_eq!(table.connections(), 2);
    }

    #[test]
    fn connect_rejects_when_the_cursor_slot_is_occupied_without_searching() {
        let mut table = ClientTable::new(2);
        table.connect(1, "a".into(), sender()).unwrap();
        table.connect(2, "b".into(), sender()).unwrap();
        // Both slots full: the cursor wrapped to 0, which is occupied.
        assert!(matches!(
            table.connect(3, "c".into(), sender()),
            Err(DaemonError::TableFull)
        ));
    }

    #[test]
    fn disconnect_frees_the_slot_for_reuse_by_cursor_wraparound() {
        let mut table = ClientTable::new(2);
        table.connect(1, "a".into(), sender()).unwrap();
        table.connect(2, "b".into(), sender()).unwrap();
        assert!(table.disconnect(0).is_some());
        // Cursor is now at 0 (it wrapped after the second connect); the
        // freed slot 0 is immediately reusable.
        assert_eq!(table.connect(3, "c".into(), sender()).unwrap(), 0);
    }

    #[test]
    fn blocking_state_is_mutually_exclusive_by_construction() {
        let state = BlockingState::JoinPid(2);
        assert!(!state.is_idle());
        // There is no way to also set a wait_target on this same value:
        // it would have to replace the JoinPid variant entirely.
    }
}
