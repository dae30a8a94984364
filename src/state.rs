//! # Dispatcher state
//!
//! The daemon's top-level state machine (`spec.md` §4.4):
//!
//! ```text
//!        +------+
//!        | IDLE |
//!        +------+
//!            || (1)
//!            \/
//!      +-----------+
//!      | LISTENING |
//!      +-----------+
//!       || (2)   || (4)
//!       \/       ||
//!   +---------+  ||
//!   | SERVING |==++
//!   +---------+
//!       || (3)
//!       \/
//!   +----------+
//!   | SHUTDOWN |
//!   +----------+
//!
//! (1) FIFOs created and opened for reading
//! (2) first CONNECT admitted
//! (3) SHUTDOWN issued by the last live client
//! (4) last client EXITs with others still connected (stays SERVING),
//!     or the only client EXITs (drops back to LISTENING, not shown above
//!     for clients, only for the special SHUTDOWN path)
//! ```
//!
//! `IDLE`/`LISTENING`/`SHUTDOWN` are bookkeeping for `demos/yamsd`'s
//! outer loop (FIFO lifecycle); the engine in this crate is mostly
//! concerned with `SERVING`, where the dispatcher in [`crate::dispatcher`]
//! lives.

/// Coarse daemon lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonState {
    /// No FIFOs open, no clients. The state before the daemon binds its
    /// well-known FIFO paths.
    Idle,
    /// Server FIFOs open, waiting for the first CONNECT. `spec.md` §6's
    /// "too many bad requests before the first CONNECT" exit applies
    /// only in this state.
    Listening,
    /// At least one client is live.
    Serving,
    /// Terminal: FIFOs have been (or are being) torn down. A daemon in
    /// this state will not read another syscall.
    Shutdown,
}

impl DaemonState {
    /// Whether the dispatcher accepts a CONNECT: the per-call admission
    /// logic still applies (table might be full), but no CONNECT is ever
    /// considered once the daemon has moved to `Shutdown`.
    pub fn accepts_connections(self) -> bool {
        matches!(self, DaemonState::Listening | DaemonState::Serving)
    }
}
