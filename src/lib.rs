//! The YAMS daemon engine: mailbox registry, message queue, client
//! table, syscall dispatcher, and blocking coordinator.
//!
//! This crate is transport-agnostic: it has no notion of a FIFO, a
//! socket, or any particular process model. It receives already-parsed
//! syscall parameters from its caller and hands back `yams_proto::Response`
//! values through each client's own channel. `demos/yamsd` is the binary
//! that gives it real FIFOs to run over.

pub mod clients;
pub mod dispatcher;
pub mod error;
pub mod queue;
pub mod registry;
pub mod state;

pub use clients::{BlockingState, ClientRecord, ClientTable, LocalPid};
pub use dispatcher::{DepartureOutcome, Engine, SendTarget};
pub use error::DaemonError;
pub use queue::MessageQueue;
pub use registry::{Mailbox, MailboxRegistry};
pub use state::DaemonState;
