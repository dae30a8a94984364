//! Wire types and framed I/O primitives for the YAMS broker protocol.
//!
//! This crate is the misuse-resistant data layer: it knows how a `SEND`,
//! a `Message`, or a lock grant look on the wire, but nothing about
//! mailboxes, client tables, or blocking. The daemon logic lives in the
//! `yams` crate, one layer up.

pub mod constants;
pub mod error;
pub mod message;
pub mod priority;
pub mod response;
pub mod syscall;
pub mod wire;

pub use error::WireError;
pub use message::{Line, Message};
pub use priority::{MessageType, Priority, SenderFilter};
pub use response::Response;
pub use syscall::SysCall;
