//! Daemon-level errors (`spec.md` §7).

use thiserror::Error;

/// An error raised by the daemon engine, as opposed to a wire-level
/// [`yams_proto::WireError`].
///
/// Per `spec.md` §7, most of the taxonomy there is handled as an ordinary
/// response value (an error string, or int `-1`) rather than as a Rust
/// error: a bad syscall code, an out-of-range PID, or a JOIN/WAIT target
/// that isn't live are all things the protocol has a defined response
/// for, so they never reach this type. `DaemonError` exists for the
/// handful of conditions the wire protocol has no response shape for.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Raised internally when admission is attempted against a full
    /// client table; callers are expected to catch this and perform the
    /// drain-and-reject behavior of `spec.md` §4.4's CONNECT admission
    /// rule rather than surface it further.
    #[error("client table is full")]
    TableFull,

    /// More than `MAX_BAD_REQUESTS_BEFORE_CONNECT` non-CONNECT requests
    /// arrived before the first CONNECT (`spec.md` §6, exit code -1).
    #[error("too many requests before the first CONNECT")]
    TooManyRequestsBeforeConnect,

    #[error(transparent)]
    Wire(#[from] yams_proto::WireError),
}
