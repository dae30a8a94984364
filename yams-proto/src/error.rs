//! Wire-level errors.

use thiserror::Error;

/// An error while reading or writing a single wire primitive.
///
/// `spec.md` §4.1: the framed I/O primitives "signal failure only when
/// the channel closes mid-item"; there is no framing error as such,
/// only a channel that stopped producing or accepting bytes partway
/// through an integer or string.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("channel closed while reading an integer")]
    ClosedMidInt,

    #[error("channel closed while reading a string")]
    ClosedMidString,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
