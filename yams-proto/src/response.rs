//! Responses the daemon writes on a client's private FIFO (`spec.md`
//! §4.4's response column, and the message block shared by `RECV` and
//! the `SEND` fast path).

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{
    error::WireError,
    message::Message,
    wire::{write_int, write_string},
};

/// A response written to a client's private FIFO.
///
/// The wire shape is entirely determined by which variant this is: there
/// is no discriminant byte, because the client already knows (from the
/// syscall it just made) which shape to expect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// A single integer response (`GETPID`, `GETAGE`, `JOINPID`, `WAIT`,
    /// `SIGNAL`, and the CONNECT-time assigned local PID / lock grant).
    Int(i32),
    /// A single string response (`PING`, `EXIT`, `SHUTDOWN`, `SEND`'s
    /// acks, `CHECK`, `CONFIGURE`'s per-item acks, and unknown-syscall
    /// errors).
    Text(String),
    /// The message block returned by a successful `RECV` or delivered
    /// directly to a waiting `RECV` by the `SEND` fast path: priority,
    /// type, sender mailbox, line count, then that many lines.
    Message(Message),
}

impl Response {
    pub async fn write<W: AsyncWrite + Unpin>(&self, w: &mut W) -> Result<(), WireError> {
        match self {
            Response::Int(value) => write_int(w, *value).await,
            Response::Text(text) => write_string(w, text).await,
            Response::Message(msg) => {
                write_int(w, msg.priority.0).await?;
                write_int(w, msg.message_type.0).await?;
                write_string(w, &msg.sender).await?;
                write_int(w, msg.num_lines() as i32).await?;
                for line in &msg.lines {
                    write_string(w, line).await?;
                }
                Ok(())
            }
        }
    }
}

/// Writes the final empty-string terminator that ends every `SEND` line
/// stream, as a convenience for callers that don't want to reach for
/// `write_string` directly.
pub async fn write_line_terminator<W: AsyncWrite + Unpin>(w: &mut W) -> Result<(), WireError> {
    w.write_all(&[0u8]).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        priority::{MessageType, Priority},
        wire::{read_int, read_string},
    };
    use crate::constants::STRING_SIZE;

    #[tokio::test]
    async fn message_block_round_trips() {
        let (mut a, mut b) = tokio::io::duplex(512);
        let mut msg = Message::new(Priority::NORMAL, MessageType::INFO, "alice");
        msg.lines.push("hi".to_string());
        msg.lines.push("there".to_string());

        Response::Message(msg.clone()).write(&mut a).await.unwrap();

        assert_eq!(read_int(&mut b).await.unwrap(), Priority::NORMAL.0);
        assert_eq!(read_int(&mut b).await.unwrap(), MessageType::INFO.0);
        assert_eq!(read_string(&mut b, STRING_SIZE).await.unwrap(), "alice");
        assert_eq!(read_int(&mut b).await.unwrap(), 2);
        assert_eq!(read_string(&mut b, STRING_SIZE).await.unwrap(), "hi");
        assert_eq!(read_string(&mut b, STRING_SIZE).await.unwrap(), "there");
    }

    #[tokio::test]
    async fn zero_line_message_is_legal() {
        let (mut a, mut b) = tokio::io::duplex(128);
        let msg = Message::new(Priority::SPAM, MessageType::SYSTEM, "bob");
        Response::Message(msg).write(&mut a).await.unwrap();

        assert_eq!(read_int(&mut b).await.unwrap(), Priority::SPAM.0);
        assert_eq!(read_int(&mut b).await.unwrap(), MessageType::SYSTEM.0);
        assert_eq!(read_string(&mut b, STRING_SIZE).await.unwrap(), "bob");
        assert_eq!(read_int(&mut b).await.unwrap(), 0);
    }
}
