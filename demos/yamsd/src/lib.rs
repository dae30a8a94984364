//! The daemon's request loop, generic over its transport.
//!
//! Everything here is parameterized over `AsyncRead`/`AsyncWrite` rather
//! than tied to `tokio::fs::File`, so `tests/` can drive it over
//! `tokio::io::duplex` pairs instead of real FIFOs, the same trick
//! `yams-proto`'s framed I/O primitives use. `src/main.rs` is the only
//! place that knows about actual filesystem paths.

use std::future::Future;

use anyhow::{Context, Result};
use log::{debug, error, warn};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, Unpin};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use yams::dispatcher::{DepartureOutcome, Engine};
use yams::LocalPid;
use yams_proto::constants::{MAX_BAD_REQUESTS_BEFORE_CONNECT, STRING_SIZE};
use yams_proto::wire::{read_int, read_string};
use yams_proto::{MessageType, Priority, Response, SenderFilter, SysCall};

/// Blocks until the first `CONNECT` code arrives on the syscall FIFO, or
/// returns an error after `MAX_BAD_REQUESTS_BEFORE_CONNECT` non-CONNECT
/// codes (`spec.md` §6, exit code `-1`).
pub async fn wait_for_first_connect<R: AsyncRead + Unpin>(syscall_fifo: &mut R) -> Result<()> {
    let mut bad_requests = 0u32;
    loop {
        let code = read_int(syscall_fifo).await?;
        if SysCall::from(code) == SysCall::Connect {
            return Ok(());
        }
        bad_requests += 1;
        warn!("bad request #{bad_requests} before first CONNECT: code {code:o}");
        if bad_requests > MAX_BAD_REQUESTS_BEFORE_CONNECT {
            anyhow::bail!("too many bad requests before the first CONNECT");
        }
    }
}

/// Handles one CONNECT whose syscall code has already been consumed:
/// reads `host_pid` off the syscall FIFO and `mailbox_name` off the
/// comm-channel FIFO, checks admission, and, only on success, opens a
/// private response channel via `open_private` and admits the client.
///
/// `open_private` stands in for "open `YAMS_<host_pid>_fifo` for
/// writing" in production; tests substitute a `tokio::io::duplex` half.
pub async fn handle_connect<R, W, F, Fut>(
    engine: &Engine,
    syscall_fifo: &mut R,
    comm_fifo: &mut R,
    mut open_private: F,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<W>>,
{
    let admitted = engine.admission_check().await;
    let host_pid = read_int(syscall_fifo).await?;
    let mailbox_name = read_string(comm_fifo, STRING_SIZE).await?;

    if !admitted {
        warn!("rejecting connection from host process {host_pid}: too many clients connected");
        return Ok(());
    }

    let file = open_private(host_pid as u32)
        .await
        .with_context(|| format!("opening private FIFO for host process {host_pid}"))?;

    let (tx, rx) = unbounded_channel();
    let pid = engine
        .complete_connect(host_pid as u32, mailbox_name, tx)
        .await
        .context("client table unexpectedly full after admission check")?;
    spawn_writer(pid, file, rx);
    Ok(())
}

/// Spawns the task that owns one client's private-FIFO write side,
/// draining its response channel for as long as the client's slot
/// exists. Every response, immediate or deferred, passes through
/// here uniformly (`SPEC_FULL.md` §5).
pub fn spawn_writer<W>(pid: LocalPid, mut file: W, mut rx: UnboundedReceiver<Response>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(response) = rx.recv().await {
            if let Err(e) = response.write(&mut file).await {
                error!("client {pid}: private FIFO write failed: {e}");
                break;
            }
        }
        let _ = file.flush().await;
        debug!("client {pid}: private FIFO writer task exiting");
    });
}

/// Reads and services one non-CONNECT syscall whose code and caller PID
/// have already been consumed from the syscall FIFO and lock-granted.
/// Returns `true` if this call was a `SHUTDOWN` that tore down the whole
/// daemon, in which case the caller should stop its request loop.
pub async fn dispatch<R: AsyncRead + Unpin>(
    engine: &Engine,
    syscall: SysCall,
    pid: LocalPid,
    comm_fifo: &mut R,
) -> Result<bool> {
    match syscall {
        SysCall::Connect => unreachable!("CONNECT is handled by the caller before dispatch"),
        SysCall::Ping => {
            let code = read_int(comm_fifo).await?;
            engine.ping(pid, code).await;
        }
        SysCall::Exit => {
            engine.exit(pid).await;
        }
        SysCall::Shutdown => {
            let outcome = engine.shutdown(pid).await;
            return Ok(matches!(outcome, DepartureOutcome::DaemonShutdown));
        }
        SysCall::GetPid => engine.get_pid(pid).await,
        SysCall::GetAge => engine.get_age(pid).await,
        SysCall::JoinPid => {
            let target = read_int(comm_fifo).await? as LocalPid;
            engine.join_pid(pid, target).await;
        }
        SysCall::Wait => {
            let target = read_int(comm_fifo).await? as LocalPid;
            engine.wait(pid, target).await;
        }
        SysCall::Signal => {
            let target = read_int(comm_fifo).await? as LocalPid;
            engine.signal(pid, target).await;
        }
        SysCall::Send => {
            let mailbox = read_string(comm_fifo, STRING_SIZE).await?;
            let priority = Priority(read_int(comm_fifo).await?);
            let message_type = MessageType(read_int(comm_fifo).await?);
            let target = engine.begin_send(pid, &mailbox, priority, message_type).await;

            let mut lines = Vec::new();
            loop {
                let line = read_string(comm_fifo, STRING_SIZE).await?;
                if line.is_empty() {
                    break;
                }
                lines.push(line);
            }
            engine
                .finish_send(pid, &mailbox, priority, message_type, target, lines)
                .await;
        }
        SysCall::Check => {
            let priority = Priority(read_int(comm_fifo).await?);
            let message_type = MessageType(read_int(comm_fifo).await?);
            let sender = SenderFilter(read_string(comm_fifo, STRING_SIZE).await?);
            engine.check(pid, priority, message_type, sender).await;
        }
        SysCall::Recv => {
            let priority = Priority(read_int(comm_fifo).await?);
            let message_type = MessageType(read_int(comm_fifo).await?);
            let sender = SenderFilter(read_string(comm_fifo, STRING_SIZE).await?);
            engine.recv(pid, priority, message_type, sender).await;
        }
        SysCall::Configure => {
            let n = read_int(comm_fifo).await?.max(0);
            let mut items = Vec::with_capacity(n as usize);
            for _ in 0..n {
                items.push(read_string(comm_fifo, STRING_SIZE).await?);
            }
            engine.configure(pid, &items).await;
        }
        SysCall::Unknown(code) => {
            engine.unknown_syscall(pid, code).await;
        }
    }
    Ok(false)
}
