//! The YAMS broker daemon.
//!
//! Creates the two shared FIFOs (`YAMSD_syscall_fifo`, `YAMSD_comm_channel_fifo`)
//! in its runtime directory, waits for the first `CONNECT`, then services
//! syscalls until every client has disconnected, at which point it tears
//! the FIFOs down and listens again, unless the departure was a `SHUTDOWN`,
//! which ends the process entirely (`spec.md` §5, "outer accept loop").

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};
use nix::errno::Errno;
use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use tokio::fs::{File, OpenOptions};

use yams::dispatcher::Engine;
use yams_proto::constants::{
    client_fifo_name, COMM_CHANNEL_FIFO_NAME, LIST_SIZE, SYSCALL_FIFO_NAME,
};
use yams_proto::wire::read_int;
use yams_proto::SysCall;

use yamsd::{dispatch, handle_connect, wait_for_first_connect};

/// Services one CONNECT by opening the new client's private FIFO for
/// writing in `dir`. Thin wrapper around [`handle_connect`] so the two
/// call sites in the daemon's main loop (the very first CONNECT, and
/// every subsequent one) share the same FIFO-opening closure.
async fn accept_connect<R: tokio::io::AsyncRead + Unpin>(
    engine: &Engine,
    syscall_fifo: &mut R,
    comm_fifo: &mut R,
    dir: &Path,
) -> Result<()> {
    handle_connect(engine, syscall_fifo, comm_fifo, |host_pid| {
        let path = dir.join(client_fifo_name(host_pid));
        async move {
            OpenOptions::new()
                .write(true)
                .open(&path)
                .await
                .with_context(|| format!("opening {}", path.display()))
        }
    })
    .await
}

/// Directory the daemon creates its FIFOs in. `spec.md` doesn't name a
/// default location for the reference implementation (it assumes the
/// current directory); `YAMSD_RUNTIME_DIR` lets an operator point this
/// at a proper runtime directory (`SPEC_FULL.md` §5.3).
fn runtime_dir() -> PathBuf {
    env::var_os("YAMSD_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn fifo_mode() -> Mode {
    Mode::from_bits_truncate(yams_proto::constants::FIFO_MODE)
}

/// Creates a FIFO at `path`, tolerating one already being there from a
/// previous, uncleanly terminated run.
fn create_fifo(path: &Path) -> Result<()> {
    match mkfifo(path, fifo_mode()) {
        Ok(()) | Err(Errno::EEXIST) => Ok(()),
        Err(e) => Err(e).with_context(|| format!("mkfifo {}", path.display())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let dir = runtime_dir();
    let syscall_path = dir.join(SYSCALL_FIFO_NAME);
    let comm_path = dir.join(COMM_CHANNEL_FIFO_NAME);

    info!("yamsd starting in {}", dir.display());

    'generations: loop {
        create_fifo(&syscall_path)?;
        create_fifo(&comm_path)?;

        info!("listening on {}", syscall_path.display());

        // Opening a FIFO for reading blocks until some writer opens the
        // other end; these two opens establish the "server is up" point
        // a client's own opens can rendezvous with.
        let mut syscall_fifo = File::open(&syscall_path)
            .await
            .with_context(|| format!("opening {}", syscall_path.display()))?;
        let mut comm_fifo = File::open(&comm_path)
            .await
            .with_context(|| format!("opening {}", comm_path.display()))?;

        if let Err(e) = wait_for_first_connect(&mut syscall_fifo).await {
            warn!("{e}; exiting");
            std::process::exit(-1);
        }

        let engine = Engine::new(LIST_SIZE);
        accept_connect(&engine, &mut syscall_fifo, &mut comm_fifo, &dir).await?;

        let mut shutting_down = false;

        while engine.connections().await > 0 {
            let code = read_int(&mut syscall_fifo).await?;
            let syscall = SysCall::from(code);

            if syscall == SysCall::Connect {
                accept_connect(&engine, &mut syscall_fifo, &mut comm_fifo, &dir).await?;
                continue;
            }

            let caller_pid = read_int(&mut syscall_fifo).await? as yams::LocalPid;
            if !engine.issue_lock_grant(caller_pid).await {
                warn!("syscall {code:o} from unknown local PID {caller_pid}, dropping");
                continue;
            }

            if dispatch(&engine, syscall, caller_pid, &mut comm_fifo).await? {
                shutting_down = true;
            }
        }

        drop(syscall_fifo);
        drop(comm_fifo);
        let _ = tokio::fs::remove_file(&syscall_path).await;
        let _ = tokio::fs::remove_file(&comm_path).await;

        if shutting_down {
            info!("yamsd shut down");
            break 'generations;
        }
        info!("all clients disconnected; relistening");
    }

    Ok(())
}
