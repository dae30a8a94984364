use std::env;
use std::path::PathBuf;

use anyhow::{Context, Error};
use nix::errno::Errno;
use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use tokio::fs::{File, OpenOptions};

use yams_proto::constants::{
    client_fifo_name, COMM_CHANNEL_FIFO_NAME, FIFO_MODE, STRING_SIZE, SYSCALL_FIFO_NAME,
};
use yams_proto::wire::{read_int, read_string, write_int, write_string};
use yams_proto::{MessageType, Priority, SysCall};

// Poor human's terminal color support.
const BLUE: &str = "\x1b[34m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

fn runtime_dir() -> PathBuf {
    env::var_os("YAMSD_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn create_fifo(path: &std::path::Path) -> Result<(), Error> {
    let mode = Mode::from_bits_truncate(FIFO_MODE);
    match mkfifo(path, mode) {
        Ok(()) | Err(Errno::EEXIST) => Ok(()),
        Err(e) => Err(e).with_context(|| format!("mkfifo {}", path.display())),
    }
}

/// Writes a non-CONNECT syscall header and waits for the lock grant.
async fn call(
    syscall: &mut File,
    private: &mut File,
    code: SysCall,
    pid: i32,
) -> Result<(), Error> {
    write_int(syscall, code.into()).await?;
    write_int(syscall, pid).await?;
    let grant = read_int(private).await?;
    anyhow::ensure!(grant == pid, "expected lock grant {pid}, got {grant}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let mailbox = env::args().nth(1).unwrap_or_else(|| "alice".to_string());
    let dir = runtime_dir();
    let host_pid = std::process::id();

    let private_path = dir.join(client_fifo_name(host_pid));
    create_fifo(&private_path)?;

    let mut syscall = OpenOptions::new()
        .write(true)
        .open(dir.join(SYSCALL_FIFO_NAME))
        .await
        .context("opening syscall FIFO")?;
    let mut comm = OpenOptions::new()
        .write(true)
        .open(dir.join(COMM_CHANNEL_FIFO_NAME))
        .await
        .context("opening comm-channel FIFO")?;

    write_int(&mut syscall, SysCall::Connect.into()).await?;
    write_int(&mut syscall, host_pid as i32).await?;
    write_string(&mut comm, &mailbox).await?;

    let mut private = File::open(&private_path)
        .await
        .context("opening private FIFO")?;
    let pid = read_int(&mut private).await?;
    println!("{BLUE}S: assigned local PID {pid}{RESET}");

    call(&mut syscall, &mut private, SysCall::Ping, pid).await?;
    write_int(&mut comm, 7).await?;
    let ack = read_string(&mut private, STRING_SIZE).await?;
    println!("{BLUE}S: {ack}{RESET}");

    println!("{RED}C: SEND {mailbox} priority=NORMAL type=INFO [\"hello\", \"world\"]{RESET}");
    call(&mut syscall, &mut private, SysCall::Send, pid).await?;
    write_string(&mut comm, &mailbox).await?;
    write_int(&mut comm, Priority::NORMAL.0).await?;
    write_int(&mut comm, MessageType::INFO.0).await?;
    let ready = read_string(&mut private, STRING_SIZE).await?;
    println!("{BLUE}S: {ready}{RESET}");
    for line in ["hello", "world"] {
        write_string(&mut comm, line).await?;
    }
    write_string(&mut comm, "").await?;
    let sent = read_string(&mut private, STRING_SIZE).await?;
    println!("{BLUE}S: {sent}{RESET}");

    println!("{RED}C: RECV priority=ALL type=ALL sender=*{RESET}");
    call(&mut syscall, &mut private, SysCall::Recv, pid).await?;
    write_int(&mut comm, Priority::ALL.0).await?;
    write_int(&mut comm, MessageType::ALL.0).await?;
    write_string(&mut comm, "*").await?;
    let priority = read_int(&mut private).await?;
    let message_type = read_int(&mut private).await?;
    let sender = read_string(&mut private, STRING_SIZE).await?;
    let num_lines = read_int(&mut private).await?;
    println!("{BLUE}S: message priority={priority} type={message_type} sender={sender} lines={num_lines}{RESET}");
    for _ in 0..num_lines {
        let line = read_string(&mut private, STRING_SIZE).await?;
        println!("{BLUE}S: > {line}{RESET}");
    }

    call(&mut syscall, &mut private, SysCall::Exit, pid).await?;
    let goodbye = read_string(&mut private, STRING_SIZE).await?;
    println!("{BLUE}S: {goodbye}{RESET}");

    let _ = tokio::fs::remove_file(&private_path).await;
    Ok(())
}
