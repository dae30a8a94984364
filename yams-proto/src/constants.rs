//! Protocol-wide constants, taken verbatim from `spec.md` §6.

/// Number of client-table slots and mailbox-registry buckets.
pub const LIST_SIZE: usize = 64;

/// Maximum wire length of a string payload, terminator included.
pub const STRING_SIZE: usize = 121;

/// Maximum wire length of a short, pre-formatted status string
/// (priority/type names in the reference client's console output).
pub const SHORT_STRING: usize = 16;

/// Maximum number of non-CONNECT requests the daemon will read before the
/// first CONNECT arrives. Exceeding this terminates the daemon (exit -1).
pub const MAX_BAD_REQUESTS_BEFORE_CONNECT: u32 = 10;

/// Name of the FIFO through which clients submit syscall headers.
pub const SYSCALL_FIFO_NAME: &str = "YAMSD_syscall_fifo";

/// Name of the FIFO through which clients stream syscall parameters.
pub const COMM_CHANNEL_FIFO_NAME: &str = "YAMSD_comm_channel_fifo";

/// Builds the name of a per-client FIFO from the client's host OS PID.
pub fn client_fifo_name(host_pid: u32) -> String {
    format!("YAMS_{host_pid}_fifo")
}

/// Unix file mode the daemon creates every FIFO with.
pub const FIFO_MODE: u32 = 0o666;
