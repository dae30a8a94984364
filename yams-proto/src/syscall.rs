//! System call codes (`spec.md` §4.4).
//!
//! Codes are octal in the reference implementation and in every trace
//! message the daemon logs, so the numeric values below are written as
//! Rust octal literals to keep them recognizable against `spec.md` and
//! `original_source/yams_headers.h`.

/// A system call code read from the syscall FIFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SysCall {
    Connect,
    Ping,
    Exit,
    Shutdown,
    GetPid,
    GetAge,
    JoinPid,
    Wait,
    Signal,
    Send,
    Check,
    Recv,
    Configure,
    /// A code outside the protocol's assigned range. Still carries the
    /// raw value so the daemon can echo it back in an error string
    /// without disconnecting the caller (`spec.md` §4.4, "Unknown codes").
    Unknown(i32),
}

impl SysCall {
    /// True for every code other than `CONNECT`: these callers must
    /// follow their syscall code with their local PID before the
    /// dispatcher grants them the comm-channel lock (`spec.md` §4.4).
    pub fn requires_caller_pid(self) -> bool {
        !matches!(self, SysCall::Connect)
    }
}

impl From<i32> for SysCall {
    fn from(code: i32) -> Self {
        match code {
            0o000 => SysCall::Connect,
            0o001 => SysCall::Ping,
            0o006 => SysCall::Exit,
            0o007 => SysCall::Shutdown,
            0o010 => SysCall::GetPid,
            0o011 => SysCall::GetAge,
            0o012 => SysCall::JoinPid,
            0o013 => SysCall::Wait,
            0o014 => SysCall::Signal,
            0o020 => SysCall::Send,
            0o021 => SysCall::Check,
            0o022 => SysCall::Recv,
            0o023 => SysCall::Configure,
            other => SysCall::Unknown(other),
        }
    }
}

impl From<SysCall> for i32 {
    fn from(call: SysCall) -> Self {
        match call {
            SysCall::Connect => 0o000,
            SysCall::Ping => 0o001,
            SysCall::Exit => 0o006,
            SysCall::Shutdown => 0o007,
            SysCall::GetPid => 0o010,
            SysCall::GetAge => 0o011,
            SysCall::JoinPid => 0o012,
            SysCall::Wait => 0o013,
            SysCall::Signal => 0o014,
            SysCall::Send => 0o020,
            SysCall::Check => 0o021,
            SysCall::Recv => 0o022,
            SysCall::Configure => 0o023,
            SysCall::Unknown(code) => code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_known_codes() {
        for call in [
            SysCall::Connect,
            SysCall::Ping,
            SysCall::Exit,
            SysCall::Shutdown,
            SysCall::GetPid,
            SysCall::GetAge,
            SysCall::JoinPid,
            SysCall::Wait,
            SysCall::Signal,
            SysCall::Send,
            SysCall::Check,
            SysCall::Recv,
            SysCall::Configure,
        ] {
            let code: i32 = call.into();
            assert_eq!(SysCall::from(code), call);
        }
    }

    #[test]
    fn unknown_code_is_preserved() {
        assert_eq!(SysCall::from(0o777), SysCall::Unknown(0o777));
        assert_eq!(i32::from(SysCall::Unknown(0o777)), 0o777);
    }

    #[test]
    fn only_connect_skips_the_caller_pid() {
        assert!(!SysCall::Connect.requires_caller_pid());
        assert!(SysCall::Ping.requires_caller_pid());
        assert!(SysCall::Recv.requires_caller_pid());
    }
}
