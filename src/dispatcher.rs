//! The syscall dispatcher (`spec.md` §4.4) and blocking coordinator
//! (`spec.md` §4.5).
//!
//! [`Engine`] is the transport-agnostic daemon core: it knows nothing
//! about FIFOs, only about client PIDs, mailbox names, and the
//! `yams_proto::Response` values a handler produces. The caller (in this
//! workspace, `demos/yamsd`) is responsible for the actual wire
//! choreography: reading a syscall header, issuing the lock grant,
//! streaming comm-channel parameters, and calling the matching
//! `Engine` method once it has what that syscall needs.
//!
//! Every method here is written assuming a single logical caller drives
//! it: the one task that reads the syscall FIFO in order (`spec.md` §5,
//! "request headers are processed in the order they are read from the
//! syscall FIFO"). That is what makes the two-step CONNECT admission
//! below race-free without holding the lock across the FIFO-open
//! `.await` in between.

use log::{debug, info, warn};
use tokio::sync::{mpsc::UnboundedSender, Mutex};

use yams_proto::{Message, MessageType, Priority, Response, SenderFilter};

use crate::clients::{BlockingState, ClientTable, LocalPid};
use crate::registry::MailboxRegistry;

/// Where a `SEND` should be delivered, decided before its line stream is
/// read (`spec.md` §4.4, "SEND with fast-path").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendTarget {
    /// A client is already blocked in `RECV` with a matching filter;
    /// deliver directly to it and skip the queue entirely.
    FastPath(LocalPid),
    /// No waiting match; the message will be queued on the mailbox.
    Queued,
}

/// What happened as a result of a `SHUTDOWN` or `EXIT` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepartureOutcome {
    /// The caller was the last live client; the daemon itself is done.
    DaemonShutdown,
    /// The caller left; this many clients remain.
    ClientExited { remaining_connections: usize },
}

struct Inner {
    clients: ClientTable,
    registry: MailboxRegistry,
}

/// Shared daemon state plus the syscall handlers that mutate it.
///
/// `spec.md` §5: "a single mutex around both [tables] is sufficient".
/// This is exactly that mutex, wrapping both tables together so the
/// SEND fast-path scan (which touches the client table) and mailbox
/// registration (which touches the registry) happen atomically with
/// respect to any other handler.
pub struct Engine {
    inner: Mutex<Inner>,
}

impl Engine {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                clients: ClientTable::new(capacity),
                registry: MailboxRegistry::new(),
            }),
        }
    }

    pub async fn connections(&self) -> usize {
        self.inner.lock().await.clients.connections()
    }

    /// True if the client table has room for one more CONNECT at the
    /// current cursor position. Callers are expected to check this
    /// *before* doing anything else for a CONNECT request, not even
    /// reading its parameters, exactly mirroring the reference daemon's
    /// `if(clients[nextPID].PID == UNUSED)` check ahead of
    /// `connect_process`/`connect_fail`.
    pub async fn admission_check(&self) -> bool {
        let inner = self.inner.lock().await;
        let pid = inner.clients.next_pid_preview();
        !inner.clients.is_live(pid)
    }

    /// Admits a new client once its private FIFO is open and its
    /// `outbound` sender is ready. Only call this after a prior
    /// [`Engine::admission_check`] returned `true`; registers the
    /// mailbox, assigns the PID, advances the cursor, and sends the
    /// assigned PID back on the caller's own channel.
    pub async fn complete_connect(
        &self,
        host_pid: u32,
        mailbox_name: String,
        outbound: UnboundedSender<Response>,
    ) -> Result<LocalPid, crate::error::DaemonError> {
        let mut inner = self.inner.lock().await;
        inner.registry.register(&mailbox_name);
        let pid = inner.clients.connect(host_pid, mailbox_name, outbound)?;
        if let Some(record) = inner.clients.get(pid) {
            record.respond(Response::Int(pid as i32));
            info!(
                "client {pid} connected (host process {host_pid}, mailbox {}); {} clients total",
                record.mailbox_name,
                inner.clients.connections()
            );
        }
        Ok(pid)
    }

    /// `spec.md` §4.4's lock grant: echoes `pid` back on its own private
    /// channel so the client knows it holds exclusive write access to
    /// the comm-channel FIFO. Every non-CONNECT syscall goes through
    /// this before its handler runs. Returns `false` if `pid` is not
    /// (or no longer) live, which the caller should treat as a
    /// malformed or stale request and simply drop.
    pub async fn issue_lock_grant(&self, pid: LocalPid) -> bool {
        let inner = self.inner.lock().await;
        match inner.clients.get(pid) {
            Some(record) => {
                record.respond(Response::Int(pid as i32));
                true
            }
            None => false,
        }
    }

    pub async fn ping(&self, pid: LocalPid, code: i32) {
        let inner = self.inner.lock().await;
        if let Some(record) = inner.clients.get(pid) {
            record.respond(Response::Text(format!("Received PING with code {code}")));
        }
    }

    /// `spec.md` §4.4 EXIT: wakes any JOINers of `pid`, then frees its
    /// slot.
    pub async fn exit(&self, pid: LocalPid) -> DepartureOutcome {
        let mut inner = self.inner.lock().await;
        let remaining = depart(&mut inner, pid, "DISCONNECTING. Goodbye.");
        info!("client {pid} exited; {remaining} clients remaining");
        DepartureOutcome::ClientExited {
            remaining_connections: remaining,
        }
    }

    /// `spec.md` §4.4 SHUTDOWN: if `pid` is the last live client, the
    /// daemon itself is torn down; otherwise this behaves exactly like
    /// EXIT.
    pub async fn shutdown(&self, pid: LocalPid) -> DepartureOutcome {
        let mut inner = self.inner.lock().await;
        if inner.clients.connections() == 1 {
            if let Some(record) = inner.clients.get(pid) {
                record.respond(Response::Text("SHUTTING DOWN. Goodbye.".to_string()));
            }
            inner.clients.disconnect(pid);
            info!("client {pid} issued SHUTDOWN as the last connected client; daemon is tearing down");
            DepartureOutcome::DaemonShutdown
        } else {
            let remaining = depart(&mut inner, pid, "DISCONNECTING. Goodbye.");
            debug!("client {pid} issued SHUTDOWN with {remaining} other clients still connected; treated as EXIT");
            DepartureOutcome::ClientExited {
                remaining_connections: remaining,
            }
        }
    }

    pub async fn get_pid(&self, pid: LocalPid) {
        let inner = self.inner.lock().await;
        if let Some(record) = inner.clients.get(pid) {
            record.respond(Response::Int(pid as i32));
        }
    }

    pub async fn get_age(&self, pid: LocalPid) {
        let inner = self.inner.lock().await;
        if let Some(record) = inner.clients.get(pid) {
            record.respond(Response::Int(record.age_secs() as i32));
        }
    }

    /// `spec.md` §4.4 JOINPID: blocks the caller on `target`'s EXIT, or
    /// answers `-1` immediately if `target` is not live.
    pub async fn join_pid(&self, pid: LocalPid, target: LocalPid) {
        let mut inner = self.inner.lock().await;
        if inner.clients.is_live(target) {
            if let Some(record) = inner.clients.get_mut(pid) {
                record.blocking = BlockingState::JoinPid(target);
            }
            debug!("client {pid} blocked in JOINPID on client {target}");
        } else if let Some(record) = inner.clients.get(pid) {
            record.respond(Response::Int(-1));
            warn!("client {pid} JOINPID on never-live client {target}");
        }
    }

    /// `spec.md` §4.4 WAIT: blocks the caller on a matching SIGNAL from
    /// `target`, or answers `-1` immediately if `target` is not live.
    pub async fn wait(&self, pid: LocalPid, target: LocalPid) {
        let mut inner = self.inner.lock().await;
        if inner.clients.is_live(target) {
            if let Some(record) = inner.clients.get_mut(pid) {
                record.blocking = BlockingState::WaitPid(target);
            }
            debug!("client {pid} blocked in WAIT on client {target}");
        } else if let Some(record) = inner.clients.get(pid) {
            record.respond(Response::Int(-1));
            warn!("client {pid} WAIT on never-live client {target}");
        }
    }

    /// `spec.md` §4.4 SIGNAL: succeeds only if `target` is currently
    /// WAITing on `pid` specifically.
    pub async fn signal(&self, pid: LocalPid, target: LocalPid) {
        let mut inner = self.inner.lock().await;
        let target_is_waiting_on_us = inner
            .clients
            .get(target)
            .is_some_and(|t| t.blocking == BlockingState::WaitPid(pid));

        if target_is_waiting_on_us {
            if let Some(t) = inner.clients.get_mut(target) {
                t.blocking = BlockingState::Idle;
                t.respond(Response::Int(0));
            }
            if let Some(caller) = inner.clients.get(pid) {
                caller.respond(Response::Int(0));
            }
            debug!("client {pid} signalled client {target}, waking it from WAIT");
        } else if let Some(caller) = inner.clients.get(pid) {
            caller.respond(Response::Int(-1));
            debug!("client {pid} SIGNALed client {target}, which was not WAITing on it");
        }
    }

    /// `spec.md` §4.4 SEND, phase 1: decides whether a waiting RECV
    /// matches, sends the "Ready to receive" ack, and ensures the
    /// mailbox is registered for the queued path. Must run before the
    /// sender's line stream is read, and its result must be passed to
    /// [`Engine::finish_send`] once those lines are in hand.
    pub async fn begin_send(
        &self,
        sender_pid: LocalPid,
        mailbox: &str,
        priority: Priority,
        message_type: MessageType,
    ) -> SendTarget {
        let mut inner = self.inner.lock().await;

        let sender_mailbox = inner
            .clients
            .get(sender_pid)
            .map(|c| c.mailbox_name.clone())
            .unwrap_or_default();

        let target = inner.clients.iter().find_map(|(waiter_pid, waiter)| {
            if waiter.mailbox_name != mailbox {
                return None;
            }
            match &waiter.blocking {
                BlockingState::PendingRecv {
                    priority: p,
                    message_type: t,
                    sender: s,
                } if p.matches(priority) && t.matches(message_type) && s.matches(&sender_mailbox) => {
                    Some(waiter_pid)
                }
                _ => None,
            }
        });

        let send_target = match target {
            Some(waiter_pid) => {
                debug!(
                    "client {sender_pid} SEND to mailbox {mailbox} fast-pathed to waiting client {waiter_pid}"
                );
                SendTarget::FastPath(waiter_pid)
            }
            None => {
                inner.registry.register(mailbox);
                debug!("client {sender_pid} SEND to mailbox {mailbox} queued, no waiting RECV matched");
                SendTarget::Queued
            }
        };

        if let Some(record) = inner.clients.get(sender_pid) {
            record.respond(Response::Text(format!(
                "Ready to receive priority {priority}, type {message_type} message for mailbox {mailbox}"
            )));
        }

        send_target
    }

    /// `spec.md` §4.4 SEND, phase 2: delivers the now-fully-read message
    /// either straight to the waiting RECV or onto the mailbox's queue,
    /// and acknowledges the sender.
    pub async fn finish_send(
        &self,
        sender_pid: LocalPid,
        mailbox: &str,
        priority: Priority,
        message_type: MessageType,
        target: SendTarget,
        lines: Vec<String>,
    ) {
        let mut inner = self.inner.lock().await;

        let sender_mailbox = inner
            .clients
            .get(sender_pid)
            .map(|c| c.mailbox_name.clone())
            .unwrap_or_default();

        let num_lines = lines.len();
        let mut message = Message::new(priority, message_type, sender_mailbox);
        message.lines = lines;

        match target {
            SendTarget::FastPath(waiter_pid) => {
                if let Some(waiter) = inner.clients.get_mut(waiter_pid) {
                    waiter.blocking = BlockingState::Idle;
                    waiter.respond(Response::Message(message));
                }
            }
            SendTarget::Queued => {
                inner.registry.register(mailbox).queue.push_back(message);
            }
        }

        if let Some(record) = inner.clients.get(sender_pid) {
            record.respond(Response::Text(format!("Received {num_lines} message lines")));
        }
    }

    /// `spec.md` §4.4 CHECK.
    pub async fn check(
        &self,
        pid: LocalPid,
        priority: Priority,
        message_type: MessageType,
        sender: SenderFilter,
    ) {
        let mut inner = self.inner.lock().await;
        let Some(mailbox_name) = inner.clients.get(pid).map(|c| c.mailbox_name.clone()) else {
            return;
        };
        let count = inner
            .registry
            .register(&mailbox_name)
            .queue
            .count_matching(priority, message_type, &sender);

        if let Some(record) = inner.clients.get(pid) {
            record.respond(Response::Text(format!(
                "You have {count} messages of priority {priority} and type {message_type} from sender {}",
                sender.0
            )));
        }
    }

    /// `spec.md` §4.4 RECV: an immediate message block on a hit, or a
    /// recorded `pending_recv` filter (no response) on a miss.
    pub async fn recv(
        &self,
        pid: LocalPid,
        priority: Priority,
        message_type: MessageType,
        sender: SenderFilter,
    ) {
        let mut inner = self.inner.lock().await;
        let Some(mailbox_name) = inner.clients.get(pid).map(|c| c.mailbox_name.clone()) else {
            return;
        };

        let message = inner
            .registry
            .register(&mailbox_name)
            .queue
            .fetch_first_matching(priority, message_type, &sender);

        match message {
            Some(message) => {
                debug!("client {pid} RECV matched a queued message in mailbox {mailbox_name}");
                if let Some(record) = inner.clients.get(pid) {
                    record.respond(Response::Message(message));
                }
            }
            None => {
                debug!("client {pid} RECV found no match in mailbox {mailbox_name}; blocking");
                if let Some(record) = inner.clients.get_mut(pid) {
                    record.blocking = BlockingState::PendingRecv {
                        priority,
                        message_type,
                        sender,
                    };
                }
            }
        }
    }

    /// `spec.md` §4.4 CONFIGURE: every item gets its own ack string, none
    /// of them are actually persisted (`spec.md` §6, "Persisted state:
    /// None").
    pub async fn configure(&self, pid: LocalPid, items: &[String]) {
        let inner = self.inner.lock().await;
        let Some(record) = inner.clients.get(pid) else {
            return;
        };
        let mailbox_name = &record.mailbox_name;
        record.respond(Response::Text(format!(
            "Received CONFIGURE request for mailbox {mailbox_name} with {} configuration strings",
            items.len()
        )));
        for item in items {
            record.respond(Response::Text(format!("Configuring {item}")));
        }
    }

    /// `spec.md` §4.4, "Unknown codes are answered with an error string
    /// echoing the code".
    pub async fn unknown_syscall(&self, pid: LocalPid, code: i32) {
        let inner = self.inner.lock().await;
        if let Some(record) = inner.clients.get(pid) {
            record.respond(Response::Text(format!("Received unknown system call {code:o}")));
        }
        warn!("client {pid} sent unknown system call {code:o}");
    }
}

/// Shared tail of EXIT and SHUTDOWN-as-EXIT: wake every JOINer of `pid`,
/// then free its slot. Returns the client count after departure.
fn depart(inner: &mut Inner, pid: LocalPid, goodbye: &str) -> usize {
    if let Some(record) = inner.clients.get(pid) {
        record.respond(Response::Text(goodbye.to_string()));
    }
    inner.clients.disconnect(pid);

    for (other_pid, other) in inner.clients.iter_mut() {
        if other.blocking == BlockingState::JoinPid(pid) {
            other.blocking = BlockingState::Idle;
            other.respond(Response::Int(0));
            debug!("client {other_pid} woken from JOINPID by client {pid}'s departure");
        }
    }

    inner.clients.connections()
}
