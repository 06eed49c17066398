//! SMB1 connection core: transport + inbox monitor.
//!
//! SMB1 correlation is by command code only — callers are strictly
//! serialised per connection — so requests always go out with
//! `PID = 0, MID = 0`, and those are the response values admitted back.

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use super::reader::MessageDispatcher;
use super::transport::Transport;
use crate::packets::smb1::{Smb1Command, Smb1Header, Smb1Message};

/// How long a caller waits for a response.
pub const SMB1_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);
/// Re-check interval between signal waits.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

struct Inbox {
    messages: Vec<Smb1Message>,
    connected: bool,
}

pub(crate) struct Smb1Connection {
    transport: Transport,
    inbox: Mutex<Inbox>,
    signal: Condvar,
}

impl Smb1Connection {
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            inbox: Mutex::new(Inbox {
                messages: Vec::new(),
                connected: true,
            }),
            signal: Condvar::new(),
        }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn is_connected(&self) -> bool {
        self.inbox.lock().expect("inbox lock").connected
    }

    /// Sends a message. Transport failures are swallowed; the caller
    /// observes them as a wait timeout.
    pub fn send(&self, message: &Smb1Message) -> crate::Result<()> {
        let bytes = message.encode()?;
        log::trace!(
            "Sending SMB1 {} ({} bytes)",
            message.header.command,
            bytes.len()
        );
        self.transport.send_message(&bytes);
        Ok(())
    }

    /// Blocks until a response to `command` arrives, removing it from
    /// the inbox. `Ok(None)` is a timeout; `Err(NotConnected)` means the
    /// connection died while waiting.
    pub fn wait_for(
        &self,
        command: Smb1Command,
        timeout: Duration,
    ) -> crate::Result<Option<Smb1Message>> {
        let deadline = Instant::now() + timeout;
        let mut inbox = self.inbox.lock().expect("inbox lock");
        loop {
            if let Some(index) = inbox
                .messages
                .iter()
                .position(|m| m.header.command == command)
            {
                return Ok(Some(inbox.messages.remove(index)));
            }
            if !inbox.connected {
                return Err(crate::Error::NotConnected);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                log::warn!("Timed out waiting for SMB1 {command}");
                return Ok(None);
            }
            let (guard, _) = self
                .signal
                .wait_timeout(inbox, remaining.min(POLL_INTERVAL))
                .expect("inbox lock");
            inbox = guard;
        }
    }

    pub fn shutdown(&self) {
        self.transport.shutdown();
    }
}

impl MessageDispatcher for Smb1Connection {
    fn dispatch(&self, payload: &[u8]) -> crate::Result<()> {
        let message = Smb1Message::decode(payload)?;
        let header = &message.header;

        let oplock_break = header.mid == Smb1Header::OPLOCK_BREAK_MID
            && header.command == Smb1Command::LockingAndX;
        let solicited = header.pid_high == 0 && header.pid_low == 0 && header.mid == 0;
        if !oplock_break && !solicited {
            log::debug!(
                "Dropping unsolicited SMB1 {} (PID {:#x}/{:#x}, MID {:#x})",
                header.command,
                header.pid_high,
                header.pid_low,
                header.mid
            );
            return Ok(());
        }

        log::trace!("Received SMB1 {} status {}", header.command, message.status());
        let mut inbox = self.inbox.lock().expect("inbox lock");
        inbox.messages.push(message);
        drop(inbox);
        self.signal.notify_all();
        Ok(())
    }

    fn connection_lost(&self) {
        let mut inbox = self.inbox.lock().expect("inbox lock");
        inbox.connected = false;
        drop(inbox);
        self.signal.notify_all();
        log::info!("SMB1 connection closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::reader::MessageDispatcher;
    use crate::connection::transport::TransportMode;
    use crate::packets::smb1::*;
    use std::net::TcpListener;

    fn connection() -> (Smb1Connection, TcpListener) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let transport = Transport::connect_to(
            listener.local_addr().unwrap(),
            TransportMode::DirectTcp,
            "TESTBOX",
        )
        .unwrap();
        (Smb1Connection::new(transport), listener)
    }

    fn response(command: Smb1Command, pid: u16, mid: u16) -> Vec<u8> {
        let mut header = Smb1Header::new(command);
        header.flags.set_reply(true);
        header.pid_low = pid;
        header.mid = mid;
        Smb1Message::new(
            header,
            Smb1Content::Raw(Smb1RawContent {
                word_count: 0,
                words: vec![],
                bytes: vec![],
            }),
        )
        .encode()
        .unwrap()
    }

    #[test]
    fn test_admission_rules() {
        let (connection, _listener) = connection();

        // A response stamped PID 0 / MID 0 is admitted.
        connection.dispatch(&response(Smb1Command::Echo, 0, 0)).unwrap();
        assert!(connection
            .wait_for(Smb1Command::Echo, Duration::from_millis(100))
            .unwrap()
            .is_some());

        // Another caller's MID is dropped.
        connection.dispatch(&response(Smb1Command::Echo, 0, 7)).unwrap();
        assert!(connection
            .wait_for(Smb1Command::Echo, Duration::from_millis(100))
            .unwrap()
            .is_none());

        // An oplock break travels as LockingAndX with MID 0xFFFF.
        connection
            .dispatch(&response(
                Smb1Command::LockingAndX,
                0,
                Smb1Header::OPLOCK_BREAK_MID,
            ))
            .unwrap();
        assert!(connection
            .wait_for(Smb1Command::LockingAndX, Duration::from_millis(100))
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_wait_matches_by_command() {
        let (connection, _listener) = connection();
        connection
            .dispatch(&response(Smb1Command::TreeConnectAndX, 0, 0))
            .unwrap();
        connection.dispatch(&response(Smb1Command::Close, 0, 0)).unwrap();

        let close = connection
            .wait_for(Smb1Command::Close, Duration::from_millis(100))
            .unwrap()
            .unwrap();
        assert_eq!(close.header.command, Smb1Command::Close);
        let tree = connection
            .wait_for(Smb1Command::TreeConnectAndX, Duration::from_millis(100))
            .unwrap()
            .unwrap();
        assert_eq!(tree.header.command, Smb1Command::TreeConnectAndX);
    }

    #[test]
    fn test_lost_connection_releases_waiters() {
        let (connection, _listener) = connection();
        connection.connection_lost();
        assert!(matches!(
            connection.wait_for(Smb1Command::Echo, Duration::from_secs(5)),
            Err(crate::Error::NotConnected)
        ));
    }
}
