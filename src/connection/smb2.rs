//! SMB2 connection core: transport, inbox, credit ledger and message-id
//! allocator, all guarded by one monitor.
//!
//! Correlation is by `(command, message id)`, so concurrent callers are
//! safe. A command consumes one credit on send; every response grants
//! the credits its header carries.

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use super::reader::MessageDispatcher;
use super::transport::Transport;
use crate::packets::smb2::{Smb2Command, Smb2Header, Smb2Message};
use crate::packets::status::Status;

/// How long a caller waits for a response or for credits.
pub const SMB2_RESPONSE_TIMEOUT: Duration = Duration::from_secs(60);
/// Re-check interval between signal waits.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

struct Core {
    messages: Vec<Smb2Message>,
    credits: u16,
    next_message_id: u64,
    connected: bool,
}

pub(crate) struct Smb2Connection {
    transport: Transport,
    core: Mutex<Core>,
    signal: Condvar,
    timeout: Duration,
}

impl Smb2Connection {
    pub fn new(transport: Transport, timeout: Duration) -> Self {
        Self {
            transport,
            core: Mutex::new(Core {
                messages: Vec::new(),
                credits: 1,
                next_message_id: 0,
                connected: true,
            }),
            signal: Condvar::new(),
            timeout,
        }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn is_connected(&self) -> bool {
        self.core.lock().expect("connection lock").connected
    }

    #[cfg(test)]
    pub fn available_credits(&self) -> u16 {
        self.core.lock().expect("connection lock").credits
    }

    /// Stamps the credit fields and a fresh message id onto `message`
    /// and sends it, returning the message id. Blocks until a credit is
    /// available; a credit starvation beyond the timeout is an error.
    pub fn send(&self, message: &mut Smb2Message) -> crate::Result<u64> {
        let message_id = self.allocate(message.header.credit_charge.max(1))?;
        message.header.message_id = message_id;
        message.header.credit_charge = 1;
        message.header.credits = 1;

        let bytes = message.encode()?;
        log::trace!(
            "Sending SMB2 {} #{message_id} ({} bytes)",
            message.header.command,
            bytes.len()
        );
        // Transport failures are swallowed; the caller observes them as
        // a wait timeout.
        self.transport.send_message(&bytes);
        Ok(message_id)
    }

    /// Consumes `charge` credits and allocates the next message id.
    fn allocate(&self, charge: u16) -> crate::Result<u64> {
        let deadline = Instant::now() + self.timeout;
        let mut core = self.core.lock().expect("connection lock");
        loop {
            if !core.connected {
                return Err(crate::Error::NotConnected);
            }
            if core.credits >= charge {
                core.credits -= charge;
                let id = core.next_message_id;
                core.next_message_id += 1;
                return Ok(id);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(crate::Error::TimedOut("credits"));
            }
            let (guard, _) = self
                .signal
                .wait_timeout(core, remaining.min(POLL_INTERVAL))
                .expect("connection lock");
            core = guard;
        }
    }

    /// Blocks until the response correlated by `(command, message_id)`
    /// arrives, removing it from the inbox. A matched interim
    /// `STATUS_PENDING` response is removed and the wait abandoned with
    /// `Ok(None)`; a timeout is also `Ok(None)`.
    pub fn wait_for(
        &self,
        command: Smb2Command,
        message_id: u64,
    ) -> crate::Result<Option<Smb2Message>> {
        let deadline = Instant::now() + self.timeout;
        let mut core = self.core.lock().expect("connection lock");
        loop {
            if let Some(index) = core
                .messages
                .iter()
                .position(|m| m.header.command == command && m.header.message_id == message_id)
            {
                let message = core.messages.remove(index);
                if message.status() == Status::Pending {
                    log::debug!("Interim pending response for {command} #{message_id}");
                    return Ok(None);
                }
                return Ok(Some(message));
            }
            if !core.connected {
                return Err(crate::Error::NotConnected);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                log::warn!("Timed out waiting for SMB2 {command} #{message_id}");
                return Ok(None);
            }
            let (guard, _) = self
                .signal
                .wait_timeout(core, remaining.min(POLL_INTERVAL))
                .expect("connection lock");
            core = guard;
        }
    }

    pub fn shutdown(&self) {
        self.transport.shutdown();
    }
}

impl MessageDispatcher for Smb2Connection {
    fn dispatch(&self, payload: &[u8]) -> crate::Result<()> {
        let message = Smb2Message::decode(payload)?;
        let header = &message.header;

        if header.message_id == Smb2Header::UNSOLICITED_MESSAGE_ID
            && header.command != Smb2Command::OplockBreak
        {
            log::debug!("Dropping unsolicited SMB2 {}", header.command);
            return Ok(());
        }

        log::trace!(
            "Received SMB2 {} #{} status {} (+{} credits)",
            header.command,
            header.message_id,
            message.status(),
            header.credits
        );
        let mut core = self.core.lock().expect("connection lock");
        core.credits = core.credits.saturating_add(header.credits);
        core.messages.push(message);
        drop(core);
        self.signal.notify_all();
        Ok(())
    }

    fn connection_lost(&self) {
        let mut core = self.core.lock().expect("connection lock");
        core.connected = false;
        drop(core);
        self.signal.notify_all();
        log::info!("SMB2 connection closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::reader::MessageDispatcher;
    use crate::connection::transport::TransportMode;
    use crate::connection::Transport;
    use crate::packets::smb2::*;
    use std::net::TcpListener;

    /// A connection whose peer is a loopback socket nobody answers on.
    fn silent_connection(timeout: Duration) -> (Smb2Connection, TcpListener) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let transport = Transport::connect_to(
            listener.local_addr().unwrap(),
            TransportMode::DirectTcp,
            "TESTBOX",
        )
        .unwrap();
        (Smb2Connection::new(transport, timeout), listener)
    }

    fn response(command: Smb2Command, message_id: u64, status: Status, credits: u16) -> Vec<u8> {
        let mut header = Smb2Header::new(command);
        header.flags.set_server_to_redir(true);
        header.message_id = message_id;
        header.status = status.as_u32();
        header.credits = credits;
        Smb2Message::new(header, Smb2Content::ErrorResponse(Smb2ErrorResponse::empty()))
            .encode()
            .unwrap()
    }

    fn echo_request(connection: &Smb2Connection) -> u64 {
        let mut message = Smb2Message::new(
            Smb2Header::new(Smb2Command::Logoff),
            Smb2Content::LogoffRequest(Smb2LogoffRequest::default()),
        );
        connection.send(&mut message).unwrap()
    }

    #[test]
    fn test_credit_ledger_conservation() {
        let (connection, _listener) = silent_connection(Duration::from_millis(300));
        assert_eq!(connection.available_credits(), 1);

        // One command consumes the only credit.
        let id0 = echo_request(&connection);
        assert_eq!(id0, 0);
        assert_eq!(connection.available_credits(), 0);

        // Granting two credits lets two more commands through.
        connection
            .dispatch(&response(Smb2Command::Logoff, id0, Status::Success, 2))
            .unwrap();
        assert_eq!(connection.available_credits(), 2);
        let id1 = echo_request(&connection);
        let id2 = echo_request(&connection);
        assert_eq!((id1, id2), (1, 2));
        assert_eq!(connection.available_credits(), 0);

        // Starved of credits, a send times out rather than going
        // negative.
        let mut message = Smb2Message::new(
            Smb2Header::new(Smb2Command::Logoff),
            Smb2Content::LogoffRequest(Smb2LogoffRequest::default()),
        );
        assert!(matches!(
            connection.send(&mut message),
            Err(crate::Error::TimedOut(_))
        ));
        assert_eq!(connection.available_credits(), 0);
    }

    #[test]
    fn test_message_ids_are_monotonic() {
        let (connection, _listener) = silent_connection(Duration::from_secs(5));
        let mut last = None;
        for _ in 0..5 {
            let id = echo_request(&connection);
            if let Some(prev) = last {
                assert!(id > prev);
            }
            last = Some(id);
            connection
                .dispatch(&response(Smb2Command::Logoff, id, Status::Success, 1))
                .unwrap();
            connection
                .wait_for(Smb2Command::Logoff, id)
                .unwrap()
                .unwrap();
        }
    }

    #[test]
    fn test_matched_message_is_removed_exactly_once() {
        let (connection, _listener) = silent_connection(Duration::from_millis(200));
        let id = echo_request(&connection);
        connection
            .dispatch(&response(Smb2Command::Logoff, id, Status::Success, 1))
            .unwrap();
        assert!(connection.wait_for(Smb2Command::Logoff, id).unwrap().is_some());
        // Gone: a second wait times out.
        assert!(connection.wait_for(Smb2Command::Logoff, id).unwrap().is_none());
    }

    #[test]
    fn test_pending_response_yields_none_and_grants_credits() {
        let (connection, _listener) = silent_connection(Duration::from_millis(200));
        let id = echo_request(&connection);
        connection
            .dispatch(&response(Smb2Command::Logoff, id, Status::Pending, 3))
            .unwrap();
        // The interim response is consumed and the wait abandoned.
        assert!(connection.wait_for(Smb2Command::Logoff, id).unwrap().is_none());
        assert_eq!(connection.available_credits(), 3);
    }

    #[test]
    fn test_unsolicited_messages_are_filtered() {
        let (connection, _listener) = silent_connection(Duration::from_millis(200));
        let id = echo_request(&connection);

        // Unsolicited non-oplock-break: dropped.
        connection
            .dispatch(&response(
                Smb2Command::Echo,
                Smb2Header::UNSOLICITED_MESSAGE_ID,
                Status::Success,
                0,
            ))
            .unwrap();
        assert!(connection
            .wait_for(Smb2Command::Echo, Smb2Header::UNSOLICITED_MESSAGE_ID)
            .unwrap()
            .is_none());

        // Unsolicited oplock break: admitted.
        let mut header = Smb2Header::new(Smb2Command::OplockBreak);
        header.flags.set_server_to_redir(true);
        header.message_id = Smb2Header::UNSOLICITED_MESSAGE_ID;
        let notification = Smb2Message::new(
            header,
            Smb2Content::OplockBreakNotification(Smb2OplockBreakNotification {
                oplock_level: 0,
                file_id: FileId {
                    persistent: 1,
                    volatile: 2,
                },
            }),
        )
        .encode()
        .unwrap();
        connection.dispatch(&notification).unwrap();
        assert!(connection
            .wait_for(Smb2Command::OplockBreak, Smb2Header::UNSOLICITED_MESSAGE_ID)
            .unwrap()
            .is_some());
        let _ = id;
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        let (connection, _listener) = silent_connection(Duration::from_millis(200));
        assert!(connection.dispatch(&[0xFF, 0x53, 0x4D, 0x42, 0x00]).is_err());
    }
}
