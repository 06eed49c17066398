//! The background reader: one thread per connection, feeding the
//! receive buffer and dispatching complete session packets.

use std::io::Read;
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::thread::JoinHandle;

use super::buffer::ReceiveBuffer;
use crate::packets::netbios::SessionPacketType;

/// Dialect-specific half of the dispatcher: decodes a session-message
/// body and routes it to the inbox.
pub(crate) trait MessageDispatcher: Send + Sync + 'static {
    /// Handles one SMB message body. An `Err` is a fatal decode failure.
    fn dispatch(&self, payload: &[u8]) -> crate::Result<()>;

    /// Called exactly once, when the socket dies or a fatal protocol
    /// error closes it. Releases every blocked waiter.
    fn connection_lost(&self);
}

pub(crate) fn spawn_receive_loop<D: MessageDispatcher>(
    stream: TcpStream,
    dispatcher: Arc<D>,
) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name("smb-receiver".to_string())
        .spawn(move || {
            receive_loop(stream, &*dispatcher);
            dispatcher.connection_lost();
        })
        .expect("spawning the receiver thread")
}

fn receive_loop<D: MessageDispatcher>(mut stream: TcpStream, dispatcher: &D) {
    let mut buffer = ReceiveBuffer::new();
    let mut chunk = [0u8; 16384];
    loop {
        let n = match stream.read(&mut chunk) {
            Ok(0) => {
                log::debug!("Peer closed the connection");
                return;
            }
            Ok(n) => n,
            Err(e) => {
                log::debug!("Socket read failed: {e}");
                return;
            }
        };
        buffer.append(&chunk[..n]);

        loop {
            match buffer.dequeue_packet() {
                Ok(None) => break,
                Ok(Some((packet_type, payload))) => {
                    if let Err(e) = handle_packet(packet_type, &payload, dispatcher) {
                        log::error!("Fatal protocol error, closing connection: {e}");
                        stream.shutdown(Shutdown::Both).ok();
                        return;
                    }
                }
                Err(e) => {
                    log::error!("Malformed session packet, closing connection: {e}");
                    stream.shutdown(Shutdown::Both).ok();
                    return;
                }
            }
        }
    }
}

fn handle_packet<D: MessageDispatcher>(
    packet_type: SessionPacketType,
    payload: &[u8],
    dispatcher: &D,
) -> crate::Result<()> {
    match packet_type {
        SessionPacketType::SessionMessage => dispatcher.dispatch(payload),
        SessionPacketType::SessionKeepAlive
        | SessionPacketType::PositiveSessionResponse => Ok(()),
        SessionPacketType::NegativeSessionResponse
        | SessionPacketType::SessionRetargetResponse
        | SessionPacketType::SessionRequest => Err(crate::Error::InvalidMessage(format!(
            "unexpected session packet mid-stream: {packet_type:?}"
        ))),
    }
}
