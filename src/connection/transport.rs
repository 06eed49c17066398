//! The framed TCP transport: Direct TCP on port 445, or
//! NetBIOS-over-TCP on port 139 with the session-request handshake.

use std::io::{Cursor, Read, Write};
use std::net::{IpAddr, Shutdown, SocketAddr, TcpStream};
use std::sync::Mutex;

use binrw::{BinRead, BinWrite};

use crate::packets::netbios::*;
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    NetBios,
    DirectTcp,
}

impl TransportMode {
    pub fn default_port(&self) -> u16 {
        match self {
            TransportMode::NetBios => 139,
            TransportMode::DirectTcp => 445,
        }
    }
}

/// A connected, framed SMB transport. Sends are serialized behind a
/// mutex; the read half is cloned out once for the background reader.
pub struct Transport {
    stream: Mutex<TcpStream>,
    peer: SocketAddr,
}

impl Transport {
    /// Connects, and on NetBIOS performs the session-request handshake
    /// before any SMB traffic.
    pub fn connect(server: IpAddr, mode: TransportMode, machine_name: &str) -> crate::Result<Self> {
        Self::connect_to(SocketAddr::new(server, mode.default_port()), mode, machine_name)
    }

    /// [`Transport::connect`] with an explicit port. Tests use this to
    /// reach loopback servers on ephemeral ports.
    pub fn connect_to(
        peer: SocketAddr,
        mode: TransportMode,
        machine_name: &str,
    ) -> crate::Result<Self> {
        log::debug!("Connecting to {peer} ({mode:?})");
        let mut stream = TcpStream::connect(peer)?;
        stream.set_nodelay(true)?;

        if mode == TransportMode::NetBios {
            netbios_session_setup(&mut stream, machine_name)?;
        }

        log::info!("Connected to {peer}");
        Ok(Self {
            stream: Mutex::new(stream),
            peer,
        })
    }

    pub fn peer_ip(&self) -> IpAddr {
        self.peer.ip()
    }

    /// Clones the read half for the background reader thread.
    pub fn reader_stream(&self) -> crate::Result<TcpStream> {
        Ok(self.stream.lock().expect("transport lock").try_clone()?)
    }

    /// Frames `payload` as a session message and sends it. Send failures
    /// are swallowed: the caller observes them as a response timeout.
    pub fn send_message(&self, payload: &[u8]) {
        if let Err(e) = self.try_send(payload) {
            log::warn!("Send of {} bytes failed: {e}", payload.len());
        }
    }

    fn try_send(&self, payload: &[u8]) -> crate::Result<()> {
        let header = SessionPacketHeader::new(
            SessionPacketType::SessionMessage,
            payload.len() as u32,
        )?;
        let mut frame = Cursor::new(Vec::with_capacity(SessionPacketHeader::SIZE + payload.len()));
        header.write(&mut frame)?;
        frame.get_mut().extend_from_slice(payload);

        let stream = self.stream.lock().expect("transport lock");
        (&*stream).write_all(frame.get_ref())?;
        Ok(())
    }

    /// Tears the socket down, releasing the reader and all waiters.
    pub fn shutdown(&self) {
        let stream = self.stream.lock().expect("transport lock");
        stream.shutdown(Shutdown::Both).ok();
    }
}

fn netbios_session_setup(stream: &mut TcpStream, machine_name: &str) -> crate::Result<()> {
    log::debug!("Performing NetBIOS session setup");
    let request = SessionRequest {
        called_name: NetBiosName::new("*SMBSERVER".to_string(), FILE_SERVER_SERVICE),
        calling_name: NetBiosName::new(machine_name.to_string(), WORKSTATION_SERVICE),
    };
    let mut trailer = Cursor::new(Vec::new());
    request.write(&mut trailer)?;
    let trailer = trailer.into_inner();

    let mut frame = Cursor::new(Vec::new());
    SessionPacketHeader::new(SessionPacketType::SessionRequest, trailer.len() as u32)?
        .write(&mut frame)?;
    frame.get_mut().extend_from_slice(&trailer);
    stream.write_all(frame.get_ref())?;

    let mut header_bytes = [0u8; SessionPacketHeader::SIZE];
    stream.read_exact(&mut header_bytes)?;
    let header = SessionPacketHeader::read(&mut Cursor::new(&header_bytes))?;
    let mut response_trailer = vec![0u8; header.trailer_length() as usize];
    stream.read_exact(&mut response_trailer)?;

    match header.packet_type {
        SessionPacketType::PositiveSessionResponse => {
            log::debug!("NetBIOS session established");
            Ok(())
        }
        SessionPacketType::NegativeSessionResponse => {
            let response =
                NegativeSessionResponse::read(&mut Cursor::new(&response_trailer))?;
            stream.shutdown(Shutdown::Both).ok();
            Err(Error::InvalidMessage(format!(
                "NetBIOS session refused: {:?}",
                response.error_code
            )))
        }
        other => {
            stream.shutdown(Shutdown::Both).ok();
            Err(Error::InvalidMessage(format!(
                "unexpected NetBIOS session response: {other:?}"
            )))
        }
    }
}
