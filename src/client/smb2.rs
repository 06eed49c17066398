//! The SMB2 client: dialect 2.0.2 / 2.1 negotiation, SPNEGO/NTLM
//! session setup, tree connects with credit-managed messaging.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use super::{AuthMethod, Client, ClientConfig};
use crate::auth::{NtlmContext, NtlmCredentials};
use crate::connection::reader::spawn_receive_loop;
use crate::connection::smb2::Smb2Connection;
use crate::connection::{Transport, TransportMode};
use crate::filestore::{FileStore, Smb2FileStore};
use crate::packets::guid::Guid;
use crate::packets::smb2::*;
use crate::packets::status::Status;
use crate::Error;

/// Transaction/read/write sizes are clamped to this, whatever the
/// server offers.
const MAX_IO_SIZE: u32 = 65536;

struct NegotiatedSmb2 {
    dialect: Smb2Dialect,
    signing_required: bool,
    max_transact_size: u32,
    max_read_size: u32,
    max_write_size: u32,
    security_blob: Vec<u8>,
}

pub struct Smb2Client {
    config: ClientConfig,
    connection: Option<Arc<Smb2Connection>>,
    server: Option<IpAddr>,
    negotiated: Option<NegotiatedSmb2>,
    session_id: u64,
    logged_in: bool,
    session_key: Option<[u8; 16]>,
}

impl Smb2Client {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            connection: None,
            server: None,
            negotiated: None,
            session_id: 0,
            logged_in: false,
            session_key: None,
        }
    }

    pub fn session_key(&self) -> Option<&[u8; 16]> {
        self.session_key.as_ref()
    }

    pub fn dialect(&self) -> Option<Smb2Dialect> {
        self.negotiated.as_ref().map(|n| n.dialect)
    }

    pub fn signing_required(&self) -> Option<bool> {
        self.negotiated.as_ref().map(|n| n.signing_required)
    }

    /// [`Client::connect`] with an explicit port.
    pub fn connect_endpoint(
        &mut self,
        endpoint: SocketAddr,
        mode: TransportMode,
    ) -> crate::Result<()> {
        if self.connection.is_some() {
            return Err(Error::InvalidState("client is already connected".into()));
        }
        let transport = Transport::connect_to(endpoint, mode, &self.config.machine_name)?;
        let reader_stream = transport.reader_stream()?;
        let connection = Arc::new(Smb2Connection::new(
            transport,
            self.config.response_timeout,
        ));
        spawn_receive_loop(reader_stream, connection.clone());

        self.server = Some(endpoint.ip());
        self.connection = Some(connection);
        if let Err(e) = self.negotiate() {
            self.disconnect();
            return Err(e);
        }
        Ok(())
    }

    fn connection(&self) -> crate::Result<&Arc<Smb2Connection>> {
        self.connection.as_ref().ok_or(Error::NotConnected)
    }

    fn transact(
        &self,
        command: Smb2Command,
        content: Smb2Content,
    ) -> crate::Result<Option<Smb2Message>> {
        let mut header = Smb2Header::new(command);
        header.session_id = self.session_id;
        let connection = self.connection()?;
        let mut message = Smb2Message::new(header, content);
        let message_id = connection.send(&mut message)?;
        connection.wait_for(command, message_id)
    }

    fn negotiate(&mut self) -> crate::Result<()> {
        log::debug!("Negotiating SMB2 (2.0.2, 2.1)");
        let request = Smb2NegotiateRequest::new(Guid::generate());
        let Some(response) =
            self.transact(Smb2Command::Negotiate, Smb2Content::NegotiateRequest(request))?
        else {
            return Err(Error::TimedOut("SMB2 negotiate response"));
        };
        let status = response.status();
        let Smb2Content::NegotiateResponse(negotiate) = response.content else {
            return Err(Error::NegotiationError(format!(
                "no usable negotiate response (status {status})"
            )));
        };
        if !status.is_success() {
            return Err(Error::NegotiationError(format!(
                "negotiate failed with {status}"
            )));
        }

        log::info!(
            "Negotiated SMB2 dialect {:?} (signing required: {})",
            negotiate.dialect_revision,
            negotiate.security_mode.signing_required()
        );
        self.negotiated = Some(NegotiatedSmb2 {
            dialect: negotiate.dialect_revision,
            signing_required: negotiate.security_mode.signing_required(),
            max_transact_size: negotiate.max_transact_size.min(MAX_IO_SIZE),
            max_read_size: negotiate.max_read_size.min(MAX_IO_SIZE),
            max_write_size: negotiate.max_write_size.min(MAX_IO_SIZE),
            security_blob: negotiate.buffer,
        });
        Ok(())
    }
}

impl Client for Smb2Client {
    fn connect(&mut self, server: IpAddr, mode: TransportMode) -> crate::Result<()> {
        self.connect_endpoint(SocketAddr::new(server, mode.default_port()), mode)
    }

    fn login(
        &mut self,
        domain: &str,
        user: &str,
        password: &str,
        method: AuthMethod,
    ) -> crate::Result<Status> {
        if !self.is_connected() {
            return Err(Error::InvalidState("login needs a connected client".into()));
        }
        let creds = NtlmCredentials {
            domain: domain.to_string(),
            user: user.to_string(),
            password: password.to_string(),
            machine_name: self.config.machine_name.clone(),
        };
        let security_blob = self
            .negotiated
            .as_ref()
            .expect("negotiation preceded")
            .security_blob
            .clone();

        let mut context = NtlmContext::new(creds, method);
        let Some(negotiate_token) = context.negotiate_token(&security_blob)? else {
            return Ok(Status::SecEInvalidToken);
        };

        let Some(response) = self.transact(
            Smb2Command::SessionSetup,
            Smb2Content::SessionSetupRequest(Smb2SessionSetupRequest::new(negotiate_token)),
        )?
        else {
            return Ok(Status::InvalidSmb);
        };
        let status = response.status();
        // The session id is assigned with the challenge and mirrored on
        // every subsequent header.
        self.session_id = response.header.session_id;
        let Smb2Content::SessionSetupResponse(challenge) = response.content else {
            return Ok(status);
        };
        if status != Status::MoreProcessingRequired {
            return Ok(status);
        }

        let Some(authenticate_token) = context.authenticate_token(&challenge.buffer)? else {
            return Ok(Status::SecEInvalidToken);
        };
        let Some(response) = self.transact(
            Smb2Command::SessionSetup,
            Smb2Content::SessionSetupRequest(Smb2SessionSetupRequest::new(authenticate_token)),
        )?
        else {
            return Ok(Status::InvalidSmb);
        };
        let status = response.status();
        if status.is_success() {
            self.logged_in = true;
            self.session_key = context.session_key().copied();
            log::info!("Logged in (session {:#x})", self.session_id);
        }
        Ok(status)
    }

    fn logoff(&mut self) -> crate::Result<Status> {
        if !self.is_connected() || !self.logged_in {
            return Err(Error::InvalidState(
                "logoff needs a logged-in client".into(),
            ));
        }
        let Some(response) = self.transact(
            Smb2Command::Logoff,
            Smb2Content::LogoffRequest(Smb2LogoffRequest::default()),
        )?
        else {
            return Ok(Status::InvalidSmb);
        };
        let status = response.status();
        if status.is_success() {
            self.logged_in = false;
            log::info!("Logged off");
        }
        Ok(status)
    }

    fn list_shares(&mut self) -> crate::Result<(Vec<String>, Status)> {
        let server = self.server.ok_or(Error::NotConnected)?;
        let (store, status) = self.tree_connect("IPC$")?;
        let Some(store) = store else {
            return Ok((vec![], status));
        };
        let result = crate::rpc::srvsvc::net_share_enum(store.as_ref(), &server.to_string());
        let disconnect_status = store.disconnect()?;
        if !disconnect_status.is_success() {
            log::warn!("IPC$ tree disconnect failed: {disconnect_status}");
        }
        result
    }

    fn tree_connect(
        &mut self,
        share: &str,
    ) -> crate::Result<(Option<Box<dyn FileStore>>, Status)> {
        if !self.is_connected() || !self.logged_in {
            return Err(Error::InvalidState(
                "tree connect needs a logged-in client".into(),
            ));
        }
        let server = self.server.ok_or(Error::NotConnected)?;
        let path = format!(r"\\{server}\{share}");
        log::debug!("Connecting to tree {path}");
        let Some(response) = self.transact(
            Smb2Command::TreeConnect,
            Smb2Content::TreeConnectRequest(Smb2TreeConnectRequest::new(&path)),
        )?
        else {
            return Ok((None, Status::InvalidSmb));
        };
        let status = response.status();
        if !status.is_success() {
            return Ok((None, status));
        }
        let tree_id = response.header.tree_id.unwrap_or(0);
        log::info!("Connected to {path} (tree {tree_id:#x})");
        let negotiated = self.negotiated.as_ref().expect("negotiation preceded");
        let store = Smb2FileStore::new(
            self.connection()?.clone(),
            self.session_id,
            tree_id,
            negotiated.max_transact_size,
            negotiated.max_read_size,
            negotiated.max_write_size,
        );
        Ok((Some(Box::new(store)), status))
    }

    fn disconnect(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.shutdown();
        }
        self.negotiated = None;
        self.server = None;
        self.session_id = 0;
        self.logged_in = false;
        self.session_key = None;
    }

    fn is_connected(&self) -> bool {
        self.connection
            .as_ref()
            .map(|c| c.is_connected())
            .unwrap_or(false)
    }

    fn is_logged_in(&self) -> bool {
        self.logged_in
    }
}

impl Drop for Smb2Client {
    fn drop(&mut self) {
        self.disconnect();
    }
}
