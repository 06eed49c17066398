//! The SMB1/CIFS client: `NT LM 0.12` negotiation, NTLM session setup
//! (pre-extended or SPNEGO extended security), tree connects.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use super::{AuthMethod, Client, ClientConfig};
use crate::auth::{self, NtlmContext, NtlmCredentials};
use crate::connection::reader::spawn_receive_loop;
use crate::connection::smb1::{Smb1Connection, SMB1_RESPONSE_TIMEOUT};
use crate::connection::{Transport, TransportMode};
use crate::filestore::{FileStore, Smb1FileStore};
use crate::packets::binrw_util::prelude::FileTime;
use crate::packets::smb1::*;
use crate::packets::status::Status;
use crate::Error;

/// What SMB1 negotiation agreed on. Exactly one of the challenge and
/// the security blob is present.
struct NegotiatedSmb1 {
    unicode: bool,
    large_files: bool,
    large_read: bool,
    info_level_passthrough: bool,
    server_max_buffer_size: u32,
    max_mpx_count: u16,
    security: NegotiatedSecurity,
}

enum NegotiatedSecurity {
    Classic { server_challenge: [u8; 8] },
    Extended { security_blob: Vec<u8> },
}

pub struct Smb1Client {
    config: ClientConfig,
    connection: Option<Arc<Smb1Connection>>,
    server: Option<IpAddr>,
    negotiated: Option<NegotiatedSmb1>,
    uid: u16,
    logged_in: bool,
    session_key: Option<[u8; 16]>,
}

impl Smb1Client {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            connection: None,
            server: None,
            negotiated: None,
            uid: 0,
            logged_in: false,
            session_key: None,
        }
    }

    pub fn session_key(&self) -> Option<&[u8; 16]> {
        self.session_key.as_ref()
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
        let connection = Arc::new(Smb1Connection::new(transport));
        spawn_receive_loop(reader_stream, connection.clone());

        self.server = Some(endpoint.ip());
        self.connection = Some(connection);
        if let Err(e) = self.negotiate() {
            self.disconnect();
            return Err(e);
        }
        Ok(())
    }

    fn connection(&self) -> crate::Result<&Arc<Smb1Connection>> {
        self.connection.as_ref().ok_or(Error::NotConnected)
    }

    fn negotiated(&self) -> &NegotiatedSmb1 {
        self.negotiated.as_ref().expect("negotiation preceded")
    }

    /// Base header carrying the negotiated flags, the session UID and
    /// the given tree.
    fn header(&self, command: Smb1Command, tid: u16) -> Smb1Header {
        let unicode = self.negotiated.as_ref().map(|n| n.unicode).unwrap_or(false);
        let mut header = Smb1Header::new(command);
        header.flags2 = Smb1HeaderFlags2::new()
            .with_unicode(unicode)
            .with_extended_security(self.config.force_extended_security)
            .with_long_names_allowed(true)
            .with_long_name_used(true)
            .with_nt_status_code(true);
        header.uid = self.uid;
        header.tid = tid;
        header
    }

    fn transact(
        &self,
        command: Smb1Command,
        tid: u16,
        content: Smb1Content,
    ) -> crate::Result<Option<Smb1Message>> {
        let connection = self.connection()?;
        connection.send(&Smb1Message::new(self.header(command, tid), content))?;
        connection.wait_for(command, SMB1_RESPONSE_TIMEOUT)
    }

    fn negotiate(&mut self) -> crate::Result<()> {
        log::debug!("Negotiating SMB1 dialect {NT_LM_0_12}");
        let Some(response) = self.transact(
            Smb1Command::Negotiate,
            0,
            Smb1Content::NegotiateRequest(Smb1NegotiateRequest::default()),
        )?
        else {
            return Err(Error::TimedOut("SMB1 negotiate response"));
        };
        let status = response.status();
        let Smb1Content::NegotiateResponse(negotiate) = response.content else {
            return Err(Error::NegotiationError(format!(
                "no usable negotiate response (status {status})"
            )));
        };
        if negotiate.dialect_index == 0xFFFF {
            return Err(Error::NegotiationError(
                "server declined every offered dialect".into(),
            ));
        }

        let caps = negotiate.capabilities;
        if !(caps.nt_smb() && caps.rpc_remote_api() && caps.nt_status_code()) {
            return Err(Error::NegotiationError(
                "server lacks NT SMB, remote API or NT status support".into(),
            ));
        }

        let security = match negotiate.security {
            Smb1NegotiateSecurity::Classic { challenge, .. } => {
                if self.config.force_extended_security {
                    return Err(Error::NegotiationError(
                        "extended security required but the server negotiated classic".into(),
                    ));
                }
                NegotiatedSecurity::Classic {
                    server_challenge: challenge,
                }
            }
            Smb1NegotiateSecurity::Extended { security_blob, .. } => {
                NegotiatedSecurity::Extended { security_blob }
            }
        };

        log::info!(
            "Negotiated {NT_LM_0_12}: unicode={}, extended security={}, large r/w={}/{}, passthrough={}",
            caps.unicode(),
            matches!(security, NegotiatedSecurity::Extended { .. }),
            caps.large_read(),
            caps.large_write(),
            caps.info_level_passthrough(),
        );
        self.negotiated = Some(NegotiatedSmb1 {
            unicode: caps.unicode(),
            large_files: caps.large_files(),
            large_read: caps.large_read(),
            info_level_passthrough: caps.info_level_passthrough(),
            server_max_buffer_size: negotiate.max_buffer_size,
            max_mpx_count: negotiate.max_mpx_count,
            security,
        });
        Ok(())
    }

    /// The client capability mask mirrored back on session setup.
    fn session_capabilities(&self) -> Smb1Capabilities {
        let negotiated = self.negotiated();
        Smb1Capabilities::new()
            .with_nt_smb(true)
            .with_rpc_remote_api(true)
            .with_nt_status_code(true)
            .with_nt_find(true)
            .with_unicode(negotiated.unicode)
            .with_large_files(negotiated.large_files)
            .with_large_read(negotiated.large_read)
    }

    fn login_pre_extended(
        &mut self,
        creds: &NtlmCredentials,
        method: AuthMethod,
        server_challenge: [u8; 8],
    ) -> crate::Result<Status> {
        if method == AuthMethod::NtlmV1ExtendedSessionSecurity {
            return Err(Error::InvalidArgument(
                "NTLMv1 extended session security needs an extended-security negotiation".into(),
            ));
        }
        let responses =
            auth::compute_responses(creds, method, &server_challenge, FileTime::now());

        let request = Smb1SessionSetupRequest {
            max_buffer_size: self.config.client_max_buffer_size as u16,
            max_mpx_count: self.negotiated().max_mpx_count.min(1),
            vc_number: 0,
            session_key: 0,
            capabilities: self.session_capabilities(),
            oem_password: responses.lm_response,
            unicode_password: responses.nt_response,
            account_name: creds.user.as_str().into(),
            primary_domain: creds.domain.as_str().into(),
            native_os: "".into(),
            native_lan_man: "".into(),
        };
        let Some(response) = self.transact(
            Smb1Command::SessionSetupAndX,
            0,
            Smb1Content::SessionSetupRequest(request),
        )?
        else {
            return Ok(Status::InvalidSmb);
        };
        let status = response.status();
        if status.is_success() {
            self.uid = response.header.uid;
            self.logged_in = true;
            self.session_key = Some(responses.session_base_key);
            log::info!("Logged in as {} (UID {:#x})", creds.user, self.uid);
        }
        Ok(status)
    }

    fn login_extended(
        &mut self,
        creds: &NtlmCredentials,
        method: AuthMethod,
        security_blob: Vec<u8>,
    ) -> crate::Result<Status> {
        let mut context = NtlmContext::new(creds.clone(), method);
        let Some(negotiate_token) = context.negotiate_token(&security_blob)? else {
            return Ok(Status::SecEInvalidToken);
        };

        let Some(response) = self.transact(
            Smb1Command::SessionSetupAndX,
            0,
            Smb1Content::SessionSetupExtendedRequest(
                self.extended_setup_request(negotiate_token),
            ),
        )?
        else {
            return Ok(Status::InvalidSmb);
        };
        let status = response.status();
        let Smb1Content::SessionSetupExtendedResponse(challenge) = response.content else {
            return Ok(status);
        };
        if status != Status::MoreProcessingRequired {
            return Ok(status);
        }
        // The UID is assigned with the challenge and echoed from now on.
        self.uid = response.header.uid;

        let Some(authenticate_token) = context.authenticate_token(&challenge.security_blob)?
        else {
            return Ok(Status::SecEInvalidToken);
        };
        let Some(response) = self.transact(
            Smb1Command::SessionSetupAndX,
            0,
            Smb1Content::SessionSetupExtendedRequest(
                self.extended_setup_request(authenticate_token),
            ),
        )?
        else {
            return Ok(Status::InvalidSmb);
        };
        let status = response.status();
        if status.is_success() {
            self.logged_in = true;
            self.session_key = context.session_key().copied();
            log::info!("Logged in as {} (UID {:#x})", creds.user, self.uid);
        }
        Ok(status)
    }

    fn extended_setup_request(&self, security_blob: Vec<u8>) -> Smb1SessionSetupExtendedRequest {
        Smb1SessionSetupExtendedRequest {
            max_buffer_size: self.config.client_max_buffer_size as u16,
            max_mpx_count: self.negotiated().max_mpx_count.min(1),
            vc_number: 0,
            session_key: 0,
            capabilities: self
                .session_capabilities()
                .with_extended_security(true),
            security_blob,
            native_os: "".into(),
            native_lan_man: "".into(),
        }
    }
}

impl Client for Smb1Client {
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
        let (classic_challenge, extended_blob) = match &self.negotiated().security {
            NegotiatedSecurity::Classic { server_challenge } => (Some(*server_challenge), None),
            NegotiatedSecurity::Extended { security_blob } => (None, Some(security_blob.clone())),
        };
        match classic_challenge {
            Some(challenge) => self.login_pre_extended(&creds, method, challenge),
            None => self.login_extended(&creds, method, extended_blob.expect("extended blob")),
        }
    }

    fn logoff(&mut self) -> crate::Result<Status> {
        if !self.is_connected() || !self.logged_in {
            return Err(Error::InvalidState(
                "logoff needs a logged-in client".into(),
            ));
        }
        let Some(response) = self.transact(
            Smb1Command::LogoffAndX,
            0,
            Smb1Content::LogoffRequest(Smb1LogoffRequest::default()),
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
        let request = Smb1TreeConnectRequest {
            flags: 0,
            password: vec![0],
            path: path.as_str().into(),
            service: "?????".into(),
        };
        let Some(response) = self.transact(
            Smb1Command::TreeConnectAndX,
            0,
            Smb1Content::TreeConnectRequest(request),
        )?
        else {
            return Ok((None, Status::InvalidSmb));
        };
        let status = response.status();
        if !status.is_success() {
            return Ok((None, status));
        }
        let negotiated = self.negotiated();
        log::info!("Connected to {path} (TID {:#x})", response.header.tid);
        let store = Smb1FileStore::new(
            self.connection()?.clone(),
            self.uid,
            response.header.tid,
            negotiated.unicode,
            self.config.force_extended_security,
            negotiated.info_level_passthrough,
            self.config.client_max_buffer_size,
            negotiated.server_max_buffer_size,
        );
        Ok((Some(Box::new(store)), status))
    }

    fn disconnect(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.shutdown();
        }
        self.negotiated = None;
        self.server = None;
        self.uid = 0;
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

impl Drop for Smb1Client {
    fn drop(&mut self) {
        self.disconnect();
    }
}
