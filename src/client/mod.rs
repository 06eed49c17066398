//! The public client surface, identical across dialects.

mod config;
pub mod smb1;
pub mod smb2;

pub use crate::auth::AuthMethod;
pub use config::ClientConfig;
pub use smb1::Smb1Client;
pub use smb2::Smb2Client;

use std::net::IpAddr;

use crate::connection::TransportMode;
use crate::filestore::FileStore;
use crate::packets::status::Status;

/// A connected SMB client: one TCP connection, one authenticated
/// session, any number of sequential tree connects.
///
/// Lifecycle misuse — logging in while disconnected, binding a tree
/// while logged off — is a programming error and surfaces as
/// [`crate::Error::InvalidState`], never as a protocol status.
pub trait Client {
    /// Opens the transport and negotiates the dialect.
    fn connect(&mut self, server: IpAddr, mode: TransportMode) -> crate::Result<()>;

    /// Authenticates the session, returning the server's verdict.
    fn login(
        &mut self,
        domain: &str,
        user: &str,
        password: &str,
        method: AuthMethod,
    ) -> crate::Result<Status>;

    /// Ends the authenticated session.
    fn logoff(&mut self) -> crate::Result<Status>;

    /// Enumerates the server's disk shares through the `IPC$` pipe tree.
    fn list_shares(&mut self) -> crate::Result<(Vec<String>, Status)>;

    /// Binds a share, returning a file store on success.
    fn tree_connect(
        &mut self,
        share: &str,
    ) -> crate::Result<(Option<Box<dyn FileStore>>, Status)>;

    /// Closes the transport. Open handles die with the session.
    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    fn is_logged_in(&self) -> bool;
}
