//! A dual-dialect SMB client.
//!
//! Speaks the legacy SMB1/CIFS dialect (`NT LM 0.12`) and SMB2 (2.0.2 and
//! 2.1) against a file server over Direct TCP (port 445) or
//! NetBIOS-over-TCP (port 139). Authentication is NTLM (v1 or v2) carried
//! inside SPNEGO where the server negotiates extended security.
//!
//! The [`client::Smb1Client`] and [`client::Smb2Client`] types expose the
//! same surface through the [`client::Client`] trait: connect, login,
//! enumerate shares, bind a share tree, and perform file operations
//! through the [`filestore::FileStore`] returned by a tree connect.

pub mod auth;
pub mod client;
pub mod connection;
pub mod error;
pub mod filestore;
pub mod packets;
pub mod rpc;

pub use client::{AuthMethod, Client, ClientConfig, Smb1Client, Smb2Client};
pub use connection::TransportMode;
pub use error::Error;
pub use filestore::{FileHandle, FileStatus, FileStore};
pub use packets::status::Status;

pub type Result<T> = std::result::Result<T, crate::Error>;
