//! The SMB2 message envelope. Header and body serialize into a single
//! stream so that header-relative buffer offsets equal stream positions.

use binrw::prelude::*;
use paste::paste;

use super::create;
use super::error;
use super::file;
use super::header::*;
use super::info;
use super::ioctl;
use super::negotiate;
use super::oplock;
use super::query_dir;
use super::session_setup;
use super::tree_connect;

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb2Message {
    pub header: Smb2Header,
    #[brw(args(header.command, header.flags.server_to_redir()))]
    pub content: Smb2Content,
}

impl Smb2Message {
    pub fn new(header: Smb2Header, content: Smb2Content) -> Self {
        Self { header, content }
    }

    pub fn encode(&self) -> crate::Result<Vec<u8>> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        self.write(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    pub fn decode(data: &[u8]) -> crate::Result<Self> {
        Ok(Self::read(&mut std::io::Cursor::new(data))?)
    }

    pub fn status(&self) -> crate::packets::status::Status {
        crate::packets::status::Status::from_u32(self.header.status)
    }
}

/// One-use macro generating the request/response pairs of the `Smb2Content`
/// enum, followed by the direction-less special cases.
macro_rules! smb2_content {
    (
        $({$cmd:ident, $module:ident, $prefix:ident},)+
    ) => {
        paste! {

#[binrw::binrw]
#[derive(Debug)]
#[brw(import(command: Smb2Command, from_server: bool))]
pub enum Smb2Content {
    $(
        #[br(pre_assert(matches!(command, Smb2Command::$cmd) && !from_server))]
        [<$cmd Request>]($module::[<Smb2 $prefix Request>]),
        #[br(pre_assert(matches!(command, Smb2Command::$cmd) && from_server))]
        [<$cmd Response>]($module::[<Smb2 $prefix Response>]),
    )+

    #[br(pre_assert(matches!(command, Smb2Command::OplockBreak) && from_server))]
    OplockBreakNotification(oplock::Smb2OplockBreakNotification),

    /// Fallback for non-success bodies.
    #[br(pre_assert(from_server))]
    ErrorResponse(error::Smb2ErrorResponse),
}

impl Smb2Content {
    /// The command a body travels under.
    ///
    /// # Panics
    /// For error responses, which have no associated command.
    pub fn associated_command(&self) -> Smb2Command {
        match self {
            $(
                Smb2Content::[<$cmd Request>](_) | Smb2Content::[<$cmd Response>](_) => {
                    Smb2Command::$cmd
                }
            )+
            Smb2Content::OplockBreakNotification(_) => Smb2Command::OplockBreak,
            Smb2Content::ErrorResponse(_) => panic!("error responses have no command"),
        }
    }
}
        }
    };
}

smb2_content! {
    {Negotiate, negotiate, Negotiate},
    {SessionSetup, session_setup, SessionSetup},
    {Logoff, session_setup, Logoff},
    {TreeConnect, tree_connect, TreeConnect},
    {TreeDisconnect, tree_connect, TreeDisconnect},
    {Create, create, Create},
    {Close, create, Close},
    {Read, file, Read},
    {Write, file, Write},
    {QueryDirectory, query_dir, QueryDirectory},
    {QueryInfo, info, QueryInfo},
    {SetInfo, info, SetInfo},
    {Ioctl, ioctl, Ioctl},
}
