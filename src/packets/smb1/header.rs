//! SMB1 message header ([MS-CIFS] 2.2.3.1) and the capability/flag masks
//! shared by the SMB1 command set.

use binrw::prelude::*;
use modular_bitfield::prelude::*;

#[derive(BinRead, BinWrite, Debug, PartialEq, Eq, Clone, Copy)]
#[brw(repr(u8))]
pub enum Smb1Command {
    Close = 0x04,
    LockingAndX = 0x24,
    Transaction = 0x25,
    Echo = 0x2B,
    ReadAndX = 0x2E,
    WriteAndX = 0x2F,
    Transaction2 = 0x32,
    Transaction2Secondary = 0x33,
    TreeDisconnect = 0x71,
    Negotiate = 0x72,
    SessionSetupAndX = 0x73,
    LogoffAndX = 0x74,
    TreeConnectAndX = 0x75,
    NtTransact = 0xA0,
    NtTransactSecondary = 0xA1,
    NtCreateAndX = 0xA2,
    NtCancel = 0xA4,
}

impl std::fmt::Display for Smb1Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} ({:#04x})", self, *self as u8)
    }
}

/// The fixed 32-byte SMB1 header.
#[binrw::binrw]
#[derive(Debug, Clone, PartialEq, Eq)]
#[brw(magic(b"\xffSMB"), little)]
pub struct Smb1Header {
    pub command: Smb1Command,
    /// Raw NT status. Convert with [`crate::packets::status::Status::from_u32`].
    pub status: u32,
    pub flags: Smb1HeaderFlags,
    pub flags2: Smb1HeaderFlags2,
    pub pid_high: u16,
    pub security_features: u64,
    #[bw(calc = 0)]
    _reserved: u16,
    pub tid: u16,
    pub pid_low: u16,
    pub uid: u16,
    pub mid: u16,
}

impl Smb1Header {
    pub const STRUCT_SIZE: usize = 32;

    /// The MID carried by an unsolicited oplock break notification.
    pub const OPLOCK_BREAK_MID: u16 = 0xFFFF;

    pub fn new(command: Smb1Command) -> Self {
        Self {
            command,
            status: 0,
            flags: Smb1HeaderFlags::new()
                .with_case_insensitive(true)
                .with_canonicalized_paths(true),
            flags2: Smb1HeaderFlags2::new(),
            pid_high: 0,
            security_features: 0,
            tid: 0,
            pid_low: 0,
            uid: 0,
            mid: 0,
        }
    }
}

#[bitfield]
#[derive(BinWrite, BinRead, Debug, Clone, Copy, PartialEq, Eq)]
#[bw(map = |&x| Self::into_bytes(x))]
#[br(map = Self::from_bytes)]
pub struct Smb1HeaderFlags {
    pub lock_and_read_ok: bool,
    pub buf_avail: bool,
    #[skip]
    __: B1,
    pub case_insensitive: bool,
    pub canonicalized_paths: bool,
    pub oplock: bool,
    pub opbatch: bool,
    /// Set on every message travelling server to client.
    pub reply: bool,
}

#[bitfield]
#[derive(BinWrite, BinRead, Debug, Clone, Copy, PartialEq, Eq)]
#[bw(map = |&x| Self::into_bytes(x))]
#[br(map = Self::from_bytes)]
pub struct Smb1HeaderFlags2 {
    pub long_names_allowed: bool,
    pub eas: bool,
    pub smb_security_signature: bool,
    #[skip]
    __: B3,
    pub long_name_used: bool,
    #[skip]
    __: B4,
    pub extended_security: bool,
    pub dfs: bool,
    pub paging_io: bool,
    pub nt_status_code: bool,
    pub unicode: bool,
}

/// The AndX chaining block opening every AndX command body. This client
/// never chains, so the follow-up command is always `0xFF` (none).
#[binrw::binrw]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[brw(little)]
pub struct AndXHeader {
    pub andx_command: u8,
    #[bw(calc = 0)]
    _reserved: u8,
    pub andx_offset: u16,
}

impl Default for AndXHeader {
    fn default() -> Self {
        Self {
            andx_command: 0xFF,
            andx_offset: 0,
        }
    }
}

/// Server/client capability bits from SMB1 negotiation.
#[bitfield]
#[derive(BinWrite, BinRead, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[bw(map = |&x| Self::into_bytes(x))]
#[br(map = Self::from_bytes)]
pub struct Smb1Capabilities {
    pub raw_mode: bool,
    pub mpx_mode: bool,
    pub unicode: bool,
    pub large_files: bool,
    pub nt_smb: bool,
    pub rpc_remote_api: bool,
    pub nt_status_code: bool,
    pub level2_oplocks: bool,
    pub lock_and_read: bool,
    pub nt_find: bool,
    #[skip]
    __: B2,
    pub dfs: bool,
    pub info_level_passthrough: bool,
    pub large_read: bool,
    pub large_write: bool,
    pub lwio: bool,
    #[skip]
    __: B6,
    pub unix: bool,
    #[skip]
    __: B5,
    pub dynamic_reauth: bool,
    pub persistent_handles: bool,
    pub extended_security: bool,
}
