//! SMB1 dialect negotiation ([MS-CIFS] 2.2.4.52).

use binrw::io::TakeSeekExt;
use binrw::prelude::*;

use super::header::Smb1Capabilities;
use crate::packets::binrw_util::prelude::*;
use crate::packets::guid::Guid;

/// The only dialect this client offers.
pub const NT_LM_0_12: &str = "NT LM 0.12";

#[binrw::binrw]
#[derive(Debug, PartialEq, Eq)]
#[brw(little)]
pub struct Smb1NegotiateRequest {
    #[bw(calc = 0)]
    #[br(assert(_word_count == 0))]
    _word_count: u8,
    #[bw(calc = PosMarker::default())]
    byte_count: PosMarker<u16>,
    #[br(map_stream = |s| s.take_seek(byte_count.value.into()), parse_with = binrw::helpers::until_eof)]
    #[bw(write_with = PosMarker::write_size, args(&byte_count))]
    pub dialects: Vec<Smb1Dialect>,
}

impl Default for Smb1NegotiateRequest {
    fn default() -> Self {
        Self {
            dialects: vec![Smb1Dialect {
                name: binrw::NullString::from(NT_LM_0_12),
            }],
        }
    }
}

#[derive(BinRead, BinWrite, Debug, PartialEq, Eq)]
#[brw(magic(b"\x02"))]
pub struct Smb1Dialect {
    pub name: binrw::NullString,
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb1NegotiateResponse {
    #[bw(calc = 17)]
    #[br(assert(_word_count == 17))]
    _word_count: u8,
    /// Index into the request's dialect list.
    pub dialect_index: u16,
    pub security_mode: u8,
    pub max_mpx_count: u16,
    pub max_number_vcs: u16,
    pub max_buffer_size: u32,
    pub max_raw_size: u32,
    pub session_key: u32,
    pub capabilities: Smb1Capabilities,
    pub system_time: FileTime,
    pub server_time_zone: i16,
    pub challenge_length: u8,
    #[bw(calc = PosMarker::default())]
    byte_count: PosMarker<u16>,
    #[br(args(capabilities.extended_security(), byte_count.value))]
    #[bw(write_with = PosMarker::write_size, args(&byte_count))]
    pub security: Smb1NegotiateSecurity,
}

/// The variable part of the negotiate response: a classic server sends a
/// challenge (plus domain/server names), an extended-security server
/// sends its GUID and an SPNEGO blob.
#[binrw::binrw]
#[derive(Debug)]
#[br(import(extended_security: bool, byte_count: u16))]
pub enum Smb1NegotiateSecurity {
    #[br(pre_assert(!extended_security))]
    Classic {
        challenge: [u8; 8],
        /// OEM/Unicode domain and server names; not consumed by this client.
        #[br(count = byte_count.saturating_sub(8))]
        domain_and_server: Vec<u8>,
    },
    #[br(pre_assert(extended_security))]
    Extended {
        server_guid: Guid,
        #[br(count = byte_count.saturating_sub(16))]
        security_blob: Vec<u8>,
    },
}
