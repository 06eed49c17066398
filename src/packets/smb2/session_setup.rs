//! Session setup and logoff ([MS-SMB2] 2.2.5 — 2.2.8).

use binrw::prelude::*;
use modular_bitfield::prelude::*;

use crate::packets::binrw_util::prelude::*;

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb2SessionSetupRequest {
    #[bw(calc = 25)]
    #[br(assert(_structure_size == 25))]
    _structure_size: u16,
    #[bw(calc = 0)]
    _flags: u8,
    pub security_mode: SessionSecurityMode,
    pub capabilities: u32,
    #[bw(calc = 0)]
    _channel: u32,
    #[bw(calc = PosMarker::default())]
    _security_buffer_offset: PosMarker<u16>,
    #[bw(try_calc = buffer.len().try_into())]
    security_buffer_length: u16,
    pub previous_session_id: u64,
    /// The SPNEGO token for this authentication leg.
    #[br(seek_before = std::io::SeekFrom::Start(_security_buffer_offset.value as u64), count = security_buffer_length)]
    #[bw(write_with = PosMarker::write_aoff, args(&_security_buffer_offset))]
    pub buffer: Vec<u8>,
}

impl Smb2SessionSetupRequest {
    pub fn new(buffer: Vec<u8>) -> Self {
        Self {
            security_mode: SessionSecurityMode::new().with_signing_enabled(true),
            capabilities: 0,
            previous_session_id: 0,
            buffer,
        }
    }
}

#[bitfield]
#[derive(BinRead, BinWrite, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[bw(map = |&x| Self::into_bytes(x))]
#[br(map = Self::from_bytes)]
pub struct SessionSecurityMode {
    pub signing_enabled: bool,
    pub signing_required: bool,
    #[skip]
    __: B6,
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb2SessionSetupResponse {
    #[bw(calc = 9)]
    #[br(assert(_structure_size == 9))]
    _structure_size: u16,
    pub session_flags: u16,
    #[bw(calc = PosMarker::default())]
    _security_buffer_offset: PosMarker<u16>,
    #[bw(try_calc = buffer.len().try_into())]
    security_buffer_length: u16,
    #[br(seek_before = std::io::SeekFrom::Start(_security_buffer_offset.value as u64), count = security_buffer_length)]
    #[bw(write_with = PosMarker::write_aoff, args(&_security_buffer_offset))]
    pub buffer: Vec<u8>,
}

#[binrw::binrw]
#[derive(Debug, Default)]
#[brw(little)]
pub struct Smb2LogoffRequest {
    #[bw(calc = 4)]
    #[br(assert(_structure_size == 4))]
    _structure_size: u16,
    #[bw(calc = 0)]
    _reserved: u16,
}

#[binrw::binrw]
#[derive(Debug, Default)]
#[brw(little)]
pub struct Smb2LogoffResponse {
    #[bw(calc = 4)]
    #[br(assert(_structure_size == 4))]
    _structure_size: u16,
    #[bw(calc = 0)]
    _reserved: u16,
}
