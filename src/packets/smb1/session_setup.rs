//! SMB1 session establishment: SessionSetupAndX in both its
//! pre-extended-security ([MS-CIFS] 2.2.4.53) and extended-security
//! ([MS-SMB] 2.2.4.6) forms, plus LogoffAndX.

use binrw::prelude::*;

use super::header::AndXHeader;
use super::string::Smb1String;
use crate::packets::binrw_util::prelude::*;

/// Pre-extended-security session setup: the password responses travel
/// directly in the request.
#[binrw::binrw]
#[derive(Debug)]
#[brw(little, import(unicode: bool))]
pub struct Smb1SessionSetupRequest {
    #[bw(calc = 13)]
    #[br(assert(_word_count == 13))]
    _word_count: u8,
    #[bw(calc = AndXHeader::default())]
    _andx: AndXHeader,
    pub max_buffer_size: u16,
    pub max_mpx_count: u16,
    pub vc_number: u16,
    pub session_key: u32,
    #[bw(try_calc = oem_password.len().try_into())]
    oem_password_length: u16,
    #[bw(try_calc = unicode_password.len().try_into())]
    unicode_password_length: u16,
    #[bw(calc = 0)]
    _reserved: u32,
    pub capabilities: super::header::Smb1Capabilities,
    #[bw(calc = PosMarker::default())]
    byte_count: PosMarker<u16>,
    #[bw(calc = PosMarker::default())]
    _body_start: PosMarker<()>,
    /// The case-insensitive (LM / LMv2) response.
    #[br(count = oem_password_length)]
    pub oem_password: Vec<u8>,
    /// The case-sensitive (NT / NTLMv2) response.
    #[br(count = unicode_password_length)]
    pub unicode_password: Vec<u8>,
    #[brw(args(unicode))]
    pub account_name: Smb1String,
    #[brw(args(unicode))]
    pub primary_domain: Smb1String,
    #[brw(args(unicode))]
    pub native_os: Smb1String,
    #[br(args(unicode))]
    #[bw(write_with = write_and_patch_byte_count, args(unicode, &byte_count, &_body_start))]
    pub native_lan_man: Smb1String,
}

/// Extended-security session setup: an SPNEGO token travels in the
/// security blob, over as many round-trips as the mechanism needs.
#[binrw::binrw]
#[derive(Debug)]
#[brw(little, import(unicode: bool))]
pub struct Smb1SessionSetupExtendedRequest {
    #[bw(calc = 12)]
    #[br(assert(_word_count == 12))]
    _word_count: u8,
    #[bw(calc = AndXHeader::default())]
    _andx: AndXHeader,
    pub max_buffer_size: u16,
    pub max_mpx_count: u16,
    pub vc_number: u16,
    pub session_key: u32,
    #[bw(try_calc = security_blob.len().try_into())]
    security_blob_length: u16,
    #[bw(calc = 0)]
    _reserved: u32,
    pub capabilities: super::header::Smb1Capabilities,
    #[bw(calc = PosMarker::default())]
    byte_count: PosMarker<u16>,
    #[bw(calc = PosMarker::default())]
    _body_start: PosMarker<()>,
    #[br(count = security_blob_length)]
    pub security_blob: Vec<u8>,
    #[brw(args(unicode))]
    pub native_os: Smb1String,
    #[br(args(unicode))]
    #[bw(write_with = write_and_patch_byte_count, args(unicode, &byte_count, &_body_start))]
    pub native_lan_man: Smb1String,
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb1SessionSetupResponse {
    #[bw(calc = 3)]
    #[br(assert(_word_count == 3))]
    _word_count: u8,
    #[bw(calc = AndXHeader::default())]
    _andx: AndXHeader,
    pub action: u16,
    #[bw(try_calc = names.len().try_into())]
    byte_count: u16,
    /// Native OS / LAN manager / domain strings; not consumed.
    #[br(count = byte_count)]
    pub names: Vec<u8>,
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb1SessionSetupExtendedResponse {
    #[bw(calc = 4)]
    #[br(assert(_word_count == 4))]
    _word_count: u8,
    #[bw(calc = AndXHeader::default())]
    _andx: AndXHeader,
    pub action: u16,
    #[bw(try_calc = security_blob.len().try_into())]
    security_blob_length: u16,
    #[bw(calc = PosMarker::default())]
    byte_count: PosMarker<u16>,
    #[bw(calc = PosMarker::default())]
    _body_start: PosMarker<()>,
    #[br(count = security_blob_length)]
    #[bw(write_with = write_blob_and_patch_byte_count, args(&byte_count, &_body_start))]
    pub security_blob: Vec<u8>,
}

#[binrw::binrw]
#[derive(Debug, Default)]
#[brw(little)]
pub struct Smb1LogoffRequest {
    #[bw(calc = 2)]
    #[br(assert(_word_count == 2))]
    _word_count: u8,
    #[bw(calc = AndXHeader::default())]
    _andx: AndXHeader,
    #[bw(calc = 0)]
    _byte_count: u16,
}

#[binrw::binrw]
#[derive(Debug, Default)]
#[brw(little)]
pub struct Smb1LogoffResponse {
    #[bw(calc = 2)]
    #[br(assert(_word_count == 2))]
    _word_count: u8,
    #[bw(calc = AndXHeader::default())]
    _andx: AndXHeader,
    #[bw(calc = 0)]
    _byte_count: u16,
}

/// Writes the final string of a body and patches the distance from the
/// body start into the byte-count marker.
#[binrw::writer(writer, endian)]
pub(crate) fn write_and_patch_byte_count(
    value: &Smb1String,
    unicode: bool,
    byte_count: &PosMarker<u16>,
    body_start: &PosMarker<()>,
) -> BinResult<()> {
    value.write_options(writer, endian, (unicode,))?;
    let total = writer.stream_position()? - body_start.pos.get();
    byte_count.write_back(total, writer, endian)
}

/// Blob flavor of [`write_and_patch_byte_count`].
#[binrw::writer(writer, endian)]
pub(crate) fn write_blob_and_patch_byte_count(
    value: &Vec<u8>,
    byte_count: &PosMarker<u16>,
    body_start: &PosMarker<()>,
) -> BinResult<()> {
    value.write_options(writer, endian, ())?;
    let total = writer.stream_position()? - body_start.pos.get();
    byte_count.write_back(total, writer, endian)
}
