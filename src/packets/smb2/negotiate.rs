//! SMB2 dialect negotiation ([MS-SMB2] 2.2.3, 2.2.4), for dialects
//! 2.0.2 and 2.1 — no negotiate contexts.

use binrw::prelude::*;
use modular_bitfield::prelude::*;

use crate::packets::binrw_util::prelude::*;
use crate::packets::guid::Guid;

#[derive(BinRead, BinWrite, Debug, PartialEq, Eq, PartialOrd, Ord, Copy, Clone)]
#[brw(repr(u16))]
pub enum Smb2Dialect {
    Smb0202 = 0x0202,
    Smb021 = 0x0210,
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb2NegotiateRequest {
    #[bw(calc = 36)]
    #[br(assert(_structure_size == 36))]
    _structure_size: u16,
    #[bw(try_calc = dialects.len().try_into())]
    dialect_count: u16,
    pub security_mode: NegotiateSecurityMode,
    #[bw(calc = 0)]
    _reserved: u16,
    pub capabilities: u32,
    pub client_guid: Guid,
    /// Wall-clock time at the client, UTC.
    pub client_start_time: FileTime,
    #[br(count = dialect_count)]
    pub dialects: Vec<Smb2Dialect>,
}

impl Smb2NegotiateRequest {
    pub fn new(client_guid: Guid) -> Self {
        Self {
            security_mode: NegotiateSecurityMode::new().with_signing_enabled(true),
            capabilities: 0,
            client_guid,
            client_start_time: FileTime::now(),
            dialects: vec![Smb2Dialect::Smb0202, Smb2Dialect::Smb021],
        }
    }
}

#[bitfield]
#[derive(BinRead, BinWrite, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[bw(map = |&x| Self::into_bytes(x))]
#[br(map = Self::from_bytes)]
pub struct NegotiateSecurityMode {
    pub signing_enabled: bool,
    pub signing_required: bool,
    #[skip]
    __: B14,
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb2NegotiateResponse {
    #[bw(calc = 65)]
    #[br(assert(_structure_size == 65))]
    _structure_size: u16,
    pub security_mode: NegotiateSecurityMode,
    pub dialect_revision: Smb2Dialect,
    #[bw(calc = 0)]
    _negotiate_context_count: u16,
    pub server_guid: Guid,
    pub capabilities: u32,
    pub max_transact_size: u32,
    pub max_read_size: u32,
    pub max_write_size: u32,
    pub system_time: FileTime,
    pub server_start_time: FileTime,
    #[bw(calc = PosMarker::default())]
    _security_buffer_offset: PosMarker<u16>,
    #[bw(try_calc = buffer.len().try_into())]
    security_buffer_length: u16,
    #[bw(calc = 0)]
    _negotiate_context_offset: u32,
    /// The server's SPNEGO token.
    #[br(seek_before = std::io::SeekFrom::Start(_security_buffer_offset.value as u64), count = security_buffer_length)]
    #[bw(write_with = PosMarker::write_aoff, args(&_security_buffer_offset))]
    pub buffer: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packets::smb2::message::tests::{decode_message, encode_message};
    use crate::packets::smb2::*;

    #[test]
    fn test_negotiate_request_round_trip() {
        let guid = Guid::from([0x11; 16]);
        let bytes = encode_message(
            Smb2Header::new(Smb2Command::Negotiate),
            Smb2Content::NegotiateRequest(Smb2NegotiateRequest::new(guid)),
        );
        let body = &bytes[Smb2Header::STRUCT_SIZE..];
        assert_eq!(&body[..2], &[36, 0]);
        assert_eq!(&body[2..4], &[2, 0]); // two dialects
        assert_eq!(&body[4..6], &[1, 0]); // signing enabled
        assert_eq!(&body[body.len() - 4..], &[0x02, 0x02, 0x10, 0x02]);

        let message = decode_message(&bytes);
        let Smb2Content::NegotiateRequest(parsed) = message.content else {
            panic!("wrong content: {:?}", message.content);
        };
        assert_eq!(parsed.client_guid, guid);
        assert_eq!(
            parsed.dialects,
            vec![Smb2Dialect::Smb0202, Smb2Dialect::Smb021]
        );
    }

    #[test]
    fn test_negotiate_response_round_trip() {
        let mut header = Smb2Header::new(Smb2Command::Negotiate);
        header.flags.set_server_to_redir(true);
        let blob = vec![0x60, 0x10, 0x06, 0x06, 0x2b, 0x06, 0x01, 0x05, 0x05, 0x02];
        let bytes = encode_message(
            header,
            Smb2Content::NegotiateResponse(Smb2NegotiateResponse {
                security_mode: NegotiateSecurityMode::new().with_signing_enabled(true),
                dialect_revision: Smb2Dialect::Smb021,
                server_guid: Guid::from([0x42; 16]),
                capabilities: 0,
                max_transact_size: 1048576,
                max_read_size: 1048576,
                max_write_size: 1048576,
                system_time: FileTime::from(133818609802776324),
                server_start_time: 0.into(),
                buffer: blob.clone(),
            }),
        );
        let message = decode_message(&bytes);
        let Smb2Content::NegotiateResponse(parsed) = message.content else {
            panic!("wrong content: {:?}", message.content);
        };
        assert_eq!(parsed.dialect_revision, Smb2Dialect::Smb021);
        assert_eq!(parsed.max_read_size, 1048576);
        assert_eq!(parsed.buffer, blob);
    }
}
