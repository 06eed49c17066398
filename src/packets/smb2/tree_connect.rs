//! Tree connect and disconnect ([MS-SMB2] 2.2.9 — 2.2.12).

use binrw::prelude::*;

use crate::packets::binrw_util::prelude::*;

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb2TreeConnectRequest {
    #[bw(calc = 9)]
    #[br(assert(_structure_size == 9))]
    _structure_size: u16,
    #[bw(calc = 0)]
    _flags: u16,
    #[bw(calc = PosMarker::default())]
    _path_offset: PosMarker<u16>,
    #[bw(try_calc = path.size().try_into())]
    path_length: u16,
    /// `\\server\share` UNC path.
    #[br(seek_before = std::io::SeekFrom::Start(_path_offset.value as u64), args(path_length as u64))]
    #[bw(write_with = PosMarker::write_aoff, args(&_path_offset))]
    pub path: SizedWideString,
}

impl Smb2TreeConnectRequest {
    pub fn new(path: &str) -> Self {
        Self { path: path.into() }
    }
}

#[binrw::binrw]
#[derive(Debug, PartialEq, Eq)]
#[brw(little)]
pub struct Smb2TreeConnectResponse {
    #[bw(calc = 16)]
    #[br(assert(_structure_size == 16))]
    _structure_size: u16,
    pub share_type: Smb2ShareType,
    #[bw(calc = 0)]
    _reserved: u8,
    pub share_flags: u32,
    pub capabilities: u32,
    pub maximal_access: u32,
}

#[binrw::binrw]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[brw(repr(u8))]
pub enum Smb2ShareType {
    Disk = 0x1,
    Pipe = 0x2,
    Print = 0x3,
}

#[binrw::binrw]
#[derive(Debug, Default)]
#[brw(little)]
pub struct Smb2TreeDisconnectRequest {
    #[bw(calc = 4)]
    #[br(assert(_structure_size == 4))]
    _structure_size: u16,
    #[bw(calc = 0)]
    _reserved: u16,
}

#[binrw::binrw]
#[derive(Debug, Default)]
#[brw(little)]
pub struct Smb2TreeDisconnectResponse {
    #[bw(calc = 4)]
    #[br(assert(_structure_size == 4))]
    _structure_size: u16,
    #[bw(calc = 0)]
    _reserved: u16,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packets::smb2::message::tests::{decode_message, encode_message};
    use crate::packets::smb2::*;

    #[test]
    fn test_tree_connect_request_round_trip() {
        let mut header = Smb2Header::new(Smb2Command::TreeConnect);
        header.session_id = 9;
        let bytes = encode_message(
            header,
            Smb2Content::TreeConnectRequest(Smb2TreeConnectRequest::new(r"\\192.0.2.1\Public")),
        );
        let message = decode_message(&bytes);
        let Smb2Content::TreeConnectRequest(parsed) = message.content else {
            panic!("wrong content: {:?}", message.content);
        };
        assert_eq!(parsed.path.to_string(), r"\\192.0.2.1\Public");
    }

    #[test]
    fn test_tree_connect_response_parse() {
        let mut header = Smb2Header::new(Smb2Command::TreeConnect);
        header.flags.set_server_to_redir(true);
        header.tree_id = Some(3);
        let bytes = encode_message(
            header,
            Smb2Content::TreeConnectResponse(Smb2TreeConnectResponse {
                share_type: Smb2ShareType::Disk,
                share_flags: 0x800,
                capabilities: 0,
                maximal_access: 0x001f01ff,
            }),
        );
        let message = decode_message(&bytes);
        assert_eq!(message.header.tree_id, Some(3));
        let Smb2Content::TreeConnectResponse(parsed) = message.content else {
            panic!("wrong content: {:?}", message.content);
        };
        assert_eq!(parsed.share_type, Smb2ShareType::Disk);
        assert_eq!(parsed.maximal_access, 0x001f01ff);
    }
}
