//! TreeConnectAndX / TreeDisconnect ([MS-CIFS] 2.2.4.55, 2.2.4.51).

use binrw::prelude::*;

use super::header::AndXHeader;
use super::session_setup::write_and_patch_byte_count;
use super::string::Smb1String;
use crate::packets::binrw_util::prelude::*;

#[binrw::binrw]
#[derive(Debug)]
#[brw(little, import(unicode: bool))]
pub struct Smb1TreeConnectRequest {
    #[bw(calc = 4)]
    #[br(assert(_word_count == 4))]
    _word_count: u8,
    #[bw(calc = AndXHeader::default())]
    _andx: AndXHeader,
    pub flags: u16,
    #[bw(try_calc = password.len().try_into())]
    password_length: u16,
    #[bw(calc = PosMarker::default())]
    byte_count: PosMarker<u16>,
    #[bw(calc = PosMarker::default())]
    _body_start: PosMarker<()>,
    /// Share-level password; a single null byte under user-level security.
    #[br(count = password_length)]
    pub password: Vec<u8>,
    /// `\\server\share` UNC path.
    #[brw(args(unicode))]
    pub path: Smb1String,
    /// Requested service type, always OEM-encoded (`?????` = any).
    #[br(args(false))]
    #[bw(write_with = write_and_patch_byte_count, args(false, &byte_count, &_body_start))]
    pub service: Smb1String,
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb1TreeConnectResponse {
    #[br(assert(word_count >= 3))]
    pub word_count: u8,
    #[bw(calc = AndXHeader::default())]
    _andx: AndXHeader,
    pub optional_support: u16,
    /// Later revisions append access masks; not consumed.
    #[br(count = (word_count - 3) as usize * 2)]
    pub extra_words: Vec<u8>,
    #[bw(try_calc = service_and_fs.len().try_into())]
    byte_count: u16,
    /// Service string and native filesystem; not consumed.
    #[br(count = byte_count)]
    pub service_and_fs: Vec<u8>,
}

#[binrw::binrw]
#[derive(Debug, Default)]
#[brw(little)]
pub struct Smb1TreeDisconnectRequest {
    #[bw(calc = 0)]
    #[br(assert(_word_count == 0))]
    _word_count: u8,
    #[bw(calc = 0)]
    _byte_count: u16,
}

#[binrw::binrw]
#[derive(Debug, Default)]
#[brw(little)]
pub struct Smb1TreeDisconnectResponse {
    #[bw(calc = 0)]
    #[br(assert(_word_count == 0))]
    _word_count: u8,
    #[bw(calc = 0)]
    _byte_count: u16,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packets::smb1::message::tests::{decode_message, encode_message};
    use crate::packets::smb1::*;

    #[test]
    fn test_tree_connect_request_round_trip() {
        let mut header = Smb1Header::new(Smb1Command::TreeConnectAndX);
        header.flags2.set_unicode(true);
        header.uid = 0x0801;
        let bytes = encode_message(
            header,
            Smb1Content::TreeConnectRequest(Smb1TreeConnectRequest {
                flags: 0,
                password: vec![0],
                path: r"\\192.0.2.1\Public".into(),
                service: "?????".into(),
            }),
        );
        let message = decode_message(&bytes);
        assert_eq!(message.header.uid, 0x0801);
        let Smb1Content::TreeConnectRequest(parsed) = message.content else {
            panic!("wrong content: {:?}", message.content);
        };
        assert_eq!(parsed.path.0, r"\\192.0.2.1\Public");
        assert_eq!(parsed.service.0, "?????");
        assert_eq!(parsed.password, vec![0]);
    }

    #[test]
    fn test_tree_connect_response_round_trip() {
        let mut header = Smb1Header::new(Smb1Command::TreeConnectAndX);
        header.flags.set_reply(true);
        header.tid = 0x2001;
        let bytes = encode_message(
            header,
            Smb1Content::TreeConnectResponse(Smb1TreeConnectResponse {
                word_count: 3,
                optional_support: 1,
                extra_words: vec![],
                service_and_fs: b"A:\0NTFS\0".to_vec(),
            }),
        );
        let message = decode_message(&bytes);
        assert_eq!(message.header.tid, 0x2001);
        let Smb1Content::TreeConnectResponse(parsed) = message.content else {
            panic!("wrong content: {:?}", message.content);
        };
        assert_eq!(parsed.optional_support, 1);
    }
}
