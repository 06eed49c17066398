//! IOCTL / FSCTL ([MS-SMB2] 2.2.31, 2.2.32).

use binrw::prelude::*;

use super::header::FileId;
use crate::packets::binrw_util::prelude::*;

/// `FSCTL_PIPE_TRANSCEIVE`: write to and read from a named pipe in one
/// round trip. The transport for DCE/RPC over SMB.
pub const FSCTL_PIPE_TRANSCEIVE: u32 = 0x0011C017;

/// Set on `Flags` when the control code is a filesystem control.
pub const IOCTL_IS_FSCTL: u32 = 0x1;

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb2IoctlRequest {
    #[bw(calc = 57)]
    #[br(assert(_structure_size == 57))]
    _structure_size: u16,
    #[bw(calc = 0)]
    _reserved: u16,
    pub ctl_code: u32,
    pub file_id: FileId,
    #[bw(calc = PosMarker::default())]
    input_offset: PosMarker<u32>,
    #[bw(try_calc = input.len().try_into())]
    input_count: u32,
    #[bw(calc = 0)]
    _max_input_response: u32,
    #[bw(calc = 0)]
    _output_offset: u32,
    #[bw(calc = 0)]
    _output_count: u32,
    pub max_output_response: u32,
    pub flags: u32,
    #[bw(calc = 0)]
    _reserved2: u32,
    #[br(seek_before = std::io::SeekFrom::Start(input_offset.value as u64), count = input_count)]
    #[bw(write_with = PosMarker::write_aoff, args(&input_offset))]
    pub input: Vec<u8>,
}

impl Smb2IoctlRequest {
    pub fn fsctl(file_id: FileId, ctl_code: u32, input: Vec<u8>, max_output: u32) -> Self {
        Self {
            ctl_code,
            file_id,
            max_output_response: max_output,
            flags: IOCTL_IS_FSCTL,
            input,
        }
    }
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb2IoctlResponse {
    #[bw(calc = 49)]
    #[br(assert(_structure_size == 49))]
    _structure_size: u16,
    #[bw(calc = 0)]
    _reserved: u16,
    pub ctl_code: u32,
    pub file_id: FileId,
    #[bw(calc = 0)]
    _input_offset: u32,
    #[bw(calc = 0)]
    _input_count: u32,
    #[bw(calc = PosMarker::default())]
    output_offset: PosMarker<u32>,
    #[bw(try_calc = output.len().try_into())]
    output_count: u32,
    pub flags: u32,
    #[bw(calc = 0)]
    _reserved2: u32,
    #[br(seek_before = std::io::SeekFrom::Start(output_offset.value as u64), count = output_count)]
    #[bw(write_with = PosMarker::write_aoff, args(&output_offset))]
    pub output: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packets::smb2::message::tests::{decode_message, encode_message};
    use crate::packets::smb2::*;

    #[test]
    fn test_ioctl_request_round_trip() {
        let input = vec![5u8; 24];
        let bytes = encode_message(
            Smb2Header::new(Smb2Command::Ioctl),
            Smb2Content::IoctlRequest(Smb2IoctlRequest::fsctl(
                FileId {
                    persistent: 1,
                    volatile: 2,
                },
                FSCTL_PIPE_TRANSCEIVE,
                input.clone(),
                4096,
            )),
        );
        let message = decode_message(&bytes);
        let Smb2Content::IoctlRequest(parsed) = message.content else {
            panic!("wrong content: {:?}", message.content);
        };
        assert_eq!(parsed.ctl_code, FSCTL_PIPE_TRANSCEIVE);
        assert_eq!(parsed.flags, IOCTL_IS_FSCTL);
        assert_eq!(parsed.input, input);
    }

    #[test]
    fn test_ioctl_response_round_trip() {
        let mut header = Smb2Header::new(Smb2Command::Ioctl);
        header.flags.set_server_to_redir(true);
        let output = vec![7u8; 100];
        let bytes = encode_message(
            header,
            Smb2Content::IoctlResponse(Smb2IoctlResponse {
                ctl_code: FSCTL_PIPE_TRANSCEIVE,
                file_id: FileId {
                    persistent: 1,
                    volatile: 2,
                },
                flags: 0,
                output: output.clone(),
            }),
        );
        let message = decode_message(&bytes);
        let Smb2Content::IoctlResponse(parsed) = message.content else {
            panic!("wrong content: {:?}", message.content);
        };
        assert_eq!(parsed.output, output);
    }
}
