//! Create and close ([MS-SMB2] 2.2.13 — 2.2.16). This client sends no
//! create contexts and ignores any the server returns.

use binrw::prelude::*;

use super::header::FileId;
use crate::packets::binrw_util::prelude::*;

#[derive(BinRead, BinWrite, Debug, PartialEq, Eq, Clone, Copy)]
#[brw(repr(u32), little)]
pub enum CreateDisposition {
    Supersede = 0x0,
    Open = 0x1,
    Create = 0x2,
    OpenIf = 0x3,
    Overwrite = 0x4,
    OverwriteIf = 0x5,
}

/// The action the server took on create ([MS-SMB2] 2.2.14). Kept raw;
/// unknown values fall back to "opened" at the file-store layer.
pub const CREATE_ACTION_SUPERSEDED: u32 = 0x0;
pub const CREATE_ACTION_OPENED: u32 = 0x1;
pub const CREATE_ACTION_CREATED: u32 = 0x2;
pub const CREATE_ACTION_OVERWRITTEN: u32 = 0x3;

#[derive(BinRead, BinWrite, Debug, PartialEq, Eq, Clone, Copy)]
#[brw(repr(u32), little)]
pub enum ImpersonationLevel {
    Anonymous = 0x0,
    Identification = 0x1,
    Impersonation = 0x2,
    Delegate = 0x3,
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb2CreateRequest {
    #[bw(calc = 57)]
    #[br(assert(_structure_size == 57))]
    _structure_size: u16,
    #[bw(calc = 0)]
    _security_flags: u8,
    pub requested_oplock_level: u8,
    pub impersonation_level: ImpersonationLevel,
    #[bw(calc = 0)]
    _smb_create_flags: u64,
    #[bw(calc = 0)]
    _reserved: u64,
    pub desired_access: u32,
    pub file_attributes: u32,
    pub share_access: u32,
    pub create_disposition: CreateDisposition,
    pub create_options: u32,
    #[bw(calc = PosMarker::default())]
    _name_offset: PosMarker<u16>,
    #[bw(try_calc = name.size().try_into())]
    name_length: u16,
    #[bw(calc = 0)]
    _create_contexts_offset: u32,
    #[bw(calc = 0)]
    _create_contexts_length: u32,
    /// Share-relative path, no leading backslash. Empty opens the root.
    #[br(seek_before = std::io::SeekFrom::Start(_name_offset.value as u64), args(name_length as u64))]
    #[bw(write_with = write_name_buffer, args(&_name_offset))]
    pub name: SizedWideString,
}

/// The name buffer must occupy at least one byte even for the root open.
#[binrw::writer(writer, endian)]
fn write_name_buffer(name: &SizedWideString, name_offset: &PosMarker<u16>) -> BinResult<()> {
    name_offset.write_back(writer.stream_position()?, writer, endian)?;
    if name.is_empty() {
        0u8.write_options(writer, endian, ())
    } else {
        name.write_options(writer, endian, ())
    }
}

#[binrw::binrw]
#[derive(Debug, Clone)]
#[brw(little)]
pub struct Smb2CreateResponse {
    #[bw(calc = 89)]
    #[br(assert(_structure_size == 89))]
    _structure_size: u16,
    pub oplock_level: u8,
    #[bw(calc = 0)]
    _flags: u8,
    pub create_action: u32,
    pub creation_time: FileTime,
    pub last_access_time: FileTime,
    pub last_write_time: FileTime,
    pub change_time: FileTime,
    pub allocation_size: u64,
    pub end_of_file: u64,
    pub file_attributes: u32,
    #[bw(calc = 0)]
    _reserved2: u32,
    pub file_id: FileId,
    #[bw(calc = 0)]
    _create_contexts_offset: u32,
    #[bw(calc = 0)]
    _create_contexts_length: u32,
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb2CloseRequest {
    #[bw(calc = 24)]
    #[br(assert(_structure_size == 24))]
    _structure_size: u16,
    pub flags: u16,
    #[bw(calc = 0)]
    _reserved: u32,
    pub file_id: FileId,
}

#[binrw::binrw]
#[derive(Debug, Default)]
#[brw(little)]
pub struct Smb2CloseResponse {
    #[bw(calc = 60)]
    #[br(assert(_structure_size == 60))]
    _structure_size: u16,
    pub flags: u16,
    #[bw(calc = 0)]
    _reserved: u32,
    pub creation_time: FileTime,
    pub last_access_time: FileTime,
    pub last_write_time: FileTime,
    pub change_time: FileTime,
    pub allocation_size: u64,
    pub end_of_file: u64,
    pub file_attributes: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packets::smb2::message::tests::{decode_message, encode_message};
    use crate::packets::smb2::*;

    fn create_request(name: &str) -> Smb2CreateRequest {
        Smb2CreateRequest {
            requested_oplock_level: 0,
            impersonation_level: ImpersonationLevel::Impersonation,
            desired_access: 0x0012019F,
            file_attributes: 0,
            share_access: 0x7,
            create_disposition: CreateDisposition::Open,
            create_options: 0,
            name: name.into(),
        }
    }

    #[test]
    fn test_create_request_round_trip() {
        let bytes = encode_message(
            Smb2Header::new(Smb2Command::Create),
            Smb2Content::CreateRequest(create_request(r"dir\test.bin")),
        );
        let message = decode_message(&bytes);
        let Smb2Content::CreateRequest(parsed) = message.content else {
            panic!("wrong content: {:?}", message.content);
        };
        assert_eq!(parsed.name.to_string(), r"dir\test.bin");
        assert_eq!(parsed.create_disposition, CreateDisposition::Open);
    }

    #[test]
    fn test_create_request_empty_name_keeps_buffer_byte() {
        let bytes = encode_message(
            Smb2Header::new(Smb2Command::Create),
            Smb2Content::CreateRequest(create_request("")),
        );
        // 64 header + 56 fixed body + 1 buffer placeholder byte.
        assert_eq!(bytes.len(), Smb2Header::STRUCT_SIZE + 56 + 1);
        let message = decode_message(&bytes);
        let Smb2Content::CreateRequest(parsed) = message.content else {
            panic!("wrong content: {:?}", message.content);
        };
        assert!(parsed.name.is_empty());
    }

    #[test]
    fn test_create_response_round_trip() {
        let mut header = Smb2Header::new(Smb2Command::Create);
        header.flags.set_server_to_redir(true);
        let file_id = FileId {
            persistent: 0x0102030405060708,
            volatile: 0x1112131415161718,
        };
        let bytes = encode_message(
            header,
            Smb2Content::CreateResponse(Smb2CreateResponse {
                oplock_level: 0,
                create_action: CREATE_ACTION_CREATED,
                creation_time: 0.into(),
                last_access_time: 0.into(),
                last_write_time: 0.into(),
                change_time: 0.into(),
                allocation_size: 0,
                end_of_file: 0,
                file_attributes: 0x20,
                file_id,
            }),
        );
        let message = decode_message(&bytes);
        let Smb2Content::CreateResponse(parsed) = message.content else {
            panic!("wrong content: {:?}", message.content);
        };
        assert_eq!(parsed.create_action, CREATE_ACTION_CREATED);
        assert_eq!(parsed.file_id, file_id);
    }
}
