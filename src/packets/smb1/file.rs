//! File access over the AndX command set: NTCreateAndX, ReadAndX,
//! WriteAndX, Close ([MS-CIFS] 2.2.4.64, 2.2.4.42, 2.2.4.43, 2.2.4.5).

use binrw::prelude::*;

use super::header::{AndXHeader, Smb1Header};
use super::string::Smb1String;
use crate::packets::binrw_util::prelude::*;

#[binrw::binrw]
#[derive(Debug)]
#[brw(little, import(unicode: bool))]
pub struct Smb1NtCreateRequest {
    #[bw(calc = 24)]
    #[br(assert(_word_count == 24))]
    _word_count: u8,
    #[bw(calc = AndXHeader::default())]
    _andx: AndXHeader,
    #[bw(calc = 0)]
    _reserved: u8,
    #[bw(try_calc = file_name.encoded_len(unicode).try_into())]
    _name_length: u16,
    pub flags: u32,
    pub root_directory_fid: u32,
    pub desired_access: u32,
    pub allocation_size: u64,
    pub ext_file_attributes: u32,
    pub share_access: u32,
    pub create_disposition: u32,
    pub create_options: u32,
    pub impersonation_level: u32,
    pub security_flags: u8,
    #[bw(calc = PosMarker::default())]
    byte_count: PosMarker<u16>,
    #[bw(calc = PosMarker::default())]
    _body_start: PosMarker<()>,
    #[br(args(unicode))]
    #[bw(write_with = super::session_setup::write_and_patch_byte_count, args(unicode, &byte_count, &_body_start))]
    pub file_name: Smb1String,
}

#[binrw::binrw]
#[derive(Debug, Clone)]
#[brw(little)]
pub struct Smb1NtCreateResponse {
    #[bw(calc = 34)]
    #[br(assert(_word_count == 34))]
    _word_count: u8,
    #[bw(calc = AndXHeader::default())]
    _andx: AndXHeader,
    pub oplock_level: u8,
    pub fid: u16,
    /// The action the server took (opened/created/overwritten...).
    pub create_disposition: u32,
    pub creation_time: FileTime,
    pub last_access_time: FileTime,
    pub last_write_time: FileTime,
    pub change_time: FileTime,
    pub ext_file_attributes: u32,
    pub allocation_size: u64,
    pub end_of_file: u64,
    pub resource_type: u16,
    pub nm_pipe_status: u16,
    pub directory: u8,
    #[bw(calc = 0)]
    _byte_count: u16,
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb1ReadRequest {
    #[bw(calc = 12)]
    #[br(assert(_word_count == 12))]
    _word_count: u8,
    #[bw(calc = AndXHeader::default())]
    _andx: AndXHeader,
    pub fid: u16,
    /// Low 32 bits of the file offset.
    pub offset: u32,
    pub max_count: u16,
    pub min_count: u16,
    /// High 16 bits of the read size for large reads, else a timeout.
    pub max_count_high: u32,
    pub remaining: u16,
    /// High 32 bits of the file offset.
    pub offset_high: u32,
    #[bw(calc = 0)]
    _byte_count: u16,
}

impl Smb1ReadRequest {
    /// Fixed parameter-words length, in bytes.
    pub const PARAMETERS_LENGTH: usize = 24;

    pub fn new(fid: u16, offset: u64, max_count: u32) -> Self {
        Self {
            fid,
            offset: offset as u32,
            max_count: max_count as u16,
            min_count: 0,
            max_count_high: max_count >> 16,
            remaining: 0,
            offset_high: (offset >> 32) as u32,
        }
    }
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb1ReadResponse {
    #[bw(calc = 12)]
    #[br(assert(_word_count == 12))]
    _word_count: u8,
    #[bw(calc = AndXHeader::default())]
    _andx: AndXHeader,
    pub available: u16,
    #[bw(calc = 0)]
    _data_compaction_mode: u16,
    #[bw(calc = 0)]
    _reserved: u16,
    #[bw(try_calc = (data.len() & 0xFFFF).try_into())]
    data_length: u16,
    #[bw(calc = PosMarker::default())]
    data_offset: PosMarker<u16>,
    #[bw(try_calc = (data.len() >> 16).try_into())]
    data_length_high: u16,
    #[bw(calc = [0; 8])]
    _reserved2: [u8; 8],
    #[bw(calc = PosMarker::default())]
    byte_count: PosMarker<u16>,
    #[br(seek_before = std::io::SeekFrom::Start(data_offset.value as u64),
          count = ((data_length_high as usize) << 16) | data_length as usize)]
    #[bw(write_with = write_read_data, args(&data_offset, &byte_count))]
    pub data: Vec<u8>,
}

impl Smb1ReadResponse {
    /// Fixed parameter-words length, in bytes.
    pub const PARAMETERS_LENGTH: usize = 24;
}

/// Patches the data offset (header-relative) and the byte count before
/// laying down the read payload.
#[binrw::writer(writer, endian)]
fn write_read_data(
    data: &Vec<u8>,
    data_offset: &PosMarker<u16>,
    byte_count: &PosMarker<u16>,
) -> BinResult<()> {
    let start = writer.stream_position()?;
    data_offset.write_back(start, writer, endian)?;
    data.write_options(writer, endian, ())?;
    let total = writer.stream_position()? - start;
    // The 16-bit byte count saturates on large reads; DataLength is
    // authoritative.
    byte_count.write_back(total.min(u16::MAX as u64), writer, endian)
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb1WriteRequest {
    #[bw(calc = 14)]
    #[br(assert(_word_count == 14))]
    _word_count: u8,
    #[bw(calc = AndXHeader::default())]
    _andx: AndXHeader,
    pub fid: u16,
    /// Low 32 bits of the file offset.
    pub offset: u32,
    #[bw(calc = 0)]
    _timeout: u32,
    pub write_mode: u16,
    pub remaining: u16,
    #[bw(try_calc = (data.len() >> 16).try_into())]
    data_length_high: u16,
    #[bw(try_calc = (data.len() & 0xFFFF).try_into())]
    data_length: u16,
    #[bw(calc = PosMarker::default())]
    data_offset: PosMarker<u16>,
    /// High 32 bits of the file offset.
    pub offset_high: u32,
    #[bw(calc = PosMarker::default())]
    byte_count: PosMarker<u16>,
    #[br(seek_before = std::io::SeekFrom::Start(data_offset.value as u64),
          count = ((data_length_high as usize) << 16) | data_length as usize)]
    #[bw(write_with = write_read_data, args(&data_offset, &byte_count))]
    pub data: Vec<u8>,
}

impl Smb1WriteRequest {
    /// Fixed parameter-words length, in bytes.
    pub const PARAMETERS_LENGTH: usize = 28;
    /// Bytes of framing between the byte count and the data section.
    pub const DATA_FRAMING_LENGTH: usize = 4;

    pub fn new(fid: u16, offset: u64, data: Vec<u8>) -> Self {
        Self {
            fid,
            offset: offset as u32,
            write_mode: 0,
            remaining: 0,
            offset_high: (offset >> 32) as u32,
            data,
        }
    }
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb1WriteResponse {
    #[bw(calc = 6)]
    #[br(assert(_word_count == 6))]
    _word_count: u8,
    #[bw(calc = AndXHeader::default())]
    _andx: AndXHeader,
    pub count: u16,
    pub available: u16,
    pub count_high: u16,
    #[bw(calc = 0)]
    _reserved: u16,
    #[bw(calc = 0)]
    _byte_count: u16,
}

impl Smb1WriteResponse {
    pub fn total_count(&self) -> u32 {
        ((self.count_high as u32) << 16) | self.count as u32
    }
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb1CloseRequest {
    #[bw(calc = 3)]
    #[br(assert(_word_count == 3))]
    _word_count: u8,
    pub fid: u16,
    /// UTIME of last modification; `0xFFFFFFFF` leaves it untouched.
    pub last_time_modified: u32,
    #[bw(calc = 0)]
    _byte_count: u16,
}

#[binrw::binrw]
#[derive(Debug, Default)]
#[brw(little)]
pub struct Smb1CloseResponse {
    #[bw(calc = 0)]
    #[br(assert(_word_count == 0))]
    _word_count: u8,
    #[bw(calc = 0)]
    _byte_count: u16,
}

/// Sanity floor so the derived max sizes stay positive even against a
/// server advertising a tiny buffer.
pub const MIN_NEGOTIATED_BUFFER_SIZE: u32 = 1024;

/// Largest read this client may request, per the negotiated client
/// buffer: the response must fit a header, the word/byte counts and the
/// ReadAndX parameter words.
pub fn max_read_size(client_max_buffer_size: u32) -> u32 {
    client_max_buffer_size.max(MIN_NEGOTIATED_BUFFER_SIZE)
        - (Smb1Header::STRUCT_SIZE + 3 + Smb1ReadResponse::PARAMETERS_LENGTH) as u32
}

/// Largest write the server accepts, mirrored from its negotiated buffer
/// size. A Unicode pad byte costs one more.
pub fn max_write_size(server_max_buffer_size: u32, unicode: bool) -> u32 {
    let size = server_max_buffer_size.max(MIN_NEGOTIATED_BUFFER_SIZE)
        - (Smb1Header::STRUCT_SIZE
            + 3
            + Smb1WriteRequest::PARAMETERS_LENGTH
            + Smb1WriteRequest::DATA_FRAMING_LENGTH) as u32;
    if unicode {
        size - 1
    } else {
        size
    }
}
