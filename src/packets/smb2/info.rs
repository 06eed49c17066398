//! Query and set info ([MS-SMB2] 2.2.37 — 2.2.40). The info payloads
//! stay opaque here; `packets::fscc` provides the typed structures.

use binrw::prelude::*;

use super::header::FileId;
use crate::packets::binrw_util::prelude::*;

#[derive(BinRead, BinWrite, Debug, PartialEq, Eq, Clone, Copy)]
#[brw(repr(u8), little)]
pub enum InfoType {
    File = 0x1,
    FileSystem = 0x2,
    Security = 0x3,
    Quota = 0x4,
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb2QueryInfoRequest {
    #[bw(calc = 41)]
    #[br(assert(_structure_size == 41))]
    _structure_size: u16,
    pub info_type: InfoType,
    /// The information class within `info_type`; zero for security.
    pub file_info_class: u8,
    pub output_buffer_length: u32,
    #[bw(calc = 0)]
    _input_buffer_offset: u16,
    #[bw(calc = 0)]
    _reserved: u16,
    #[bw(calc = 0)]
    _input_buffer_length: u32,
    /// `SECURITY_INFORMATION` bits for security queries.
    pub additional_information: u32,
    #[bw(calc = 0)]
    _flags: u32,
    pub file_id: FileId,
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb2QueryInfoResponse {
    #[bw(calc = 9)]
    #[br(assert(_structure_size == 9))]
    _structure_size: u16,
    #[bw(calc = PosMarker::default())]
    output_buffer_offset: PosMarker<u16>,
    #[bw(try_calc = output_buffer.len().try_into())]
    output_buffer_length: u32,
    #[br(seek_before = std::io::SeekFrom::Start(output_buffer_offset.value as u64), count = output_buffer_length)]
    #[bw(write_with = PosMarker::write_aoff, args(&output_buffer_offset))]
    pub output_buffer: Vec<u8>,
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb2SetInfoRequest {
    #[bw(calc = 33)]
    #[br(assert(_structure_size == 33))]
    _structure_size: u16,
    pub info_type: InfoType,
    pub file_info_class: u8,
    #[bw(try_calc = buffer.len().try_into())]
    buffer_length: u32,
    #[bw(calc = PosMarker::default())]
    buffer_offset: PosMarker<u16>,
    #[bw(calc = 0)]
    _reserved: u16,
    pub additional_information: u32,
    pub file_id: FileId,
    #[br(seek_before = std::io::SeekFrom::Start(buffer_offset.value as u64), count = buffer_length)]
    #[bw(write_with = PosMarker::write_aoff, args(&buffer_offset))]
    pub buffer: Vec<u8>,
}

#[binrw::binrw]
#[derive(Debug, Default)]
#[brw(little)]
pub struct Smb2SetInfoResponse {
    #[bw(calc = 2)]
    #[br(assert(_structure_size == 2))]
    _structure_size: u16,
}
