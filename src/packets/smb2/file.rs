//! Read and write ([MS-SMB2] 2.2.19 — 2.2.22). RDMA channels are not
//! used, so the channel-info fields are pinned to zero.

use binrw::prelude::*;

use super::header::{FileId, Smb2Header};
use crate::packets::binrw_util::prelude::*;

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb2ReadRequest {
    #[bw(calc = 49)]
    #[br(assert(_structure_size == 49))]
    _structure_size: u16,
    #[bw(calc = 0)]
    _padding: u8,
    #[bw(calc = 0)]
    _flags: u8,
    pub length: u32,
    pub offset: u64,
    pub file_id: FileId,
    pub minimum_count: u32,
    #[bw(calc = 0)]
    _channel: u32,
    #[bw(calc = 0)]
    _remaining_bytes: u32,
    #[bw(calc = 0)]
    _read_channel_info_offset: u16,
    #[bw(calc = 0)]
    _read_channel_info_length: u16,
    // The fixed structure size counts one buffer byte.
    #[bw(calc = 0)]
    _buffer_placeholder: u8,
}

impl Smb2ReadRequest {
    pub fn new(file_id: FileId, offset: u64, length: u32) -> Self {
        Self {
            length,
            offset,
            file_id,
            minimum_count: 0,
        }
    }
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb2ReadResponse {
    #[bw(calc = 17)]
    #[br(assert(_structure_size == 17))]
    _structure_size: u16,
    #[br(assert(data_offset.value == 0 || data_offset.value as usize >= Smb2Header::STRUCT_SIZE))]
    #[bw(calc = PosMarker::default())]
    data_offset: PosMarker<u8>,
    #[bw(calc = 0)]
    _reserved: u8,
    #[bw(try_calc = data.len().try_into())]
    data_length: u32,
    #[bw(calc = 0)]
    _data_remaining: u32,
    #[bw(calc = 0)]
    _reserved2: u32,
    #[br(seek_before = std::io::SeekFrom::Start(data_offset.value as u64), count = data_length)]
    #[bw(write_with = PosMarker::write_aoff, args(&data_offset))]
    pub data: Vec<u8>,
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb2WriteRequest {
    #[bw(calc = 49)]
    #[br(assert(_structure_size == 49))]
    _structure_size: u16,
    #[bw(calc = PosMarker::default())]
    data_offset: PosMarker<u16>,
    #[bw(try_calc = data.len().try_into())]
    length: u32,
    pub offset: u64,
    pub file_id: FileId,
    #[bw(calc = 0)]
    _channel: u32,
    #[bw(calc = 0)]
    _remaining_bytes: u32,
    #[bw(calc = 0)]
    _write_channel_info_offset: u16,
    #[bw(calc = 0)]
    _write_channel_info_length: u16,
    pub flags: u32,
    #[br(seek_before = std::io::SeekFrom::Start(data_offset.value as u64), count = length)]
    #[bw(write_with = PosMarker::write_aoff, args(&data_offset))]
    pub data: Vec<u8>,
}

impl Smb2WriteRequest {
    pub fn new(file_id: FileId, offset: u64, data: Vec<u8>) -> Self {
        Self {
            offset,
            file_id,
            flags: 0,
            data,
        }
    }
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb2WriteResponse {
    #[bw(calc = 17)]
    #[br(assert(_structure_size == 17))]
    _structure_size: u16,
    #[bw(calc = 0)]
    _reserved: u16,
    pub count: u32,
    #[bw(calc = 0)]
    _remaining: u32,
    #[bw(calc = 0)]
    _write_channel_info_offset: u16,
    #[bw(calc = 0)]
    _write_channel_info_length: u16,
}
