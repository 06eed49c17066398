//! Directory enumeration ([MS-SMB2] 2.2.33, 2.2.34).

use binrw::prelude::*;
use modular_bitfield::prelude::*;

use super::header::FileId;
use crate::packets::binrw_util::prelude::*;
use crate::packets::fscc::FileInformationClass;

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb2QueryDirectoryRequest {
    #[bw(calc = 33)]
    #[br(assert(_structure_size == 33))]
    _structure_size: u16,
    pub file_information_class: FileInformationClass,
    pub flags: QueryDirectoryFlags,
    #[bw(assert(flags.index_specified() || *file_index == 0))]
    pub file_index: u32,
    pub file_id: FileId,
    #[bw(calc = PosMarker::default())]
    _file_name_offset: PosMarker<u16>,
    #[bw(try_calc = file_name.size().try_into())]
    file_name_length: u16,
    pub output_buffer_length: u32,
    /// The search pattern, e.g. `*`.
    #[br(seek_before = std::io::SeekFrom::Start(_file_name_offset.value as u64), args(file_name_length as u64))]
    #[bw(write_with = PosMarker::write_aoff, args(&_file_name_offset))]
    pub file_name: SizedWideString,
}

#[bitfield]
#[derive(BinWrite, BinRead, Debug, Default, Clone, Copy)]
#[bw(map = |&x| Self::into_bytes(x))]
#[br(map = Self::from_bytes)]
pub struct QueryDirectoryFlags {
    pub restart_scans: bool,
    pub return_single_entry: bool,
    pub index_specified: bool,
    pub reopen: bool,
    #[skip]
    __: B4,
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb2QueryDirectoryResponse {
    #[bw(calc = 9)]
    #[br(assert(_structure_size == 9))]
    _structure_size: u16,
    #[bw(calc = PosMarker::default())]
    output_buffer_offset: PosMarker<u16>,
    #[bw(try_calc = output_buffer.len().try_into())]
    output_buffer_length: u32,
    /// A chained run of the requested information class.
    #[br(seek_before = std::io::SeekFrom::Start(output_buffer_offset.value as u64), count = output_buffer_length)]
    #[bw(write_with = PosMarker::write_aoff, args(&output_buffer_offset))]
    pub output_buffer: Vec<u8>,
}
