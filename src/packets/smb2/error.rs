//! The generic error response body ([MS-SMB2] 2.2.2), carried by most
//! non-success responses — including interim `STATUS_PENDING` replies.

use binrw::prelude::*;

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb2ErrorResponse {
    #[bw(calc = 9)]
    #[br(assert(_structure_size == 9))]
    _structure_size: u16,
    pub error_context_count: u8,
    #[bw(calc = 0)]
    _reserved: u8,
    #[bw(try_calc = error_data.len().try_into())]
    byte_count: u32,
    /// At least one byte is present on the wire even when empty.
    #[br(count = byte_count.max(1))]
    #[bw(write_with = write_error_data)]
    pub error_data: Vec<u8>,
}

#[binrw::writer(writer, endian)]
fn write_error_data(error_data: &Vec<u8>) -> BinResult<()> {
    if error_data.is_empty() {
        0u8.write_options(writer, endian, ())
    } else {
        error_data.write_options(writer, endian, ())
    }
}

impl Smb2ErrorResponse {
    pub fn empty() -> Self {
        Self {
            error_context_count: 0,
            error_data: vec![],
        }
    }
}
