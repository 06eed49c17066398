//! Oplock break notification ([MS-SMB2] 2.2.23.1). Recognized on the
//! wire so the inbox can admit it; no break handling is performed.

use binrw::prelude::*;

use super::header::FileId;

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb2OplockBreakNotification {
    #[bw(calc = 24)]
    #[br(assert(_structure_size == 24))]
    _structure_size: u16,
    pub oplock_level: u8,
    #[bw(calc = 0)]
    _reserved: u8,
    #[bw(calc = 0)]
    _reserved2: u32,
    pub file_id: FileId,
}
