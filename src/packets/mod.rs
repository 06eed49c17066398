//! Wire structure codecs, all binrw-based.

pub mod binrw_util;
pub mod fscc;
pub mod guid;
pub mod netbios;
pub mod smb1;
pub mod smb2;
pub mod status;
