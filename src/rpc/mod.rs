//! DCE/RPC over SMB named pipes, and the Server Service calls built on
//! top of it.

pub mod ndr;
pub mod pdu;
pub mod srvsvc;
