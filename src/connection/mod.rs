//! Connection plumbing shared by both dialects: the framed transport,
//! the receive buffer, the background reader, and the per-dialect
//! connection cores.

pub mod buffer;
pub(crate) mod reader;
pub mod smb1;
pub mod smb2;
pub mod transport;

pub use transport::{Transport, TransportMode};
