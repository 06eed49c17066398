//! SMB2 wire structures, for dialects 2.0.2 and 2.1.

pub mod create;
pub mod error;
pub mod file;
pub mod header;
pub mod info;
pub mod ioctl;
pub mod message;
pub mod negotiate;
pub mod oplock;
pub mod query_dir;
pub mod session_setup;
pub mod tree_connect;

pub use create::*;
pub use error::*;
pub use file::*;
pub use header::*;
pub use info::*;
pub use ioctl::*;
pub use message::*;
pub use negotiate::*;
pub use oplock::*;
pub use query_dir::*;
pub use session_setup::*;
pub use tree_connect::*;
