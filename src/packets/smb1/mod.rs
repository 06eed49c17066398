//! SMB1/CIFS wire structures, for the `NT LM 0.12` dialect.

pub mod file;
pub mod header;
pub mod message;
pub mod negotiate;
pub mod session_setup;
pub mod string;
pub mod transaction;
pub mod tree_connect;

pub use file::*;
pub use header::*;
pub use message::*;
pub use negotiate::*;
pub use session_setup::*;
pub use string::*;
pub use transaction::*;
pub use tree_connect::*;
