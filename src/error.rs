use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Binrw Error: {0}")]
    BinRwError(#[from] binrw::Error),
    #[error("DER Error: {0}")]
    DerError(#[from] der::Error),
    #[error("Client is not connected.")]
    NotConnected,
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Unexpected message: {0}")]
    InvalidMessage(String),
    #[error("Timed out waiting for {0}")]
    TimedOut(&'static str),
    #[error("Negotiation failed: {0}")]
    NegotiationError(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("File handle does not belong to this file store")]
    InvalidHandle,
    #[error("Operation is not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("RPC fault: {0:#x}")]
    RpcFault(u32),
}
