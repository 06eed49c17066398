//! The SMB1 message envelope.
//!
//! Header and body serialize into a single stream so that the
//! header-relative offsets carried by AndX and transaction bodies equal
//! absolute stream positions.

use binrw::prelude::*;

use super::file::*;
use super::header::*;
use super::negotiate::*;
use super::session_setup::*;
use super::transaction::*;
use super::tree_connect::*;

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb1Message {
    pub header: Smb1Header,
    #[brw(args(header.command, header.flags.reply(), header.flags2.unicode()))]
    pub content: Smb1Content,
}

impl Smb1Message {
    pub fn new(header: Smb1Header, content: Smb1Content) -> Self {
        Self { header, content }
    }

    pub fn encode(&self) -> crate::Result<Vec<u8>> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        self.write(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    pub fn decode(data: &[u8]) -> crate::Result<Self> {
        Ok(Self::read(&mut std::io::Cursor::new(data))?)
    }

    pub fn status(&self) -> crate::packets::status::Status {
        crate::packets::status::Status::from_u32(self.header.status)
    }
}

/// Every command body this client understands; anything else — including
/// error-status bodies and unsolicited oplock breaks — lands in
/// [`Smb1Content::Raw`].
#[binrw::binrw]
#[derive(Debug)]
#[brw(import(command: Smb1Command, from_server: bool, unicode: bool))]
pub enum Smb1Content {
    #[br(pre_assert(matches!(command, Smb1Command::Negotiate) && !from_server))]
    NegotiateRequest(Smb1NegotiateRequest),
    #[br(pre_assert(matches!(command, Smb1Command::Negotiate) && from_server))]
    NegotiateResponse(Smb1NegotiateResponse),

    #[br(pre_assert(matches!(command, Smb1Command::SessionSetupAndX) && !from_server))]
    SessionSetupRequest(#[brw(args(unicode))] Smb1SessionSetupRequest),
    #[br(pre_assert(matches!(command, Smb1Command::SessionSetupAndX) && !from_server))]
    SessionSetupExtendedRequest(#[brw(args(unicode))] Smb1SessionSetupExtendedRequest),
    #[br(pre_assert(matches!(command, Smb1Command::SessionSetupAndX) && from_server))]
    SessionSetupExtendedResponse(Smb1SessionSetupExtendedResponse),
    #[br(pre_assert(matches!(command, Smb1Command::SessionSetupAndX) && from_server))]
    SessionSetupResponse(Smb1SessionSetupResponse),

    #[br(pre_assert(matches!(command, Smb1Command::LogoffAndX) && !from_server))]
    LogoffRequest(Smb1LogoffRequest),
    #[br(pre_assert(matches!(command, Smb1Command::LogoffAndX) && from_server))]
    LogoffResponse(Smb1LogoffResponse),

    #[br(pre_assert(matches!(command, Smb1Command::TreeConnectAndX) && !from_server))]
    TreeConnectRequest(#[brw(args(unicode))] Smb1TreeConnectRequest),
    #[br(pre_assert(matches!(command, Smb1Command::TreeConnectAndX) && from_server))]
    TreeConnectResponse(Smb1TreeConnectResponse),

    #[br(pre_assert(matches!(command, Smb1Command::TreeDisconnect) && !from_server))]
    TreeDisconnectRequest(Smb1TreeDisconnectRequest),
    #[br(pre_assert(matches!(command, Smb1Command::TreeDisconnect) && from_server))]
    TreeDisconnectResponse(Smb1TreeDisconnectResponse),

    #[br(pre_assert(matches!(command, Smb1Command::NtCreateAndX) && !from_server))]
    NtCreateRequest(#[brw(args(unicode))] Smb1NtCreateRequest),
    #[br(pre_assert(matches!(command, Smb1Command::NtCreateAndX) && from_server))]
    NtCreateResponse(Smb1NtCreateResponse),

    #[br(pre_assert(matches!(command, Smb1Command::Close) && !from_server))]
    CloseRequest(Smb1CloseRequest),
    #[br(pre_assert(matches!(command, Smb1Command::Close) && from_server))]
    CloseResponse(Smb1CloseResponse),

    #[br(pre_assert(matches!(command, Smb1Command::ReadAndX) && !from_server))]
    ReadRequest(Smb1ReadRequest),
    #[br(pre_assert(matches!(command, Smb1Command::ReadAndX) && from_server))]
    ReadResponse(Smb1ReadResponse),

    #[br(pre_assert(matches!(command, Smb1Command::WriteAndX) && !from_server))]
    WriteRequest(Smb1WriteRequest),
    #[br(pre_assert(matches!(command, Smb1Command::WriteAndX) && from_server))]
    WriteResponse(Smb1WriteResponse),

    #[br(pre_assert(matches!(command, Smb1Command::Transaction2) && !from_server))]
    Transaction2Request(Smb1Transaction2Request),
    #[br(pre_assert(matches!(command, Smb1Command::Transaction2) && from_server))]
    Transaction2Response(Smb1Transaction2Response),

    #[br(pre_assert(matches!(command, Smb1Command::NtTransact) && !from_server))]
    NtTransactRequest(Smb1NtTransactRequest),
    #[br(pre_assert(matches!(command, Smb1Command::NtTransact) && from_server))]
    NtTransactResponse(Smb1NtTransactResponse),

    Raw(Smb1RawContent),
}

impl Smb1Content {
    /// The command code a body travels under.
    pub fn associated_command(&self) -> Option<Smb1Command> {
        use Smb1Content::*;
        Some(match self {
            NegotiateRequest(_) | NegotiateResponse(_) => Smb1Command::Negotiate,
            SessionSetupRequest(_)
            | SessionSetupExtendedRequest(_)
            | SessionSetupResponse(_)
            | SessionSetupExtendedResponse(_) => Smb1Command::SessionSetupAndX,
            LogoffRequest(_) | LogoffResponse(_) => Smb1Command::LogoffAndX,
            TreeConnectRequest(_) | TreeConnectResponse(_) => Smb1Command::TreeConnectAndX,
            TreeDisconnectRequest(_) | TreeDisconnectResponse(_) => Smb1Command::TreeDisconnect,
            NtCreateRequest(_) | NtCreateResponse(_) => Smb1Command::NtCreateAndX,
            CloseRequest(_) | CloseResponse(_) => Smb1Command::Close,
            ReadRequest(_) | ReadResponse(_) => Smb1Command::ReadAndX,
            WriteRequest(_) | WriteResponse(_) => Smb1Command::WriteAndX,
            Transaction2Request(_) | Transaction2Response(_) => Smb1Command::Transaction2,
            NtTransactRequest(_) | NtTransactResponse(_) => Smb1Command::NtTransact,
            Raw(_) => return None,
        })
    }
}

/// An uninterpreted command body: parameter words and data bytes.
#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb1RawContent {
    pub word_count: u8,
    #[br(count = word_count as usize * 2)]
    pub words: Vec<u8>,
    #[bw(try_calc = bytes.len().try_into())]
    byte_count: u16,
    #[br(count = byte_count)]
    pub bytes: Vec<u8>,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Serializes a full message, returning the raw bytes.
    pub fn encode_message(header: Smb1Header, content: Smb1Content) -> Vec<u8> {
        Smb1Message::new(header, content).encode().unwrap()
    }

    pub fn decode_message(bytes: &[u8]) -> Smb1Message {
        Smb1Message::decode(bytes).unwrap()
    }

    #[test]
    fn test_error_body_falls_back_to_raw() {
        let mut header = Smb1Header::new(Smb1Command::TreeConnectAndX);
        header.flags.set_reply(true);
        header.status = crate::Status::BadNetworkName.as_u32();
        let bytes = encode_message(
            header,
            Smb1Content::Raw(Smb1RawContent {
                word_count: 0,
                words: vec![],
                bytes: vec![],
            }),
        );
        let message = decode_message(&bytes);
        assert_eq!(message.status(), crate::Status::BadNetworkName);
        assert!(matches!(message.content, Smb1Content::Raw(_)));
    }

    #[test]
    fn test_oplock_break_notification_parses() {
        // An unsolicited LockingAndX break: parsed raw, admitted by MID.
        let mut header = Smb1Header::new(Smb1Command::LockingAndX);
        header.flags.set_reply(true);
        header.mid = Smb1Header::OPLOCK_BREAK_MID;
        let bytes = encode_message(
            header,
            Smb1Content::Raw(Smb1RawContent {
                word_count: 8,
                words: vec![0xFF, 0, 0, 0, 4, 0, 0x02, 0, 0, 0, 0, 0, 0, 0, 0, 0],
                bytes: vec![],
            }),
        );
        let message = decode_message(&bytes);
        assert_eq!(message.header.mid, Smb1Header::OPLOCK_BREAK_MID);
        assert!(matches!(message.content, Smb1Content::Raw(_)));
    }
}
