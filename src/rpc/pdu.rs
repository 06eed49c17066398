//! Connection-oriented DCE/RPC v5.0 PDUs, as carried over named pipes
//! (C706 ch. 12). Single-fragment only: every PDU this client sends or
//! accepts is both first and last fragment.

use binrw::io::TakeSeekExt;
use binrw::prelude::*;

use crate::packets::binrw_util::prelude::*;
use crate::packets::guid::Guid;

/// First-and-last fragment flags.
pub const PFC_SINGLE_FRAGMENT: u8 = 0x03;
/// Little-endian, ASCII, IEEE float data representation.
pub const NDR_DATA_REPRESENTATION: u32 = 0x0000_0010;

pub const DCE_RPC_VERSION_MAJOR: u8 = 5;
pub const DCE_RPC_VERSION_MINOR: u8 = 0;

#[derive(BinRead, BinWrite, Debug, PartialEq, Eq, Clone, Copy)]
#[brw(repr(u8))]
pub enum DceRpcPacketType {
    Request = 0,
    Response = 2,
    Fault = 3,
    Bind = 11,
    BindAck = 12,
    BindNak = 13,
}

/// An interface or transfer syntax identifier: UUID plus version.
#[binrw::binrw]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[brw(little)]
pub struct SyntaxId {
    pub uuid: Guid,
    pub version_major: u16,
    pub version_minor: u16,
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct DceRpcMessage {
    #[bw(calc = DCE_RPC_VERSION_MAJOR)]
    #[br(assert(_version_major == DCE_RPC_VERSION_MAJOR))]
    _version_major: u8,
    #[bw(calc = DCE_RPC_VERSION_MINOR)]
    _version_minor: u8,
    #[bw(calc = content.packet_type())]
    packet_type: DceRpcPacketType,
    pub pfc_flags: u8,
    pub data_representation: u32,
    #[bw(calc = PosMarker::default())]
    #[br(assert(frag_length.value as usize >= Self::COMMON_SIZE))]
    frag_length: PosMarker<u16>,
    #[bw(calc = 0)]
    _auth_length: u16,
    pub call_id: u32,
    #[br(args(packet_type), map_stream = |s| s.take_seek(frag_length.value as u64 - Self::COMMON_SIZE as u64))]
    pub content: DceRpcContent,
    #[bw(write_with = write_frag_length, args(&frag_length))]
    _frag_end: (),
}

impl DceRpcMessage {
    pub const COMMON_SIZE: usize = 16;

    pub fn new(call_id: u32, content: DceRpcContent) -> Self {
        Self {
            pfc_flags: PFC_SINGLE_FRAGMENT,
            data_representation: NDR_DATA_REPRESENTATION,
            call_id,
            content,
            _frag_end: (),
        }
    }

    pub fn encode(&self) -> crate::Result<Vec<u8>> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        self.write(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    pub fn decode(data: &[u8]) -> crate::Result<Self> {
        Ok(Self::read(&mut std::io::Cursor::new(data))?)
    }
}

/// The whole PDU was serialized from offset zero, so the final stream
/// position is the fragment length.
#[binrw::writer(writer, endian)]
fn write_frag_length(_: &(), frag_length: &PosMarker<u16>) -> BinResult<()> {
    let end = writer.stream_position()?;
    frag_length.write_back(end, writer, endian)
}

#[binrw::binrw]
#[derive(Debug)]
#[br(import(packet_type: DceRpcPacketType))]
#[brw(little)]
pub enum DceRpcContent {
    #[br(pre_assert(packet_type == DceRpcPacketType::Bind))]
    Bind(DceRpcBind),
    #[br(pre_assert(packet_type == DceRpcPacketType::BindAck))]
    BindAck(DceRpcBindAck),
    #[br(pre_assert(packet_type == DceRpcPacketType::BindNak))]
    BindNak(DceRpcBindNak),
    #[br(pre_assert(packet_type == DceRpcPacketType::Request))]
    Request(DceRpcRequest),
    #[br(pre_assert(packet_type == DceRpcPacketType::Response))]
    Response(DceRpcResponse),
    #[br(pre_assert(packet_type == DceRpcPacketType::Fault))]
    Fault(DceRpcFault),
}

impl DceRpcContent {
    pub fn packet_type(&self) -> DceRpcPacketType {
        match self {
            DceRpcContent::Bind(_) => DceRpcPacketType::Bind,
            DceRpcContent::BindAck(_) => DceRpcPacketType::BindAck,
            DceRpcContent::BindNak(_) => DceRpcPacketType::BindNak,
            DceRpcContent::Request(_) => DceRpcPacketType::Request,
            DceRpcContent::Response(_) => DceRpcPacketType::Response,
            DceRpcContent::Fault(_) => DceRpcPacketType::Fault,
        }
    }
}

/// Bind with a single presentation context carrying one transfer syntax.
#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct DceRpcBind {
    pub max_xmit_frag: u16,
    pub max_recv_frag: u16,
    pub assoc_group_id: u32,
    #[bw(calc = 1)]
    #[br(assert(_num_context_items == 1))]
    _num_context_items: u8,
    #[bw(calc = [0; 3])]
    _pad: [u8; 3],
    pub context_id: u16,
    #[bw(calc = 1)]
    _num_transfer_syntaxes: u8,
    #[bw(calc = 0)]
    _pad2: u8,
    pub abstract_syntax: SyntaxId,
    pub transfer_syntax: SyntaxId,
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct DceRpcBindAck {
    pub max_xmit_frag: u16,
    pub max_recv_frag: u16,
    pub assoc_group_id: u32,
    #[bw(try_calc = secondary_address.len().try_into())]
    secondary_address_length: u16,
    #[br(count = secondary_address_length)]
    pub secondary_address: Vec<u8>,
    // The result list is 4-aligned from the PDU start; the PDU header is
    // 16 bytes, so alignment holds within this stream as well.
    #[brw(align_before = 4)]
    #[bw(calc = 1)]
    #[br(assert(_num_results >= 1))]
    _num_results: u8,
    #[bw(calc = [0; 3])]
    _pad: [u8; 3],
    /// 0 = acceptance.
    pub result: u16,
    pub reason: u16,
    pub transfer_syntax: SyntaxId,
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct DceRpcBindNak {
    pub reject_reason: u16,
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct DceRpcRequest {
    pub alloc_hint: u32,
    pub context_id: u16,
    pub opnum: u16,
    #[br(parse_with = binrw::helpers::until_eof)]
    pub stub_data: Vec<u8>,
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct DceRpcResponse {
    pub alloc_hint: u32,
    pub context_id: u16,
    pub cancel_count: u8,
    #[bw(calc = 0)]
    _reserved: u8,
    #[br(parse_with = binrw::helpers::until_eof)]
    pub stub_data: Vec<u8>,
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct DceRpcFault {
    pub alloc_hint: u32,
    pub context_id: u16,
    pub cancel_count: u8,
    #[bw(calc = 0)]
    _reserved: u8,
    pub status: u32,
    #[bw(calc = 0)]
    _reserved2: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::srvsvc::{NDR32_TRANSFER_SYNTAX, SRVSVC_INTERFACE};

    #[test]
    fn test_bind_round_trip() {
        let bind = DceRpcMessage::new(
            1,
            DceRpcContent::Bind(DceRpcBind {
                max_xmit_frag: 4280,
                max_recv_frag: 4280,
                assoc_group_id: 0,
                context_id: 0,
                abstract_syntax: SRVSVC_INTERFACE,
                transfer_syntax: NDR32_TRANSFER_SYNTAX,
            }),
        );
        let bytes = bind.encode().unwrap();
        // frag_length covers the whole PDU.
        assert_eq!(
            u16::from_le_bytes([bytes[8], bytes[9]]) as usize,
            bytes.len()
        );
        let parsed = DceRpcMessage::decode(&bytes).unwrap();
        let DceRpcContent::Bind(parsed_bind) = parsed.content else {
            panic!("wrong content");
        };
        assert_eq!(parsed_bind.abstract_syntax, SRVSVC_INTERFACE);
        assert_eq!(parsed_bind.transfer_syntax, NDR32_TRANSFER_SYNTAX);
    }

    #[test]
    fn test_request_round_trip() {
        let request = DceRpcMessage::new(
            2,
            DceRpcContent::Request(DceRpcRequest {
                alloc_hint: 4,
                context_id: 0,
                opnum: 15,
                stub_data: vec![1, 2, 3, 4],
            }),
        );
        let bytes = request.encode().unwrap();
        let parsed = DceRpcMessage::decode(&bytes).unwrap();
        let DceRpcContent::Request(parsed_request) = parsed.content else {
            panic!("wrong content");
        };
        assert_eq!(parsed_request.opnum, 15);
        assert_eq!(parsed_request.stub_data, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_bind_ack_round_trip() {
        let ack = DceRpcMessage::new(
            1,
            DceRpcContent::BindAck(DceRpcBindAck {
                max_xmit_frag: 4280,
                max_recv_frag: 4280,
                assoc_group_id: 0x1234,
                secondary_address: b"\\PIPE\\srvsvc\0".to_vec(),
                result: 0,
                reason: 0,
                transfer_syntax: NDR32_TRANSFER_SYNTAX,
            }),
        );
        let bytes = ack.encode().unwrap();
        let parsed = DceRpcMessage::decode(&bytes).unwrap();
        let DceRpcContent::BindAck(parsed_ack) = parsed.content else {
            panic!("wrong content");
        };
        assert_eq!(parsed_ack.result, 0);
        assert_eq!(parsed_ack.secondary_address, b"\\PIPE\\srvsvc\0".to_vec());
    }
}
