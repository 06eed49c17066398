//! Server Service (`srvsvc`) client: `NetrShareEnum` at information
//! level 1, over FSCTL_PIPE_TRANSCEIVE on the `srvsvc` named pipe.

use crate::filestore::{CreateFileArgs, FileStore};
use crate::packets::smb2::FSCTL_PIPE_TRANSCEIVE;
use crate::packets::status::Status;
use crate::rpc::ndr::{NdrReader, NdrWriter};
use crate::rpc::pdu::*;
use crate::Error;

/// Abstract syntax of the Server Service ([MS-SRVS]).
pub const SRVSVC_INTERFACE: SyntaxId = SyntaxId {
    uuid: crate::packets::guid::Guid::from_fields(
        0x4b324fc8, 0x1670, 0x01d3, [0x12, 0x78, 0x5a, 0x47, 0xbf, 0x6e, 0xe1, 0x88],
    ),
    version_major: 3,
    version_minor: 0,
};

/// NDR32 transfer syntax (C706).
pub const NDR32_TRANSFER_SYNTAX: SyntaxId = SyntaxId {
    uuid: crate::packets::guid::Guid::from_fields(
        0x8a885d04, 0x1ceb, 0x11c9, [0x9f, 0xe8, 0x08, 0x00, 0x2b, 0x10, 0x48, 0x60],
    ),
    version_major: 2,
    version_minor: 0,
};

/// `NetrShareEnum` operation number.
pub const OPNUM_NETR_SHARE_ENUM: u16 = 15;

/// Share kind mask and kinds ([MS-SRVS] 2.2.2.4); the high bits flag
/// special/temporary shares.
pub const SHARE_KIND_MASK: u32 = 0x0FFF_FFFF;
pub const SHARE_KIND_DISK: u32 = 0;

const BIND_CALL_ID: u32 = 1;
const ENUM_CALL_ID: u32 = 2;
const FRAG_SIZE: u16 = 4280;
const TRANSCEIVE_MAX_OUTPUT: u32 = 65536;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareInfo1 {
    pub name: String,
    pub share_type: u32,
    pub remark: String,
}

impl ShareInfo1 {
    pub fn is_disk(&self) -> bool {
        self.share_type & SHARE_KIND_MASK == SHARE_KIND_DISK
    }
}

/// Enumerates the disk shares of `server_name` through an `IPC$` file
/// store: opens the pipe, binds the interface, runs the enumeration and
/// closes the pipe again.
pub fn net_share_enum(
    store: &dyn FileStore,
    server_name: &str,
) -> crate::Result<(Vec<String>, Status)> {
    let (result, status) = store.create_file("srvsvc", &CreateFileArgs::named_pipe())?;
    let Some(pipe) = result else {
        return Ok((vec![], status));
    };
    if !status.is_success() {
        return Ok((vec![], status));
    }
    log::debug!("Opened the srvsvc pipe; binding");

    let outcome = bind_and_enumerate(store, &pipe.handle, server_name);

    let close_status = store.close_file(&pipe.handle)?;
    if !close_status.is_success() {
        log::warn!("Closing the srvsvc pipe failed: {close_status}");
    }
    outcome
}

fn bind_and_enumerate(
    store: &dyn FileStore,
    pipe: &crate::filestore::FileHandle,
    server_name: &str,
) -> crate::Result<(Vec<String>, Status)> {
    let bind = build_bind().encode()?;
    let (response, status) =
        store.device_io_control(pipe, FSCTL_PIPE_TRANSCEIVE, &bind, TRANSCEIVE_MAX_OUTPUT)?;
    if !(status == Status::Success || status == Status::BufferOverflow) {
        return Ok((vec![], status));
    }
    check_bind_ack(&DceRpcMessage::decode(&response)?)?;

    let request = build_share_enum_request(server_name).encode()?;
    let (response, status) =
        store.device_io_control(pipe, FSCTL_PIPE_TRANSCEIVE, &request, TRANSCEIVE_MAX_OUTPUT)?;
    if !(status == Status::Success || status == Status::BufferOverflow) {
        return Ok((vec![], status));
    }
    let (shares, api_status) = parse_share_enum_response(&DceRpcMessage::decode(&response)?)?;
    if api_status != 0 {
        log::warn!("NetrShareEnum failed with Win32 error {api_status}");
        return Ok((vec![], Status::Other(api_status)));
    }

    let names = shares
        .into_iter()
        .filter(ShareInfo1::is_disk)
        .map(|share| share.name)
        .collect();
    Ok((names, Status::Success))
}

pub fn build_bind() -> DceRpcMessage {
    DceRpcMessage::new(
        BIND_CALL_ID,
        DceRpcContent::Bind(DceRpcBind {
            max_xmit_frag: FRAG_SIZE,
            max_recv_frag: FRAG_SIZE,
            assoc_group_id: 0,
            context_id: 0,
            abstract_syntax: SRVSVC_INTERFACE,
            transfer_syntax: NDR32_TRANSFER_SYNTAX,
        }),
    )
}

fn check_bind_ack(message: &DceRpcMessage) -> crate::Result<()> {
    match &message.content {
        DceRpcContent::BindAck(ack) if ack.result == 0 => Ok(()),
        DceRpcContent::BindAck(ack) => Err(Error::InvalidMessage(format!(
            "srvsvc bind rejected: result {} reason {}",
            ack.result, ack.reason
        ))),
        DceRpcContent::BindNak(nak) => Err(Error::InvalidMessage(format!(
            "srvsvc bind refused: reason {}",
            nak.reject_reason
        ))),
        DceRpcContent::Fault(fault) => Err(Error::RpcFault(fault.status)),
        _ => Err(Error::InvalidMessage(
            "unexpected PDU answering the srvsvc bind".into(),
        )),
    }
}

/// Marshals the `NetrShareEnum` input: server name, a level-1 enum
/// structure with an empty container, no byte cap, and a zero resume
/// handle.
pub fn build_share_enum_request(server_name: &str) -> DceRpcMessage {
    let mut ndr = NdrWriter::new();
    ndr.write_referent_id();
    ndr.write_wide_string(&format!(r"\\{server_name}"));
    ndr.write_u32(1); // InfoStruct.Level
    ndr.write_u32(1); // ShareInfo union discriminant
    ndr.write_referent_id(); // -> SHARE_INFO_1_CONTAINER
    ndr.write_u32(0); // EntriesRead
    ndr.write_null_pointer(); // Buffer
    ndr.write_u32(u32::MAX); // PreferedMaximumLength
    ndr.write_referent_id(); // -> ResumeHandle
    ndr.write_u32(0);
    let stub_data = ndr.into_buffer();

    DceRpcMessage::new(
        ENUM_CALL_ID,
        DceRpcContent::Request(DceRpcRequest {
            alloc_hint: stub_data.len() as u32,
            context_id: 0,
            opnum: OPNUM_NETR_SHARE_ENUM,
            stub_data,
        }),
    )
}

/// Unmarshals the `NetrShareEnum` output, yielding the level-1 entries
/// and the trailing NET_API_STATUS.
pub fn parse_share_enum_response(message: &DceRpcMessage) -> crate::Result<(Vec<ShareInfo1>, u32)> {
    let stub = match &message.content {
        DceRpcContent::Response(response) => &response.stub_data,
        DceRpcContent::Fault(fault) => return Err(Error::RpcFault(fault.status)),
        _ => {
            return Err(Error::InvalidMessage(
                "unexpected PDU answering NetrShareEnum".into(),
            ))
        }
    };

    let mut ndr = NdrReader::new(stub);
    let _level = ndr.read_u32()?;
    let _discriminant = ndr.read_u32()?;
    let mut shares = Vec::new();
    if ndr.read_pointer()? != 0 {
        let entries_read = ndr.read_u32()? as usize;
        if ndr.read_pointer()? != 0 {
            let _max_count = ndr.read_u32()?;
            let mut headers = Vec::with_capacity(entries_read);
            for _ in 0..entries_read {
                let name_present = ndr.read_pointer()? != 0;
                let share_type = ndr.read_u32()?;
                let remark_present = ndr.read_pointer()? != 0;
                headers.push((name_present, share_type, remark_present));
            }
            for (name_present, share_type, remark_present) in headers {
                let name = if name_present {
                    ndr.read_wide_string()?
                } else {
                    String::new()
                };
                let remark = if remark_present {
                    ndr.read_wide_string()?
                } else {
                    String::new()
                };
                shares.push(ShareInfo1 {
                    name,
                    share_type,
                    remark,
                });
            }
        }
    }
    let _total_entries = ndr.read_u32()?;
    if ndr.read_pointer()? != 0 {
        let _resume_handle = ndr.read_u32()?;
    }
    let api_status = ndr.read_u32()?;
    Ok((shares, api_status))
}

/// Marshals a `NetrShareEnum` response stub. Used by the in-process
/// test servers.
pub fn build_share_enum_response(shares: &[ShareInfo1], api_status: u32) -> DceRpcMessage {
    let mut ndr = NdrWriter::new();
    ndr.write_u32(1); // Level
    ndr.write_u32(1); // union discriminant
    ndr.write_referent_id(); // -> container
    ndr.write_u32(shares.len() as u32); // EntriesRead
    ndr.write_referent_id(); // -> array
    ndr.write_u32(shares.len() as u32); // conformance
    for share in shares {
        ndr.write_referent_id();
        ndr.write_u32(share.share_type);
        ndr.write_referent_id();
    }
    for share in shares {
        ndr.write_wide_string(&share.name);
        ndr.align(4);
        ndr.write_wide_string(&share.remark);
        ndr.align(4);
    }
    ndr.write_u32(shares.len() as u32); // TotalEntries
    ndr.write_referent_id(); // -> resume handle
    ndr.write_u32(0);
    ndr.write_u32(api_status);
    let stub_data = ndr.into_buffer();

    DceRpcMessage::new(
        ENUM_CALL_ID,
        DceRpcContent::Response(DceRpcResponse {
            alloc_hint: stub_data.len() as u32,
            context_id: 0,
            cancel_count: 0,
            stub_data,
        }),
    )
}
