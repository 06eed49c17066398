//! Scripted loopback servers for driving the clients end to end.
#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread::JoinHandle;

use smb_client::auth::{crypto, messages, spnego};
use smb_client::packets::fscc::*;
use smb_client::packets::smb1::*;
use smb_client::packets::smb2::*;
use smb_client::packets::status::Status;
use smb_client::rpc::pdu::{DceRpcContent, DceRpcMessage, DceRpcRequest};
use smb_client::rpc::srvsvc;

pub const TEST_DOMAIN: &str = "DOM";
pub const TEST_USER: &str = "user";
pub const TEST_PASSWORD: &str = "pw";
pub const SERVER_CHALLENGE: [u8; 8] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];

fn read_frame(stream: &mut TcpStream) -> Option<Vec<u8>> {
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).ok()?;
    let length = ((header[1] as usize & 1) << 16) | ((header[2] as usize) << 8) | header[3] as usize;
    let mut payload = vec![0u8; length];
    stream.read_exact(&mut payload).ok()?;
    match header[0] {
        0x00 => Some(payload),
        0x81 => {
            // NetBIOS session request: acknowledge and read the next
            // frame.
            stream.write_all(&[0x82, 0, 0, 0]).ok()?;
            read_frame(stream)
        }
        _ => None,
    }
}

fn write_frame(stream: &mut TcpStream, payload: &[u8]) {
    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.push(0x00);
    frame.push(((payload.len() >> 16) & 1) as u8);
    frame.push((payload.len() >> 8) as u8);
    frame.push(payload.len() as u8);
    frame.extend_from_slice(payload);
    stream.write_all(&frame).expect("server write");
}

// ---------------------------------------------------------------- SMB2

pub struct Smb2ServerConfig {
    /// Entries served by directory enumeration, per page count below.
    pub directory_entries: usize,
    pub enumeration_page_size: usize,
    /// Shares reported by NetrShareEnum (name, type).
    pub shares: Vec<(String, u32)>,
    /// Fail the final session-setup leg with STATUS_LOGON_FAILURE.
    pub fail_login: bool,
}

impl Default for Smb2ServerConfig {
    fn default() -> Self {
        Self {
            directory_entries: 4,
            enumeration_page_size: 100,
            shares: vec![
                ("C$".to_string(), 0x8000_0000),
                ("IPC$".to_string(), 0x8000_0000),
                ("Public".to_string(), 0),
                ("LaserJet".to_string(), 1),
            ],
            fail_login: false,
        }
    }
}

struct Smb2ServerState {
    config: Smb2ServerConfig,
    next_session_id: u64,
    next_tree_id: u32,
    next_file_id: u64,
    session_id: u64,
    /// Open handles: file id -> (name, file bytes).
    files: HashMap<u64, (String, Vec<u8>)>,
    /// Directory enumeration cursors per open handle.
    cursors: HashMap<u64, usize>,
}

pub fn spawn_smb2_server(config: Smb2ServerConfig) -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
    let addr = listener.local_addr().unwrap();
    let handle = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let mut state = Smb2ServerState {
            config,
            next_session_id: 0x1000,
            next_tree_id: 1,
            next_file_id: 1,
            session_id: 0,
            files: HashMap::new(),
            cursors: HashMap::new(),
        };
        while let Some(payload) = read_frame(&mut stream) {
            let request = Smb2Message::decode(&payload).expect("server-side decode");
            let response = handle_smb2(&mut state, request);
            write_frame(&mut stream, &response.encode().unwrap());
        }
    });
    (addr, handle)
}

fn smb2_response_header(request: &Smb2Header, status: Status) -> Smb2Header {
    let mut header = Smb2Header::new(request.command);
    header.flags.set_server_to_redir(true);
    header.message_id = request.message_id;
    header.session_id = request.session_id;
    header.tree_id = request.tree_id;
    header.status = status.as_u32();
    header.credits = 1;
    header
}

fn smb2_error(request: &Smb2Header, status: Status) -> Smb2Message {
    Smb2Message::new(
        smb2_response_header(request, status),
        Smb2Content::ErrorResponse(Smb2ErrorResponse::empty()),
    )
}

fn handle_smb2(state: &mut Smb2ServerState, request: Smb2Message) -> Smb2Message {
    let header = request.header.clone();
    match request.content {
        Smb2Content::NegotiateRequest(_) => Smb2Message::new(
            smb2_response_header(&header, Status::Success),
            Smb2Content::NegotiateResponse(Smb2NegotiateResponse {
                security_mode: NegotiateSecurityMode::new().with_signing_enabled(true),
                dialect_revision: Smb2Dialect::Smb021,
                server_guid: smb_client::packets::guid::Guid::from([0x77; 16]),
                capabilities: 0,
                max_transact_size: 1 << 20,
                max_read_size: 1 << 20,
                max_write_size: 1 << 20,
                system_time: 0.into(),
                server_start_time: 0.into(),
                buffer: spnego::build_negotiate_hint().unwrap(),
            }),
        ),
        Smb2Content::SessionSetupRequest(setup) => {
            let inner = spnego::unwrap_response(&setup.buffer).unwrap_or(None);
            let is_authenticate = inner
                .as_ref()
                .map(|t| t.len() > 12 && t[8] == 3)
                .unwrap_or(false);
            if !is_authenticate {
                // First leg: assign the session and challenge the client.
                state.session_id = state.next_session_id;
                state.next_session_id += 1;
                let challenge = messages::NtlmChallengeMessage::new(
                    SERVER_CHALLENGE,
                    TEST_DOMAIN.encode_utf16().flat_map(u16::to_le_bytes).collect(),
                    vec![],
                );
                let mut response_header =
                    smb2_response_header(&header, Status::MoreProcessingRequired);
                response_header.session_id = state.session_id;
                Smb2Message::new(
                    response_header,
                    Smb2Content::SessionSetupResponse(Smb2SessionSetupResponse {
                        session_flags: 0,
                        buffer: spnego::wrap_challenge(&challenge.encode().unwrap()).unwrap(),
                    }),
                )
            } else if state.config.fail_login {
                smb2_error(&header, Status::LogonFailure)
            } else {
                Smb2Message::new(
                    smb2_response_header(&header, Status::Success),
                    Smb2Content::SessionSetupResponse(Smb2SessionSetupResponse {
                        session_flags: 0,
                        buffer: vec![],
                    }),
                )
            }
        }
        Smb2Content::LogoffRequest(_) => Smb2Message::new(
            smb2_response_header(&header, Status::Success),
            Smb2Content::LogoffResponse(Smb2LogoffResponse::default()),
        ),
        Smb2Content::TreeConnectRequest(tree) => {
            let path = tree.path.to_string();
            let mut response_header = smb2_response_header(&header, Status::Success);
            response_header.tree_id = Some(state.next_tree_id);
            state.next_tree_id += 1;
            Smb2Message::new(
                response_header,
                Smb2Content::TreeConnectResponse(Smb2TreeConnectResponse {
                    share_type: if path.ends_with("IPC$") {
                        Smb2ShareType::Pipe
                    } else {
                        Smb2ShareType::Disk
                    },
                    share_flags: 0,
                    capabilities: 0,
                    maximal_access: 0x001f01ff,
                }),
            )
        }
        Smb2Content::TreeDisconnectRequest(_) => Smb2Message::new(
            smb2_response_header(&header, Status::Success),
            Smb2Content::TreeDisconnectResponse(Smb2TreeDisconnectResponse::default()),
        ),
        Smb2Content::CreateRequest(create) => {
            let name = create.name.to_string();
            let id = state.next_file_id;
            state.next_file_id += 1;
            state.files.insert(id, (name, Vec::new()));
            let created = matches!(
                create.create_disposition,
                CreateDisposition::Create | CreateDisposition::OverwriteIf
            );
            Smb2Message::new(
                smb2_response_header(&header, Status::Success),
                Smb2Content::CreateResponse(Smb2CreateResponse {
                    oplock_level: 0,
                    create_action: if created {
                        CREATE_ACTION_CREATED
                    } else {
                        CREATE_ACTION_OPENED
                    },
                    creation_time: 0.into(),
                    last_access_time: 0.into(),
                    last_write_time: 0.into(),
                    change_time: 0.into(),
                    allocation_size: 0,
                    end_of_file: 0,
                    file_attributes: if create.create_options & 0x1 != 0 { 0x10 } else { 0x80 },
                    file_id: FileId {
                        persistent: id,
                        volatile: id,
                    },
                }),
            )
        }
        Smb2Content::CloseRequest(close) => {
            state.files.remove(&close.file_id.persistent);
            state.cursors.remove(&close.file_id.persistent);
            Smb2Message::new(
                smb2_response_header(&header, Status::Success),
                Smb2Content::CloseResponse(Smb2CloseResponse::default()),
            )
        }
        Smb2Content::WriteRequest(write) => {
            let Some((_, data)) = state.files.get_mut(&write.file_id.persistent) else {
                return smb2_error(&header, Status::InvalidHandle);
            };
            let end = write.offset as usize + write.data.len();
            if data.len() < end {
                data.resize(end, 0);
            }
            data[write.offset as usize..end].copy_from_slice(&write.data);
            let count = write.data.len() as u32;
            Smb2Message::new(
                smb2_response_header(&header, Status::Success),
                Smb2Content::WriteResponse(Smb2WriteResponse { count }),
            )
        }
        Smb2Content::ReadRequest(read) => {
            let Some((_, data)) = state.files.get(&read.file_id.persistent) else {
                return smb2_error(&header, Status::InvalidHandle);
            };
            if read.offset as usize >= data.len() {
                return smb2_error(&header, Status::EndOfFile);
            }
            let end = (read.offset as usize + read.length as usize).min(data.len());
            Smb2Message::new(
                smb2_response_header(&header, Status::Success),
                Smb2Content::ReadResponse(Smb2ReadResponse {
                    data: data[read.offset as usize..end].to_vec(),
                }),
            )
        }
        Smb2Content::QueryDirectoryRequest(query) => {
            let key = query.file_id.persistent;
            if query.flags.reopen() {
                state.cursors.insert(key, 0);
            }
            let cursor = state.cursors.entry(key).or_insert(0);
            if *cursor >= state.config.directory_entries {
                return smb2_error(&header, Status::NoMoreFiles);
            }
            let end =
                (*cursor + state.config.enumeration_page_size).min(state.config.directory_entries);
            let entries: Vec<FileDirectoryInformation> = (*cursor..end)
                .map(|i| FileDirectoryInformation::simple(&format!("file-{i:04}"), false))
                .collect();
            *cursor = end;
            Smb2Message::new(
                smb2_response_header(&header, Status::Success),
                Smb2Content::QueryDirectoryResponse(Smb2QueryDirectoryResponse {
                    output_buffer: ChainedList::encode(&entries).unwrap(),
                }),
            )
        }
        Smb2Content::QueryInfoRequest(query) => {
            let info = FileStandardInformation {
                allocation_size: 4096,
                end_of_file: state
                    .files
                    .get(&query.file_id.persistent)
                    .map(|(_, d)| d.len() as u64)
                    .unwrap_or(0),
                number_of_links: 1,
                delete_pending: 0,
                directory: 0,
            };
            let mut cursor = std::io::Cursor::new(Vec::new());
            use binrw::BinWrite;
            info.write(&mut cursor).unwrap();
            Smb2Message::new(
                smb2_response_header(&header, Status::Success),
                Smb2Content::QueryInfoResponse(Smb2QueryInfoResponse {
                    output_buffer: cursor.into_inner(),
                }),
            )
        }
        Smb2Content::SetInfoRequest(_) => Smb2Message::new(
            smb2_response_header(&header, Status::Success),
            Smb2Content::SetInfoResponse(Smb2SetInfoResponse::default()),
        ),
        Smb2Content::IoctlRequest(ioctl) => {
            let rpc_request = DceRpcMessage::decode(&ioctl.input).expect("rpc decode");
            let output = answer_rpc(&state.config, rpc_request).encode().unwrap();
            Smb2Message::new(
                smb2_response_header(&header, Status::Success),
                Smb2Content::IoctlResponse(Smb2IoctlResponse {
                    ctl_code: ioctl.ctl_code,
                    file_id: ioctl.file_id,
                    flags: 0,
                    output,
                }),
            )
        }
        _ => smb2_error(&header, Status::NotSupported),
    }
}

fn answer_rpc(config: &Smb2ServerConfig, request: DceRpcMessage) -> DceRpcMessage {
    match request.content {
        DceRpcContent::Bind(bind) => DceRpcMessage::new(
            request.call_id,
            DceRpcContent::BindAck(smb_client::rpc::pdu::DceRpcBindAck {
                max_xmit_frag: bind.max_xmit_frag,
                max_recv_frag: bind.max_recv_frag,
                assoc_group_id: 0x5342,
                secondary_address: b"\\PIPE\\srvsvc\0".to_vec(),
                result: 0,
                reason: 0,
                transfer_syntax: bind.transfer_syntax,
            }),
        ),
        DceRpcContent::Request(DceRpcRequest { opnum, .. }) => {
            assert_eq!(opnum, srvsvc::OPNUM_NETR_SHARE_ENUM);
            let shares: Vec<srvsvc::ShareInfo1> = config
                .shares
                .iter()
                .map(|(name, share_type)| srvsvc::ShareInfo1 {
                    name: name.clone(),
                    share_type: *share_type,
                    remark: String::new(),
                })
                .collect();
            srvsvc::build_share_enum_response(&shares, 0)
        }
        other => panic!("unexpected RPC PDU: {other:?}"),
    }
}

// ---------------------------------------------------------------- SMB1

pub struct Smb1ServerConfig {
    /// Negotiate extended security (SPNEGO) instead of a raw challenge.
    pub extended_security: bool,
    /// Fail the final session-setup leg with STATUS_LOGON_FAILURE.
    pub fail_login: bool,
    /// Entries served by FindFirst2.
    pub directory_entries: usize,
}

impl Default for Smb1ServerConfig {
    fn default() -> Self {
        Self {
            extended_security: false,
            fail_login: false,
            directory_entries: 3,
        }
    }
}

pub fn spawn_smb1_server(config: Smb1ServerConfig) -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
    let addr = listener.local_addr().unwrap();
    let handle = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let mut files: HashMap<u16, (String, Vec<u8>)> = HashMap::new();
        let mut next_fid = 0x4000u16;
        while let Some(payload) = read_frame(&mut stream) {
            let request = Smb1Message::decode(&payload).expect("server-side decode");
            let response = handle_smb1(&config, &mut files, &mut next_fid, request);
            write_frame(&mut stream, &response.encode().unwrap());
        }
    });
    (addr, handle)
}

fn smb1_response_header(request: &Smb1Header, status: Status) -> Smb1Header {
    let mut header = request.clone();
    header.flags.set_reply(true);
    header.status = status.as_u32();
    header
}

fn smb1_error(request: &Smb1Header, status: Status) -> Smb1Message {
    Smb1Message::new(
        smb1_response_header(request, status),
        Smb1Content::Raw(Smb1RawContent {
            word_count: 0,
            words: vec![],
            bytes: vec![],
        }),
    )
}

fn verify_ntlm_v2(oem_password: &[u8], unicode_password: &[u8]) -> bool {
    if oem_password.len() != 24 || unicode_password.len() < 16 {
        return false;
    }
    let v2_hash = crypto::ntlm_v2_hash(TEST_PASSWORD, TEST_USER, TEST_DOMAIN);

    let client_challenge: [u8; 8] = oem_password[16..24].try_into().unwrap();
    let expected_lm = crypto::lm_v2_response(&v2_hash, &SERVER_CHALLENGE, &client_challenge);
    if oem_password != expected_lm.as_slice() {
        return false;
    }

    let (proof, blob) = unicode_password.split_at(16);
    proof == crypto::ntlm_v2_proof(&v2_hash, &SERVER_CHALLENGE, blob).as_slice()
}

fn verify_authenticate_blob(blob: &[u8]) -> bool {
    let Ok(Some(token)) = spnego::unwrap_response(blob) else {
        return false;
    };
    let Ok(authenticate) = messages::NtlmAuthenticateMessage::decode(&token) else {
        return false;
    };
    verify_ntlm_v2(&authenticate.lm_response, &authenticate.nt_response)
}

fn handle_smb1(
    config: &Smb1ServerConfig,
    files: &mut HashMap<u16, (String, Vec<u8>)>,
    next_fid: &mut u16,
    request: Smb1Message,
) -> Smb1Message {
    let header = request.header.clone();
    match request.content {
        Smb1Content::NegotiateRequest(_) => {
            let mut caps = Smb1Capabilities::new()
                .with_nt_smb(true)
                .with_rpc_remote_api(true)
                .with_nt_status_code(true)
                .with_nt_find(true)
                .with_unicode(true)
                .with_large_files(true)
                .with_large_read(true)
                .with_info_level_passthrough(true);
            let security = if config.extended_security {
                caps.set_extended_security(true);
                Smb1NegotiateSecurity::Extended {
                    server_guid: smb_client::packets::guid::Guid::from([0x55; 16]),
                    security_blob: spnego::build_negotiate_hint().unwrap(),
                }
            } else {
                Smb1NegotiateSecurity::Classic {
                    challenge: SERVER_CHALLENGE,
                    domain_and_server: vec![],
                }
            };
            Smb1Message::new(
                smb1_response_header(&header, Status::Success),
                Smb1Content::NegotiateResponse(Smb1NegotiateResponse {
                    dialect_index: 0,
                    security_mode: 0x03,
                    max_mpx_count: 50,
                    max_number_vcs: 1,
                    max_buffer_size: 16644,
                    max_raw_size: 65536,
                    session_key: 0,
                    capabilities: caps,
                    system_time: 0.into(),
                    server_time_zone: 0,
                    challenge_length: if config.extended_security { 0 } else { 8 },
                    security,
                }),
            )
        }
        Smb1Content::SessionSetupRequest(setup) => {
            if verify_ntlm_v2(&setup.oem_password, &setup.unicode_password) {
                let mut response_header = smb1_response_header(&header, Status::Success);
                response_header.uid = 0x0801;
                Smb1Message::new(
                    response_header,
                    Smb1Content::SessionSetupResponse(Smb1SessionSetupResponse {
                        action: 0,
                        names: vec![],
                    }),
                )
            } else {
                smb1_error(&header, Status::LogonFailure)
            }
        }
        Smb1Content::SessionSetupExtendedRequest(setup) => {
            let is_negotiate = spnego::unwrap_response(&setup.security_blob).is_err();
            if is_negotiate {
                // First leg: hand out the challenge and the UID.
                let challenge = messages::NtlmChallengeMessage::new(
                    SERVER_CHALLENGE,
                    TEST_DOMAIN.encode_utf16().flat_map(u16::to_le_bytes).collect(),
                    vec![],
                );
                let mut response_header =
                    smb1_response_header(&header, Status::MoreProcessingRequired);
                response_header.uid = 0x0801;
                Smb1Message::new(
                    response_header,
                    Smb1Content::SessionSetupExtendedResponse(Smb1SessionSetupExtendedResponse {
                        action: 0,
                        security_blob: spnego::wrap_challenge(&challenge.encode().unwrap())
                            .unwrap(),
                    }),
                )
            } else if config.fail_login || !verify_authenticate_blob(&setup.security_blob) {
                smb1_error(&header, Status::LogonFailure)
            } else {
                Smb1Message::new(
                    smb1_response_header(&header, Status::Success),
                    Smb1Content::SessionSetupExtendedResponse(Smb1SessionSetupExtendedResponse {
                        action: 0,
                        security_blob: vec![],
                    }),
                )
            }
        }
        Smb1Content::LogoffRequest(_) => Smb1Message::new(
            smb1_response_header(&header, Status::Success),
            Smb1Content::LogoffResponse(Smb1LogoffResponse::default()),
        ),
        Smb1Content::TreeConnectRequest(_) => {
            let mut response_header = smb1_response_header(&header, Status::Success);
            response_header.tid = 0x2001;
            Smb1Message::new(
                response_header,
                Smb1Content::TreeConnectResponse(Smb1TreeConnectResponse {
                    word_count: 3,
                    optional_support: 1,
                    extra_words: vec![],
                    service_and_fs: b"A:\0NTFS\0".to_vec(),
                }),
            )
        }
        Smb1Content::TreeDisconnectRequest(_) => Smb1Message::new(
            smb1_response_header(&header, Status::Success),
            Smb1Content::TreeDisconnectResponse(Smb1TreeDisconnectResponse::default()),
        ),
        Smb1Content::NtCreateRequest(create) => {
            let fid = *next_fid;
            *next_fid += 1;
            files.insert(fid, (create.file_name.0.clone(), Vec::new()));
            Smb1Message::new(
                smb1_response_header(&header, Status::Success),
                Smb1Content::NtCreateResponse(Smb1NtCreateResponse {
                    oplock_level: 0,
                    fid,
                    create_disposition: 2, // FILE_CREATED
                    creation_time: 0.into(),
                    last_access_time: 0.into(),
                    last_write_time: 0.into(),
                    change_time: 0.into(),
                    ext_file_attributes: 0x80,
                    allocation_size: 0,
                    end_of_file: 0,
                    resource_type: 0,
                    nm_pipe_status: 0,
                    directory: 0,
                }),
            )
        }
        Smb1Content::CloseRequest(close) => {
            files.remove(&close.fid);
            Smb1Message::new(
                smb1_response_header(&header, Status::Success),
                Smb1Content::CloseResponse(Smb1CloseResponse::default()),
            )
        }
        Smb1Content::WriteRequest(write) => {
            let Some((_, data)) = files.get_mut(&write.fid) else {
                return smb1_error(&header, Status::InvalidHandle);
            };
            let offset = ((write.offset_high as u64) << 32 | write.offset as u64) as usize;
            let end = offset + write.data.len();
            if data.len() < end {
                data.resize(end, 0);
            }
            data[offset..end].copy_from_slice(&write.data);
            let count = write.data.len() as u32;
            Smb1Message::new(
                smb1_response_header(&header, Status::Success),
                Smb1Content::WriteResponse(Smb1WriteResponse {
                    count: count as u16,
                    available: 0,
                    count_high: (count >> 16) as u16,
                }),
            )
        }
        Smb1Content::ReadRequest(read) => {
            let Some((_, data)) = files.get(&read.fid) else {
                return smb1_error(&header, Status::InvalidHandle);
            };
            let offset = ((read.offset_high as u64) << 32 | read.offset as u64) as usize;
            if offset >= data.len() {
                return smb1_error(&header, Status::EndOfFile);
            }
            let length = (read.max_count as usize | ((read.max_count_high as usize) << 16))
                .min(data.len() - offset);
            Smb1Message::new(
                smb1_response_header(&header, Status::Success),
                Smb1Content::ReadResponse(Smb1ReadResponse {
                    available: 0,
                    data: data[offset..offset + length].to_vec(),
                }),
            )
        }
        Smb1Content::Transaction2Request(transaction) => {
            match transaction.subcommand() {
                Some(Trans2Subcommand::FindFirst2) => {
                    let entries: Vec<FileDirectoryInformation> = (0..config.directory_entries)
                        .map(|i| FileDirectoryInformation::simple(&format!("doc-{i:02}"), false))
                        .collect();
                    let reply = FindFirst2ReplyParameters {
                        sid: 1,
                        search_count: entries.len() as u16,
                        end_of_search: 1,
                        ea_error_offset: 0,
                        last_name_offset: 0,
                    };
                    Smb1Message::new(
                        smb1_response_header(&header, Status::Success),
                        Smb1Content::Transaction2Response(Smb1Transaction2Response::new(
                            encode_blob(&reply).unwrap(),
                            ChainedList::encode(&entries).unwrap(),
                        )),
                    )
                }
                Some(Trans2Subcommand::QueryFileInformation) => {
                    use binrw::BinWrite;
                    let info = FileStandardInformation {
                        allocation_size: 4096,
                        end_of_file: 0,
                        number_of_links: 1,
                        delete_pending: 0,
                        directory: 0,
                    };
                    let mut cursor = std::io::Cursor::new(Vec::new());
                    info.write(&mut cursor).unwrap();
                    Smb1Message::new(
                        smb1_response_header(&header, Status::Success),
                        Smb1Content::Transaction2Response(Smb1Transaction2Response::new(
                            vec![0, 0],
                            cursor.into_inner(),
                        )),
                    )
                }
                _ => smb1_error(&header, Status::NotImplemented),
            }
        }
        _ => smb1_error(&header, Status::NotSupported),
    }
}
