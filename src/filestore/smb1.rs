//! File operations over an SMB1 tree connect, via the AndX, Trans2 and
//! NT Transact command sets.

use std::sync::Arc;

use super::*;
use crate::connection::smb1::{Smb1Connection, SMB1_RESPONSE_TIMEOUT};
use crate::packets::fscc::{
    ChainedList, FileDirectoryInformation, FileInformationClass, FsInformationClass,
};
use crate::packets::smb1::*;
use crate::packets::status::Status;
use crate::Error;

/// Entries requested per Trans2 find round trip.
const FIND_SEARCH_COUNT: u16 = 512;
/// Parameter/data ceilings offered to the server for transactions.
const TRANSACT_MAX_PARAMETER_COUNT: u16 = 256;
const TRANSACT_MAX_DATA_COUNT: u16 = 16384;

pub struct Smb1FileStore {
    connection: Arc<Smb1Connection>,
    uid: u16,
    tree_id: u16,
    unicode: bool,
    extended_security: bool,
    info_level_passthrough: bool,
    client_max_buffer_size: u32,
    server_max_buffer_size: u32,
}

impl Smb1FileStore {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        connection: Arc<Smb1Connection>,
        uid: u16,
        tree_id: u16,
        unicode: bool,
        extended_security: bool,
        info_level_passthrough: bool,
        client_max_buffer_size: u32,
        server_max_buffer_size: u32,
    ) -> Self {
        Self {
            connection,
            uid,
            tree_id,
            unicode,
            extended_security,
            info_level_passthrough,
            client_max_buffer_size,
            server_max_buffer_size,
        }
    }

    /// The pass-through info levels carry the native information
    /// classes; without them the legacy levels would be needed.
    fn require_passthrough(&self) -> crate::Result<()> {
        if self.info_level_passthrough {
            Ok(())
        } else {
            Err(Error::NotImplemented(
                "server lacks pass-through information levels",
            ))
        }
    }

    pub fn tree_id(&self) -> u16 {
        self.tree_id
    }

    fn header(&self, command: Smb1Command) -> Smb1Header {
        let mut header = Smb1Header::new(command);
        header.flags2 = Smb1HeaderFlags2::new()
            .with_unicode(self.unicode)
            .with_extended_security(self.extended_security)
            .with_long_names_allowed(true)
            .with_long_name_used(true)
            .with_nt_status_code(true);
        header.uid = self.uid;
        header.tid = self.tree_id;
        header
    }

    /// One request/response round trip. `Ok(None)` is a response
    /// timeout; the caller reports `STATUS_INVALID_SMB`.
    fn transact(
        &self,
        command: Smb1Command,
        content: Smb1Content,
    ) -> crate::Result<Option<Smb1Message>> {
        let message = Smb1Message::new(self.header(command), content);
        self.connection.send(&message)?;
        self.connection.wait_for(command, SMB1_RESPONSE_TIMEOUT)
    }

    fn check_handle(&self, handle: &FileHandle) -> crate::Result<u16> {
        match handle {
            FileHandle::Smb1 { fid, tree_id } if *tree_id == self.tree_id => Ok(*fid),
            _ => Err(Error::InvalidHandle),
        }
    }

    /// Issues one Trans2 subcommand, returning the reply parameter and
    /// data sections.
    fn transaction2(
        &self,
        subcommand: Trans2Subcommand,
        parameters: Vec<u8>,
        data: Vec<u8>,
    ) -> crate::Result<(Option<(Vec<u8>, Vec<u8>)>, Status)> {
        let mut request = Smb1Transaction2Request::new(subcommand, parameters, data);
        request.max_parameter_count = TRANSACT_MAX_PARAMETER_COUNT;
        request.max_data_count = TRANSACT_MAX_DATA_COUNT;
        let Some(response) =
            self.transact(Smb1Command::Transaction2, Smb1Content::Transaction2Request(request))?
        else {
            return Ok((None, Status::InvalidSmb));
        };
        let status = response.status();
        match response.content {
            Smb1Content::Transaction2Response(r) if status.is_success() => {
                Ok((Some((r.parameters, r.data)), status))
            }
            _ => Ok((None, status)),
        }
    }

    fn find_info_level(&self) -> u16 {
        FIND_FILE_DIRECTORY_INFO
    }
}

impl FileStore for Smb1FileStore {
    fn create_file(
        &self,
        path: &str,
        args: &CreateFileArgs,
    ) -> crate::Result<(Option<CreateFileResult>, Status)> {
        let request = Smb1NtCreateRequest {
            flags: 0,
            root_directory_fid: 0,
            desired_access: args.desired_access,
            allocation_size: 0,
            ext_file_attributes: args.file_attributes,
            share_access: args.share_access,
            create_disposition: args.create_disposition as u32,
            create_options: args.create_options,
            impersonation_level: 2, // SECURITY_IMPERSONATION
            security_flags: 0,
            file_name: path.into(),
        };
        let Some(response) =
            self.transact(Smb1Command::NtCreateAndX, Smb1Content::NtCreateRequest(request))?
        else {
            return Ok((None, Status::InvalidSmb));
        };
        let status = response.status();
        let Smb1Content::NtCreateResponse(create) = response.content else {
            return Ok((None, status));
        };
        log::debug!("Created '{path}' (FID {:#x})", create.fid);
        let file_status = match create.create_disposition {
            0 => FileStatus::Superseded,
            2 => FileStatus::Created,
            3 => FileStatus::Overwritten,
            _ => FileStatus::Opened,
        };
        Ok((
            Some(CreateFileResult {
                handle: FileHandle::Smb1 {
                    fid: create.fid,
                    tree_id: self.tree_id,
                },
                file_status,
                is_directory: create.directory != 0,
                end_of_file: create.end_of_file,
            }),
            status,
        ))
    }

    fn close_file(&self, handle: &FileHandle) -> crate::Result<Status> {
        let fid = self.check_handle(handle)?;
        let request = Smb1CloseRequest {
            fid,
            last_time_modified: u32::MAX,
        };
        let Some(response) =
            self.transact(Smb1Command::Close, Smb1Content::CloseRequest(request))?
        else {
            return Ok(Status::InvalidSmb);
        };
        Ok(response.status())
    }

    fn read_file(
        &self,
        handle: &FileHandle,
        offset: u64,
        max_count: u32,
    ) -> crate::Result<(Vec<u8>, Status)> {
        let fid = self.check_handle(handle)?;
        let request = Smb1ReadRequest::new(fid, offset, max_count.min(self.max_read_size()));
        let Some(response) =
            self.transact(Smb1Command::ReadAndX, Smb1Content::ReadRequest(request))?
        else {
            return Ok((vec![], Status::InvalidSmb));
        };
        let status = response.status();
        match response.content {
            Smb1Content::ReadResponse(read) => Ok((read.data, status)),
            _ => Ok((vec![], status)),
        }
    }

    fn write_file(
        &self,
        handle: &FileHandle,
        offset: u64,
        data: &[u8],
    ) -> crate::Result<(u32, Status)> {
        let fid = self.check_handle(handle)?;
        let chunk = &data[..data.len().min(self.max_write_size() as usize)];
        let request = Smb1WriteRequest::new(fid, offset, chunk.to_vec());
        let Some(response) =
            self.transact(Smb1Command::WriteAndX, Smb1Content::WriteRequest(request))?
        else {
            return Ok((0, Status::InvalidSmb));
        };
        let status = response.status();
        match response.content {
            Smb1Content::WriteResponse(write) => Ok((write.total_count(), status)),
            _ => Ok((0, status)),
        }
    }

    fn flush_file_buffers(&self, _handle: &FileHandle) -> crate::Result<Status> {
        Err(Error::NotImplemented("FlushFileBuffers over SMB1"))
    }

    fn lock_file(
        &self,
        _handle: &FileHandle,
        _offset: u64,
        _length: u64,
        _exclusive: bool,
    ) -> crate::Result<Status> {
        Err(Error::NotImplemented("LockFile over SMB1"))
    }

    fn unlock_file(
        &self,
        _handle: &FileHandle,
        _offset: u64,
        _length: u64,
    ) -> crate::Result<Status> {
        Err(Error::NotImplemented("UnlockFile over SMB1"))
    }

    fn query_directory(
        &self,
        _handle: Option<&FileHandle>,
        pattern: &str,
        info_class: FileInformationClass,
    ) -> crate::Result<(Vec<FileDirectoryInformation>, Status)> {
        if info_class != FileInformationClass::DirectoryInformation {
            return Err(Error::NotImplemented(
                "SMB1 directory enumeration supports FileDirectoryInformation only",
            ));
        }

        let first = FindFirst2Parameters {
            search_attributes: FIND_DEFAULT_SEARCH_ATTRIBUTES,
            search_count: FIND_SEARCH_COUNT,
            flags: FIND_CLOSE_AT_EOS,
            information_level: self.find_info_level(),
            file_name: pattern.into(),
        };
        let (section, status) = self.transaction2(
            Trans2Subcommand::FindFirst2,
            encode_blob_args(&first, self.unicode)?,
            vec![],
        )?;
        let Some((reply_params, data)) = section else {
            return Ok((vec![], status));
        };
        let reply: FindFirst2ReplyParameters = decode_blob(&reply_params)?;
        let mut entries: Vec<FileDirectoryInformation> = ChainedList::decode(&data)?;
        let mut end_of_search = reply.end_of_search != 0;
        let sid = reply.sid;
        let mut last_status = status;

        while !end_of_search {
            let next = FindNext2Parameters {
                sid,
                search_count: FIND_SEARCH_COUNT,
                information_level: self.find_info_level(),
                flags: FIND_CLOSE_AT_EOS,
                file_name: "".into(),
            };
            let (section, status) = self.transaction2(
                Trans2Subcommand::FindNext2,
                encode_blob_args(&next, self.unicode)?,
                vec![],
            )?;
            last_status = status;
            let Some((reply_params, data)) = section else {
                break;
            };
            let reply: FindNext2ReplyParameters = decode_blob(&reply_params)?;
            entries.extend(ChainedList::<FileDirectoryInformation>::decode(&data)?);
            end_of_search = reply.end_of_search != 0;
        }

        Ok((entries, last_status))
    }

    fn get_file_information(
        &self,
        handle: &FileHandle,
        info_class: FileInformationClass,
    ) -> crate::Result<(Vec<u8>, Status)> {
        self.require_passthrough()?;
        let fid = self.check_handle(handle)?;
        let parameters = QueryFileInformationParameters {
            fid,
            information_level: INFO_PASSTHROUGH + info_class as u16,
        };
        let (section, status) = self.transaction2(
            Trans2Subcommand::QueryFileInformation,
            encode_blob(&parameters)?,
            vec![],
        )?;
        Ok((section.map(|(_, data)| data).unwrap_or_default(), status))
    }

    fn set_file_information(
        &self,
        handle: &FileHandle,
        info_class: FileInformationClass,
        buffer: Vec<u8>,
    ) -> crate::Result<Status> {
        self.require_passthrough()?;
        let fid = self.check_handle(handle)?;
        let parameters = SetFileInformationParameters {
            fid,
            information_level: INFO_PASSTHROUGH + info_class as u16,
        };
        let (_, status) = self.transaction2(
            Trans2Subcommand::SetFileInformation,
            encode_blob(&parameters)?,
            buffer,
        )?;
        Ok(status)
    }

    fn get_file_system_information(
        &self,
        info_class: FsInformationClass,
    ) -> crate::Result<(Vec<u8>, Status)> {
        self.require_passthrough()?;
        let parameters = QueryFsInformationParameters {
            information_level: INFO_PASSTHROUGH + info_class as u16,
        };
        let (section, status) = self.transaction2(
            Trans2Subcommand::QueryFsInformation,
            encode_blob(&parameters)?,
            vec![],
        )?;
        Ok((section.map(|(_, data)| data).unwrap_or_default(), status))
    }

    fn set_file_system_information(
        &self,
        _info_class: FsInformationClass,
        _buffer: Vec<u8>,
    ) -> crate::Result<Status> {
        Err(Error::NotImplemented("SetFileSystemInformation over SMB1"))
    }

    fn get_security_information(
        &self,
        _handle: &FileHandle,
        _security_information: u32,
    ) -> crate::Result<(Vec<u8>, Status)> {
        Err(Error::NotImplemented("GetSecurityInformation over SMB1"))
    }

    fn set_security_information(
        &self,
        _handle: &FileHandle,
        _security_information: u32,
        _descriptor: Vec<u8>,
    ) -> crate::Result<Status> {
        Err(Error::NotImplemented("SetSecurityInformation over SMB1"))
    }

    fn notify_change(
        &self,
        handle: &FileHandle,
        completion_filter: u32,
        watch_tree: bool,
        output_buffer_size: u32,
    ) -> crate::Result<(Vec<u8>, Status)> {
        let fid = self.check_handle(handle)?;
        let setup = NotifyChangeSetup {
            completion_filter,
            fid,
            watch_tree: watch_tree as u8,
        };
        let request = Smb1NtTransactRequest {
            max_setup_count: 0,
            max_parameter_count: output_buffer_size,
            max_data_count: 0,
            function: NtTransactFunction::NotifyChange,
            setup: blob_to_words(&encode_blob(&setup)?),
            parameters: vec![],
            data: vec![],
        };
        let Some(response) =
            self.transact(Smb1Command::NtTransact, Smb1Content::NtTransactRequest(request))?
        else {
            return Ok((vec![], Status::InvalidSmb));
        };
        let status = response.status();
        match response.content {
            Smb1Content::NtTransactResponse(r) => Ok((r.parameters, status)),
            _ => Ok((vec![], status)),
        }
    }

    fn device_io_control(
        &self,
        handle: &FileHandle,
        ctl_code: u32,
        input: &[u8],
        max_output: u32,
    ) -> crate::Result<(Vec<u8>, Status)> {
        let fid = self.check_handle(handle)?;
        let setup = IoctlSetup {
            function_code: ctl_code,
            fid,
            is_fsctl: 1,
            is_flags: 0,
        };
        let request = Smb1NtTransactRequest {
            max_setup_count: 0,
            max_parameter_count: 0,
            max_data_count: max_output,
            function: NtTransactFunction::Ioctl,
            setup: blob_to_words(&encode_blob(&setup)?),
            parameters: vec![],
            data: input.to_vec(),
        };
        let Some(response) =
            self.transact(Smb1Command::NtTransact, Smb1Content::NtTransactRequest(request))?
        else {
            return Ok((vec![], Status::InvalidSmb));
        };
        let status = response.status();
        match response.content {
            Smb1Content::NtTransactResponse(r)
                if status == Status::Success || status == Status::BufferOverflow =>
            {
                Ok((r.data, status))
            }
            _ => Ok((vec![], status)),
        }
    }

    fn cancel(&self, _handle: &FileHandle) -> crate::Result<Status> {
        Err(Error::NotImplemented("Cancel over SMB1"))
    }

    fn disconnect(&self) -> crate::Result<Status> {
        let Some(response) = self.transact(
            Smb1Command::TreeDisconnect,
            Smb1Content::TreeDisconnectRequest(Smb1TreeDisconnectRequest::default()),
        )?
        else {
            return Ok(Status::InvalidSmb);
        };
        log::debug!("Disconnected from tree {:#x}", self.tree_id);
        Ok(response.status())
    }

    fn max_read_size(&self) -> u32 {
        max_read_size(self.client_max_buffer_size)
    }

    fn max_write_size(&self) -> u32 {
        max_write_size(self.server_max_buffer_size, self.unicode)
    }
}

fn blob_to_words(blob: &[u8]) -> Vec<u16> {
    blob.chunks(2)
        .map(|c| u16::from_le_bytes([c[0], *c.get(1).unwrap_or(&0)]))
        .collect()
}
