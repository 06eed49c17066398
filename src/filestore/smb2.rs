//! File operations over an SMB2 tree connect.

use std::sync::Arc;

use super::*;
use crate::connection::smb2::Smb2Connection;
use crate::packets::fscc::{
    ChainedList, FileDirectoryInformation, FileInformationClass, FsInformationClass,
};
use crate::packets::smb2::*;
use crate::packets::status::Status;
use crate::Error;

pub struct Smb2FileStore {
    connection: Arc<Smb2Connection>,
    session_id: u64,
    tree_id: u32,
    max_transact_size: u32,
    max_read_size: u32,
    max_write_size: u32,
}

impl Smb2FileStore {
    pub(crate) fn new(
        connection: Arc<Smb2Connection>,
        session_id: u64,
        tree_id: u32,
        max_transact_size: u32,
        max_read_size: u32,
        max_write_size: u32,
    ) -> Self {
        Self {
            connection,
            session_id,
            tree_id,
            max_transact_size,
            max_read_size,
            max_write_size,
        }
    }

    pub fn tree_id(&self) -> u32 {
        self.tree_id
    }

    fn header(&self, command: Smb2Command) -> Smb2Header {
        let mut header = Smb2Header::new(command);
        header.session_id = self.session_id;
        header.tree_id = Some(self.tree_id);
        header
    }

    /// One request/response round trip, correlated by message id.
    /// `Ok(None)` is a timeout or an abandoned pending wait; the caller
    /// reports `STATUS_INVALID_SMB`.
    fn transact(
        &self,
        command: Smb2Command,
        content: Smb2Content,
    ) -> crate::Result<Option<Smb2Message>> {
        let mut message = Smb2Message::new(self.header(command), content);
        let message_id = self.connection.send(&mut message)?;
        self.connection.wait_for(command, message_id)
    }

    fn check_handle(&self, handle: &FileHandle) -> crate::Result<FileId> {
        match handle {
            FileHandle::Smb2 { file_id, tree_id } if *tree_id == self.tree_id => Ok(*file_id),
            _ => Err(Error::InvalidHandle),
        }
    }

    /// Query filesystem information against an already-open handle.
    pub fn get_file_system_information_on(
        &self,
        handle: &FileHandle,
        info_class: FsInformationClass,
    ) -> crate::Result<(Vec<u8>, Status)> {
        let file_id = self.check_handle(handle)?;
        let request = Smb2QueryInfoRequest {
            info_type: InfoType::FileSystem,
            file_info_class: info_class as u8,
            output_buffer_length: self.max_transact_size,
            additional_information: 0,
            file_id,
        };
        let Some(response) =
            self.transact(Smb2Command::QueryInfo, Smb2Content::QueryInfoRequest(request))?
        else {
            return Ok((vec![], Status::InvalidSmb));
        };
        let status = response.status();
        match response.content {
            Smb2Content::QueryInfoResponse(r) => Ok((r.output_buffer, status)),
            _ => Ok((vec![], status)),
        }
    }
}

impl FileStore for Smb2FileStore {
    fn create_file(
        &self,
        path: &str,
        args: &CreateFileArgs,
    ) -> crate::Result<(Option<CreateFileResult>, Status)> {
        let request = Smb2CreateRequest {
            requested_oplock_level: 0,
            impersonation_level: ImpersonationLevel::Impersonation,
            desired_access: args.desired_access,
            file_attributes: args.file_attributes,
            share_access: args.share_access,
            create_disposition: args.create_disposition,
            create_options: args.create_options,
            name: path.into(),
        };
        let Some(response) =
            self.transact(Smb2Command::Create, Smb2Content::CreateRequest(request))?
        else {
            return Ok((None, Status::InvalidSmb));
        };
        let status = response.status();
        let Smb2Content::CreateResponse(create) = response.content else {
            return Ok((None, status));
        };
        log::debug!("Created '{path}' ({})", create.file_id);
        let file_status = match create.create_action {
            CREATE_ACTION_SUPERSEDED => FileStatus::Superseded,
            CREATE_ACTION_CREATED => FileStatus::Created,
            CREATE_ACTION_OVERWRITTEN => FileStatus::Overwritten,
            _ => FileStatus::Opened,
        };
        Ok((
            Some(CreateFileResult {
                handle: FileHandle::Smb2 {
                    file_id: create.file_id,
                    tree_id: self.tree_id,
                },
                file_status,
                is_directory: create.file_attributes & 0x10 != 0,
                end_of_file: create.end_of_file,
            }),
            status,
        ))
    }

    fn close_file(&self, handle: &FileHandle) -> crate::Result<Status> {
        let file_id = self.check_handle(handle)?;
        let Some(response) = self.transact(
            Smb2Command::Close,
            Smb2Content::CloseRequest(Smb2CloseRequest { flags: 0, file_id }),
        )?
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
        let file_id = self.check_handle(handle)?;
        let request =
            Smb2ReadRequest::new(file_id, offset, max_count.min(self.max_read_size));
        let Some(response) =
            self.transact(Smb2Command::Read, Smb2Content::ReadRequest(request))?
        else {
            return Ok((vec![], Status::InvalidSmb));
        };
        let status = response.status();
        match response.content {
            Smb2Content::ReadResponse(read) => Ok((read.data, status)),
            _ => Ok((vec![], status)),
        }
    }

    fn write_file(
        &self,
        handle: &FileHandle,
        offset: u64,
        data: &[u8],
    ) -> crate::Result<(u32, Status)> {
        let file_id = self.check_handle(handle)?;
        let chunk = &data[..data.len().min(self.max_write_size as usize)];
        let request = Smb2WriteRequest::new(file_id, offset, chunk.to_vec());
        let Some(response) =
            self.transact(Smb2Command::Write, Smb2Content::WriteRequest(request))?
        else {
            return Ok((0, Status::InvalidSmb));
        };
        let status = response.status();
        match response.content {
            Smb2Content::WriteResponse(write) => Ok((write.count, status)),
            _ => Ok((0, status)),
        }
    }

    fn flush_file_buffers(&self, _handle: &FileHandle) -> crate::Result<Status> {
        Err(Error::NotImplemented("FlushFileBuffers over SMB2"))
    }

    fn lock_file(
        &self,
        _handle: &FileHandle,
        _offset: u64,
        _length: u64,
        _exclusive: bool,
    ) -> crate::Result<Status> {
        Err(Error::NotImplemented("LockFile over SMB2"))
    }

    fn unlock_file(
        &self,
        _handle: &FileHandle,
        _offset: u64,
        _length: u64,
    ) -> crate::Result<Status> {
        Err(Error::NotImplemented("UnlockFile over SMB2"))
    }

    fn query_directory(
        &self,
        handle: Option<&FileHandle>,
        pattern: &str,
        info_class: FileInformationClass,
    ) -> crate::Result<(Vec<FileDirectoryInformation>, Status)> {
        if info_class != FileInformationClass::DirectoryInformation {
            return Err(Error::NotImplemented(
                "SMB2 directory enumeration supports FileDirectoryInformation only",
            ));
        }
        let handle = handle.ok_or_else(|| {
            Error::InvalidArgument("SMB2 directory enumeration needs an open handle".into())
        })?;
        let file_id = self.check_handle(handle)?;

        let mut entries = Vec::new();
        // The first request restarts the scan; follow-ups page through.
        let mut reopen = true;
        loop {
            let request = Smb2QueryDirectoryRequest {
                file_information_class: info_class,
                flags: QueryDirectoryFlags::new().with_reopen(reopen),
                file_index: 0,
                file_id,
                output_buffer_length: self.max_transact_size,
                file_name: pattern.into(),
            };
            reopen = false;
            let Some(response) = self.transact(
                Smb2Command::QueryDirectory,
                Smb2Content::QueryDirectoryRequest(request),
            )?
            else {
                return Ok((entries, Status::InvalidSmb));
            };
            let status = response.status();
            match response.content {
                Smb2Content::QueryDirectoryResponse(page) if status.is_success() => {
                    entries.extend(ChainedList::<FileDirectoryInformation>::decode(
                        &page.output_buffer,
                    )?);
                }
                _ => return Ok((entries, status)),
            }
        }
    }

    fn get_file_information(
        &self,
        handle: &FileHandle,
        info_class: FileInformationClass,
    ) -> crate::Result<(Vec<u8>, Status)> {
        let file_id = self.check_handle(handle)?;
        let request = Smb2QueryInfoRequest {
            info_type: InfoType::File,
            file_info_class: info_class as u8,
            output_buffer_length: self.max_transact_size,
            additional_information: 0,
            file_id,
        };
        let Some(response) =
            self.transact(Smb2Command::QueryInfo, Smb2Content::QueryInfoRequest(request))?
        else {
            return Ok((vec![], Status::InvalidSmb));
        };
        let status = response.status();
        match response.content {
            Smb2Content::QueryInfoResponse(r) => Ok((r.output_buffer, status)),
            _ => Ok((vec![], status)),
        }
    }

    fn set_file_information(
        &self,
        handle: &FileHandle,
        info_class: FileInformationClass,
        buffer: Vec<u8>,
    ) -> crate::Result<Status> {
        let file_id = self.check_handle(handle)?;
        let request = Smb2SetInfoRequest {
            info_type: InfoType::File,
            file_info_class: info_class as u8,
            additional_information: 0,
            file_id,
            buffer,
        };
        let Some(response) =
            self.transact(Smb2Command::SetInfo, Smb2Content::SetInfoRequest(request))?
        else {
            return Ok(Status::InvalidSmb);
        };
        Ok(response.status())
    }

    fn get_file_system_information(
        &self,
        info_class: FsInformationClass,
    ) -> crate::Result<(Vec<u8>, Status)> {
        // Self-opening variant: bind the tree root, query, close.
        let (result, status) = self.create_file("", &CreateFileArgs::directory())?;
        let Some(result) = result else {
            return Ok((vec![], status));
        };
        if !status.is_success() {
            return Ok((vec![], status));
        }
        let outcome = self.get_file_system_information_on(&result.handle, info_class);
        let close_status = self.close_file(&result.handle)?;
        if !close_status.is_success() {
            log::warn!("Closing the root handle failed: {close_status}");
        }
        outcome
    }

    fn set_file_system_information(
        &self,
        _info_class: FsInformationClass,
        _buffer: Vec<u8>,
    ) -> crate::Result<Status> {
        Err(Error::NotImplemented("SetFileSystemInformation over SMB2"))
    }

    fn get_security_information(
        &self,
        handle: &FileHandle,
        security_information: u32,
    ) -> crate::Result<(Vec<u8>, Status)> {
        let file_id = self.check_handle(handle)?;
        let request = Smb2QueryInfoRequest {
            info_type: InfoType::Security,
            file_info_class: 0,
            output_buffer_length: self.max_transact_size,
            additional_information: security_information,
            file_id,
        };
        let Some(response) =
            self.transact(Smb2Command::QueryInfo, Smb2Content::QueryInfoRequest(request))?
        else {
            return Ok((vec![], Status::InvalidSmb));
        };
        let status = response.status();
        match response.content {
            Smb2Content::QueryInfoResponse(r) => Ok((r.output_buffer, status)),
            _ => Ok((vec![], status)),
        }
    }

    fn set_security_information(
        &self,
        _handle: &FileHandle,
        _security_information: u32,
        _descriptor: Vec<u8>,
    ) -> crate::Result<Status> {
        Ok(Status::NotSupported)
    }

    fn notify_change(
        &self,
        _handle: &FileHandle,
        _completion_filter: u32,
        _watch_tree: bool,
        _output_buffer_size: u32,
    ) -> crate::Result<(Vec<u8>, Status)> {
        Err(Error::NotImplemented("NotifyChange over SMB2"))
    }

    fn device_io_control(
        &self,
        handle: &FileHandle,
        ctl_code: u32,
        input: &[u8],
        max_output: u32,
    ) -> crate::Result<(Vec<u8>, Status)> {
        let file_id = self.check_handle(handle)?;
        let request = Smb2IoctlRequest::fsctl(file_id, ctl_code, input.to_vec(), max_output);
        let Some(response) =
            self.transact(Smb2Command::Ioctl, Smb2Content::IoctlRequest(request))?
        else {
            return Ok((vec![], Status::InvalidSmb));
        };
        let status = response.status();
        match response.content {
            // A buffer overflow still delivers the part that fit.
            Smb2Content::IoctlResponse(r)
                if status == Status::Success || status == Status::BufferOverflow =>
            {
                Ok((r.output, status))
            }
            _ => Ok((vec![], status)),
        }
    }

    fn cancel(&self, _handle: &FileHandle) -> crate::Result<Status> {
        Err(Error::NotImplemented("Cancel over SMB2"))
    }

    fn disconnect(&self) -> crate::Result<Status> {
        let Some(response) = self.transact(
            Smb2Command::TreeDisconnect,
            Smb2Content::TreeDisconnectRequest(Smb2TreeDisconnectRequest::default()),
        )?
        else {
            return Ok(Status::InvalidSmb);
        };
        log::debug!("Disconnected from tree {:#x}", self.tree_id);
        Ok(response.status())
    }

    fn max_read_size(&self) -> u32 {
        self.max_read_size
    }

    fn max_write_size(&self) -> u32 {
        self.max_write_size
    }
}
