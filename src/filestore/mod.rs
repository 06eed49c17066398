//! The dialect-independent file-store surface returned by a tree
//! connect, with one implementation per dialect.

pub mod smb1;
pub mod smb2;

pub use smb1::Smb1FileStore;
pub use smb2::Smb2FileStore;

use crate::packets::fscc::{FileDirectoryInformation, FileInformationClass, FsInformationClass};
use crate::packets::smb2::{CreateDisposition, FileId};
use crate::packets::status::Status;

// Access mask bits ([MS-SMB2] 2.2.13.1).
pub const FILE_READ_DATA: u32 = 0x0000_0001;
pub const FILE_WRITE_DATA: u32 = 0x0000_0002;
pub const FILE_APPEND_DATA: u32 = 0x0000_0004;
pub const FILE_READ_EA: u32 = 0x0000_0008;
pub const FILE_WRITE_EA: u32 = 0x0000_0010;
pub const FILE_LIST_DIRECTORY: u32 = 0x0000_0001;
pub const FILE_READ_ATTRIBUTES: u32 = 0x0000_0080;
pub const FILE_WRITE_ATTRIBUTES: u32 = 0x0000_0100;
pub const DELETE: u32 = 0x0001_0000;
pub const READ_CONTROL: u32 = 0x0002_0000;
pub const SYNCHRONIZE: u32 = 0x0010_0000;

// Share access ([MS-SMB2] 2.2.13).
pub const FILE_SHARE_READ: u32 = 0x1;
pub const FILE_SHARE_WRITE: u32 = 0x2;
pub const FILE_SHARE_DELETE: u32 = 0x4;

// Create options ([MS-SMB2] 2.2.13).
pub const FILE_DIRECTORY_FILE: u32 = 0x0000_0001;
pub const FILE_NON_DIRECTORY_FILE: u32 = 0x0000_0040;
pub const FILE_SYNCHRONOUS_IO_NONALERT: u32 = 0x0000_0020;
pub const FILE_DELETE_ON_CLOSE: u32 = 0x0000_1000;

/// A file handle, tagged by the dialect and tree that created it so
/// cross-store misuse is rejected rather than silently mis-addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileHandle {
    Smb1 { fid: u16, tree_id: u16 },
    Smb2 { file_id: FileId, tree_id: u32 },
}

/// What the create operation did, mapped from the dialect-specific
/// create action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Superseded,
    Opened,
    Created,
    Overwritten,
}

#[derive(Debug, Clone)]
pub struct CreateFileArgs {
    pub desired_access: u32,
    pub file_attributes: u32,
    pub share_access: u32,
    pub create_disposition: CreateDisposition,
    pub create_options: u32,
}

impl CreateFileArgs {
    /// Open an existing file for reading.
    pub fn read(disposition: CreateDisposition) -> Self {
        Self {
            desired_access: FILE_READ_DATA | FILE_READ_ATTRIBUTES | SYNCHRONIZE,
            file_attributes: 0,
            share_access: FILE_SHARE_READ,
            create_disposition: disposition,
            create_options: FILE_NON_DIRECTORY_FILE | FILE_SYNCHRONOUS_IO_NONALERT,
        }
    }

    /// Open or create a file for reading and writing.
    pub fn read_write(disposition: CreateDisposition) -> Self {
        Self {
            desired_access: FILE_READ_DATA
                | FILE_WRITE_DATA
                | FILE_READ_ATTRIBUTES
                | DELETE
                | SYNCHRONIZE,
            file_attributes: 0,
            share_access: FILE_SHARE_READ | FILE_SHARE_WRITE,
            create_disposition: disposition,
            create_options: FILE_NON_DIRECTORY_FILE | FILE_SYNCHRONOUS_IO_NONALERT,
        }
    }

    /// Open a directory for enumeration.
    pub fn directory() -> Self {
        Self {
            desired_access: FILE_LIST_DIRECTORY | FILE_READ_ATTRIBUTES | SYNCHRONIZE,
            file_attributes: 0,
            share_access: FILE_SHARE_READ | FILE_SHARE_WRITE,
            create_disposition: CreateDisposition::Open,
            create_options: FILE_DIRECTORY_FILE | FILE_SYNCHRONOUS_IO_NONALERT,
        }
    }

    /// Open a named pipe endpoint, as used for DCE/RPC.
    pub fn named_pipe() -> Self {
        Self {
            desired_access: FILE_READ_DATA
                | FILE_WRITE_DATA
                | FILE_APPEND_DATA
                | FILE_READ_EA
                | FILE_WRITE_EA
                | FILE_READ_ATTRIBUTES
                | FILE_WRITE_ATTRIBUTES
                | READ_CONTROL
                | SYNCHRONIZE,
            file_attributes: 0,
            share_access: FILE_SHARE_READ | FILE_SHARE_WRITE,
            create_disposition: CreateDisposition::Open,
            create_options: FILE_NON_DIRECTORY_FILE | FILE_SYNCHRONOUS_IO_NONALERT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateFileResult {
    pub handle: FileHandle,
    pub file_status: FileStatus,
    pub is_directory: bool,
    pub end_of_file: u64,
}

/// File-level operations over a connected tree.
///
/// Every operation reports the server's NT status verbatim alongside its
/// out-parameters; `Err` is reserved for transport loss, handle misuse
/// and unimplemented operations. SMB1 stores additionally require their
/// callers to serialise operations (responses correlate by command code
/// alone).
pub trait FileStore: Send + Sync {
    fn create_file(
        &self,
        path: &str,
        args: &CreateFileArgs,
    ) -> crate::Result<(Option<CreateFileResult>, Status)>;

    fn close_file(&self, handle: &FileHandle) -> crate::Result<Status>;

    fn read_file(
        &self,
        handle: &FileHandle,
        offset: u64,
        max_count: u32,
    ) -> crate::Result<(Vec<u8>, Status)>;

    fn write_file(
        &self,
        handle: &FileHandle,
        offset: u64,
        data: &[u8],
    ) -> crate::Result<(u32, Status)>;

    fn flush_file_buffers(&self, handle: &FileHandle) -> crate::Result<Status>;

    fn lock_file(
        &self,
        handle: &FileHandle,
        offset: u64,
        length: u64,
        exclusive: bool,
    ) -> crate::Result<Status>;

    fn unlock_file(&self, handle: &FileHandle, offset: u64, length: u64)
        -> crate::Result<Status>;

    /// Enumerates a directory. SMB2 drives the open `handle` with the
    /// given pattern; SMB1 addresses the search by `pattern` alone
    /// (e.g. `\dir\*`) and ignores the handle.
    fn query_directory(
        &self,
        handle: Option<&FileHandle>,
        pattern: &str,
        info_class: FileInformationClass,
    ) -> crate::Result<(Vec<FileDirectoryInformation>, Status)>;

    fn get_file_information(
        &self,
        handle: &FileHandle,
        info_class: FileInformationClass,
    ) -> crate::Result<(Vec<u8>, Status)>;

    fn set_file_information(
        &self,
        handle: &FileHandle,
        info_class: FileInformationClass,
        buffer: Vec<u8>,
    ) -> crate::Result<Status>;

    fn get_file_system_information(
        &self,
        info_class: FsInformationClass,
    ) -> crate::Result<(Vec<u8>, Status)>;

    fn set_file_system_information(
        &self,
        info_class: FsInformationClass,
        buffer: Vec<u8>,
    ) -> crate::Result<Status>;

    fn get_security_information(
        &self,
        handle: &FileHandle,
        security_information: u32,
    ) -> crate::Result<(Vec<u8>, Status)>;

    fn set_security_information(
        &self,
        handle: &FileHandle,
        security_information: u32,
        descriptor: Vec<u8>,
    ) -> crate::Result<Status>;

    fn notify_change(
        &self,
        handle: &FileHandle,
        completion_filter: u32,
        watch_tree: bool,
        output_buffer_size: u32,
    ) -> crate::Result<(Vec<u8>, Status)>;

    fn device_io_control(
        &self,
        handle: &FileHandle,
        ctl_code: u32,
        input: &[u8],
        max_output: u32,
    ) -> crate::Result<(Vec<u8>, Status)>;

    fn cancel(&self, handle: &FileHandle) -> crate::Result<Status>;

    /// Disconnects the underlying tree. The store is unusable afterwards.
    fn disconnect(&self) -> crate::Result<Status>;

    fn max_read_size(&self) -> u32;

    fn max_write_size(&self) -> u32;
}
