//! File System Control Codes structures ([MS-FSCC]): information
//! classes shared by SMB2 query/set info, SMB2 query directory, and the
//! SMB1 pass-through info levels.

use binrw::prelude::*;
use modular_bitfield::prelude::*;

use crate::packets::binrw_util::prelude::*;

/// File information classes ([MS-FSCC] 2.4).
#[derive(BinRead, BinWrite, Debug, PartialEq, Eq, Clone, Copy)]
#[brw(repr(u8), little)]
pub enum FileInformationClass {
    DirectoryInformation = 0x01,
    FullDirectoryInformation = 0x02,
    BothDirectoryInformation = 0x03,
    BasicInformation = 0x04,
    StandardInformation = 0x05,
    InternalInformation = 0x06,
    EaInformation = 0x07,
    AccessInformation = 0x08,
    NameInformation = 0x09,
    RenameInformation = 0x0A,
    NamesInformation = 0x0C,
    DispositionInformation = 0x0D,
    PositionInformation = 0x0E,
    ModeInformation = 0x10,
    AlignmentInformation = 0x11,
    AllInformation = 0x12,
    AllocationInformation = 0x13,
    EndOfFileInformation = 0x14,
    NetworkOpenInformation = 0x22,
    AttributeTagInformation = 0x23,
    IdBothDirectoryInformation = 0x25,
    IdFullDirectoryInformation = 0x26,
}

/// Filesystem information classes ([MS-FSCC] 2.5).
#[derive(BinRead, BinWrite, Debug, PartialEq, Eq, Clone, Copy)]
#[brw(repr(u8), little)]
pub enum FsInformationClass {
    VolumeInformation = 0x01,
    LabelInformation = 0x02,
    SizeInformation = 0x03,
    DeviceInformation = 0x04,
    AttributeInformation = 0x05,
    ControlInformation = 0x06,
    FullSizeInformation = 0x07,
    ObjectIdInformation = 0x08,
}

#[bitfield]
#[derive(BinRead, BinWrite, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[bw(map = |&x| Self::into_bytes(x))]
#[br(map = Self::from_bytes)]
pub struct FileAttributes {
    pub readonly: bool,
    pub hidden: bool,
    pub system: bool,
    #[skip]
    __: B1,
    pub directory: bool,
    pub archive: bool,
    #[skip]
    __: B1,
    pub normal: bool,
    pub temporary: bool,
    pub sparse_file: bool,
    pub reparse_point: bool,
    pub compressed: bool,
    pub offline: bool,
    pub not_content_indexed: bool,
    pub encrypted: bool,
    pub integrity_stream: bool,
    #[skip]
    __: B16,
}

/// `FileDirectoryInformation` ([MS-FSCC] 2.4.10), without its chaining
/// prefix — see [`ChainedList`]. Identical to the SMB1
/// `SMB_FIND_FILE_DIRECTORY_INFO` level body.
#[binrw::binrw]
#[derive(Debug, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct FileDirectoryInformation {
    pub file_index: u32,
    pub creation_time: FileTime,
    pub last_access_time: FileTime,
    pub last_write_time: FileTime,
    pub change_time: FileTime,
    pub end_of_file: u64,
    pub allocation_size: u64,
    pub file_attributes: FileAttributes,
    #[bw(try_calc = file_name.size().try_into())]
    file_name_length: u32,
    #[br(args(file_name_length as u64))]
    pub file_name: SizedWideString,
}

impl FileDirectoryInformation {
    pub fn simple(name: &str, directory: bool) -> Self {
        Self {
            file_index: 0,
            creation_time: 0.into(),
            last_access_time: 0.into(),
            last_write_time: 0.into(),
            change_time: 0.into(),
            end_of_file: 0,
            allocation_size: 0,
            file_attributes: FileAttributes::new().with_directory(directory),
            file_name: name.into(),
        }
    }
}

/// A run of chained entries: each prefixed with a `NextEntryOffset`
/// pointing at the 8-aligned start of its successor, zero on the last.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChainedList<T>(pub Vec<T>);

impl<T> ChainedList<T> {
    const ALIGNMENT: u64 = 8;
}

impl<T> BinRead for ChainedList<T>
where
    T: for<'a> BinRead<Args<'a> = ()>,
{
    type Args<'a> = ();

    fn read_options<R: binrw::io::Read + binrw::io::Seek>(
        reader: &mut R,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let mut entries = Vec::new();
        // An empty buffer is an empty run.
        let len = reader.seek(std::io::SeekFrom::End(0))?;
        reader.seek(std::io::SeekFrom::Start(0))?;
        if len == 0 {
            return Ok(Self(entries));
        }
        loop {
            let start = reader.stream_position()?;
            let next_entry_offset = u32::read_options(reader, endian, ())?;
            entries.push(T::read_options(reader, endian, ())?);
            if next_entry_offset == 0 {
                break;
            }
            reader.seek(std::io::SeekFrom::Start(start + next_entry_offset as u64))?;
        }
        Ok(Self(entries))
    }
}

impl<T> BinWrite for ChainedList<T>
where
    T: for<'a> BinWrite<Args<'a> = ()>,
{
    type Args<'a> = ();

    fn write_options<W: binrw::io::Write + binrw::io::Seek>(
        &self,
        writer: &mut W,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        for (index, entry) in self.0.iter().enumerate() {
            let start = writer.stream_position()?;
            let last = index == self.0.len() - 1;
            0u32.write_options(writer, endian, ())?;
            entry.write_options(writer, endian, ())?;
            if !last {
                while (writer.stream_position()? - start) % Self::ALIGNMENT != 0 {
                    0u8.write_options(writer, endian, ())?;
                }
                let end = writer.stream_position()?;
                writer.seek(std::io::SeekFrom::Start(start))?;
                u32::try_from(end - start)
                    .map_err(|_| binrw::Error::AssertFail {
                        pos: start,
                        message: "chained entry too large".to_string(),
                    })?
                    .write_options(writer, endian, ())?;
                writer.seek(std::io::SeekFrom::Start(end))?;
            }
        }
        Ok(())
    }
}

impl<T> ChainedList<T>
where
    T: for<'a> BinRead<Args<'a> = ()>,
{
    /// Parses a chained run out of a raw buffer.
    pub fn decode(buffer: &[u8]) -> crate::Result<Vec<T>> {
        let mut cursor = std::io::Cursor::new(buffer);
        Ok(Self::read_le(&mut cursor)?.0)
    }
}

impl<T> ChainedList<T>
where
    T: for<'a> BinWrite<Args<'a> = ()>,
{
    /// Serializes entries into a chained buffer.
    pub fn encode(entries: &[T]) -> crate::Result<Vec<u8>>
    where
        T: Clone,
    {
        let mut cursor = std::io::Cursor::new(Vec::new());
        Self(entries.to_vec()).write_le(&mut cursor)?;
        Ok(cursor.into_inner())
    }
}

#[binrw::binrw]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[brw(little)]
pub struct FileBasicInformation {
    pub creation_time: FileTime,
    pub last_access_time: FileTime,
    pub last_write_time: FileTime,
    pub change_time: FileTime,
    pub file_attributes: FileAttributes,
    #[bw(calc = 0)]
    _reserved: u32,
}

#[binrw::binrw]
#[derive(Debug, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct FileStandardInformation {
    pub allocation_size: u64,
    pub end_of_file: u64,
    pub number_of_links: u32,
    pub delete_pending: u8,
    pub directory: u8,
    #[bw(calc = 0)]
    _reserved: u16,
}

#[binrw::binrw]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[brw(little)]
pub struct FileEndOfFileInformation {
    pub end_of_file: u64,
}

#[binrw::binrw]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[brw(little)]
pub struct FileDispositionInformation {
    /// Non-zero marks the file for deletion on final close.
    pub delete_pending: u8,
}

#[binrw::binrw]
#[derive(Debug, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct FileFsVolumeInformation {
    pub volume_creation_time: FileTime,
    pub volume_serial_number: u32,
    #[bw(try_calc = volume_label.size().try_into())]
    volume_label_length: u32,
    pub supports_objects: u8,
    #[bw(calc = 0)]
    _reserved: u8,
    #[br(args(volume_label_length as u64))]
    pub volume_label: SizedWideString,
}

#[binrw::binrw]
#[derive(Debug, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct FileFsSizeInformation {
    pub total_allocation_units: u64,
    pub available_allocation_units: u64,
    pub sectors_per_allocation_unit: u32,
    pub bytes_per_sector: u32,
}
