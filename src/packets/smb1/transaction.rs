//! Transaction2 and NT Transact carriers ([MS-CIFS] 2.2.4.46, 2.2.4.62)
//! plus the subcommand parameter blocks this client issues through them.
//!
//! Both carriers move an opaque parameter section and an opaque data
//! section addressed by header-relative offsets; the subcommand decides
//! their shape. Multi-part (secondary) transactions are not produced or
//! reassembled.

use binrw::prelude::*;

use super::string::Smb1String;
use crate::packets::binrw_util::prelude::*;

#[derive(BinRead, BinWrite, Debug, PartialEq, Eq, Clone, Copy)]
#[brw(repr(u16), little)]
pub enum Trans2Subcommand {
    FindFirst2 = 0x0001,
    FindNext2 = 0x0002,
    QueryFsInformation = 0x0003,
    QueryFileInformation = 0x0007,
    SetFileInformation = 0x0008,
}

/// NT Transact subsystem functions.
#[derive(BinRead, BinWrite, Debug, PartialEq, Eq, Clone, Copy)]
#[brw(repr(u16), little)]
pub enum NtTransactFunction {
    Ioctl = 0x0002,
    NotifyChange = 0x0004,
}

/// Pass-through info levels address the native information classes
/// directly ([MS-SMB] 2.2.2.3.5).
pub const INFO_PASSTHROUGH: u16 = 0x03E8;
/// `SMB_FIND_FILE_DIRECTORY_INFO`.
pub const FIND_FILE_DIRECTORY_INFO: u16 = 0x0101;
/// Close the search automatically once the last entry is returned.
pub const FIND_CLOSE_AT_EOS: u16 = 0x0002;
/// Hidden | system | directory: enumerate everything.
pub const FIND_DEFAULT_SEARCH_ATTRIBUTES: u16 = 0x0016;

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb1Transaction2Request {
    #[bw(try_calc = (14 + setup.len()).try_into())]
    #[br(assert(_word_count >= 14))]
    _word_count: u8,
    #[bw(try_calc = parameters.len().try_into())]
    _total_parameter_count: u16,
    #[bw(try_calc = data.len().try_into())]
    _total_data_count: u16,
    pub max_parameter_count: u16,
    pub max_data_count: u16,
    pub max_setup_count: u8,
    #[bw(calc = 0)]
    _reserved: u8,
    pub flags: u16,
    #[bw(calc = 0)]
    _timeout: u32,
    #[bw(calc = 0)]
    _reserved2: u16,
    #[bw(try_calc = parameters.len().try_into())]
    parameter_count: u16,
    #[bw(calc = PosMarker::default())]
    parameter_offset: PosMarker<u16>,
    #[bw(try_calc = data.len().try_into())]
    data_count: u16,
    #[bw(calc = PosMarker::default())]
    data_offset: PosMarker<u16>,
    #[bw(try_calc = setup.len().try_into())]
    setup_count: u8,
    #[bw(calc = 0)]
    _reserved3: u8,
    #[br(count = setup_count)]
    pub setup: Vec<u16>,
    #[bw(calc = PosMarker::default())]
    byte_count: PosMarker<u16>,
    #[bw(calc = PosMarker::default())]
    _body_start: PosMarker<()>,
    #[br(seek_before = std::io::SeekFrom::Start(parameter_offset.value as u64), count = parameter_count)]
    #[bw(write_with = write_trans2_parameters, args(&parameter_offset))]
    pub parameters: Vec<u8>,
    #[br(seek_before = std::io::SeekFrom::Start(data_offset.value as u64), count = data_count)]
    #[bw(write_with = write_trans_data, args(&data_offset, &byte_count, &_body_start))]
    pub data: Vec<u8>,
}

impl Smb1Transaction2Request {
    pub fn new(subcommand: Trans2Subcommand, parameters: Vec<u8>, data: Vec<u8>) -> Self {
        Self {
            max_parameter_count: 256,
            max_data_count: 16384,
            max_setup_count: 0,
            flags: 0,
            setup: vec![subcommand as u16],
            parameters,
            data,
        }
    }

    pub fn subcommand(&self) -> Option<Trans2Subcommand> {
        match self.setup.first() {
            Some(0x0001) => Some(Trans2Subcommand::FindFirst2),
            Some(0x0002) => Some(Trans2Subcommand::FindNext2),
            Some(0x0003) => Some(Trans2Subcommand::QueryFsInformation),
            Some(0x0007) => Some(Trans2Subcommand::QueryFileInformation),
            Some(0x0008) => Some(Trans2Subcommand::SetFileInformation),
            _ => None,
        }
    }
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb1Transaction2Response {
    #[bw(try_calc = (10 + setup.len()).try_into())]
    #[br(assert(_word_count >= 10))]
    _word_count: u8,
    #[bw(try_calc = parameters.len().try_into())]
    _total_parameter_count: u16,
    #[bw(try_calc = data.len().try_into())]
    _total_data_count: u16,
    #[bw(calc = 0)]
    _reserved: u16,
    #[bw(try_calc = parameters.len().try_into())]
    parameter_count: u16,
    #[bw(calc = PosMarker::default())]
    parameter_offset: PosMarker<u16>,
    #[bw(calc = 0)]
    _parameter_displacement: u16,
    #[bw(try_calc = data.len().try_into())]
    data_count: u16,
    #[bw(calc = PosMarker::default())]
    data_offset: PosMarker<u16>,
    #[bw(calc = 0)]
    _data_displacement: u16,
    #[bw(try_calc = setup.len().try_into())]
    setup_count: u8,
    #[bw(calc = 0)]
    _reserved2: u8,
    #[br(count = setup_count)]
    pub setup: Vec<u16>,
    #[bw(calc = PosMarker::default())]
    byte_count: PosMarker<u16>,
    #[bw(calc = PosMarker::default())]
    _body_start: PosMarker<()>,
    #[br(seek_before = std::io::SeekFrom::Start(parameter_offset.value as u64), count = parameter_count)]
    #[bw(write_with = write_trans_parameters, args(&parameter_offset))]
    pub parameters: Vec<u8>,
    #[br(seek_before = std::io::SeekFrom::Start(data_offset.value as u64), count = data_count)]
    #[bw(write_with = write_trans_data, args(&data_offset, &byte_count, &_body_start))]
    pub data: Vec<u8>,
}

impl Smb1Transaction2Response {
    pub fn new(parameters: Vec<u8>, data: Vec<u8>) -> Self {
        Self {
            setup: vec![],
            parameters,
            data,
        }
    }
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb1NtTransactRequest {
    #[bw(try_calc = (19 + setup.len()).try_into())]
    #[br(assert(_word_count >= 19))]
    _word_count: u8,
    pub max_setup_count: u8,
    #[bw(calc = 0)]
    _reserved: u16,
    #[bw(try_calc = parameters.len().try_into())]
    _total_parameter_count: u32,
    #[bw(try_calc = data.len().try_into())]
    _total_data_count: u32,
    pub max_parameter_count: u32,
    pub max_data_count: u32,
    #[bw(try_calc = parameters.len().try_into())]
    parameter_count: u32,
    #[bw(calc = PosMarker::default())]
    parameter_offset: PosMarker<u32>,
    #[bw(try_calc = data.len().try_into())]
    data_count: u32,
    #[bw(calc = PosMarker::default())]
    data_offset: PosMarker<u32>,
    #[bw(try_calc = setup.len().try_into())]
    setup_count: u8,
    pub function: NtTransactFunction,
    #[br(count = setup_count)]
    pub setup: Vec<u16>,
    #[bw(calc = PosMarker::default())]
    byte_count: PosMarker<u16>,
    #[bw(calc = PosMarker::default())]
    _body_start: PosMarker<()>,
    #[br(seek_before = std::io::SeekFrom::Start(parameter_offset.value as u64), count = parameter_count)]
    #[bw(write_with = write_trans_parameters, args(&parameter_offset))]
    pub parameters: Vec<u8>,
    #[br(seek_before = std::io::SeekFrom::Start(data_offset.value as u64), count = data_count)]
    #[bw(write_with = write_trans_data, args(&data_offset, &byte_count, &_body_start))]
    pub data: Vec<u8>,
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct Smb1NtTransactResponse {
    #[bw(try_calc = (18 + setup.len()).try_into())]
    #[br(assert(_word_count >= 18))]
    _word_count: u8,
    #[bw(calc = [0; 3])]
    _reserved: [u8; 3],
    #[bw(try_calc = parameters.len().try_into())]
    _total_parameter_count: u32,
    #[bw(try_calc = data.len().try_into())]
    _total_data_count: u32,
    #[bw(try_calc = parameters.len().try_into())]
    parameter_count: u32,
    #[bw(calc = PosMarker::default())]
    parameter_offset: PosMarker<u32>,
    #[bw(calc = 0)]
    _parameter_displacement: u32,
    #[bw(try_calc = data.len().try_into())]
    data_count: u32,
    #[bw(calc = PosMarker::default())]
    data_offset: PosMarker<u32>,
    #[bw(calc = 0)]
    _data_displacement: u32,
    #[bw(try_calc = setup.len().try_into())]
    setup_count: u8,
    #[br(count = setup_count)]
    pub setup: Vec<u16>,
    #[bw(calc = PosMarker::default())]
    byte_count: PosMarker<u16>,
    #[bw(calc = PosMarker::default())]
    _body_start: PosMarker<()>,
    #[br(seek_before = std::io::SeekFrom::Start(parameter_offset.value as u64), count = parameter_count)]
    #[bw(write_with = write_trans_parameters, args(&parameter_offset))]
    pub parameters: Vec<u8>,
    #[br(seek_before = std::io::SeekFrom::Start(data_offset.value as u64), count = data_count)]
    #[bw(write_with = write_trans_data, args(&data_offset, &byte_count, &_body_start))]
    pub data: Vec<u8>,
}

impl Smb1NtTransactResponse {
    pub fn new(setup: Vec<u16>, parameters: Vec<u8>, data: Vec<u8>) -> Self {
        Self {
            setup,
            parameters,
            data,
        }
    }
}

fn align_to_4<W: binrw::io::Write + binrw::io::Seek>(writer: &mut W) -> BinResult<()> {
    while writer.stream_position()? % 4 != 0 {
        writer.write_all(&[0])?;
    }
    Ok(())
}

/// Transaction2 parameter sections follow the (empty) transaction name.
#[binrw::writer(writer, endian)]
fn write_trans2_parameters<O>(
    parameters: &Vec<u8>,
    parameter_offset: &PosMarker<O>,
) -> BinResult<()>
where
    O: BinWrite<Args<'static> = ()> + TryFrom<u64> + Default,
    O::Error: binrw::error::CustomError + 'static,
{
    0u8.write_options(writer, endian, ())?;
    write_trans_parameters(parameters, writer, endian, (parameter_offset,))
}

#[binrw::writer(writer, endian)]
fn write_trans_parameters<O>(
    parameters: &Vec<u8>,
    parameter_offset: &PosMarker<O>,
) -> BinResult<()>
where
    O: BinWrite<Args<'static> = ()> + TryFrom<u64> + Default,
    O::Error: binrw::error::CustomError + 'static,
{
    align_to_4(writer)?;
    parameter_offset.write_back(writer.stream_position()?, writer, endian)?;
    parameters.write_options(writer, endian, ())
}

#[binrw::writer(writer, endian)]
fn write_trans_data<O>(
    data: &Vec<u8>,
    data_offset: &PosMarker<O>,
    byte_count: &PosMarker<u16>,
    body_start: &PosMarker<()>,
) -> BinResult<()>
where
    O: BinWrite<Args<'static> = ()> + TryFrom<u64> + Default,
    O::Error: binrw::error::CustomError + 'static,
{
    align_to_4(writer)?;
    data_offset.write_back(writer.stream_position()?, writer, endian)?;
    data.write_options(writer, endian, ())?;
    let total = writer.stream_position()? - body_start.pos.get();
    byte_count.write_back(total, writer, endian)
}

// -- Subcommand parameter blocks --

#[binrw::binrw]
#[derive(Debug)]
#[brw(little, import(unicode: bool))]
pub struct FindFirst2Parameters {
    pub search_attributes: u16,
    pub search_count: u16,
    pub flags: u16,
    pub information_level: u16,
    #[bw(calc = 0)]
    _search_storage_type: u32,
    #[brw(args(unicode))]
    pub file_name: Smb1String,
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct FindFirst2ReplyParameters {
    pub sid: u16,
    pub search_count: u16,
    pub end_of_search: u16,
    pub ea_error_offset: u16,
    pub last_name_offset: u16,
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little, import(unicode: bool))]
pub struct FindNext2Parameters {
    pub sid: u16,
    pub search_count: u16,
    pub information_level: u16,
    #[bw(calc = 0)]
    _resume_key: u32,
    pub flags: u16,
    #[brw(args(unicode))]
    pub file_name: Smb1String,
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct FindNext2ReplyParameters {
    pub search_count: u16,
    pub end_of_search: u16,
    pub ea_error_offset: u16,
    pub last_name_offset: u16,
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct QueryFileInformationParameters {
    pub fid: u16,
    pub information_level: u16,
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct SetFileInformationParameters {
    pub fid: u16,
    pub information_level: u16,
    #[bw(calc = 0)]
    _reserved: u16,
}

#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct QueryFsInformationParameters {
    pub information_level: u16,
}

/// Setup words of an NT Transact IOCTL ([MS-CIFS] 2.2.7.2).
#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct IoctlSetup {
    pub function_code: u32,
    pub fid: u16,
    pub is_fsctl: u8,
    pub is_flags: u8,
}

/// Setup words of an NT Transact NotifyChange ([MS-CIFS] 2.2.7.4).
#[binrw::binrw]
#[derive(Debug)]
#[brw(little)]
pub struct NotifyChangeSetup {
    pub completion_filter: u32,
    pub fid: u16,
    pub watch_tree: u8,
    #[bw(calc = 0)]
    _reserved: u8,
}

/// Encodes a binrw structure into a standalone blob, as transaction
/// parameter/data sections are carried.
pub fn encode_blob<T: for<'a> BinWrite<Args<'a> = ()>>(value: &T) -> crate::Result<Vec<u8>> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    value.write_le(&mut cursor)?;
    Ok(cursor.into_inner())
}

/// Encodes a binrw structure taking the Unicode flag, such as the find
/// parameter blocks.
pub fn encode_blob_args<T: for<'a> BinWrite<Args<'a> = (bool,)>>(
    value: &T,
    unicode: bool,
) -> crate::Result<Vec<u8>> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    value.write_le_args(&mut cursor, (unicode,))?;
    Ok(cursor.into_inner())
}

/// Decodes a transaction parameter/data section.
pub fn decode_blob<T: for<'a> BinRead<Args<'a> = ()>>(blob: &[u8]) -> crate::Result<T> {
    Ok(T::read_le(&mut std::io::Cursor::new(blob))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packets::smb1::message::tests::{decode_message, encode_message};
    use crate::packets::smb1::*;

    #[test]
    fn test_trans2_request_round_trip() {
        let mut header = Smb1Header::new(Smb1Command::Transaction2);
        header.flags2.set_unicode(true);
        let params = encode_blob_args(
            &FindFirst2Parameters {
                search_attributes: FIND_DEFAULT_SEARCH_ATTRIBUTES,
                search_count: 100,
                flags: FIND_CLOSE_AT_EOS,
                information_level: FIND_FILE_DIRECTORY_INFO,
                file_name: r"\dir\*".into(),
            },
            false,
        )
        .unwrap();
        let bytes = encode_message(
            header,
            Smb1Content::Transaction2Request(Smb1Transaction2Request::new(
                Trans2Subcommand::FindFirst2,
                params.clone(),
                vec![],
            )),
        );
        let message = decode_message(&bytes);
        let Smb1Content::Transaction2Request(parsed) = message.content else {
            panic!("wrong content: {:?}", message.content);
        };
        assert_eq!(parsed.subcommand(), Some(Trans2Subcommand::FindFirst2));
        assert_eq!(parsed.parameters, params);
        assert!(parsed.data.is_empty());
    }

    #[test]
    fn test_trans2_response_round_trip() {
        let mut header = Smb1Header::new(Smb1Command::Transaction2);
        header.flags.set_reply(true);
        let reply_params = encode_blob(&FindFirst2ReplyParameters {
            sid: 3,
            search_count: 2,
            end_of_search: 1,
            ea_error_offset: 0,
            last_name_offset: 0,
        })
        .unwrap();
        let data = vec![0xA5; 96];
        let bytes = encode_message(
            header,
            Smb1Content::Transaction2Response(Smb1Transaction2Response::new(
                reply_params.clone(),
                data.clone(),
            )),
        );
        let message = decode_message(&bytes);
        let Smb1Content::Transaction2Response(parsed) = message.content else {
            panic!("wrong content: {:?}", message.content);
        };
        assert_eq!(parsed.parameters, reply_params);
        assert_eq!(parsed.data, data);
        let reply: FindFirst2ReplyParameters = decode_blob(&parsed.parameters).unwrap();
        assert_eq!(reply.sid, 3);
        assert_eq!(reply.end_of_search, 1);
    }

    #[test]
    fn test_nt_transact_ioctl_round_trip() {
        let header = Smb1Header::new(Smb1Command::NtTransact);
        let setup = IoctlSetup {
            function_code: 0x0011C017,
            fid: 42,
            is_fsctl: 1,
            is_flags: 0,
        };
        let setup_blob = encode_blob(&setup).unwrap();
        let setup_words: Vec<u16> = setup_blob
            .chunks(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        let bytes = encode_message(
            header,
            Smb1Content::NtTransactRequest(Smb1NtTransactRequest {
                max_setup_count: 0,
                max_parameter_count: 0,
                max_data_count: 4096,
                function: NtTransactFunction::Ioctl,
                setup: setup_words.clone(),
                parameters: vec![],
                data: vec![1, 2, 3, 4],
            }),
        );
        let message = decode_message(&bytes);
        let Smb1Content::NtTransactRequest(parsed) = message.content else {
            panic!("wrong content: {:?}", message.content);
        };
        assert_eq!(parsed.setup, setup_words);
        assert_eq!(parsed.data, vec![1, 2, 3, 4]);
    }
}
