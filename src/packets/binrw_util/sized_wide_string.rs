//! Length-delimited string codecs.
//!
//! SMB carries most strings as UTF-16LE runs whose byte length lives in a
//! separate field, unlike [`binrw::NullWideString`] which is terminated
//! inline. `SizedWideString` parses with the byte length passed as an
//! argument and writes bare code units.

use binrw::{prelude::*, Endian};
use core::fmt::{self, Write as _};
use std::io::prelude::*;
use std::string::FromUtf16Error;

#[derive(Clone, Eq, PartialEq, Default)]
pub struct SizedWideString {
    data: Vec<u16>,
}

impl SizedWideString {
    const CHAR_WIDTH: u64 = 2;

    /// Size of the string data, in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64 * Self::CHAR_WIDTH
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl BinRead for SizedWideString {
    type Args<'a> = (u64,);

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        (size_bytes,): Self::Args<'_>,
    ) -> BinResult<Self> {
        if size_bytes % Self::CHAR_WIDTH != 0 {
            return Err(binrw::Error::AssertFail {
                pos: reader.stream_position()?,
                message: "wide string byte length is odd".to_string(),
            });
        }
        let mut data = Vec::with_capacity((size_bytes / Self::CHAR_WIDTH) as usize);
        for _ in 0..size_bytes / Self::CHAR_WIDTH {
            data.push(u16::read_options(reader, endian, ())?);
        }
        Ok(Self { data })
    }
}

impl BinWrite for SizedWideString {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        self.data.write_options(writer, endian, ())
    }
}

impl From<&str> for SizedWideString {
    fn from(s: &str) -> Self {
        Self {
            data: s.encode_utf16().collect(),
        }
    }
}

impl From<String> for SizedWideString {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl TryFrom<&SizedWideString> for String {
    type Error = FromUtf16Error;

    fn try_from(value: &SizedWideString) -> Result<Self, Self::Error> {
        String::from_utf16(&value.data)
    }
}

impl fmt::Display for SizedWideString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        char::decode_utf16(self.data.iter().copied())
            .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
            .try_for_each(|c| f.write_char(c))
    }
}

impl fmt::Debug for SizedWideString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SizedWideString(\"{}\")", self)
    }
}
