//! SMB_STRING codec.
//!
//! SMB1 strings are null-terminated, OEM (single byte) or UTF-16LE
//! depending on the negotiated Unicode flag. Unicode strings are aligned
//! to a 16-bit boundary relative to the start of the SMB header; because
//! messages are serialized in a single stream starting at the header,
//! stream-position parity decides whether a pad byte is present.

use binrw::{prelude::*, Endian};
use std::io::{Read, Seek, Write};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Smb1String(pub String);

impl Smb1String {
    /// Encoded length in bytes, excluding the alignment pad and the null
    /// terminator.
    pub fn encoded_len(&self, unicode: bool) -> usize {
        if unicode {
            self.0.encode_utf16().count() * 2
        } else {
            self.0.len()
        }
    }
}

impl BinRead for Smb1String {
    type Args<'a> = (bool,);

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        (unicode,): Self::Args<'_>,
    ) -> BinResult<Self> {
        if unicode {
            if reader.stream_position()? % 2 == 1 {
                u8::read_options(reader, endian, ())?;
            }
            let mut units = Vec::new();
            loop {
                let unit = u16::read_options(reader, Endian::Little, ())?;
                if unit == 0 {
                    break;
                }
                units.push(unit);
            }
            String::from_utf16(&units)
                .map(Smb1String)
                .map_err(|_| binrw::Error::AssertFail {
                    pos: 0,
                    message: "string is not valid UTF-16".to_string(),
                })
        } else {
            let mut bytes = Vec::new();
            loop {
                let byte = u8::read_options(reader, endian, ())?;
                if byte == 0 {
                    break;
                }
                bytes.push(byte);
            }
            Ok(Smb1String(bytes.into_iter().map(|b| b as char).collect()))
        }
    }
}

impl BinWrite for Smb1String {
    type Args<'a> = (bool,);

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        (unicode,): Self::Args<'_>,
    ) -> BinResult<()> {
        if unicode {
            if writer.stream_position()? % 2 == 1 {
                0u8.write_options(writer, endian, ())?;
            }
            for unit in self.0.encode_utf16() {
                unit.write_options(writer, Endian::Little, ())?;
            }
            0u16.write_options(writer, Endian::Little, ())
        } else {
            for c in self.0.chars() {
                if c as u32 > 0xFF {
                    return Err(binrw::Error::AssertFail {
                        pos: writer.stream_position()?,
                        message: "string is not OEM-encodable".to_string(),
                    });
                }
                (c as u8).write_options(writer, endian, ())?;
            }
            0u8.write_options(writer, endian, ())
        }
    }
}

impl From<&str> for Smb1String {
    fn from(s: &str) -> Self {
        Smb1String(s.to_string())
    }
}

impl From<String> for Smb1String {
    fn from(s: String) -> Self {
        Smb1String(s)
    }
}

impl std::fmt::Display for Smb1String {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_oem_round_trip() {
        let mut buf = Cursor::new(Vec::new());
        Smb1String::from("ab").write_le_args(&mut buf, (false,)).unwrap();
        assert_eq!(buf.get_ref(), &vec![0x61, 0x62, 0x00]);
        buf.set_position(0);
        let parsed = Smb1String::read_le_args(&mut buf, (false,)).unwrap();
        assert_eq!(parsed.0, "ab");
    }

    #[test]
    fn test_unicode_pad_on_odd_position() {
        let mut buf = Cursor::new(vec![0xFFu8]);
        buf.set_position(1);
        Smb1String::from("a").write_le_args(&mut buf, (true,)).unwrap();
        assert_eq!(buf.get_ref(), &vec![0xFF, 0x00, 0x61, 0x00, 0x00, 0x00]);

        buf.set_position(1);
        let parsed = Smb1String::read_le_args(&mut buf, (true,)).unwrap();
        assert_eq!(parsed.0, "a");
    }

    #[test]
    fn test_encoded_len() {
        let s = Smb1String::from("share");
        assert_eq!(s.encoded_len(false), 5);
        assert_eq!(s.encoded_len(true), 10);
    }
}
