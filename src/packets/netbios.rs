//! NetBIOS session service framing (RFC 1001 §4.3.1).
//!
//! Every SMB message travels inside a session packet: a 4-byte header
//! (type, flags, length — the low flags bit extends the length to 17
//! bits) followed by the packet trailer. Over Direct TCP only
//! `SessionMessage` packets appear; NetBIOS-over-TCP adds the session
//! establishment packets.

use std::str::FromStr;

use binrw::prelude::*;

#[binrw::binrw]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[brw(big)]
pub struct SessionPacketHeader {
    pub packet_type: SessionPacketType,
    #[br(assert(flags <= 1))]
    flags: u8,
    length: u16,
}

impl SessionPacketHeader {
    /// Size of the header network structure in bytes.
    pub const SIZE: usize = 4;
    /// Largest trailer a 17-bit length can describe.
    pub const MAX_TRAILER_LENGTH: u32 = 0x1FFFF;

    pub fn new(packet_type: SessionPacketType, trailer_length: u32) -> crate::Result<Self> {
        if trailer_length > Self::MAX_TRAILER_LENGTH {
            return Err(crate::Error::InvalidArgument(format!(
                "session packet trailer too large: {trailer_length}"
            )));
        }
        Ok(Self {
            packet_type,
            flags: (trailer_length >> 16) as u8,
            length: trailer_length as u16,
        })
    }

    pub fn trailer_length(&self) -> u32 {
        ((self.flags as u32) << 16) | self.length as u32
    }
}

#[binrw::binrw]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[brw(repr(u8))]
pub enum SessionPacketType {
    SessionMessage = 0x00,
    SessionRequest = 0x81,
    PositiveSessionResponse = 0x82,
    NegativeSessionResponse = 0x83,
    SessionRetargetResponse = 0x84,
    SessionKeepAlive = 0x85,
}

/// A session request names the called server and the calling client.
#[binrw::binrw]
#[derive(Debug, PartialEq, Eq)]
#[brw(big)]
pub struct SessionRequest {
    pub called_name: NetBiosName,
    pub calling_name: NetBiosName,
}

#[binrw::binrw]
#[derive(Debug, PartialEq, Eq)]
#[brw(big)]
pub struct NegativeSessionResponse {
    pub error_code: NegativeSessionResponseErrorCode,
}

#[binrw::binrw]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[brw(big, repr(u8))]
pub enum NegativeSessionResponseErrorCode {
    NotListeningOnCalledName = 0x80,
    NotListeningForCallingName = 0x81,
    CalledNameNotPresent = 0x82,
    InsufficientResources = 0x83,
    UnspecifiedError = 0x8F,
}

/// NetBIOS name suffix for the file server service (`*SMBSERVER<20>`).
pub const FILE_SERVER_SERVICE: u8 = 0x20;
/// NetBIOS name suffix for the workstation service.
pub const WORKSTATION_SERVICE: u8 = 0x00;

/// A 16-byte NetBIOS name (15 characters + service suffix), carried on
/// the wire in first-level ("half-ASCII") encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetBiosName {
    name: String,
    suffix: u8,
}

impl NetBiosName {
    const NIBBLE_BASE: u8 = b'A';
    const NAME_CHARS: usize = 15;

    pub fn new(mut name: String, suffix: u8) -> Self {
        name.truncate(Self::NAME_CHARS);
        name.push_str(&" ".repeat(Self::NAME_CHARS - name.len()));
        NetBiosName { name, suffix }
    }

    /// The name including its space padding.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn suffix(&self) -> u8 {
        self.suffix
    }
}

impl std::fmt::Display for NetBiosName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}<{:02X}>", self.name.trim_end_matches(' '), self.suffix)
    }
}

impl BinRead for NetBiosName {
    type Args<'a> = ();

    fn read_options<R: std::io::Read + std::io::Seek>(
        reader: &mut R,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let encoded_len = u8::read_options(reader, endian, ())? as usize;
        if encoded_len != (Self::NAME_CHARS + 1) * 2 {
            return Err(binrw::Error::AssertFail {
                pos: reader.stream_position()?,
                message: format!("unexpected NetBIOS name length {encoded_len}"),
            });
        }

        let mut name = String::with_capacity(Self::NAME_CHARS);
        let mut suffix = 0u8;
        for index in 0..Self::NAME_CHARS + 1 {
            let upper = u8::read_options(reader, endian, ())?.wrapping_sub(Self::NIBBLE_BASE);
            let lower = u8::read_options(reader, endian, ())?.wrapping_sub(Self::NIBBLE_BASE);
            if upper > 0x0F || lower > 0x0F {
                return Err(binrw::Error::AssertFail {
                    pos: reader.stream_position()?,
                    message: "NetBIOS name is not half-ASCII encoded".to_string(),
                });
            }
            let byte = (upper << 4) | lower;
            if index == Self::NAME_CHARS {
                suffix = byte;
            } else {
                name.push(byte as char);
            }
        }
        let terminator = u8::read_options(reader, endian, ())?;
        if terminator != 0x00 {
            return Err(binrw::Error::AssertFail {
                pos: reader.stream_position()?,
                message: "NetBIOS name is not null-terminated".to_string(),
            });
        }
        Ok(NetBiosName { name, suffix })
    }
}

impl BinWrite for NetBiosName {
    type Args<'a> = ();

    fn write_options<W: std::io::Write + std::io::Seek>(
        &self,
        writer: &mut W,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        let encoded_len = ((Self::NAME_CHARS + 1) * 2) as u8;
        encoded_len.write_options(writer, endian, ())?;

        for byte in self.name.bytes().chain(std::iter::once(self.suffix)) {
            if byte > 0x7F {
                return Err(binrw::Error::AssertFail {
                    pos: writer.stream_position()?,
                    message: "NetBIOS name contains non-ASCII characters".to_string(),
                });
            }
            ((byte >> 4) + Self::NIBBLE_BASE).write_options(writer, endian, ())?;
            ((byte & 0x0F) + Self::NIBBLE_BASE).write_options(writer, endian, ())?;
        }
        0x00u8.write_options(writer, endian, ())
    }
}

impl binrw::meta::ReadEndian for NetBiosName {
    const ENDIAN: binrw::meta::EndianKind = binrw::meta::EndianKind::None;
}

impl binrw::meta::WriteEndian for NetBiosName {
    const ENDIAN: binrw::meta::EndianKind = binrw::meta::EndianKind::None;
}

impl FromStr for NetBiosName {
    type Err = crate::Error;

    /// Parses the `NAME<SS>` display form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || crate::Error::InvalidArgument(format!("malformed NetBIOS name: {s}"));
        let (name, rest) = s.split_once('<').ok_or_else(bad)?;
        if name.is_empty() || name.len() > Self::NAME_CHARS {
            return Err(bad());
        }
        let suffix_str = rest.strip_suffix('>').ok_or_else(bad)?;
        let suffix = u8::from_str_radix(suffix_str, 16).map_err(|_| bad())?;
        Ok(NetBiosName::new(name.to_string(), suffix))
    }
}
