use std::{fmt::Display, io::Cursor, str::FromStr};

use binrw::prelude::*;
use rand::{rngs::OsRng, Rng};

/// A standard, 16-byte GUID, stored in its on-the-wire (mixed-endian)
/// component form.
#[derive(BinRead, BinWrite, Clone, Copy, PartialEq, Eq, Default)]
#[brw(little)]
pub struct Guid(u32, u16, u16, [u8; 8]);

impl Guid {
    /// Builds a GUID from its display-form components.
    pub const fn from_fields(a: u32, b: u16, c: u16, d: [u8; 8]) -> Self {
        Guid(a, b, c, d)
    }

    /// Generates a fresh random GUID.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        OsRng.fill(&mut bytes);
        bytes.into()
    }
}

impl From<[u8; 16]> for Guid {
    fn from(value: [u8; 16]) -> Self {
        Guid::read(&mut Cursor::new(&value)).expect("16 bytes always form a GUID")
    }
}

impl FromStr for Guid {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || crate::Error::InvalidArgument(format!("malformed GUID string: {s}"));
        let parts: Vec<&str> = s.split('-').collect();
        let [a, b, c, d, e] = parts.as_slice() else {
            return Err(bad());
        };
        if d.len() != 4 || e.len() != 12 {
            return Err(bad());
        }
        let mut tail = [0u8; 8];
        for (i, chunk) in d.as_bytes().chunks(2).chain(e.as_bytes().chunks(2)).enumerate() {
            tail[i] = u8::from_str_radix(std::str::from_utf8(chunk).map_err(|_| bad())?, 16)
                .map_err(|_| bad())?;
        }
        Ok(Guid(
            u32::from_str_radix(a, 16).map_err(|_| bad())?,
            u16::from_str_radix(b, 16).map_err(|_| bad())?,
            u16::from_str_radix(c, 16).map_err(|_| bad())?,
            tail,
        ))
    }
}

impl Display for Guid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            self.0,
            self.1,
            self.2,
            self.3[0],
            self.3[1],
            self.3[2],
            self.3[3],
            self.3[4],
            self.3[5],
            self.3[6],
            self.3[7],
        )
    }
}

impl std::fmt::Debug for Guid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_GUID_STR: &str = "065eadf1-6daf-1543-b04f-10e69084c9ae";
    const TEST_GUID_BYTES: [u8; 16] = [
        0xf1, 0xad, 0x5e, 0x06, 0xaf, 0x6d, 0x43, 0x15, 0xb0, 0x4f, 0x10, 0xe6, 0x90, 0x84, 0xc9,
        0xae,
    ];

    #[test]
    fn test_guid_string_round_trip() {
        let guid: Guid = TEST_GUID_STR.parse().unwrap();
        assert_eq!(guid, Guid::from(TEST_GUID_BYTES));
        assert_eq!(guid.to_string(), TEST_GUID_STR);
    }

    #[test]
    fn test_guid_write_bytes() {
        let mut cursor = Cursor::new(Vec::new());
        Guid::from(TEST_GUID_BYTES).write(&mut cursor).unwrap();
        assert_eq!(cursor.into_inner(), TEST_GUID_BYTES);
    }
}
