//! A minimal NDR32 (transfer syntax 8a885d04 v2) marshalling cursor —
//! just enough surface for the Server Service calls this client makes.
//!
//! Alignment is relative to the stub-data start; stubs are built and
//! parsed standalone, so buffer offsets are NDR offsets.

use crate::Error;

pub struct NdrWriter {
    buffer: Vec<u8>,
    next_referent_id: u32,
}

impl NdrWriter {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            next_referent_id: 0x0002_0000,
        }
    }

    pub fn into_buffer(self) -> Vec<u8> {
        self.buffer
    }

    pub fn align(&mut self, boundary: usize) {
        while self.buffer.len() % boundary != 0 {
            self.buffer.push(0);
        }
    }

    pub fn write_u16(&mut self, value: u16) {
        self.align(2);
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.align(4);
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Emits a fresh referent id for a non-null unique pointer.
    pub fn write_referent_id(&mut self) -> u32 {
        let id = self.next_referent_id;
        self.next_referent_id += 4;
        self.write_u32(id);
        id
    }

    pub fn write_null_pointer(&mut self) {
        self.write_u32(0);
    }

    /// A conformant varying wide string, null terminator included.
    pub fn write_wide_string(&mut self, value: &str) {
        let units: Vec<u16> = value.encode_utf16().chain(std::iter::once(0)).collect();
        self.write_u32(units.len() as u32); // max count
        self.write_u32(0); // offset
        self.write_u32(units.len() as u32); // actual count
        for unit in &units {
            self.buffer.extend_from_slice(&unit.to_le_bytes());
        }
    }
}

impl Default for NdrWriter {
    fn default() -> Self {
        Self::new()
    }
}

pub struct NdrReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> NdrReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    fn truncated() -> Error {
        Error::InvalidMessage("truncated NDR stub data".into())
    }

    pub fn align(&mut self, boundary: usize) {
        while self.position % boundary != 0 {
            self.position += 1;
        }
    }

    pub fn read_u16(&mut self) -> crate::Result<u16> {
        self.align(2);
        let bytes = self
            .buffer
            .get(self.position..self.position + 2)
            .ok_or_else(Self::truncated)?;
        self.position += 2;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> crate::Result<u32> {
        self.align(4);
        let bytes = self
            .buffer
            .get(self.position..self.position + 4)
            .ok_or_else(Self::truncated)?;
        self.position += 4;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads a unique-pointer referent id; zero is a null pointer.
    pub fn read_pointer(&mut self) -> crate::Result<u32> {
        self.read_u32()
    }

    /// A conformant varying wide string, dropping the terminator.
    pub fn read_wide_string(&mut self) -> crate::Result<String> {
        let _max_count = self.read_u32()?;
        let _offset = self.read_u32()?;
        let actual_count = self.read_u32()? as usize;
        let mut units = Vec::with_capacity(actual_count);
        for _ in 0..actual_count {
            let bytes = self
                .buffer
                .get(self.position..self.position + 2)
                .ok_or_else(Self::truncated)?;
            self.position += 2;
            units.push(u16::from_le_bytes([bytes[0], bytes[1]]));
        }
        while units.last() == Some(&0) {
            units.pop();
        }
        String::from_utf16(&units)
            .map_err(|_| Error::InvalidMessage("NDR string is not valid UTF-16".into()))
    }
}
