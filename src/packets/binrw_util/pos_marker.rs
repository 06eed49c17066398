//! Offset/size back-patching support for binrw structures.
//!
//! Many SMB structures carry an offset or length field that precedes the
//! data it describes. `PosMarker<T>` records the stream position where the
//! field was written (as a placeholder) so the real value can be patched
//! in once the data has been laid down.
//!
//! Based on <https://github.com/jam1garner/binrw/discussions/229>.

use std::{fmt::Debug, io::SeekFrom};

use binrw::{BinRead, BinResult, BinWrite, Endian};

pub struct PosMarker<T> {
    pub pos: core::cell::Cell<u64>,
    pub value: T,
}

impl<T> BinRead for PosMarker<T>
where
    T: BinRead,
{
    type Args<'a> = T::Args<'a>;

    fn read_options<R: binrw::io::Read + binrw::io::Seek>(
        reader: &mut R,
        endian: Endian,
        args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let pos = reader.stream_position()?;
        T::read_options(reader, endian, args).map(|value| Self {
            pos: core::cell::Cell::new(pos),
            value,
        })
    }
}

impl<T> BinWrite for PosMarker<T>
where
    T: BinWrite<Args<'static> = ()> + Default,
{
    type Args<'a> = ();

    fn write_options<W: binrw::io::Write + binrw::io::Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        args: Self::Args<'_>,
    ) -> BinResult<()> {
        self.pos.set(writer.stream_position()?);
        T::default().write_options(writer, endian, args)
    }
}

impl<T> PosMarker<T>
where
    T: BinWrite<Args<'static> = ()> + TryFrom<u64>,
    T::Error: binrw::error::CustomError + 'static,
{
    /// Seek back to the marked position, write `value` there, and return
    /// to the end of the stream.
    pub fn write_back<V, W>(&self, value: V, writer: &mut W, endian: Endian) -> BinResult<()>
    where
        V: TryInto<T>,
        W: binrw::io::Write + binrw::io::Seek,
    {
        let return_to = writer.stream_position()?;
        writer.seek(SeekFrom::Start(self.pos.get()))?;
        value
            .try_into()
            .map_err(|_| binrw::error::Error::Custom {
                pos: self.pos.get(),
                err: Box::new("value does not fit marker field"),
            })?
            .write_options(writer, endian, ())?;
        writer.seek(SeekFrom::Start(return_to))?;
        Ok(())
    }

    /// Write `value`, patching its absolute stream offset into the marker.
    #[binrw::writer(writer, endian)]
    pub fn write_aoff<U>(value: &U, write_offset_to: &Self) -> BinResult<()>
    where
        U: BinWrite<Args<'static> = ()>,
    {
        let start = writer.stream_position()?;
        write_offset_to.write_back(start, writer, endian)?;
        value.write_options(writer, endian, ())
    }

    /// Write `value`, patching its written size (in bytes) into the marker.
    #[binrw::writer(writer, endian)]
    pub fn write_size<U>(value: &U, write_size_to: &Self) -> BinResult<()>
    where
        U: BinWrite<Args<'static> = ()>,
    {
        let start = writer.stream_position()?;
        value.write_options(writer, endian, ())?;
        let size = writer.stream_position()? - start;
        write_size_to.write_back(size, writer, endian)
    }

    /// Write `value`, patching both its absolute offset and its size.
    #[binrw::writer(writer, endian)]
    pub fn write_aoff_size<U, S>(
        value: &U,
        write_offset_to: &PosMarker<S>,
        write_size_to: &Self,
    ) -> BinResult<()>
    where
        U: BinWrite<Args<'static> = ()>,
        S: BinWrite<Args<'static> = ()> + TryFrom<u64>,
        S::Error: binrw::error::CustomError + 'static,
    {
        let start = writer.stream_position()?;
        write_offset_to.write_back(start, writer, endian)?;
        value.write_options(writer, endian, ())?;
        let size = writer.stream_position()? - start;
        write_size_to.write_back(size, writer, endian)
    }
}

impl<T> Debug for PosMarker<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PosMarker")
            .field("pos", &self.pos)
            .field("value", &self.value)
            .finish()
    }
}

impl<T> Default for PosMarker<T>
where
    T: Default,
{
    fn default() -> Self {
        Self {
            pos: core::cell::Cell::new(u64::MAX),
            value: T::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[binrw::binrw]
    #[derive(Debug)]
    #[brw(little)]
    struct OffsetAndBlob {
        #[bw(calc = PosMarker::default())]
        data_offset: PosMarker<u16>,
        #[bw(try_calc = data.len().try_into())]
        data_length: u16,
        #[br(seek_before = SeekFrom::Start(data_offset.value as u64), count = data_length)]
        #[bw(write_with = PosMarker::write_aoff, args(&data_offset))]
        data: Vec<u8>,
    }

    #[test]
    fn test_write_patches_offset() {
        let mut cursor = Cursor::new(Vec::new());
        OffsetAndBlob {
            data: vec![0xAA, 0xBB],
        }
        .write(&mut cursor)
        .unwrap();
        assert_eq!(cursor.into_inner(), vec![0x04, 0x00, 0x02, 0x00, 0xAA, 0xBB]);
    }

    #[test]
    fn test_read_follows_offset() {
        let parsed =
            OffsetAndBlob::read(&mut Cursor::new(&[0x04, 0x00, 0x02, 0x00, 0xAA, 0xBB])).unwrap();
        assert_eq!(parsed.data, vec![0xAA, 0xBB]);
    }
}
