//! Facilities for encoding emulation state into save-state records.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io;

//===========================================================================//

/// A trait for types that can be stored in a save-state record.
///
/// Save states are versionless: every device writes exactly the fields it
/// needs to resume, in a fixed order, and reads them back in the same order.
pub trait BinaryIo: Sized {
    /// Reads a value of this type from the save-state record.
    fn read_from<R: io::Read + ?Sized>(reader: &mut R) -> io::Result<Self>;

    /// Writes this value into the save-state record.
    fn write_to<W: io::Write + ?Sized>(&self, writer: &mut W)
    -> io::Result<()>;
}

impl BinaryIo for bool {
    fn read_from<R: io::Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        match u8::read_from(reader)? {
            0 => Ok(false),
            1 => Ok(true),
            byte => invalid_data!("expected bool, found {}", byte),
        }
    }

    fn write_to<W: io::Write + ?Sized>(
        &self,
        writer: &mut W,
    ) -> io::Result<()> {
        (*self as u8).write_to(writer)
    }
}

impl BinaryIo for u8 {
    fn read_from<R: io::Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        reader.read_u8()
    }

    fn write_to<W: io::Write + ?Sized>(
        &self,
        writer: &mut W,
    ) -> io::Result<()> {
        writer.write_u8(*self)
    }
}

impl BinaryIo for u16 {
    fn read_from<R: io::Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        reader.read_u16::<LittleEndian>()
    }

    fn write_to<W: io::Write + ?Sized>(
        &self,
        writer: &mut W,
    ) -> io::Result<()> {
        writer.write_u16::<LittleEndian>(*self)
    }
}

impl BinaryIo for String {
    fn read_from<R: io::Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        let len = reader.read_u32::<LittleEndian>()?;
        let mut bytes: Vec<u8> = vec![0; len as usize];
        reader.read_exact(&mut bytes)?;
        String::from_utf8(bytes)
            .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))
    }

    fn write_to<W: io::Write + ?Sized>(
        &self,
        writer: &mut W,
    ) -> io::Result<()> {
        let len = u32::try_from(self.len()).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "string too long")
        })?;
        writer.write_u32::<LittleEndian>(len)?;
        writer.write_all(self.as_bytes())
    }
}

impl BinaryIo for Box<[u8]> {
    fn read_from<R: io::Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        let len = reader.read_u32::<LittleEndian>()?;
        let mut bytes: Vec<u8> = vec![0; len as usize];
        reader.read_exact(&mut bytes)?;
        Ok(bytes.into_boxed_slice())
    }

    fn write_to<W: io::Write + ?Sized>(
        &self,
        writer: &mut W,
    ) -> io::Result<()> {
        let len = u32::try_from(self.len()).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "buffer too long")
        })?;
        writer.write_u32::<LittleEndian>(len)?;
        writer.write_all(self)
    }
}

//===========================================================================//

/// Reads a device name tag from `reader` and fails with `InvalidData` if it
/// doesn't match `expected`.  Nothing after the tag is consumed on failure.
pub fn expect_tag<R: io::Read + ?Sized>(
    reader: &mut R,
    expected: &str,
) -> io::Result<()> {
    let tag = String::read_from(reader)?;
    if tag != expected {
        log::warn!("save state for {tag:?} rejected by {expected:?}");
        invalid_data!("save state is for {:?}, not {:?}", tag, expected);
    }
    Ok(())
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{BinaryIo, expect_tag};
    use std::fmt::Debug;
    use std::io;

    fn round_trip<T: BinaryIo + Debug + Eq>(value: T) {
        let mut data: Vec<u8> = Vec::new();
        value.write_to(&mut data).expect("write_to");
        let parsed = T::read_from(&mut data.as_slice()).expect("read_from");
        assert_eq!(parsed, value);
    }

    #[test]
    fn round_trip_values() {
        round_trip(true);
        round_trip(0x1234u16);
        round_trip("CartridgeSB".to_string());
        round_trip(vec![1u8, 2, 3].into_boxed_slice());
    }

    #[test]
    fn short_is_little_endian() {
        let mut data: Vec<u8> = Vec::new();
        0x1f02u16.write_to(&mut data).unwrap();
        assert_eq!(data, vec![0x02, 0x1f]);
    }

    #[test]
    fn invalid_bool() {
        let error = bool::read_from(&mut [2u8].as_slice()).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn tag_mismatch() {
        let mut data: Vec<u8> = Vec::new();
        "Cartridge2K".to_string().write_to(&mut data).unwrap();
        assert!(expect_tag(&mut data.as_slice(), "Cartridge2K").is_ok());
        let error =
            expect_tag(&mut data.as_slice(), "CartridgeSB").unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn truncated_string() {
        let data = [5u8, 0, 0, 0, b'a'];
        let error = String::read_from(&mut data.as_slice()).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::UnexpectedEof);
    }
}

//===========================================================================//
