//! Cursor-based binary reading/writing helpers used by the
//! save-state (`StateComponent`) serialization machinery.
//!
//! All multi-byte values are encoded little-endian, matching the
//! native byte order of the emulated hardware's registers.

use std::io::{Cursor, Read, Write};

use crate::error::Error;

#[inline(always)]
pub fn read_u8<T: AsRef<[u8]>>(data: &mut Cursor<T>) -> Result<u8, Error> {
    let mut buffer = [0x00; size_of::<u8>()];
    data.read_exact(&mut buffer)?;
    Ok(u8::from_le_bytes(buffer))
}

#[inline(always)]
pub fn read_u16<T: AsRef<[u8]>>(data: &mut Cursor<T>) -> Result<u16, Error> {
    let mut buffer = [0x00; size_of::<u16>()];
    data.read_exact(&mut buffer)?;
    Ok(u16::from_le_bytes(buffer))
}

#[inline(always)]
pub fn read_u32<T: AsRef<[u8]>>(data: &mut Cursor<T>) -> Result<u32, Error> {
    let mut buffer = [0x00; size_of::<u32>()];
    data.read_exact(&mut buffer)?;
    Ok(u32::from_le_bytes(buffer))
}

#[inline(always)]
pub fn read_u64<T: AsRef<[u8]>>(data: &mut Cursor<T>) -> Result<u64, Error> {
    let mut buffer = [0x00; size_of::<u64>()];
    data.read_exact(&mut buffer)?;
    Ok(u64::from_le_bytes(buffer))
}

#[inline(always)]
pub fn write_u8(data: &mut Cursor<Vec<u8>>, value: u8) -> Result<(), Error> {
    data.write_all(&value.to_le_bytes())?;
    Ok(())
}

#[inline(always)]
pub fn write_u16(data: &mut Cursor<Vec<u8>>, value: u16) -> Result<(), Error> {
    data.write_all(&value.to_le_bytes())?;
    Ok(())
}

#[inline(always)]
pub fn write_u32(data: &mut Cursor<Vec<u8>>, value: u32) -> Result<(), Error> {
    data.write_all(&value.to_le_bytes())?;
    Ok(())
}

#[inline(always)]
pub fn write_u64(data: &mut Cursor<Vec<u8>>, value: u64) -> Result<(), Error> {
    data.write_all(&value.to_le_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_u8_u16_u32() {
        let mut writer = Cursor::new(vec![]);
        write_u8(&mut writer, 0x42).unwrap();
        write_u16(&mut writer, 0x1234).unwrap();
        write_u32(&mut writer, 0xdeadbeef).unwrap();
        write_u64(&mut writer, 0x0102030405060708).unwrap();
        let bytes = writer.into_inner();

        let mut reader = Cursor::new(bytes.as_slice());
        assert_eq!(read_u8(&mut reader).unwrap(), 0x42);
        assert_eq!(read_u16(&mut reader).unwrap(), 0x1234);
        assert_eq!(read_u32(&mut reader).unwrap(), 0xdeadbeef);
        assert_eq!(read_u64(&mut reader).unwrap(), 0x0102030405060708);
    }
}
