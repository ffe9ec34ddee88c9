//! Frame codec for the result journal.
//!
//! Each frame carries:
//! - a version byte for forward compatibility
//! - a little-endian length prefix
//! - a JSON payload (so serde attributes on records apply unchanged)
//! - a CRC32 of the payload for corruption detection

use std::io::{Error as IoError, ErrorKind, Read, Result as IoResult, Write};

use crc32fast::Hasher;
use serde::{de::DeserializeOwned, Serialize};

/// Current codec version.
const CODEC_VERSION: u8 = 1;

/// Magic bytes that open every journal file.
pub const MAGIC: [u8; 4] = *b"LNUP";

/// Header length in bytes (magic + version).
pub const HEADER_LEN: u64 = 5;

/// Largest payload accepted when decoding (64 MiB). Play-log batches for one
/// season stay far below this.
const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Fixed bytes around every payload: version, length, crc.
pub const FRAME_OVERHEAD: u64 = 1 + 4 + 4;

/// Serialize a value into one frame.
///
/// ```text
/// [version: 1 byte][length: 4 bytes LE][data: N bytes JSON][crc32: 4 bytes LE]
/// ```
pub fn encode<T: Serialize>(value: &T) -> IoResult<Vec<u8>> {
    let data = serde_json::to_vec(value)
        .map_err(|e| IoError::new(ErrorKind::InvalidData, format!("serialization failed: {e}")))?;

    let len = u32::try_from(data.len()).map_err(|_| {
        IoError::new(
            ErrorKind::InvalidData,
            format!("frame of {} bytes does not fit a u32 length", data.len()),
        )
    })?;

    let mut hasher = Hasher::new();
    hasher.update(&data);
    let crc = hasher.finalize();

    let mut out = Vec::with_capacity(1 + 4 + data.len() + 4);
    out.push(CODEC_VERSION);
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&data);
    out.extend_from_slice(&crc.to_le_bytes());
    Ok(out)
}

/// Read one frame and return the value plus the number of bytes consumed.
///
/// # Errors
/// - `UnexpectedEof` for a frame cut short (torn write)
/// - `InvalidData` for a bad version, oversized length, CRC mismatch, or
///   undecodable payload
pub fn decode<T: DeserializeOwned>(reader: &mut impl Read) -> IoResult<(T, u64)> {
    let mut version = [0u8; 1];
    reader.read_exact(&mut version)?;
    if version[0] != CODEC_VERSION {
        return Err(IoError::new(
            ErrorKind::InvalidData,
            format!("unsupported codec version: {} (expected {CODEC_VERSION})", version[0]),
        ));
    }

    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes)?;
    let len = u32::from_le_bytes(len_bytes) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(IoError::new(
            ErrorKind::InvalidData,
            format!("frame size {len} exceeds maximum {MAX_FRAME_SIZE}"),
        ));
    }

    let mut data = vec![0u8; len];
    reader.read_exact(&mut data)?;

    let mut crc_bytes = [0u8; 4];
    reader.read_exact(&mut crc_bytes)?;
    let stored_crc = u32::from_le_bytes(crc_bytes);

    let mut hasher = Hasher::new();
    hasher.update(&data);
    let computed_crc = hasher.finalize();
    if stored_crc != computed_crc {
        return Err(IoError::new(
            ErrorKind::InvalidData,
            format!("CRC mismatch: stored={stored_crc:08x}, computed={computed_crc:08x} (data corrupted)"),
        ));
    }

    let value = serde_json::from_slice(&data)
        .map_err(|e| IoError::new(ErrorKind::InvalidData, format!("deserialization failed: {e}")))?;
    Ok((value, FRAME_OVERHEAD + len as u64))
}

/// Write the file header (magic + version).
pub fn write_header(writer: &mut impl Write) -> IoResult<()> {
    writer.write_all(&MAGIC)?;
    writer.write_all(&[CODEC_VERSION])?;
    Ok(())
}

/// Read and validate the file header.
pub fn read_header(reader: &mut impl Read) -> IoResult<u8> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(IoError::new(
            ErrorKind::InvalidData,
            format!("invalid magic bytes: expected {MAGIC:?}, got {magic:?}"),
        ));
    }

    let mut version = [0u8; 1];
    reader.read_exact(&mut version)?;
    Ok(version[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use crate::storage::FitnessRecord;

    #[test]
    fn test_decode_reports_frame_length() {
        let record = FitnessRecord {
            lineup: "A | B".to_string(),
            average_score: 4.25,
        };
        let encoded = encode(&record).unwrap();

        let mut cursor = Cursor::new(encoded.clone());
        let (decoded, consumed): (FitnessRecord, u64) = decode(&mut cursor).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(consumed, encoded.len() as u64);
    }

    #[test]
    fn test_detects_corruption() {
        let mut encoded = encode(&"test data".to_string()).unwrap();
        encoded[7] ^= 0xFF;

        let mut cursor = Cursor::new(encoded);
        let err = decode::<String>(&mut cursor).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn test_truncated_frame_is_unexpected_eof() {
        let encoded = encode(&"torn".to_string()).unwrap();
        let mut cursor = Cursor::new(encoded[..encoded.len() - 2].to_vec());
        let err = decode::<String>(&mut cursor).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_rejects_oversized_frame() {
        let mut bad = vec![CODEC_VERSION];
        bad.extend_from_slice(&(200_000_000u32).to_le_bytes());

        let mut cursor = Cursor::new(bad);
        let err = decode::<String>(&mut cursor).unwrap_err();
        assert!(err.to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_header_rejects_foreign_file() {
        let mut cursor = Cursor::new(b"JUNK\x01".to_vec());
        assert!(read_header(&mut cursor).is_err());

        let mut buf = Vec::new();
        write_header(&mut buf).unwrap();
        assert_eq!(buf.len() as u64, HEADER_LEN);
        assert_eq!(read_header(&mut Cursor::new(buf)).unwrap(), CODEC_VERSION);
    }
}
