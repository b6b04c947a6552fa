//! Binary pose track format.
//!
//! The layout is fixed and versionless. All values are little-endian:
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ Entry count (u32)            │
//! ├──────────────────────────────┤
//! │ Entry 0                      │  timestamp (f64)
//! │                              │  position x, y, z (3 × f32)
//! │                              │  orientation x, y, z, w (4 × f32)
//! │                              │  joint count J (u32)
//! │                              │  joint values (J × f32)
//! │ Entry 1                      │
//! │ ...                          │
//! └──────────────────────────────┘
//! ```
//!
//! Entries are written in ascending timestamp order. Decoding is
//! all-or-nothing: any truncation, trailing data or non-finite timestamp
//! yields [`DecodeError::Corrupt`].

use std::io::{self, Read, Write};

use nalgebra::{Quaternion, Vector3};

use crate::error::{DecodeError, ReadError};
use crate::pose::Pose;
use crate::track::PoseTrack;

/// Size of the leading entry count
pub const COUNT_SIZE: usize = 4;

/// Size of an entry without its joint values
pub const ENTRY_FIXED_SIZE: usize = 8 + 3 * 4 + 4 * 4 + 4;

/// Size of one joint value
pub const JOINT_SIZE: usize = 4;

/// Exact encoded size of `track` in bytes
pub fn encoded_len(track: &PoseTrack) -> usize {
    COUNT_SIZE
        + track
            .iter()
            .map(|(_, pose)| ENTRY_FIXED_SIZE + pose.joints.len() * JOINT_SIZE)
            .sum::<usize>()
}

/// Encode a track into a new buffer. Never fails.
pub fn encode(track: &PoseTrack) -> Vec<u8> {
    let mut buf = Vec::with_capacity(encoded_len(track));
    buf.extend_from_slice(&(track.frame_count() as u32).to_le_bytes());
    for (timestamp, pose) in track.iter() {
        encode_entry(&mut buf, timestamp, pose);
    }
    buf
}

fn encode_entry(buf: &mut Vec<u8>, timestamp: f64, pose: &Pose) {
    // Timestamp (8 bytes)
    buf.extend_from_slice(&timestamp.to_le_bytes());
    // Position (12 bytes)
    for v in pose.position.iter() {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    // Orientation x, y, z, w (16 bytes)
    let q = &pose.orientation.coords;
    for v in [q.x, q.y, q.z, q.w] {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    // Joint count (4 bytes) and values
    buf.extend_from_slice(&(pose.joints.len() as u32).to_le_bytes());
    for v in &pose.joints {
        buf.extend_from_slice(&v.to_le_bytes());
    }
}

/// Encode `track` into `writer`
pub fn write_track<W: Write>(track: &PoseTrack, writer: &mut W) -> io::Result<()> {
    writer.write_all(&encode(track))?;
    writer.flush()
}

/// Decode a complete stream
pub fn decode(bytes: &[u8]) -> Result<PoseTrack, DecodeError> {
    let mut reader = ByteReader::new(bytes);

    let count = reader.read_u32()? as usize;
    // Every entry needs at least its fixed part, reject impossible counts
    // before reading any further.
    let min_len = count
        .checked_mul(ENTRY_FIXED_SIZE)
        .ok_or_else(|| DecodeError::corrupt(format!("entry count {} overflows", count)))?;
    if min_len > reader.remaining() {
        return Err(DecodeError::corrupt(format!(
            "entry count {} needs at least {} bytes, {} left",
            count,
            min_len,
            reader.remaining()
        )));
    }

    let mut track = PoseTrack::new();
    for index in 0..count {
        let (timestamp, pose) = decode_entry(&mut reader, index)?;
        track
            .insert(timestamp, pose)
            .map_err(|e| DecodeError::corrupt(format!("entry {}: {}", index, e)))?;
    }

    if reader.remaining() > 0 {
        return Err(DecodeError::corrupt(format!(
            "{} trailing bytes after {} entries",
            reader.remaining(),
            count
        )));
    }

    Ok(track)
}

fn decode_entry(reader: &mut ByteReader<'_>, index: usize) -> Result<(f64, Pose), DecodeError> {
    let timestamp = reader.read_f64()?;
    let position = Vector3::new(reader.read_f32()?, reader.read_f32()?, reader.read_f32()?);
    let (x, y, z, w) = (
        reader.read_f32()?,
        reader.read_f32()?,
        reader.read_f32()?,
        reader.read_f32()?,
    );

    let joint_count = reader.read_u32()? as usize;
    let joints_len = joint_count
        .checked_mul(JOINT_SIZE)
        .filter(|len| *len <= reader.remaining())
        .ok_or_else(|| {
            DecodeError::corrupt(format!(
                "entry {} claims {} joints, only {} bytes left",
                index,
                joint_count,
                reader.remaining()
            ))
        })?;
    let joints = reader
        .take(joints_len)?
        .chunks_exact(JOINT_SIZE)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    Ok((
        timestamp,
        Pose::new(position, Quaternion::new(w, x, y, z), joints),
    ))
}

/// Read and decode a complete track from `reader`
pub fn read_track<R: Read>(reader: &mut R) -> Result<PoseTrack, ReadError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(decode(&bytes)?)
}

/// Bounds-checked little-endian cursor over a byte slice
struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::corrupt(format!(
                "truncated at byte {}: needed {} more bytes, {} left",
                self.pos,
                len,
                self.remaining()
            )));
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_f32(&mut self) -> Result<f32, DecodeError> {
        let b = self.take(4)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_f64(&mut self) -> Result<f64, DecodeError> {
        let b = self.take(8)?;
        Ok(f64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_track() -> PoseTrack {
        let mut track = PoseTrack::new();
        track
            .insert(
                0.0,
                Pose::new(
                    Vector3::new(1.0, 2.0, 3.0),
                    Quaternion::new(0.5, 0.5, 0.5, 0.5),
                    vec![0.1, -0.2, 0.3],
                ),
            )
            .unwrap();
        track
            .insert(
                0.02,
                Pose::new(
                    Vector3::new(-1.5, 0.25, 8.0),
                    Quaternion::new(0.0, 1.0, 0.0, 0.0),
                    vec![],
                ),
            )
            .unwrap();
        track
    }

    #[test]
    fn test_round_trip() {
        let track = sample_track();
        let bytes = encode(&track);

        assert_eq!(bytes.len(), encoded_len(&track));
        assert_eq!(decode(&bytes).unwrap(), track);
    }

    #[test]
    fn test_empty_track() {
        let bytes = encode(&PoseTrack::new());
        assert_eq!(bytes, vec![0, 0, 0, 0]);

        let track = decode(&bytes).unwrap();
        assert_eq!(track.frame_count(), 0);
    }

    #[test]
    fn test_byte_layout() {
        let mut track = PoseTrack::new();
        track
            .insert(
                1.5,
                Pose::new(
                    Vector3::new(1.0, 2.0, 3.0),
                    Quaternion::new(4.0, 5.0, 6.0, 7.0),
                    vec![8.0],
                ),
            )
            .unwrap();
        let bytes = encode(&track);

        assert_eq!(bytes.len(), COUNT_SIZE + ENTRY_FIXED_SIZE + JOINT_SIZE);
        assert_eq!(&bytes[0..4], &1u32.to_le_bytes());
        assert_eq!(&bytes[4..12], &1.5f64.to_le_bytes());
        assert_eq!(&bytes[12..16], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[20..24], &3.0f32.to_le_bytes());
        // Orientation is stored x, y, z, w
        assert_eq!(&bytes[24..28], &5.0f32.to_le_bytes());
        assert_eq!(&bytes[36..40], &4.0f32.to_le_bytes());
        assert_eq!(&bytes[40..44], &1u32.to_le_bytes());
        assert_eq!(&bytes[44..48], &8.0f32.to_le_bytes());
    }

    #[test]
    fn test_truncated_stream_is_corrupt() {
        let bytes = encode(&sample_track());
        for len in [0, 3, 4, 20, bytes.len() - 1] {
            assert!(
                matches!(decode(&bytes[..len]), Err(DecodeError::Corrupt(_))),
                "length {} should be corrupt",
                len
            );
        }
    }

    #[test]
    fn test_trailing_bytes_are_corrupt() {
        let mut bytes = encode(&sample_track());
        bytes.push(0);
        assert!(matches!(decode(&bytes), Err(DecodeError::Corrupt(_))));
    }

    #[test]
    fn test_oversized_counts_are_corrupt() {
        assert!(matches!(
            decode(&u32::MAX.to_le_bytes()),
            Err(DecodeError::Corrupt(_))
        ));

        let mut bytes = encode(&sample_track());
        // Joint count of the first entry
        bytes[40..44].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(decode(&bytes), Err(DecodeError::Corrupt(_))));
    }

    #[test]
    fn test_non_finite_timestamp_is_corrupt() {
        let mut bytes = encode(&sample_track());
        bytes[4..12].copy_from_slice(&f64::NAN.to_le_bytes());
        assert!(matches!(decode(&bytes), Err(DecodeError::Corrupt(_))));
    }

    #[test]
    fn test_duplicate_entries_last_wins() {
        let mut first = PoseTrack::new();
        first.insert(0.5, Pose::rest(1)).unwrap();
        let mut second = PoseTrack::new();
        second.insert(0.5, Pose::rest(2)).unwrap();

        // Splice two single-entry streams into one with a count of 2
        let mut bytes = 2u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&encode(&first)[COUNT_SIZE..]);
        bytes.extend_from_slice(&encode(&second)[COUNT_SIZE..]);

        let track = decode(&bytes).unwrap();
        assert_eq!(track.frame_count(), 1);
        assert_eq!(track.get(0.5), Some(&Pose::rest(2)));
    }

    #[test]
    fn test_stream_round_trip() {
        let track = sample_track();
        let mut buf = Vec::new();
        write_track(&track, &mut buf).unwrap();

        let mut cursor = Cursor::new(buf);
        assert_eq!(read_track(&mut cursor).unwrap(), track);
    }
}
