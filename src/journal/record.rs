// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The on-disk event record: status byte, request id, timestamp, and a mix
//! of inline/external attachments packed into one framed blob (§4.9).

use crate::error::{Error, Result};
use byteorder::{LittleEndian as LE, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor as ByteCursor, Read};

/// Fixed-size portion of a record, before the variable-length offsets,
/// request id, and inline attachment bytes.
pub const RECORD_HEADER_LEN: usize = 2 + 1 + 1 + 4 + 8 + 8 + 1 + 7;

const EXTERNAL_FLAG: u32 = 0x8000_0000;

/// An event's lifecycle state (§4.9).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum Status {
    Ready = 1,
    Forwarded = 2,
    Acknowledged = 3,
    Completed = 4,
    Failed = 100,
}

impl Status {
    pub fn from_byte(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Self::Ready),
            2 => Ok(Self::Forwarded),
            3 => Ok(Self::Acknowledged),
            4 => Ok(Self::Completed),
            100 => Ok(Self::Failed),
            other => Err(Error::CorruptedData(format!("unknown event status byte {other}"))),
        }
    }

    #[must_use]
    pub fn is_live(self) -> bool {
        matches!(self, Self::Ready | Self::Forwarded | Self::Acknowledged)
    }

    /// Whether `self -> to` is one of the legal transitions (§4.9 point 2).
    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        use Status::{Acknowledged, Completed, Failed, Forwarded, Ready};
        matches!(
            (self, to),
            (Ready, Forwarded)
                | (Forwarded, Acknowledged)
                | (Ready | Forwarded | Acknowledged, Completed)
                | (Ready | Forwarded | Acknowledged, Failed)
        )
    }
}

/// One attachment, either held in memory or pointing at an external
/// `<id>.bin` file already materialised in the journal directory.
#[derive(Clone, Debug)]
pub enum Attachment {
    Inline(Vec<u8>),
    External(u32),
}

/// A fully decoded event record and the byte length it occupies on disk.
#[derive(Clone, Debug)]
pub struct EventRecord {
    pub status: Status,
    pub request_id: Vec<u8>,
    pub time_sec: u64,
    pub time_nsec: u64,
    pub attachments: Vec<Attachment>,
}

impl EventRecord {
    /// Encodes this record, returning the exact bytes to append to a file.
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.request_id.is_empty() || self.request_id.len() > 255 {
            return Err(Error::InvalidParameter("request_id must be 1..=255 bytes".into()));
        }
        if self.attachments.len() > 255 {
            return Err(Error::Full);
        }

        let offsets_len = 4 * self.attachments.len();
        let inline_start = RECORD_HEADER_LEN + offsets_len + self.request_id.len();

        let mut offsets = Vec::with_capacity(self.attachments.len());
        let mut inline_bytes = Vec::new();
        for attachment in &self.attachments {
            match attachment {
                Attachment::External(id) => {
                    if id & EXTERNAL_FLAG != 0 {
                        return Err(Error::OutOfRange("external attachment id must fit 31 bits".into()));
                    }
                    offsets.push(EXTERNAL_FLAG | id);
                }
                Attachment::Inline(bytes) => {
                    let offset = inline_start + inline_bytes.len();
                    if offset as u64 & u64::from(EXTERNAL_FLAG) != 0 {
                        return Err(Error::InvalidSize("record too large to address inline attachments".into()));
                    }
                    offsets.push(offset as u32);
                    inline_bytes.extend_from_slice(bytes);
                }
            }
        }

        let total_size = inline_start + inline_bytes.len();
        let mut buf = Vec::with_capacity(total_size);
        buf.extend_from_slice(b"ev");
        buf.push(self.status as u8);
        buf.push(self.request_id.len() as u8);
        buf.write_u32::<LE>(total_size as u32)?;
        buf.write_u64::<LE>(self.time_sec)?;
        buf.write_u64::<LE>(self.time_nsec)?;
        buf.push(self.attachments.len() as u8);
        buf.extend_from_slice(&[0u8; 7]);
        for offset in offsets {
            buf.write_u32::<LE>(offset)?;
        }
        buf.extend_from_slice(&self.request_id);
        buf.extend_from_slice(&inline_bytes);
        Ok(buf)
    }

    /// Decodes a complete record from `buf` (exactly `buf.len()` bytes, as
    /// already framed by the `size` field read during a scan).
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < RECORD_HEADER_LEN || &buf[0..2] != b"ev" {
            return Err(Error::CorruptedData("bad event record magic".into()));
        }

        let mut cursor = ByteCursor::new(&buf[2..]);
        let status = Status::from_byte(cursor.read_u8()?)?;
        let request_id_size = cursor.read_u8()? as usize;
        let size = cursor.read_u32::<LE>()? as usize;
        let time_sec = cursor.read_u64::<LE>()?;
        let time_nsec = cursor.read_u64::<LE>()?;
        let attachment_count = cursor.read_u8()? as usize;
        let mut pad = [0u8; 7];
        cursor.read_exact(&mut pad)?;

        if size != buf.len() {
            return Err(Error::CorruptedData(format!(
                "event record declares size {size} but {} bytes were given",
                buf.len()
            )));
        }

        let mut offsets = Vec::with_capacity(attachment_count);
        for _ in 0..attachment_count {
            offsets.push(cursor.read_u32::<LE>()?);
        }

        let request_id_start = RECORD_HEADER_LEN + 4 * attachment_count;
        let request_id_end = request_id_start + request_id_size;
        if request_id_end > buf.len() {
            return Err(Error::CorruptedData("event record request id overruns record".into()));
        }
        let request_id = buf[request_id_start..request_id_end].to_vec();

        let inline_indices: Vec<usize> = (0..attachment_count).filter(|&i| offsets[i] & EXTERNAL_FLAG == 0).collect();
        let mut attachments: Vec<Option<Attachment>> = vec![None; attachment_count];
        for i in 0..attachment_count {
            if offsets[i] & EXTERNAL_FLAG != 0 {
                attachments[i] = Some(Attachment::External(offsets[i] & !EXTERNAL_FLAG));
            }
        }
        for (pos, &i) in inline_indices.iter().enumerate() {
            let start = offsets[i] as usize;
            let end = inline_indices
                .get(pos + 1)
                .map_or(buf.len(), |&next| offsets[next] as usize);
            if start > end || end > buf.len() {
                return Err(Error::CorruptedData("event record inline attachment overruns record".into()));
            }
            attachments[i] = Some(Attachment::Inline(buf[start..end].to_vec()));
        }

        #[allow(clippy::unwrap_used)]
        let attachments = attachments.into_iter().map(Option::unwrap).collect();

        Ok(Self {
            status,
            request_id,
            time_sec,
            time_nsec,
            attachments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(attachments: Vec<Attachment>) -> EventRecord {
        EventRecord {
            status: Status::Ready,
            request_id: b"abc".to_vec(),
            time_sec: 1_700_000_000,
            time_nsec: 123,
            attachments,
        }
    }

    #[test]
    fn roundtrip_without_attachments() {
        let record = sample(vec![]);
        let encoded = record.encode().unwrap();
        let decoded = EventRecord::decode(&encoded).unwrap();
        assert_eq!(decoded.request_id, record.request_id);
        assert_eq!(decoded.time_sec, record.time_sec);
        assert_eq!(decoded.time_nsec, record.time_nsec);
        assert!(decoded.attachments.is_empty());
    }

    #[test]
    fn roundtrip_with_mixed_attachments() {
        let record = sample(vec![
            Attachment::Inline(b"hello".to_vec()),
            Attachment::External(42),
            Attachment::Inline(b"world!!".to_vec()),
        ]);
        let encoded = record.encode().unwrap();
        let decoded = EventRecord::decode(&encoded).unwrap();
        match (&decoded.attachments[0], &decoded.attachments[1], &decoded.attachments[2]) {
            (Attachment::Inline(a), Attachment::External(id), Attachment::Inline(b)) => {
                assert_eq!(a, b"hello");
                assert_eq!(*id, 42);
                assert_eq!(b, b"world!!");
            }
            other => panic!("unexpected attachment shapes: {other:?}"),
        }
    }

    #[test]
    fn decode_rejects_bad_magic() {
        let mut encoded = sample(vec![]).encode().unwrap();
        encoded[0] = b'X';
        assert!(matches!(EventRecord::decode(&encoded), Err(Error::CorruptedData(_))));
    }

    #[test]
    fn status_transitions_follow_the_state_machine() {
        assert!(Status::Ready.can_transition_to(Status::Forwarded));
        assert!(Status::Forwarded.can_transition_to(Status::Acknowledged));
        assert!(Status::Acknowledged.can_transition_to(Status::Completed));
        assert!(Status::Ready.can_transition_to(Status::Failed));
        assert!(!Status::Forwarded.can_transition_to(Status::Ready));
        assert!(!Status::Completed.can_transition_to(Status::Ready));
    }
}
