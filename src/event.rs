//! The kernel-to-user wire record and its in-memory counterpart.
//!
//! The layout here is bit-exact with the ring buffer producer's `struct event`
//! (type/pid/ppid/uid as four `u32`s, then a 16-byte `comm` and a 256-byte
//! `filename`, both NUL-padded). `EventRecord` documents that layout with
//! `#[repr(C)]`, but `EventRecord::parse` decodes each field directly out of
//! the byte slice rather than casting a pointer to it — ring-buffer records
//! aren't guaranteed to land on a 4-byte boundary, and an unaligned
//! `&EventRecord` reinterpret would be undefined behavior.

pub const COMM_LEN: usize = 16;
pub const FILENAME_LEN: usize = 256;
pub const EVENT_RECORD_SIZE: usize = 4 * 4 + COMM_LEN + FILENAME_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum EventType {
    Exec = 1,
    Write = 2,
    Open = 3,
    Rename = 4,
    Exit = 5,
    Unlink = 6,
}

impl EventType {
    fn from_i32(raw: i32) -> Option<Self> {
        match raw {
            1 => Some(EventType::Exec),
            2 => Some(EventType::Write),
            3 => Some(EventType::Open),
            4 => Some(EventType::Rename),
            5 => Some(EventType::Exit),
            6 => Some(EventType::Unlink),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Exec => "EXEC",
            EventType::Write => "WRITE",
            EventType::Open => "OPEN",
            EventType::Rename => "RENAME",
            EventType::Exit => "EXIT",
            EventType::Unlink => "UNLINK",
        }
    }
}

/// Raw, bit-exact wire layout, documenting field offsets for [`EventRecord::parse`].
/// Not itself constructed from the wire bytes (see the module doc for why);
/// everything downstream works with the decoded [`Event`].
#[repr(C)]
#[derive(Clone, Copy)]
pub struct EventRecord {
    pub r#type: i32,
    pub pid: u32,
    pub ppid: u32,
    pub uid: u32,
    pub comm: [u8; COMM_LEN],
    pub filename: [u8; FILENAME_LEN],
}

#[derive(Debug, thiserror::Error)]
pub enum EventParseError {
    #[error("event record too short: got {got} bytes, need {want}")]
    TooShort { got: usize, want: usize },
    #[error("unknown event type discriminant {0}")]
    UnknownType(i32),
}

impl EventRecord {
    /// Decodes a raw ring buffer record. The only validation performed is on
    /// the length and the `type` discriminant; comm/filename are not
    /// required to be valid UTF-8 and are lossily converted downstream.
    pub fn parse(bytes: &[u8]) -> Result<Event, EventParseError> {
        if bytes.len() < EVENT_RECORD_SIZE {
            return Err(EventParseError::TooShort {
                got: bytes.len(),
                want: EVENT_RECORD_SIZE,
            });
        }
        let raw_type = i32::from_ne_bytes(bytes[0..4].try_into().unwrap());
        let pid = u32::from_ne_bytes(bytes[4..8].try_into().unwrap());
        let ppid = u32::from_ne_bytes(bytes[8..12].try_into().unwrap());
        let uid = u32::from_ne_bytes(bytes[12..16].try_into().unwrap());
        let comm_bytes = &bytes[16..16 + COMM_LEN];
        let filename_bytes = &bytes[16 + COMM_LEN..16 + COMM_LEN + FILENAME_LEN];

        let event_type = EventType::from_i32(raw_type).ok_or(EventParseError::UnknownType(raw_type))?;

        Ok(Event {
            event_type,
            pid,
            ppid,
            uid,
            comm: cstr_lossy(comm_bytes),
            filename: cstr_lossy(filename_bytes),
        })
    }
}

fn cstr_lossy(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

/// The decoded, owned event used throughout the engine.
#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: EventType,
    pub pid: u32,
    pub ppid: u32,
    pub uid: u32,
    pub comm: String,
    pub filename: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(t: i32, pid: u32, comm: &str, filename: &str) -> Vec<u8> {
        let mut buf = vec![0u8; EVENT_RECORD_SIZE];
        buf[0..4].copy_from_slice(&t.to_ne_bytes());
        buf[4..8].copy_from_slice(&pid.to_ne_bytes());
        buf[8..12].copy_from_slice(&0u32.to_ne_bytes());
        buf[12..16].copy_from_slice(&0u32.to_ne_bytes());
        let comm_bytes = comm.as_bytes();
        buf[16..16 + comm_bytes.len().min(COMM_LEN)]
            .copy_from_slice(&comm_bytes[..comm_bytes.len().min(COMM_LEN)]);
        let fname_bytes = filename.as_bytes();
        let start = 16 + COMM_LEN;
        buf[start..start + fname_bytes.len().min(FILENAME_LEN)]
            .copy_from_slice(&fname_bytes[..fname_bytes.len().min(FILENAME_LEN)]);
        buf
    }

    #[test]
    fn parses_well_formed_write_event() {
        let bytes = record(2, 1001, "bash", "");
        let ev = EventRecord::parse(&bytes).unwrap();
        assert_eq!(ev.event_type, EventType::Write);
        assert_eq!(ev.pid, 1001);
        assert_eq!(ev.comm, "bash");
        assert_eq!(ev.filename, "");
    }

    #[test]
    fn rejects_short_buffers() {
        let err = EventRecord::parse(&[0u8; 10]).unwrap_err();
        assert!(matches!(err, EventParseError::TooShort { .. }));
    }

    #[test]
    fn rejects_unknown_discriminant() {
        let bytes = record(99, 1, "x", "");
        let err = EventRecord::parse(&bytes).unwrap_err();
        assert!(matches!(err, EventParseError::UnknownType(99)));
    }
}
