//! TFTP packet encoding and decoding.
//!
//! Wire layout (all integers big-endian):
//!
//! ```text
//! RRQ/WRQ | 01/02 | filename | 0 | mode | 0 |
//! DATA    | 03    | block #  | data (0..512 bytes)  |
//! ACK     | 04    | block #  |
//! ERROR   | 05    | code     | message | 0 |
//! ```
//!
//! A packet is always decoded from exactly one datagram: DATA carries no
//! length field and its payload is whatever follows the block number.

use std::fmt;
use std::io::{BufRead, Cursor, ErrorKind, Read};

use super::error::FrameError;

/// Largest payload carried by a single DATA packet.
pub const MAX_DATA_SIZE: usize = 512;

/// Largest datagram produced or consumed (DATA header plus payload).
pub const MAX_PACKET_SIZE: usize = 4 + MAX_DATA_SIZE;

/// The only transfer mode this implementation speaks.
pub const OCTET_MODE: &str = "octet";

/// Returns true if `mode` names binary transfer. Mode strings are
/// case-insensitive on the wire.
pub fn is_octet(mode: &str) -> bool {
    mode.eq_ignore_ascii_case(OCTET_MODE)
}

/// Packet type identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Rrq = 1,
    Wrq = 2,
    Data = 3,
    Ack = 4,
    Error = 5,
}

impl Opcode {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Self::Rrq),
            2 => Some(Self::Wrq),
            3 => Some(Self::Data),
            4 => Some(Self::Ack),
            5 => Some(Self::Error),
            _ => None,
        }
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Rrq => "RRQ",
            Self::Wrq => "WRQ",
            Self::Data => "DATA",
            Self::Ack => "ACK",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error codes carried in ERROR packets (RFC 1350 appendix).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotDefined = 0,
    FileNotFound = 1,
    AccessViolation = 2,
    DiskFull = 3,
    IllegalOperation = 4,
    UnknownTransferId = 5,
    FileAlreadyExists = 6,
    NoSuchUser = 7,
}

impl ErrorCode {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(Self::NotDefined),
            1 => Some(Self::FileNotFound),
            2 => Some(Self::AccessViolation),
            3 => Some(Self::DiskFull),
            4 => Some(Self::IllegalOperation),
            5 => Some(Self::UnknownTransferId),
            6 => Some(Self::FileAlreadyExists),
            7 => Some(Self::NoSuchUser),
            _ => None,
        }
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Default human readable message for this code.
    pub fn message(self) -> &'static str {
        match self {
            Self::NotDefined => "Not defined",
            Self::FileNotFound => "File not found",
            Self::AccessViolation => "Access violation",
            Self::DiskFull => "Disk full or allocation exceeded",
            Self::IllegalOperation => "Illegal TFTP operation",
            Self::UnknownTransferId => "Unknown transfer ID",
            Self::FileAlreadyExists => "File already exists",
            Self::NoSuchUser => "No such user",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.as_u16())
    }
}

/// A single TFTP message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Rrq { filename: String, mode: String },
    Wrq { filename: String, mode: String },
    Data { block_num: u16, data: Vec<u8> },
    Ack(u16),
    Error { code: ErrorCode, msg: String },
}

impl Packet {
    /// Builds an ERROR packet carrying the code's default message.
    pub fn error(code: ErrorCode) -> Self {
        Self::Error {
            code,
            msg: code.message().to_string(),
        }
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Rrq { .. } => Opcode::Rrq,
            Self::Wrq { .. } => Opcode::Wrq,
            Self::Data { .. } => Opcode::Data,
            Self::Ack(_) => Opcode::Ack,
            Self::Error { .. } => Opcode::Error,
        }
    }

    /// Encodes the packet into a single datagram.
    pub fn serialize(&self) -> Result<Vec<u8>, FrameError> {
        let mut buf = Vec::with_capacity(MAX_PACKET_SIZE);
        buf.extend_from_slice(&self.opcode().as_u16().to_be_bytes());

        match self {
            Self::Rrq { filename, mode } | Self::Wrq { filename, mode } => {
                put_text(&mut buf, filename, "filename")?;
                put_text(&mut buf, mode, "mode")?;
            }
            Self::Data { block_num, data } => {
                if data.len() > MAX_DATA_SIZE {
                    return Err(FrameError::InvalidField("data"));
                }
                buf.extend_from_slice(&block_num.to_be_bytes());
                buf.extend_from_slice(data);
            }
            Self::Ack(block_num) => buf.extend_from_slice(&block_num.to_be_bytes()),
            Self::Error { code, msg } => {
                buf.extend_from_slice(&code.as_u16().to_be_bytes());
                put_text(&mut buf, msg, "message")?;
            }
        }

        Ok(buf)
    }

    /// Decodes exactly one datagram.
    pub fn deserialize(buf: &[u8]) -> Result<Self, FrameError> {
        let mut cursor = Cursor::new(buf);
        let raw = read_u16(&mut cursor)?;
        let opcode = Opcode::from_u16(raw).ok_or(FrameError::UnknownOpcode(raw))?;

        match opcode {
            Opcode::Rrq => {
                let (filename, mode) = read_request(&mut cursor)?;
                Ok(Self::Rrq { filename, mode })
            }
            Opcode::Wrq => {
                let (filename, mode) = read_request(&mut cursor)?;
                Ok(Self::Wrq { filename, mode })
            }
            Opcode::Data => {
                let block_num = read_u16(&mut cursor)?;
                let mut data = Vec::with_capacity(buf.len().saturating_sub(4));
                cursor
                    .read_to_end(&mut data)
                    .map_err(|_| FrameError::TruncatedFrame)?;
                if data.len() > MAX_DATA_SIZE {
                    return Err(FrameError::MalformedFrame);
                }
                Ok(Self::Data { block_num, data })
            }
            Opcode::Ack => {
                let block_num = read_u16(&mut cursor)?;
                if !cursor.fill_buf().map_or(true, |rest| rest.is_empty()) {
                    return Err(FrameError::MalformedFrame);
                }
                Ok(Self::Ack(block_num))
            }
            Opcode::Error => {
                let code = ErrorCode::from_u16(read_u16(&mut cursor)?)
                    .ok_or(FrameError::MalformedFrame)?;
                let msg = read_text(&mut cursor)?;
                Ok(Self::Error { code, msg })
            }
        }
    }
}

fn put_text(buf: &mut Vec<u8>, text: &str, field: &'static str) -> Result<(), FrameError> {
    if text.as_bytes().contains(&0) {
        return Err(FrameError::InvalidField(field));
    }
    buf.extend_from_slice(text.as_bytes());
    buf.push(0);
    Ok(())
}

fn read_u16(cursor: &mut Cursor<&[u8]>) -> Result<u16, FrameError> {
    let mut bytes = [0u8; 2];
    cursor.read_exact(&mut bytes).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => FrameError::TruncatedFrame,
        _ => FrameError::MalformedFrame,
    })?;
    Ok(u16::from_be_bytes(bytes))
}

fn read_text(cursor: &mut Cursor<&[u8]>) -> Result<String, FrameError> {
    let mut bytes = Vec::new();
    cursor
        .read_until(0, &mut bytes)
        .map_err(|_| FrameError::TruncatedFrame)?;
    if bytes.pop() != Some(0) {
        return Err(FrameError::TruncatedFrame);
    }
    String::from_utf8(bytes).map_err(|_| FrameError::MalformedFrame)
}

// Option lists (RFC 2347) may follow the mode; they are not negotiated and
// are left unread.
fn read_request(cursor: &mut Cursor<&[u8]>) -> Result<(String, String), FrameError> {
    let filename = read_text(cursor)?;
    let mode = read_text(cursor)?;
    Ok((filename, mode))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rrq_wire_layout() {
        let packet = Packet::Rrq {
            filename: "test.png".to_string(),
            mode: "octet".to_string(),
        };
        let bytes = packet.serialize().unwrap();
        assert_eq!(bytes, b"\x00\x01test.png\x00octet\x00");
        assert_eq!(Packet::deserialize(&bytes).unwrap(), packet);
    }

    #[test]
    fn test_wrq_round_trip() {
        let packet = Packet::Wrq {
            filename: "pxelinux.cfg/default".to_string(),
            mode: "octet".to_string(),
        };
        let bytes = packet.serialize().unwrap();
        assert_eq!(&bytes[..2], &[0, 2]);
        assert_eq!(Packet::deserialize(&bytes).unwrap(), packet);
    }

    #[test]
    fn test_data_payload_is_rest_of_datagram() {
        let packet = Packet::Data {
            block_num: 0xBEEF,
            data: vec![0xAA; MAX_DATA_SIZE],
        };
        let bytes = packet.serialize().unwrap();
        assert_eq!(bytes.len(), MAX_PACKET_SIZE);
        assert_eq!(&bytes[..4], &[0, 3, 0xBE, 0xEF]);
        assert_eq!(Packet::deserialize(&bytes).unwrap(), packet);

        let empty = Packet::deserialize(&[0, 3, 0xFF, 0xFF]).unwrap();
        assert_eq!(
            empty,
            Packet::Data {
                block_num: u16::MAX,
                data: Vec::new()
            }
        );
    }

    #[test]
    fn test_data_payload_too_large() {
        let packet = Packet::Data {
            block_num: 1,
            data: vec![0; MAX_DATA_SIZE + 1],
        };
        assert_eq!(packet.serialize(), Err(FrameError::InvalidField("data")));

        let mut datagram = vec![0, 3, 0, 1];
        datagram.extend_from_slice(&[0; 600]);
        assert_eq!(Packet::deserialize(&datagram), Err(FrameError::MalformedFrame));
        datagram.truncate(MAX_PACKET_SIZE + 1);
        assert_eq!(Packet::deserialize(&datagram), Err(FrameError::MalformedFrame));
    }

    #[test]
    fn test_ack_layout() {
        assert_eq!(Packet::Ack(0).serialize().unwrap(), vec![0, 4, 0, 0]);
        assert_eq!(Packet::deserialize(&[0, 4, 1, 2]).unwrap(), Packet::Ack(258));
    }

    #[test]
    fn test_ack_trailing_bytes_rejected() {
        assert_eq!(
            Packet::deserialize(&[0, 4, 0, 1, 0]),
            Err(FrameError::MalformedFrame)
        );
    }

    fn assert_round_trip(packet: Packet) {
        let bytes = packet.serialize().unwrap();
        assert_eq!(Packet::deserialize(&bytes).unwrap(), packet);
    }

    const EDGE_BLOCKS: [u16; 5] = [0, 1, 0x7FFF, 0xFFFE, u16::MAX];

    #[test]
    fn test_error_round_trip() {
        for code in (0..8).filter_map(ErrorCode::from_u16) {
            let bytes = Packet::error(code).serialize().unwrap();
            assert_eq!(&bytes[2..4], &code.as_u16().to_be_bytes());
            assert_round_trip(Packet::error(code));
            for msg in ["", "x", "disk on fire: /srv/tftp"] {
                assert_round_trip(Packet::Error {
                    code,
                    msg: msg.to_string(),
                });
            }
        }
        assert_eq!(ErrorCode::from_u16(8), None);
    }

    #[test]
    fn test_data_round_trip_all_lengths() {
        for block_num in EDGE_BLOCKS {
            for len in 0..=MAX_DATA_SIZE {
                let data = (0..len).map(|i| (i * 7 + block_num as usize) as u8).collect();
                assert_round_trip(Packet::Data { block_num, data });
            }
        }
    }

    #[test]
    fn test_ack_round_trip() {
        for block_num in EDGE_BLOCKS.into_iter().chain((0..=u16::MAX).step_by(257)) {
            assert_round_trip(Packet::Ack(block_num));
        }
    }

    #[test]
    fn test_request_round_trip() {
        for filename in ["", "a", "boot/grub/x86_64-efi/core.efi", "ünïcode.bin"] {
            for mode in ["octet", "OCTET", "netascii"] {
                let filename = filename.to_string();
                let mode = mode.to_string();
                assert_round_trip(Packet::Rrq {
                    filename: filename.clone(),
                    mode: mode.clone(),
                });
                assert_round_trip(Packet::Wrq { filename, mode });
            }
        }
    }

    #[test]
    fn test_empty_text_is_single_nul() {
        let packet = Packet::Error {
            code: ErrorCode::FileNotFound,
            msg: String::new(),
        };
        assert_eq!(packet.serialize().unwrap(), vec![0, 5, 0, 1, 0]);

        let request = Packet::Rrq {
            filename: String::new(),
            mode: String::new(),
        };
        assert_eq!(request.serialize().unwrap(), vec![0, 1, 0, 0]);
        assert_eq!(Packet::deserialize(&[0, 1, 0, 0]).unwrap(), request);
    }

    #[test]
    fn test_unknown_error_code_rejected() {
        assert_eq!(
            Packet::deserialize(&[0, 5, 0, 42, b'x', 0]),
            Err(FrameError::MalformedFrame)
        );
    }

    #[test]
    fn test_unknown_opcode() {
        assert_eq!(
            Packet::deserialize(&[0, 6, b'a', 0]),
            Err(FrameError::UnknownOpcode(6))
        );
        assert_eq!(Packet::deserialize(&[0, 0]), Err(FrameError::UnknownOpcode(0)));
    }

    #[test]
    fn test_truncated_frames() {
        let cases: &[&[u8]] = &[
            b"",
            b"\x00",
            b"\x00\x01file",
            b"\x00\x01file\x00octet",
            b"\x00\x02\x00oct",
            b"\x00\x03\x00",
            b"\x00\x04\x01",
            b"\x00\x05\x00\x01",
            b"\x00\x05\x00\x01no terminator",
        ];
        for case in cases {
            assert_eq!(
                Packet::deserialize(case),
                Err(FrameError::TruncatedFrame),
                "input {:?}",
                case
            );
        }
    }

    #[test]
    fn test_request_options_ignored() {
        let bytes = b"\x00\x01boot.img\x00octet\x00blksize\x001400\x00";
        assert_eq!(
            Packet::deserialize(bytes).unwrap(),
            Packet::Rrq {
                filename: "boot.img".to_string(),
                mode: "octet".to_string()
            }
        );
    }

    #[test]
    fn test_nul_in_text_refused() {
        let packet = Packet::Wrq {
            filename: "a\0b".to_string(),
            mode: "octet".to_string(),
        };
        assert_eq!(packet.serialize(), Err(FrameError::InvalidField("filename")));
    }

    #[test]
    fn test_mode_case_insensitive() {
        assert!(is_octet("octet"));
        assert!(is_octet("OCTET"));
        assert!(!is_octet("netascii"));
        assert!(!is_octet(""));
    }

    #[test]
    fn test_opcode_table() {
        for op in [Opcode::Rrq, Opcode::Wrq, Opcode::Data, Opcode::Ack, Opcode::Error] {
            assert_eq!(Opcode::from_u16(op.as_u16()), Some(op));
        }
        assert_eq!(Opcode::from_u16(7), None);
        assert_eq!(Opcode::Ack.to_string(), "ACK");
    }
}
