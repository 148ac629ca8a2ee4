//! Pipeline error taxonomy
//!
//! Each variant maps onto one counter bucket and one wire response. These
//! errors are handled locally in the pipeline and never abort a
//! connection; only connection-level I/O failures do that.

use thiserror::Error;

use crate::counters::Bucket;
use crate::event::ResponseType;

/// Reasons a frame fails validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("bytes do not match the DC-09 frame grammar")]
    Format,

    #[error("content does not match the {0} grammar")]
    Content(&'static str),

    #[error("account {0:?} is not registered with this receiver")]
    UnknownAccount(Option<String>),

    #[error("account {0} has no AES key but the frame is flagged encrypted")]
    MissingKey(String),

    #[error("crc mismatch: declared {declared:04X}, computed {computed:04X}")]
    CrcMismatch { declared: u16, computed: u16 },

    #[error("length mismatch: declared {declared}, actual {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("timestamp outside the allowed skew window")]
    TimestampSkew,

    #[error("unrecognized message type or event code: {0}")]
    UnknownCode(String),

    #[error("payload decryption failed: {0}")]
    Decrypt(String),
}

impl ProtocolError {
    /// The counter bucket this error is charged to
    pub fn bucket(&self) -> Bucket {
        match self {
            ProtocolError::Format | ProtocolError::Content(_) => Bucket::FormatError,
            ProtocolError::UnknownAccount(_) | ProtocolError::MissingKey(_) => {
                Bucket::AccountError
            }
            // Decryption failures are charged to the CRC bucket alongside
            // the other integrity errors.
            ProtocolError::CrcMismatch { .. }
            | ProtocolError::LengthMismatch { .. }
            | ProtocolError::Decrypt(_) => Bucket::CrcError,
            ProtocolError::TimestampSkew => Bucket::TimestampError,
            ProtocolError::UnknownCode(_) => Bucket::CodeError,
        }
    }

    /// The wire response the peer receives for this error
    pub fn response(&self) -> ResponseType {
        match self {
            ProtocolError::UnknownCode(_) => ResponseType::Duh,
            _ => ResponseType::Nak,
        }
    }
}
