//! DC-09 wire protocol
//!
//! Frame and content grammar, CRC, timestamp handling, and the event
//! code tables shared by every transport.

pub mod codes;
pub mod crc;
pub mod lexer;
pub mod timestamp;

/// Content variants tunneled over DC-09.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum MessageType {
    /// SIA Digital Communications Standard content
    SiaDcs,
    /// Ademco Contact ID content
    AdmCid,
    /// Link-test heartbeat with no content
    Null,
}

impl MessageType {
    /// Map a lexed message-type token to a known variant.
    ///
    /// Unknown tokens still lex (the frame is otherwise well-formed) and
    /// are answered with DUH rather than dropped.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "SIA-DCS" => Some(MessageType::SiaDcs),
            "ADM-CID" => Some(MessageType::AdmCid),
            "NULL" => Some(MessageType::Null),
            _ => None,
        }
    }

    /// Token as it appears on the wire
    pub fn as_wire(&self) -> &'static str {
        match self {
            MessageType::SiaDcs => "SIA-DCS",
            MessageType::AdmCid => "ADM-CID",
            MessageType::Null => "NULL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_tokens() {
        assert_eq!(MessageType::from_token("SIA-DCS"), Some(MessageType::SiaDcs));
        assert_eq!(MessageType::from_token("ADM-CID"), Some(MessageType::AdmCid));
        assert_eq!(MessageType::from_token("NULL"), Some(MessageType::Null));
        assert_eq!(MessageType::from_token("FOO"), None);
        assert_eq!(MessageType::SiaDcs.as_wire(), "SIA-DCS");
    }
}
