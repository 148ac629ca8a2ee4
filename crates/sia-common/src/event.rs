//! Event model and response synthesis
//!
//! A `SiaEvent` exists from parse through response send through handler
//! dispatch. Response synthesis is a total function: every lexed frame
//! yields exactly one ACK, NAK, DUH, or RSP reply, framed with its own
//! CRC and length by the same functions used for validation.

use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::crypto::AesKey;
use crate::protocol::MessageType;
use crate::protocol::crc::crc16_hex;
use crate::protocol::lexer::{AdmContent, SiaContent};
use crate::protocol::timestamp;

/// Reply variants of the DC-09 response frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResponseType {
    /// Event accepted and dispatched
    Ack,
    /// Integrity, account, or timestamp failure; panel should resend
    Nak,
    /// Frame parsed but not actionable (unknown type or code)
    Duh,
    /// Reply to a NULL link-test heartbeat
    Rsp,
}

impl ResponseType {
    /// Token as it appears in the response body
    pub fn as_wire(&self) -> &'static str {
        match self {
            ResponseType::Ack => "ACK",
            ResponseType::Nak => "NAK",
            ResponseType::Duh => "DUH",
            ResponseType::Rsp => "RSP",
        }
    }
}

/// Decoded content variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Content {
    Sia(SiaContent),
    Adm(AdmContent),
}

/// The semantic unit emitted by the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct SiaEvent {
    /// Known message type; `None` when the token did not map
    pub message_type: Option<MessageType>,
    /// Message-type token exactly as lexed
    pub raw_message_type: String,
    pub sequence: String,
    pub receiver: Option<String>,
    pub line: String,
    pub account: Option<String>,
    /// Frame arrived with the `*` encryption flag
    pub encrypted: bool,
    pub content: Option<Content>,
    /// Description of the event code, when the table knows it
    pub code_description: Option<&'static str>,
    /// Panel-reported UTC timestamp, when the frame carried one
    pub timestamp: Option<DateTime<Utc>>,
    /// CRC and length both checked out
    pub valid_message: bool,
    /// Reported timestamp fell inside the skew window (or was absent)
    pub valid_timestamp: bool,
    pub response: ResponseType,
    /// Account key used for the response; never serialized
    #[serde(skip)]
    pub key: Option<AesKey>,
}

impl SiaEvent {
    /// Events the handler receives; NAK/DUH frames are answered but not
    /// forwarded.
    pub fn dispatchable(&self) -> bool {
        matches!(self.response, ResponseType::Ack | ResponseType::Rsp)
    }

    /// Event code as reported by the panel, if any.
    pub fn code(&self) -> Option<&str> {
        match &self.content {
            Some(Content::Sia(content)) => content.code.as_deref(),
            Some(Content::Adm(_)) => None,
            None => None,
        }
    }

    /// Zone / area identifier, if reported.
    pub fn ri(&self) -> Option<&str> {
        match &self.content {
            Some(Content::Sia(content)) => content.ri.as_deref(),
            Some(Content::Adm(content)) => Some(&content.ri),
            None => None,
        }
    }

    /// Synthesize the wire reply for this event.
    ///
    /// Sequence, receiver, line, and account are echoed back. NAK
    /// replies additionally carry the receiver's current clock so the
    /// panel can resynchronize. When the inbound frame was encrypted
    /// and the account key is known, the reply content is encrypted
    /// with a fresh IV and the type token gains the `*` flag.
    pub fn create_response(&self) -> Bytes {
        let mut header = String::with_capacity(48);
        header.push('"');
        if self.encrypted && self.key.is_some() {
            header.push('*');
        }
        header.push_str(self.response.as_wire());
        header.push('"');
        header.push_str(&self.sequence);
        if let Some(receiver) = &self.receiver {
            header.push('R');
            header.push_str(receiver);
        }
        header.push('L');
        header.push_str(&self.line);
        if let Some(account) = &self.account {
            header.push('#');
            header.push_str(account);
        }

        let trailer = match self.response {
            ResponseType::Nak => format!("_{}", timestamp::to_wire(Utc::now())),
            _ => String::new(),
        };

        let body = match &self.key {
            Some(key) if self.encrypted => {
                let plaintext = format!("|]{trailer}");
                format!("{header}[{}]", key.encrypt_content(&plaintext))
            }
            _ => format!("{header}[]{trailer}"),
        };

        wrap_frame(&body)
    }
}

/// Frame a quoted body with its CRC+length prefix and line terminators.
pub fn wrap_frame(body: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(body.len() + 10);
    buf.put_u8(b'\n');
    buf.put_slice(crc16_hex(body.as_bytes()).as_bytes());
    buf.put_slice(format!("{:04X}", body.len()).as_bytes());
    buf.put_slice(body.as_bytes());
    buf.put_u8(b'\r');
    buf.freeze()
}
