//! Frame and content lexers
//!
//! The outer DC-09 frame is
//!
//! ```text
//! ┌──────┬────────┬──────────────────────────────────────────────┬────┐
//! │ LF   │ CCCCLLLL │ "[*]TYPE"SSSS[Rrrrr]Lllll[#ACCT][payload…] │ CR │
//! ├──────┼────────┼──────────────────────────────────────────────┼────┤
//! │ 1    │ 8 hex  │ quoted body, CRC/length computed over this   │ 1  │
//! └──────┴────────┴──────────────────────────────────────────────┴────┘
//! ```
//!
//! Some panels omit the line terminators on UDP, so both are optional
//! here. The grammar is regular; each matcher is compiled once. The
//! lexer never reads beyond the declared length of the quoted body.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ProtocolError;
use crate::protocol::crc::crc16;

/// Quoted-body grammar. CRC and length are consumed before this runs.
static FRAME_MATCHER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?x)
        ^
        "
        (?P<encrypted_flag>\*)?
        (?P<message_type>[A-Za-z-]{3,10})
        "
        (?P<sequence>[0-9]{4})
        (?:R(?P<receiver>[A-Fa-f0-9]{1,6}))?
        L(?P<line>[A-Fa-f0-9]{1,6})
        (?:\#(?P<account>[A-Fa-f0-9]{3,16}))?
        \[
        (?P<rest>.*)
        $
        "#,
    )
    .expect("frame grammar compiles")
});

// Content grammar fragments shared between the clear and encrypted
// matchers. Encrypted payloads may carry printable filler ahead of the
// first `|`; the FILLER fragment skips it.
const FILLER: &str = r"[^|\[\]]*";
const XDATA_TS: &str = r"\] (?:\[(?P<xdata>[^\[\]]*)\])? (?:_(?P<timestamp>[0-9:,\-]*))? $";
const SIA_BODY: &str = r"
    (?:\#(?P<account>[A-Fa-f0-9]{3,16}))?
    \|?
    N?
    (?:ti(?P<ti>[0-9]{2}:[0-9]{2})/?)?
    (?:id(?P<id>[0-9]*)/?)?
    (?:ri(?P<ri>[0-9]*)/?)?
    (?P<code>[a-zA-Z]{2})?
    (?P<message>[^\[\]]+)?
";
const ADM_BODY: &str = r"
    (?:\#(?P<account>[A-Fa-f0-9]{3,16}))?
    \|?
    (?P<event_qualifier>[0-9])
    (?P<event_type>[0-9]{3})
    \s
    (?P<partition>[0-9]{2})
    \s
    (?P<ri>[0-9]{3})
";

static SIA_CONTENT_MATCHER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("(?x)^{SIA_BODY}{XDATA_TS}")).expect("sia grammar"));
static ENCR_SIA_CONTENT_MATCHER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("(?x)^{FILLER}{SIA_BODY}{XDATA_TS}")).expect("encrypted sia grammar")
});
static ADM_CONTENT_MATCHER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("(?x)^{ADM_BODY}{XDATA_TS}")).expect("adm grammar"));
static ENCR_ADM_CONTENT_MATCHER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("(?x)^{FILLER}{ADM_BODY}{XDATA_TS}")).expect("encrypted adm grammar")
});
static NULL_TRAILER_MATCHER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?x)^{FILLER}\|?{XDATA_TS}")).expect("null trailer grammar")
});

/// Lexed outer frame. Validation of CRC, length, account, and timestamp
/// happens downstream; the lexer only establishes shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// CRC declared in the 4-hex-digit prefix
    pub crc: u16,
    /// Byte count declared in the 4-hex-digit length field
    pub declared_len: usize,
    /// Actual byte count of the quoted body that arrived
    pub body_len: usize,
    /// CRC computed over the quoted body (capped at the declared length)
    pub computed_crc: u16,
    /// `*` flag: payload is AES-encrypted
    pub encrypted: bool,
    /// Message-type token as lexed; may be unknown to the receiver
    pub message_type: String,
    /// 4-digit sequence
    pub sequence: String,
    /// Receiver identifier without its `R` prefix
    pub receiver: Option<String>,
    /// Line identifier without its `L` prefix
    pub line: String,
    /// Account id without its `#` prefix
    pub account: Option<String>,
    /// Everything after the opening `[`
    pub rest: String,
}

impl RawFrame {
    /// CRC and length both check out against the received body.
    pub fn valid_message(&self) -> bool {
        self.body_len == self.declared_len && self.computed_crc == self.crc
    }
}

/// Inner content of a SIA-DCS frame.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct SiaContent {
    pub account: Option<String>,
    /// Time offset `mm:ss` reported by the panel
    pub ti: Option<String>,
    pub id: Option<String>,
    /// Zone / area identifier
    pub ri: Option<String>,
    /// 2-letter event code
    pub code: Option<String>,
    pub message: Option<String>,
    pub xdata: Option<String>,
    pub timestamp: Option<String>,
}

/// Inner content of an ADM-CID frame.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AdmContent {
    pub account: Option<String>,
    pub event_qualifier: u8,
    pub event_type: u16,
    pub partition: String,
    pub ri: String,
    pub xdata: Option<String>,
    pub timestamp: Option<String>,
}

fn capture(caps: &regex::Captures<'_>, name: &str) -> Option<String> {
    caps.name(name).map(|m| m.as_str().to_string())
}

fn parse_hex_u16(bytes: &[u8]) -> Option<u16> {
    let s = std::str::from_utf8(bytes).ok()?;
    u16::from_str_radix(s, 16).ok()
}

/// Lex the outer frame from raw inbound bytes.
pub fn lex_frame(data: &[u8]) -> Result<RawFrame, ProtocolError> {
    let mut bytes = data;
    if bytes.first() == Some(&b'\n') {
        bytes = &bytes[1..];
    }
    while matches!(bytes.last(), Some(b'\r') | Some(b'\n')) {
        bytes = &bytes[..bytes.len() - 1];
    }

    // 8-char CRC+length prefix plus at least the opening quote
    if bytes.len() < 9 {
        return Err(ProtocolError::Format);
    }
    let crc = parse_hex_u16(&bytes[0..4]).ok_or(ProtocolError::Format)?;
    let declared_len =
        parse_hex_u16(&bytes[4..8]).ok_or(ProtocolError::Format)? as usize;

    let body = &bytes[8..];
    let lexable = &body[..body.len().min(declared_len)];
    let computed_crc = crc16(lexable);

    let text = String::from_utf8_lossy(lexable);
    let caps = FRAME_MATCHER.captures(&text).ok_or(ProtocolError::Format)?;

    Ok(RawFrame {
        crc,
        declared_len,
        body_len: body.len(),
        computed_crc,
        encrypted: caps.name("encrypted_flag").is_some(),
        message_type: caps["message_type"].to_string(),
        sequence: caps["sequence"].to_string(),
        receiver: capture(&caps, "receiver"),
        line: caps["line"].to_string(),
        account: capture(&caps, "account"),
        rest: caps["rest"].to_string(),
    })
}

/// Lex SIA-DCS content. `encrypted` selects the filler-tolerant grammar
/// used on decrypted plaintext.
pub fn lex_sia_content(input: &str, encrypted: bool) -> Result<SiaContent, ProtocolError> {
    let matcher: &Regex = if encrypted {
        &ENCR_SIA_CONTENT_MATCHER
    } else {
        &SIA_CONTENT_MATCHER
    };
    let caps = matcher
        .captures(input)
        .ok_or(ProtocolError::Content("SIA-DCS"))?;

    Ok(SiaContent {
        account: capture(&caps, "account"),
        ti: capture(&caps, "ti"),
        id: capture(&caps, "id"),
        ri: capture(&caps, "ri"),
        code: capture(&caps, "code"),
        message: capture(&caps, "message"),
        xdata: capture(&caps, "xdata"),
        timestamp: capture(&caps, "timestamp").filter(|t| !t.is_empty()),
    })
}

/// Lex ADM-CID (Contact ID) content.
pub fn lex_adm_content(input: &str, encrypted: bool) -> Result<AdmContent, ProtocolError> {
    let matcher: &Regex = if encrypted {
        &ENCR_ADM_CONTENT_MATCHER
    } else {
        &ADM_CONTENT_MATCHER
    };
    let caps = matcher
        .captures(input)
        .ok_or(ProtocolError::Content("ADM-CID"))?;

    let event_qualifier = caps["event_qualifier"]
        .parse::<u8>()
        .map_err(|_| ProtocolError::Content("ADM-CID"))?;
    let event_type = caps["event_type"]
        .parse::<u16>()
        .map_err(|_| ProtocolError::Content("ADM-CID"))?;

    Ok(AdmContent {
        account: capture(&caps, "account"),
        event_qualifier,
        event_type,
        partition: caps["partition"].to_string(),
        ri: caps["ri"].to_string(),
        xdata: capture(&caps, "xdata"),
        timestamp: capture(&caps, "timestamp").filter(|t| !t.is_empty()),
    })
}

/// Lex the empty-bracket trailer of a NULL heartbeat, returning its
/// optional xdata and timestamp.
pub fn lex_null_trailer(
    input: &str,
) -> Result<(Option<String>, Option<String>), ProtocolError> {
    let caps = NULL_TRAILER_MATCHER
        .captures(input)
        .ok_or(ProtocolError::Content("NULL"))?;
    Ok((
        capture(&caps, "xdata"),
        capture(&caps, "timestamp").filter(|t| !t.is_empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::crc::crc16_hex;

    /// Build a well-formed wire frame around a quoted body.
    fn wire(body: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(body.len() + 10);
        out.push(b'\n');
        out.extend_from_slice(crc16_hex(body.as_bytes()).as_bytes());
        out.extend_from_slice(format!("{:04X}", body.len()).as_bytes());
        out.extend_from_slice(body.as_bytes());
        out.push(b'\r');
        out
    }

    #[test]
    fn test_lex_sia_dcs_frame() {
        let body = r#""SIA-DCS"0003L0#AAA[|Nri1/BA501]_14:12:04,09-25-2019"#;
        let frame = lex_frame(&wire(body)).unwrap();

        assert!(!frame.encrypted);
        assert_eq!(frame.message_type, "SIA-DCS");
        assert_eq!(frame.sequence, "0003");
        assert_eq!(frame.receiver, None);
        assert_eq!(frame.line, "0");
        assert_eq!(frame.account.as_deref(), Some("AAA"));
        assert_eq!(frame.rest, "|Nri1/BA501]_14:12:04,09-25-2019");
        assert!(frame.valid_message());
    }

    #[test]
    fn test_lex_frame_with_receiver() {
        let body = r#""ADM-CID"9876R579BDFL789ABC#12345A[#12345A|1110 00 129]"#;
        let frame = lex_frame(&wire(body)).unwrap();

        assert_eq!(frame.message_type, "ADM-CID");
        assert_eq!(frame.receiver.as_deref(), Some("579BDF"));
        assert_eq!(frame.line, "789ABC");
        assert_eq!(frame.account.as_deref(), Some("12345A"));
    }

    #[test]
    fn test_lex_encrypted_flag() {
        let body = r#""*SIA-DCS"0002L0#AAA[4AEE7D9C0C0B2B2F"#;
        let frame = lex_frame(&wire(body)).unwrap();
        assert!(frame.encrypted);
        assert_eq!(frame.rest, "4AEE7D9C0C0B2B2F");
    }

    #[test]
    fn test_lex_unknown_message_type_still_lexes() {
        let body = r#""FOO"0001L0#AAA[]"#;
        let frame = lex_frame(&wire(body)).unwrap();
        assert_eq!(frame.message_type, "FOO");
    }

    #[test]
    fn test_lex_rejects_garbage() {
        assert_eq!(lex_frame(b"hello world"), Err(ProtocolError::Format));
        assert_eq!(lex_frame(b""), Err(ProtocolError::Format));
        assert_eq!(
            lex_frame(b"ZZZZ0005\"NULL\"0001L0[]"),
            Err(ProtocolError::Format)
        );
    }

    #[test]
    fn test_lexer_stops_at_declared_length() {
        // Declared length covers only part of the body; the trailing
        // bytes must not reach the lexer or the CRC.
        let body = r#""NULL"0001L0#AAA[]"#;
        let truncated_at = body.len() - 1;
        let mut out = Vec::new();
        out.push(b'\n');
        out.extend_from_slice(crc16_hex(&body.as_bytes()[..truncated_at]).as_bytes());
        out.extend_from_slice(format!("{truncated_at:04X}").as_bytes());
        out.extend_from_slice(body.as_bytes());
        out.push(b'\r');

        let frame = lex_frame(&out).unwrap();
        assert_eq!(frame.rest, "");
        assert_eq!(frame.computed_crc, crc16(&body.as_bytes()[..truncated_at]));
        assert!(!frame.valid_message());
    }

    #[test]
    fn test_crc_and_length_mismatch_detected() {
        let body = r#""SIA-DCS"0003L0#AAA[|Nri1/BA501]"#;
        let mut data = wire(body);
        // corrupt the CRC prefix
        data[1] = b'0';
        data[2] = b'0';
        data[3] = b'0';
        data[4] = b'0';
        let frame = lex_frame(&data).unwrap();
        assert!(!frame.valid_message());
    }

    #[test]
    fn test_lex_sia_content() {
        let content = lex_sia_content("|Nri1/BA501]_14:12:04,09-25-2019", false).unwrap();
        assert_eq!(content.ri.as_deref(), Some("1"));
        assert_eq!(content.code.as_deref(), Some("BA"));
        assert_eq!(content.message.as_deref(), Some("501"));
        assert_eq!(content.timestamp.as_deref(), Some("14:12:04,09-25-2019"));
        assert_eq!(content.xdata, None);
    }

    #[test]
    fn test_lex_sia_content_with_ti_and_xdata() {
        let content =
            lex_sia_content("|Nti12:34/id1/ri30/TA519][Xdata]_11:41:00,01-01-2024", false)
                .unwrap();
        assert_eq!(content.ti.as_deref(), Some("12:34"));
        assert_eq!(content.id.as_deref(), Some("1"));
        assert_eq!(content.ri.as_deref(), Some("30"));
        assert_eq!(content.code.as_deref(), Some("TA"));
        assert_eq!(content.message.as_deref(), Some("519"));
        assert_eq!(content.xdata.as_deref(), Some("Xdata"));
    }

    #[test]
    fn test_lex_encrypted_sia_content_skips_filler() {
        let content =
            lex_sia_content("Y5GK2|Nri1/BA501]_14:12:04,09-25-2019", true).unwrap();
        assert_eq!(content.code.as_deref(), Some("BA"));
        assert_eq!(content.ri.as_deref(), Some("1"));
    }

    #[test]
    fn test_lex_adm_content() {
        let content = lex_adm_content("#12345A|1110 00 129]", false).unwrap();
        assert_eq!(content.account.as_deref(), Some("12345A"));
        assert_eq!(content.event_qualifier, 1);
        assert_eq!(content.event_type, 110);
        assert_eq!(content.partition, "00");
        assert_eq!(content.ri, "129");
    }

    #[test]
    fn test_lex_adm_content_rejects_short_fields() {
        assert!(lex_adm_content("|111 0 12]", false).is_err());
    }

    #[test]
    fn test_lex_null_trailer() {
        let (xdata, ts) = lex_null_trailer("]_14:12:04,09-25-2019").unwrap();
        assert_eq!(xdata, None);
        assert_eq!(ts.as_deref(), Some("14:12:04,09-25-2019"));

        let (xdata, ts) = lex_null_trailer("]").unwrap();
        assert_eq!(xdata, None);
        assert_eq!(ts, None);

        // decrypted NULL plaintext carries filler and the content bar
        let (_, ts) = lex_null_trailer("PADPAD|]_14:12:04,09-25-2019").unwrap();
        assert_eq!(ts.as_deref(), Some("14:12:04,09-25-2019"));
    }
}
