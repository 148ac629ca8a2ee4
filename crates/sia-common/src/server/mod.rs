//! Base server and handler pipeline
//!
//! Every transport feeds inbound bytes through the same
//! `parse_and_check_event` pipeline and writes back the synthesized
//! response before handing the event to the user handler. The pipeline
//! itself is synchronous; only I/O and handler dispatch suspend.

mod oh;
mod tcp;
mod udp;

pub use oh::SiaServerOh;
pub use tcp::SiaServerTcp;
pub use udp::SiaServerUdp;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use crate::Result;
use crate::account::AccountStore;
use crate::counters::{Bucket, Counters};
use crate::error::ProtocolError;
use crate::event::{Content, ResponseType, SiaEvent};
use crate::protocol::MessageType;
use crate::protocol::codes;
use crate::protocol::lexer::{self, RawFrame};
use crate::protocol::timestamp::{self, SkewWindow};

/// User-supplied sink for accepted events.
///
/// Invoked once per ACK/RSP event, after the response has been handed
/// to the transport. Must tolerate concurrent invocation; an error is
/// counted against `errors.user_code` and the already-sent ACK stands.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, event: SiaEvent) -> Result<()>;

    /// Handler name for logging
    fn name(&self) -> &'static str {
        "handler"
    }
}

/// State shared by every transport loop of one receiver.
pub struct ServerState {
    accounts: AccountStore,
    counters: Arc<Counters>,
    handler: Arc<dyn EventHandler>,
    skew: SkewWindow,
    shutdown: AtomicBool,
}

impl ServerState {
    pub fn new(
        accounts: AccountStore,
        handler: Arc<dyn EventHandler>,
        counters: Arc<Counters>,
    ) -> Self {
        Self {
            accounts,
            counters,
            handler,
            skew: SkewWindow::default(),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Override the timestamp skew window.
    pub fn with_skew(mut self, skew: SkewWindow) -> Self {
        self.skew = skew;
        self
    }

    pub fn accounts(&self) -> &AccountStore {
        &self.accounts
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Ask every loop to exit at its next read boundary. In-flight
    /// handler tasks run to completion.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Run inbound bytes through the full validation pipeline.
    ///
    /// Returns `None` for bytes that do not lex as a frame (the caller
    /// drops them without replying). Every lexed frame yields an event
    /// carrying its response; exactly one counter bucket is charged
    /// either way.
    pub fn parse_and_check_event(&self, data: &[u8]) -> Option<SiaEvent> {
        self.counters.bump(Bucket::Events);

        let frame = match lexer::lex_frame(data) {
            Ok(frame) => frame,
            Err(err) => {
                self.counters.bump(err.bucket());
                debug!(error = %err, len = data.len(), "Dropping unparseable bytes");
                return None;
            }
        };

        let mut event = SiaEvent {
            message_type: MessageType::from_token(&frame.message_type),
            raw_message_type: frame.message_type.clone(),
            sequence: frame.sequence.clone(),
            receiver: frame.receiver.clone(),
            line: frame.line.clone(),
            account: frame.account.clone(),
            encrypted: frame.encrypted,
            content: None,
            code_description: None,
            timestamp: None,
            valid_message: frame.valid_message(),
            valid_timestamp: true,
            response: ResponseType::Nak,
            key: None,
        };

        match self.check_frame(&frame, &mut event) {
            Ok(response) => {
                event.response = response;
                self.counters.bump(Bucket::ValidEvents);
            }
            Err(err) => {
                event.response = err.response();
                self.counters.bump(err.bucket());
                warn!(
                    error = %err,
                    account = ?event.account,
                    sequence = %event.sequence,
                    "Rejected frame"
                );
            }
        }

        Some(event)
    }

    /// Validation steps behind the lexer: account, decryption, content,
    /// CRC/length, timestamp. The first failure decides the response.
    fn check_frame(
        &self,
        frame: &RawFrame,
        event: &mut SiaEvent,
    ) -> std::result::Result<ResponseType, ProtocolError> {
        let account_id = frame
            .account
            .as_deref()
            .ok_or(ProtocolError::UnknownAccount(None))?;
        let account = self
            .accounts
            .get(account_id)
            .ok_or_else(|| ProtocolError::UnknownAccount(Some(account_id.to_string())))?;

        let content_input = if frame.encrypted {
            let key = account
                .key()
                .ok_or_else(|| ProtocolError::MissingKey(account.account_id().to_string()))?;
            event.key = Some(key.clone());
            key.decrypt_content(&frame.rest)?
        } else {
            frame.rest.clone()
        };

        let message_type = event
            .message_type
            .ok_or_else(|| ProtocolError::UnknownCode(frame.message_type.clone()))?;

        let raw_timestamp = match message_type {
            MessageType::SiaDcs => {
                let content = lexer::lex_sia_content(&content_input, frame.encrypted)?;
                if let Some(code) = &content.code {
                    event.code_description = Some(
                        codes::sia_code_description(code)
                            .ok_or_else(|| ProtocolError::UnknownCode(code.clone()))?,
                    );
                }
                let raw = content.timestamp.clone();
                event.content = Some(Content::Sia(content));
                raw
            }
            MessageType::AdmCid => {
                let content = lexer::lex_adm_content(&content_input, frame.encrypted)?;
                if !codes::valid_contact_id_qualifier(content.event_qualifier) {
                    return Err(ProtocolError::UnknownCode(format!(
                        "qualifier {}",
                        content.event_qualifier
                    )));
                }
                event.code_description = Some(
                    codes::contact_id_description(content.event_type).ok_or_else(|| {
                        ProtocolError::UnknownCode(content.event_type.to_string())
                    })?,
                );
                let raw = content.timestamp.clone();
                event.content = Some(Content::Adm(content));
                raw
            }
            MessageType::Null => {
                let (_xdata, raw) = lexer::lex_null_trailer(&content_input)?;
                raw
            }
        };

        if !frame.valid_message() {
            if frame.body_len != frame.declared_len {
                return Err(ProtocolError::LengthMismatch {
                    declared: frame.declared_len,
                    actual: frame.body_len,
                });
            }
            return Err(ProtocolError::CrcMismatch {
                declared: frame.crc,
                computed: frame.computed_crc,
            });
        }

        if let Some(raw) = raw_timestamp {
            match timestamp::parse_wire(&raw) {
                Some(reported) => {
                    event.timestamp = Some(reported);
                    if !self.skew.contains(reported, Utc::now()) {
                        event.valid_timestamp = false;
                        return Err(ProtocolError::TimestampSkew);
                    }
                }
                None => {
                    event.valid_timestamp = false;
                    return Err(ProtocolError::TimestampSkew);
                }
            }
        }

        let sequence = account.next_sequence();
        debug!(
            account = account.account_id(),
            received = sequence,
            "Accepted event"
        );

        Ok(match message_type {
            MessageType::Null => ResponseType::Rsp,
            _ => ResponseType::Ack,
        })
    }

    /// Hand an accepted event to the user handler without blocking the
    /// connection loop. Handler failures are counted; the response has
    /// already been sent and is not retracted.
    pub fn dispatch(self: &Arc<Self>, event: SiaEvent) {
        if !event.dispatchable() {
            return;
        }
        let state = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = state.handler.handle_event(event).await {
                state.counters.bump(Bucket::UserCodeError);
                warn!(
                    error = %err,
                    handler = state.handler.name(),
                    "Event handler failed"
                );
            }
        });
    }
}
