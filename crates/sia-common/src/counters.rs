//! Receive counters
//!
//! Every inbound frame lands in exactly one outcome bucket, so for any
//! batch of N frames `valid_events + errors == N`. The caller shares one
//! `Counters` across all transports and reads it for insight into how
//! many erroneous events were discarded of each type.

use std::sync::atomic::{AtomicU64, Ordering};

/// Outcome buckets tracked by the receiver.
///
/// `Events` is the raw inbound total; the remaining buckets partition it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Bucket {
    /// Every frame handed to the pipeline
    Events,
    /// Frames accepted and dispatched to the handler
    ValidEvents,
    /// CRC or length mismatch, or payload decryption failure
    CrcError,
    /// Timestamp outside the allowed skew window
    TimestampError,
    /// Unknown account or missing AES key
    AccountError,
    /// Unrecognized message type or event code
    CodeError,
    /// Bytes that did not lex as a DC-09 frame or content
    FormatError,
    /// User handler returned an error after the ACK went out
    UserCodeError,
}

impl Bucket {
    const COUNT: usize = 8;

    /// Short category name used in log lines
    pub fn name(&self) -> &'static str {
        match self {
            Bucket::Events => "events",
            Bucket::ValidEvents => "valid_events",
            Bucket::CrcError => "errors.crc",
            Bucket::TimestampError => "errors.timestamp",
            Bucket::AccountError => "errors.account",
            Bucket::CodeError => "errors.code",
            Bucket::FormatError => "errors.format",
            Bucket::UserCodeError => "errors.user_code",
        }
    }
}

/// Atomic per-bucket counters, safe to bump from any task.
#[derive(Debug, Default)]
pub struct Counters {
    buckets: [AtomicU64; Bucket::COUNT],
}

/// Plain copy of all buckets at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterSnapshot {
    pub events: u64,
    pub valid_events: u64,
    pub crc_errors: u64,
    pub timestamp_errors: u64,
    pub account_errors: u64,
    pub code_errors: u64,
    pub format_errors: u64,
    pub user_code_errors: u64,
}

impl Counters {
    /// Create a zeroed counter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment a bucket
    pub fn bump(&self, bucket: Bucket) {
        self.buckets[bucket as usize].fetch_add(1, Ordering::Relaxed);
    }

    /// Read a single bucket
    pub fn get(&self, bucket: Bucket) -> u64 {
        self.buckets[bucket as usize].load(Ordering::Relaxed)
    }

    /// Copy all buckets out for logging or assertions
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            events: self.get(Bucket::Events),
            valid_events: self.get(Bucket::ValidEvents),
            crc_errors: self.get(Bucket::CrcError),
            timestamp_errors: self.get(Bucket::TimestampError),
            account_errors: self.get(Bucket::AccountError),
            code_errors: self.get(Bucket::CodeError),
            format_errors: self.get(Bucket::FormatError),
            user_code_errors: self.get(Bucket::UserCodeError),
        }
    }
}

impl CounterSnapshot {
    /// Sum of the outcome buckets that partition `events`
    pub fn accounted(&self) -> u64 {
        self.valid_events
            + self.crc_errors
            + self.timestamp_errors
            + self.account_errors
            + self.code_errors
            + self.format_errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bump_and_snapshot() {
        let counters = Counters::new();
        counters.bump(Bucket::Events);
        counters.bump(Bucket::Events);
        counters.bump(Bucket::ValidEvents);
        counters.bump(Bucket::CrcError);

        let snap = counters.snapshot();
        assert_eq!(snap.events, 2);
        assert_eq!(snap.valid_events, 1);
        assert_eq!(snap.crc_errors, 1);
        assert_eq!(snap.accounted(), 2);
    }

    #[test]
    fn test_bucket_names() {
        assert_eq!(Bucket::FormatError.name(), "errors.format");
        assert_eq!(Bucket::UserCodeError.name(), "errors.user_code");
    }
}
