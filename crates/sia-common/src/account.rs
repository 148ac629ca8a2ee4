//! Alarm panel accounts
//!
//! Accounts are created once at startup and are immutable for the
//! server's lifetime except for the receive sequence counter. Lookup is
//! read-only during request handling, so the store needs no locking.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::Result;
use crate::crypto::AesKey;

/// A registered alarm panel account.
#[derive(Debug)]
pub struct SiaAccount {
    /// 3-16 hex digit account id, stored uppercased
    account_id: String,
    /// AES key; present iff the account reports encrypted
    key: Option<AesKey>,
    /// Seed for the Osborne-Hoffman scrambled key
    oh_seed: Option<[u8; 16]>,
    /// Receive sequence, advancing modulo 10 000 per accepted event
    sequence: AtomicU32,
}

impl SiaAccount {
    /// Create an account. The id must be 3-16 hex digits; the key, when
    /// given, must decode to 16, 24, or 32 bytes.
    pub fn new(account_id: &str, key_hex: Option<&str>) -> Result<Self> {
        if account_id.len() < 3
            || account_id.len() > 16
            || !account_id.chars().all(|c| c.is_ascii_hexdigit())
        {
            anyhow::bail!(
                "Invalid account id {:?}: expected 3-16 hex digits",
                account_id
            );
        }
        let key = key_hex.map(AesKey::from_hex).transpose()?;
        Ok(Self {
            account_id: account_id.to_uppercase(),
            key,
            oh_seed: None,
            sequence: AtomicU32::new(0),
        })
    }

    /// Attach an Osborne-Hoffman seed for this account.
    pub fn with_oh_seed(mut self, seed: [u8; 16]) -> Self {
        self.oh_seed = Some(seed);
        self
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn key(&self) -> Option<&AesKey> {
        self.key.as_ref()
    }

    pub fn oh_seed(&self) -> Option<&[u8; 16]> {
        self.oh_seed.as_ref()
    }

    /// An account with a key expects encrypted traffic.
    pub fn encrypted(&self) -> bool {
        self.key.is_some()
    }

    /// Advance the receive sequence and return its new value.
    pub fn next_sequence(&self) -> u32 {
        self.sequence
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |seq| {
                Some((seq + 1) % 10_000)
            })
            .map(|prev| (prev + 1) % 10_000)
            .unwrap_or(0)
    }
}

/// Read-only id-to-account mapping shared by all transports.
#[derive(Debug, Default)]
pub struct AccountStore {
    accounts: HashMap<String, SiaAccount>,
}

impl AccountStore {
    pub fn new(accounts: Vec<SiaAccount>) -> Self {
        let accounts = accounts
            .into_iter()
            .map(|account| (account.account_id.clone(), account))
            .collect();
        Self { accounts }
    }

    /// O(1) case-insensitive lookup.
    pub fn get(&self, account_id: &str) -> Option<&SiaAccount> {
        self.accounts.get(&account_id.to_uppercase())
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_id_validation() {
        assert!(SiaAccount::new("AAA", None).is_ok());
        assert!(SiaAccount::new("1234567890ABCDEF", None).is_ok());
        assert!(SiaAccount::new("AA", None).is_err());
        assert!(SiaAccount::new("1234567890ABCDEF0", None).is_err());
        assert!(SiaAccount::new("GGG", None).is_err());
    }

    #[test]
    fn test_key_marks_account_encrypted() {
        let clear = SiaAccount::new("AAA", None).unwrap();
        assert!(!clear.encrypted());

        let encrypted =
            SiaAccount::new("AAA", Some("41414141414141414141414141414141")).unwrap();
        assert!(encrypted.encrypted());
    }

    #[test]
    fn test_key_length_validation() {
        assert!(SiaAccount::new("AAA", Some("4141")).is_err());
        assert!(SiaAccount::new("AAA", Some("zz414141414141414141414141414141")).is_err());
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let store = AccountStore::new(vec![SiaAccount::new("abc123", None).unwrap()]);
        assert!(store.get("ABC123").is_some());
        assert!(store.get("abc123").is_some());
        assert!(store.get("ABC999").is_none());
    }

    #[test]
    fn test_sequence_wraps_at_ten_thousand() {
        let account = SiaAccount::new("AAA", None).unwrap();
        assert_eq!(account.next_sequence(), 1);
        assert_eq!(account.next_sequence(), 2);
        account.sequence.store(9_999, Ordering::Relaxed);
        assert_eq!(account.next_sequence(), 0);
    }
}
