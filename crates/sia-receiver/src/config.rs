use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sia_common::account::SiaAccount;
use sia_common::crypto::osborne_hoffman::SCRAMBLED_KEY_LEN;
use sia_common::protocol::timestamp::SkewWindow;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Plain TCP listener, absent to disable
    pub tcp_bind: Option<SocketAddr>,
    /// UDP listener, absent to disable
    pub udp_bind: Option<SocketAddr>,
    /// Osborne-Hoffman listener, absent to disable
    pub oh_bind: Option<SocketAddr>,
    /// Receiver-wide OH seed as 32 hex digits; falls back to the
    /// built-in default seed
    pub oh_seed: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Reject frames older than this many seconds
    pub allowed_past_secs: i64,
    /// Reject frames further than this many seconds in the future
    pub allowed_future_secs: i64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            allowed_past_secs: 20,
            allowed_future_secs: 40,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// 3-16 hex digit account id
    pub account_id: String,
    /// AES key as hex (16, 24, or 32 bytes); absent for cleartext panels
    pub key: Option<String>,
    /// Per-account OH seed as 32 hex digits
    pub oh_seed: Option<String>,
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Could not read {}: {}", path.display(), e))?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn skew(&self) -> SkewWindow {
        SkewWindow::from_seconds(self.timing.allowed_past_secs, self.timing.allowed_future_secs)
    }

    /// Build the account table from the configured entries.
    pub fn build_accounts(&self) -> Result<Vec<SiaAccount>> {
        self.accounts
            .iter()
            .map(|entry| {
                let mut account = SiaAccount::new(&entry.account_id, entry.key.as_deref())?;
                if let Some(seed) = &entry.oh_seed {
                    account = account.with_oh_seed(parse_seed(seed)?);
                }
                Ok(account)
            })
            .collect()
    }

    /// Receiver-wide OH seed, when configured.
    pub fn oh_seed(&self) -> Result<Option<[u8; SCRAMBLED_KEY_LEN]>> {
        self.server.oh_seed.as_deref().map(parse_seed).transpose()
    }
}

fn parse_seed(hex_seed: &str) -> Result<[u8; SCRAMBLED_KEY_LEN]> {
    let bytes = hex::decode(hex_seed)
        .map_err(|e| anyhow::anyhow!("OH seed is not valid hex: {}", e))?;
    if bytes.len() != SCRAMBLED_KEY_LEN {
        anyhow::bail!(
            "Invalid OH seed length: {} bytes (expected {})",
            bytes.len(),
            SCRAMBLED_KEY_LEN
        );
    }
    let mut seed = [0u8; SCRAMBLED_KEY_LEN];
    seed.copy_from_slice(&bytes);
    Ok(seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [server]
        tcp_bind = "0.0.0.0:7777"
        udp_bind = "0.0.0.0:7777"

        [timing]
        allowed_past_secs = 30
        allowed_future_secs = 60

        [[accounts]]
        account_id = "AAA"

        [[accounts]]
        account_id = "EEE"
        key = "41414141414141414141414141414141"
        oh_seed = "000102030405060708090A0B0C0D0E0F"
    "#;

    #[test]
    fn test_parse_sample() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        assert!(config.server.tcp_bind.is_some());
        assert!(config.server.oh_bind.is_none());
        assert_eq!(config.timing.allowed_past_secs, 30);
        assert_eq!(config.accounts.len(), 2);

        let accounts = config.build_accounts().unwrap();
        assert!(!accounts[0].encrypted());
        assert!(accounts[1].encrypted());
        assert!(accounts[1].oh_seed().is_some());
    }

    #[test]
    fn test_timing_defaults() {
        let config: Config = toml::from_str("[server]\ntcp_bind = \"0.0.0.0:7777\"\n").unwrap();
        assert_eq!(config.timing.allowed_past_secs, 20);
        assert_eq!(config.timing.allowed_future_secs, 40);
    }

    #[test]
    fn test_bad_seed_rejected() {
        assert!(parse_seed("xyz").is_err());
        assert!(parse_seed("0001").is_err());
        assert!(parse_seed("000102030405060708090A0B0C0D0E0F").is_ok());
    }
}
