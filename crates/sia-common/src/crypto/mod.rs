//! Per-account cryptography
//!
//! Encrypted DC-09 frames carry the bracket payload as uppercase hex:
//! a 16-byte IV chosen by the sender followed by AES-CBC ciphertext of
//! the content. The plaintext is front-padded with printable filler to a
//! whole number of blocks; the content grammar skips the filler up to
//! the first `|`.

pub mod osborne_hoffman;

use aes::cipher::block_padding::NoPadding;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::{Aes128, Aes192, Aes256};
use rand::rngs::OsRng;
use rand::{Rng, RngCore};

use crate::Result;
use crate::error::ProtocolError;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;
type Aes192CbcEnc = cbc::Encryptor<Aes192>;
type Aes192CbcDec = cbc::Decryptor<Aes192>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// AES block and IV size
pub const BLOCK_LEN: usize = 16;

/// Filler used to pad response plaintext. Must stay clear of the
/// characters the content grammar treats as structure.
const FILLER_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Account AES key, sized at construction.
#[derive(Clone, PartialEq, Eq)]
pub enum AesKey {
    Aes128([u8; 16]),
    Aes192([u8; 24]),
    Aes256([u8; 32]),
}

// Key material stays out of Debug output.
impl std::fmt::Debug for AesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AesKey::Aes128(_) => write!(f, "AesKey::Aes128(..)"),
            AesKey::Aes192(_) => write!(f, "AesKey::Aes192(..)"),
            AesKey::Aes256(_) => write!(f, "AesKey::Aes256(..)"),
        }
    }
}

impl AesKey {
    /// Decode a key from hex. Accepts 16, 24, or 32 byte keys.
    pub fn from_hex(key_hex: &str) -> Result<Self> {
        let bytes = hex::decode(key_hex)
            .map_err(|e| anyhow::anyhow!("AES key is not valid hex: {}", e))?;
        Ok(match bytes.len() {
            16 => {
                let mut key = [0u8; 16];
                key.copy_from_slice(&bytes);
                AesKey::Aes128(key)
            }
            24 => {
                let mut key = [0u8; 24];
                key.copy_from_slice(&bytes);
                AesKey::Aes192(key)
            }
            32 => {
                let mut key = [0u8; 32];
                key.copy_from_slice(&bytes);
                AesKey::Aes256(key)
            }
            len => anyhow::bail!(
                "Invalid AES key length: {} bytes (expected 16, 24, or 32)",
                len
            ),
        })
    }

    /// Decrypt a bracket payload into its plaintext content.
    ///
    /// Accepts the hex-encoded `IV || ciphertext` region following the
    /// opening `[`, tolerating a trailing `]`. Trailing NUL/whitespace
    /// padding some panels append is stripped; leading filler is left
    /// for the content grammar.
    pub fn decrypt_content(&self, payload: &str) -> std::result::Result<String, ProtocolError> {
        let payload = payload.trim_end_matches(']');
        let data = hex::decode(payload)
            .map_err(|e| ProtocolError::Decrypt(format!("payload is not hex: {}", e)))?;
        if data.len() < 2 * BLOCK_LEN || !(data.len() - BLOCK_LEN).is_multiple_of(BLOCK_LEN) {
            return Err(ProtocolError::Decrypt(format!(
                "ciphertext of {} bytes is not IV plus whole blocks",
                data.len()
            )));
        }
        let (iv, ciphertext) = data.split_at(BLOCK_LEN);
        let plaintext = self.decrypt_blocks(iv, ciphertext)?;

        let end = plaintext
            .iter()
            .rposition(|&b| b != 0 && !b.is_ascii_whitespace())
            .map_or(0, |pos| pos + 1);
        Ok(String::from_utf8_lossy(&plaintext[..end]).into_owned())
    }

    /// Encrypt response content into the wire's hex form with a fresh
    /// random IV. The content is front-padded to a whole number of
    /// blocks with printable filler.
    pub fn encrypt_content(&self, content: &str) -> String {
        let padded = pad_front(content.as_bytes());
        let mut iv = [0u8; BLOCK_LEN];
        OsRng.fill_bytes(&mut iv);
        let ciphertext = self.encrypt_blocks(&iv, &padded);

        let mut out = hex::encode_upper(iv);
        out.push_str(&hex::encode_upper(ciphertext));
        out
    }

    fn encrypt_blocks(&self, iv: &[u8; BLOCK_LEN], padded: &[u8]) -> Vec<u8> {
        match self {
            AesKey::Aes128(key) => Aes128CbcEnc::new(key.into(), iv.into())
                .encrypt_padded_vec_mut::<NoPadding>(padded),
            AesKey::Aes192(key) => Aes192CbcEnc::new(key.into(), iv.into())
                .encrypt_padded_vec_mut::<NoPadding>(padded),
            AesKey::Aes256(key) => Aes256CbcEnc::new(key.into(), iv.into())
                .encrypt_padded_vec_mut::<NoPadding>(padded),
        }
    }

    fn decrypt_blocks(
        &self,
        iv: &[u8],
        ciphertext: &[u8],
    ) -> std::result::Result<Vec<u8>, ProtocolError> {
        let decrypt_err = |e: aes::cipher::block_padding::UnpadError| {
            ProtocolError::Decrypt(e.to_string())
        };
        match self {
            AesKey::Aes128(key) => Aes128CbcDec::new_from_slices(key, iv)
                .map_err(|e| ProtocolError::Decrypt(e.to_string()))?
                .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
                .map_err(decrypt_err),
            AesKey::Aes192(key) => Aes192CbcDec::new_from_slices(key, iv)
                .map_err(|e| ProtocolError::Decrypt(e.to_string()))?
                .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
                .map_err(decrypt_err),
            AesKey::Aes256(key) => Aes256CbcDec::new_from_slices(key, iv)
                .map_err(|e| ProtocolError::Decrypt(e.to_string()))?
                .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
                .map_err(decrypt_err),
        }
    }
}

/// Front-pad content to a whole number of blocks with printable filler.
/// Already-aligned content gains a full filler block so every encrypted
/// payload differs from the bare plaintext.
fn pad_front(content: &[u8]) -> Vec<u8> {
    let mut rng = OsRng;
    let mut pad_len = (BLOCK_LEN - content.len() % BLOCK_LEN) % BLOCK_LEN;
    if pad_len == 0 {
        pad_len = BLOCK_LEN;
    }
    let mut padded = Vec::with_capacity(pad_len + content.len());
    for _ in 0..pad_len {
        padded.push(FILLER_ALPHABET[rng.gen_range(0..FILLER_ALPHABET.len())]);
    }
    padded.extend_from_slice(content);
    padded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> AesKey {
        // "AAAAAAAAAAAAAAAA" as raw bytes
        AesKey::from_hex("41414141414141414141414141414141").unwrap()
    }

    #[test]
    fn test_key_sizes() {
        assert!(matches!(test_key(), AesKey::Aes128(_)));
        assert!(matches!(
            AesKey::from_hex(&"42".repeat(24)).unwrap(),
            AesKey::Aes192(_)
        ));
        assert!(matches!(
            AesKey::from_hex(&"43".repeat(32)).unwrap(),
            AesKey::Aes256(_)
        ));
        assert!(AesKey::from_hex("4141").is_err());
        assert!(AesKey::from_hex("not hex at all").is_err());
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = test_key();
        let content = "|Nri1/BA501]_14:12:04,09-25-2019";

        let wire = key.encrypt_content(content);
        assert!(wire.chars().all(|c| c.is_ascii_hexdigit()));

        let plaintext = key.decrypt_content(&wire).unwrap();
        // leading filler survives; the content grammar strips it
        assert!(plaintext.ends_with(content));
    }

    #[test]
    fn test_fresh_iv_per_message() {
        let key = test_key();
        let a = key.encrypt_content("|Nri1/BA501]");
        let b = key.encrypt_content("|Nri1/BA501]");
        assert_ne!(a[..2 * BLOCK_LEN], b[..2 * BLOCK_LEN]);
    }

    #[test]
    fn test_decrypt_tolerates_trailing_bracket() {
        let key = test_key();
        let mut wire = key.encrypt_content("|Nri1/BA501]");
        wire.push(']');
        assert!(key.decrypt_content(&wire).is_ok());
    }

    #[test]
    fn test_decrypt_rejects_bad_input() {
        let key = test_key();
        assert!(key.decrypt_content("not hex").is_err());
        // hex, but too short for IV plus one block
        assert!(key.decrypt_content("41414141").is_err());
        // IV plus a partial block
        assert!(key.decrypt_content(&"41".repeat(24)).is_err());
    }

    #[test]
    fn test_wrong_key_garbles_content() {
        let key = test_key();
        let other = AesKey::from_hex("42424242424242424242424242424242").unwrap();
        let wire = key.encrypt_content("|Nri1/BA501]");
        let garbled = other.decrypt_content(&wire).unwrap();
        assert!(!garbled.ends_with("|Nri1/BA501]"));
    }

    #[test]
    fn test_pad_front_alignment() {
        for len in [0, 1, 15, 16, 17, 32] {
            let content = vec![b'x'; len];
            let padded = pad_front(&content);
            assert!(padded.len().is_multiple_of(BLOCK_LEN), "len {}", len);
            assert!(padded.len() > len);
            assert!(padded.ends_with(&content));
        }
    }
}
