//! Osborne-Hoffman stream obfuscation
//!
//! Legacy alarm receivers wrap DC-09 traffic in the OH scheme: at
//! connect the receiver sends a 16-byte **scrambled key** derived from
//! an account seed, then both directions run an RC4-style keystream
//! initialized from that key. The keystreams are positional, one per
//! direction; a skipped or replayed frame desynchronizes the stream and
//! the connection must be dropped.

use crate::account::SiaAccount;

/// Size of the scrambled-key handshake blob
pub const SCRAMBLED_KEY_LEN: usize = 16;

/// Receiver-wide seed used when no account seed is configured
pub const DEFAULT_SEED: [u8; SCRAMBLED_KEY_LEN] = [
    0x4F, 0x48, 0x9A, 0x13, 0x57, 0xC2, 0x2E, 0x81, 0x6D, 0xF0, 0x3B, 0xA4, 0x18, 0x75, 0xEC,
    0x26,
];

/// Derive the scrambled key from an account seed.
///
/// Small byte-wise state machine: each output byte folds the rotated
/// seed byte and its position into a running accumulator.
fn scramble(seed: &[u8; SCRAMBLED_KEY_LEN]) -> [u8; SCRAMBLED_KEY_LEN] {
    let mut key = [0u8; SCRAMBLED_KEY_LEN];
    let mut acc: u8 = 0x5A;
    for (i, &byte) in seed.iter().enumerate() {
        acc = acc
            .wrapping_mul(5)
            .wrapping_add(byte.rotate_left((i % 8) as u32))
            .wrapping_add(i as u8);
        key[i] = acc;
    }
    key
}

/// RC4 keystream state.
struct Rc4 {
    s: [u8; 256],
    i: u8,
    j: u8,
}

impl Rc4 {
    fn new(key: &[u8]) -> Self {
        let mut s = [0u8; 256];
        for (idx, slot) in s.iter_mut().enumerate() {
            *slot = idx as u8;
        }
        let mut j: u8 = 0;
        for i in 0..256 {
            j = j.wrapping_add(s[i]).wrapping_add(key[i % key.len()]);
            s.swap(i, j as usize);
        }
        Self { s, i: 0, j: 0 }
    }

    fn apply(&mut self, data: &[u8]) -> Vec<u8> {
        data.iter()
            .map(|&byte| {
                self.i = self.i.wrapping_add(1);
                self.j = self.j.wrapping_add(self.s[self.i as usize]);
                self.s.swap(self.i as usize, self.j as usize);
                let idx = self.s[self.i as usize].wrapping_add(self.s[self.j as usize]);
                byte ^ self.s[idx as usize]
            })
            .collect()
    }
}

/// Per-connection OH state. Owned by the connection's task, never
/// shared.
pub struct OsborneHoffman {
    scrambled_key: [u8; SCRAMBLED_KEY_LEN],
    inbound: Rc4,
    outbound: Rc4,
}

impl OsborneHoffman {
    /// OH context on the receiver-wide default seed
    pub fn new() -> Self {
        Self::from_seed(&DEFAULT_SEED)
    }

    /// OH context derived from an account seed
    pub fn from_seed(seed: &[u8; SCRAMBLED_KEY_LEN]) -> Self {
        Self::from_scrambled_key(scramble(seed))
    }

    /// OH context for an account, falling back to the default seed when
    /// the account carries none
    pub fn for_account(account: &SiaAccount) -> Self {
        match account.oh_seed() {
            Some(seed) => Self::from_seed(seed),
            None => Self::new(),
        }
    }

    /// OH context directly on a scrambled key, as the panel side builds
    /// it after the handshake
    pub fn from_scrambled_key(scrambled_key: [u8; SCRAMBLED_KEY_LEN]) -> Self {
        Self {
            inbound: Rc4::new(&scrambled_key),
            outbound: Rc4::new(&scrambled_key),
            scrambled_key,
        }
    }

    /// The handshake blob written at connect and before each read
    pub fn scrambled_key(&self) -> &[u8; SCRAMBLED_KEY_LEN] {
        &self.scrambled_key
    }

    /// Unwrap an inbound frame, advancing the inbound keystream.
    pub fn decrypt_data(&mut self, data: &[u8]) -> Vec<u8> {
        self.inbound.apply(data)
    }

    /// Wrap an outbound frame, advancing the outbound keystream.
    pub fn encrypt_data(&mut self, data: &[u8]) -> Vec<u8> {
        self.outbound.apply(data)
    }
}

impl Default for OsborneHoffman {
    fn default() -> Self {
        Self::new()
    }
}
