//! SIA DC-09 Receiver Library
//!
//! Shared functionality for the SIA DC-09 alarm receiver including:
//! - Wire grammar (frame and content lexing, CRC)
//! - Per-account cryptography (AES-CBC, Osborne-Hoffman obfuscation)
//! - Event model and ACK/NAK/DUH/RSP response synthesis
//! - Transport dispatch loops (TCP, UDP, OH)

pub mod account;
pub mod counters;
pub mod crypto;
pub mod error;
pub mod event;
pub mod protocol;
pub mod server;

pub use account::{AccountStore, SiaAccount};
pub use counters::{Bucket, Counters};
pub use error::ProtocolError;
pub use event::{ResponseType, SiaEvent};
pub use protocol::MessageType;
pub use server::{EventHandler, ServerState, SiaServerOh, SiaServerTcp, SiaServerUdp};

/// Common result type for receiver operations
pub type Result<T> = anyhow::Result<T>;
