//! ELG Gateway common library
//!
//! Shared functionality for the ELG location gateway:
//! - Structured message codec (`RqHeader`, `CryptoInfo`, `Rq`, `RsHeader`, `Rs`)
//! - AES-128-CBC cryptographic envelope
//! - Frame codec combining the two into whole request/response wire frames
//! - Partner key directory

pub mod crypto;
pub mod error;
pub mod frame;
pub mod keys;
pub mod message;

pub use error::GatewayError;
pub use keys::{PartnerEntry, PartnerKeys};
pub use message::{ApScan, CryptoInfo, Rq, Rs, RqHeader, RsHeader};

/// Common result type for ELG gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
