//! The gateway's error taxonomy.
//!
//! Each variant corresponds to one of the semantic error kinds the
//! connection handler logs and closes on; see the top-level error handling
//! design. No variant carries enough information to build a client-visible
//! response — the handler never writes one back.

use thiserror::Error;

/// Errors surfaced by the message codec, crypto envelope, frame codec, key
/// directory and upstream translator.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Framing lengths did not match declared sizes (header/crypto-info
    /// width, or a body length inconsistent with the header).
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// A structured message failed to deserialize, or trailing bytes
    /// remained after a complete message was parsed.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// Key/IV length was wrong, ciphertext length was not a multiple of 16,
    /// or the underlying AES operation failed.
    #[error("crypto error: {0}")]
    CryptoError(String),

    /// `partner_id` is not present in the key directory.
    #[error("unknown partner: {0}")]
    UnknownPartner(u32),

    /// The upstream HTTP call failed outright or returned a non-success
    /// status.
    #[error("upstream error: {0}")]
    UpstreamError(String),

    /// The upstream XML response was missing an expected element, or a
    /// numeric field could not be parsed.
    #[error("malformed upstream response: {0}")]
    MalformedUpstreamResponse(String),

    /// A socket read/write or upstream call exceeded its deadline.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Any other I/O failure on the client socket.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
