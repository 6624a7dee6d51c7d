//! The cryptographic envelope: AES-128-CBC encrypt/decrypt.
//!
//! The padding scheme used above this layer is NOT PKCS#7 — padding bytes
//! are random filler whose length is tracked out-of-band in `CryptoInfo`, not
//! recoverable from the plaintext itself. So these functions operate in
//! "no padding" block mode: callers must hand `encrypt` a buffer whose
//! length is already a multiple of 16, and `decrypt` gets back a plaintext
//! of the same length as the ciphertext, padding bytes (if any) included.

use aes::Aes128;
use cbc::{Decryptor, Encryptor};
use cipher::block_padding::NoPadding;
use cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::GatewayError;

type Aes128CbcEnc = Encryptor<Aes128>;
type Aes128CbcDec = Decryptor<Aes128>;

/// AES-128 key length in bytes.
pub const KEY_LEN: usize = 16;
/// AES-CBC IV length in bytes.
pub const IV_LEN: usize = 16;
/// AES block size in bytes.
pub const BLOCK_LEN: usize = 16;

/// Decrypt `ciphertext` with `key`/`iv` under AES-128-CBC. `ciphertext` must
/// be a positive multiple of 16 bytes; the returned plaintext has the same
/// length.
pub fn decrypt(key: &[u8; KEY_LEN], iv: &[u8; IV_LEN], ciphertext: &[u8]) -> Result<Vec<u8>, GatewayError> {
    if ciphertext.is_empty() || !ciphertext.len().is_multiple_of(BLOCK_LEN) {
        return Err(GatewayError::CryptoError(format!(
            "ciphertext length must be a positive multiple of {BLOCK_LEN}, got {}",
            ciphertext.len()
        )));
    }

    let cipher = Aes128CbcDec::new(key.into(), iv.into());
    cipher
        .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
        .map_err(|e| GatewayError::CryptoError(format!("AES-CBC decrypt failed: {e}")))
}

/// Encrypt `plaintext` with `key`/`iv` under AES-128-CBC. `plaintext` must be
/// a multiple of 16 bytes; the caller is responsible for padding it first.
pub fn encrypt(key: &[u8; KEY_LEN], iv: &[u8; IV_LEN], plaintext: &[u8]) -> Result<Vec<u8>, GatewayError> {
    if !plaintext.len().is_multiple_of(BLOCK_LEN) {
        return Err(GatewayError::CryptoError(format!(
            "plaintext length must be a multiple of {BLOCK_LEN}, got {}",
            plaintext.len()
        )));
    }

    let cipher = Aes128CbcEnc::new(key.into(), iv.into());
    Ok(cipher.encrypt_padded_vec_mut::<NoPadding>(plaintext))
}

/// Fill a buffer with cryptographically random bytes (IVs, padding filler).
pub fn fill_random(buf: &mut [u8]) {
    OsRng.fill_bytes(buf);
}

/// Generate a fresh random 16-byte IV.
pub fn random_iv() -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    fill_random(&mut iv);
    iv
}
