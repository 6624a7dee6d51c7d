//! Structured message codec.
//!
//! The production system gets `RqHeader`, `CryptoInfo`, `Rq`, `RsHeader` and
//! `Rs` serializers from a separately maintained interface-description file.
//! That file isn't available here, so this module defines one concretely —
//! chosen so every fixed-size invariant below holds regardless of field
//! values, with no unexplained reserved bytes:
//!
//! - `RqHeader`: `partner_id: u32` + `crypto_info_length: u32` +
//!   `rq_length: u16`, little-endian, 10 bytes total.
//! - `CryptoInfo`: `iv: [u8; 16]` + `aes_padding_length_plus_one: u32`
//!   little-endian, 20 bytes total.
//! - `RsHeader`: `remaining_length: u32` little-endian, 4 bytes.
//! - `Rq`: a varint-prefixed AP count followed by one fixed-width record per
//!   AP scan.
//! - `Rs`: three little-endian `f64`s, 24 bytes, always.
//!
//! The varint encoding for `Rq`'s AP count reuses the teacher's
//! size-byte + little-endian-value scheme (1, 2, or 4 bytes, chosen by
//! magnitude).

use bytes::{Buf, BufMut};
use std::io::Cursor;

use crate::error::GatewayError;

/// Fixed serialized length of `RqHeader`.
pub const RQ_HEADER_LEN: usize = 10;

/// Fixed serialized length of `CryptoInfo`.
pub const CRYPTO_INFO_LEN: usize = 20;

/// Fixed serialized length of `RsHeader`.
pub const RS_HEADER_LEN: usize = 4;

/// Request header: identifies the partner and the lengths of the sections
/// that follow it on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RqHeader {
    pub partner_id: u32,
    pub crypto_info_length: u32,
    pub rq_length: u16,
}

impl RqHeader {
    /// Serialize to exactly [`RQ_HEADER_LEN`] bytes.
    pub fn to_bytes(&self) -> [u8; RQ_HEADER_LEN] {
        let mut buf = [0u8; RQ_HEADER_LEN];
        buf[0..4].copy_from_slice(&self.partner_id.to_le_bytes());
        buf[4..8].copy_from_slice(&self.crypto_info_length.to_le_bytes());
        buf[8..10].copy_from_slice(&self.rq_length.to_le_bytes());
        buf
    }

    /// Deserialize from a buffer that must be exactly [`RQ_HEADER_LEN`]
    /// bytes long.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, GatewayError> {
        if buf.len() != RQ_HEADER_LEN {
            return Err(GatewayError::MalformedFrame(format!(
                "RqHeader must be {RQ_HEADER_LEN} bytes, got {}",
                buf.len()
            )));
        }

        let partner_id = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        let crypto_info_length = u32::from_le_bytes(buf[4..8].try_into().unwrap());
        let rq_length = u16::from_le_bytes(buf[8..10].try_into().unwrap());

        Ok(Self {
            partner_id,
            crypto_info_length,
            rq_length,
        })
    }
}

/// The in-frame descriptor carrying the AES-CBC IV and out-of-band padding
/// length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CryptoInfo {
    pub iv: [u8; 16],
    /// Biased by +1 over the true padding length, so that zero padding is
    /// never encoded as zero. Always in `[1, 16]`.
    pub aes_padding_length_plus_one: u32,
}

impl CryptoInfo {
    /// Serialize to exactly [`CRYPTO_INFO_LEN`] bytes.
    pub fn to_bytes(&self) -> [u8; CRYPTO_INFO_LEN] {
        let mut buf = [0u8; CRYPTO_INFO_LEN];
        buf[0..16].copy_from_slice(&self.iv);
        buf[16..20].copy_from_slice(&self.aes_padding_length_plus_one.to_le_bytes());
        buf
    }

    /// Deserialize from a buffer that must be exactly [`CRYPTO_INFO_LEN`]
    /// bytes long. Validates `aes_padding_length_plus_one ∈ [1, 16]`.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, GatewayError> {
        if buf.len() != CRYPTO_INFO_LEN {
            return Err(GatewayError::MalformedFrame(format!(
                "CryptoInfo must be {CRYPTO_INFO_LEN} bytes, got {}",
                buf.len()
            )));
        }

        let mut iv = [0u8; 16];
        iv.copy_from_slice(&buf[0..16]);
        let aes_padding_length_plus_one = u32::from_le_bytes(buf[16..20].try_into().unwrap());

        if !(1..=16).contains(&aes_padding_length_plus_one) {
            return Err(GatewayError::MalformedFrame(format!(
                "aes_padding_length_plus_one out of range [1, 16]: {aes_padding_length_plus_one}"
            )));
        }

        Ok(Self {
            iv,
            aes_padding_length_plus_one,
        })
    }
}

/// One scanned access point: MAC address, signal strength, and optional
/// channel number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApScan {
    /// 48-bit hardware address.
    pub mac: u64,
    pub rssi: i32,
    pub channel_number: Option<u16>,
}

/// The geolocation request body: a parallel-array structure of AP scans.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rq {
    pub aps: Vec<ApScan>,
}

impl Rq {
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        write_varint(&mut buf, self.aps.len() as u32);

        for ap in &self.aps {
            // Lower 6 bytes of the 48-bit MAC, big-endian, matching
            // conventional MAC-address notation.
            let mac_bytes = ap.mac.to_be_bytes();
            buf.put_slice(&mac_bytes[2..8]);
            buf.put_i32_le(ap.rssi);

            match ap.channel_number {
                Some(channel) => {
                    buf.put_u8(1);
                    buf.put_u16_le(channel);
                }
                None => buf.put_u8(0),
            }
        }

        buf
    }

    pub fn deserialize(buf: &[u8]) -> Result<Self, GatewayError> {
        let mut cursor = Cursor::new(buf);
        let ap_count = read_varint(&mut cursor)
            .map_err(|e| GatewayError::MalformedMessage(format!("Rq ap count: {e}")))?;

        let mut aps = Vec::with_capacity(ap_count as usize);
        for _ in 0..ap_count {
            if cursor.remaining() < 6 + 4 + 1 {
                return Err(GatewayError::MalformedMessage(
                    "Rq buffer truncated mid-AP-scan".into(),
                ));
            }

            let mut mac_bytes = [0u8; 8];
            cursor.copy_to_slice(&mut mac_bytes[2..8]);
            let mac = u64::from_be_bytes(mac_bytes);

            let rssi = cursor.get_i32_le();

            let channel_number = match cursor.get_u8() {
                0 => None,
                1 => {
                    if cursor.remaining() < 2 {
                        return Err(GatewayError::MalformedMessage(
                            "Rq channel_number truncated".into(),
                        ));
                    }
                    Some(cursor.get_u16_le())
                }
                other => {
                    return Err(GatewayError::MalformedMessage(format!(
                        "invalid channel_number presence flag: {other}"
                    )));
                }
            };

            aps.push(ApScan {
                mac,
                rssi,
                channel_number,
            });
        }

        if cursor.has_remaining() {
            return Err(GatewayError::MalformedMessage(format!(
                "{} trailing bytes after Rq",
                cursor.remaining()
            )));
        }

        Ok(Self { aps })
    }
}

/// Response header: total length of the `CryptoInfo` + encrypted `Rs`
/// section that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RsHeader {
    pub remaining_length: u32,
}

impl RsHeader {
    pub fn to_bytes(&self) -> [u8; RS_HEADER_LEN] {
        self.remaining_length.to_le_bytes()
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self, GatewayError> {
        if buf.len() != RS_HEADER_LEN {
            return Err(GatewayError::MalformedFrame(format!(
                "RsHeader must be {RS_HEADER_LEN} bytes, got {}",
                buf.len()
            )));
        }

        Ok(Self {
            remaining_length: u32::from_le_bytes(buf.try_into().unwrap()),
        })
    }
}

/// The geolocation response body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rs {
    pub lat: f64,
    pub lon: f64,
    pub hpe: f64,
}

impl Rs {
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(24);
        buf.put_f64_le(self.lat);
        buf.put_f64_le(self.lon);
        buf.put_f64_le(self.hpe);
        buf
    }

    pub fn deserialize(buf: &[u8]) -> Result<Self, GatewayError> {
        if buf.len() != 24 {
            return Err(GatewayError::MalformedMessage(format!(
                "Rs must be 24 bytes, got {}",
                buf.len()
            )));
        }

        let mut cursor = Cursor::new(buf);
        let lat = cursor.get_f64_le();
        let lon = cursor.get_f64_le();
        let hpe = cursor.get_f64_le();

        Ok(Self { lat, lon, hpe })
    }
}

/// Write a variable-length integer: a 1-byte size marker (1, 2, or 4)
/// followed by the value in that many little-endian bytes.
pub fn write_varint(buf: &mut Vec<u8>, value: u32) {
    if value <= 0xFF {
        buf.put_u8(1);
        buf.put_u8(value as u8);
    } else if value <= 0xFFFF {
        buf.put_u8(2);
        buf.put_u16_le(value as u16);
    } else {
        buf.put_u8(4);
        buf.put_u32_le(value);
    }
}

/// Read a variable-length integer written by [`write_varint`].
pub fn read_varint(cursor: &mut Cursor<&[u8]>) -> Result<u32, GatewayError> {
    if !cursor.has_remaining() {
        return Err(GatewayError::MalformedMessage(
            "no data for varint size byte".into(),
        ));
    }

    match cursor.get_u8() {
        1 => {
            if !cursor.has_remaining() {
                return Err(GatewayError::MalformedMessage(
                    "truncated 1-byte varint".into(),
                ));
            }
            Ok(cursor.get_u8() as u32)
        }
        2 => {
            if cursor.remaining() < 2 {
                return Err(GatewayError::MalformedMessage(
                    "truncated 2-byte varint".into(),
                ));
            }
            Ok(cursor.get_u16_le() as u32)
        }
        4 => {
            if cursor.remaining() < 4 {
                return Err(GatewayError::MalformedMessage(
                    "truncated 4-byte varint".into(),
                ));
            }
            Ok(cursor.get_u32_le())
        }
        other => Err(GatewayError::MalformedMessage(format!(
            "invalid varint size byte: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rq_header_roundtrip() {
        let header = RqHeader {
            partner_id: 7,
            crypto_info_length: 20,
            rq_length: 42,
        };

        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), RQ_HEADER_LEN);

        let parsed = RqHeader::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn rq_header_rejects_wrong_length() {
        let err = RqHeader::from_bytes(&[0u8; 9]).unwrap_err();
        assert!(matches!(err, GatewayError::MalformedFrame(_)));
    }

    #[test]
    fn crypto_info_roundtrip() {
        let info = CryptoInfo {
            iv: [7u8; 16],
            aes_padding_length_plus_one: 5,
        };

        let bytes = info.to_bytes();
        assert_eq!(bytes.len(), CRYPTO_INFO_LEN);

        let parsed = CryptoInfo::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, info);
    }

    #[test]
    fn crypto_info_rejects_out_of_range_padding() {
        let mut bytes = [0u8; CRYPTO_INFO_LEN];
        bytes[16..20].copy_from_slice(&17u32.to_le_bytes());
        let err = CryptoInfo::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, GatewayError::MalformedFrame(_)));

        let mut bytes = [0u8; CRYPTO_INFO_LEN];
        bytes[16..20].copy_from_slice(&0u32.to_le_bytes());
        let err = CryptoInfo::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, GatewayError::MalformedFrame(_)));
    }

    #[test]
    fn rq_roundtrip_with_and_without_channel() {
        let rq = Rq {
            aps: vec![
                ApScan {
                    mac: 0x0011223344aa,
                    rssi: -55,
                    channel_number: None,
                },
                ApScan {
                    mac: 0x00aabbccdd11,
                    rssi: -70,
                    channel_number: Some(11),
                },
            ],
        };

        let bytes = rq.serialize();
        let parsed = Rq::deserialize(&bytes).unwrap();
        assert_eq!(parsed, rq);
    }

    #[test]
    fn rq_rejects_trailing_bytes() {
        let rq = Rq {
            aps: vec![ApScan {
                mac: 1,
                rssi: -1,
                channel_number: None,
            }],
        };
        let mut bytes = rq.serialize();
        bytes.push(0xFF);

        let err = Rq::deserialize(&bytes).unwrap_err();
        assert!(matches!(err, GatewayError::MalformedMessage(_)));
    }

    #[test]
    fn rs_roundtrip() {
        let rs = Rs {
            lat: 37.7749,
            lon: -122.4194,
            hpe: 15.0,
        };

        let bytes = rs.serialize();
        assert_eq!(bytes.len(), 24);

        let parsed = Rs::deserialize(&bytes).unwrap();
        assert_eq!(parsed.lat, rs.lat);
        assert_eq!(parsed.lon, rs.lon);
        assert_eq!(parsed.hpe, rs.hpe);
    }

    #[test]
    fn rs_header_roundtrip() {
        let header = RsHeader {
            remaining_length: 99,
        };
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), RS_HEADER_LEN);
        assert_eq!(RsHeader::from_bytes(&bytes).unwrap(), header);
    }

    #[test]
    fn varint_roundtrip() {
        for value in [0u32, 1, 127, 255, 256, 65535, 65536, 0xFFFFFFFF] {
            let mut buf = Vec::new();
            write_varint(&mut buf, value);

            let mut cursor = Cursor::new(buf.as_slice());
            assert_eq!(read_varint(&mut cursor).unwrap(), value);
        }
    }
}
