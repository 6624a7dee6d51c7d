//! The partner key directory.
//!
//! Loads `partner_keys.yaml`, a mapping of partner id to its AES key and
//! upstream API key, into an in-memory lookup table the connection handler
//! consults once per request.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::GatewayError;

/// One partner's credentials: its AES-128 key (hex-encoded in the YAML file)
/// and the API key it presents to the upstream location service.
#[derive(Debug, Clone)]
pub struct PartnerEntry {
    pub aes_key: [u8; 16],
    pub api_key: String,
}

/// Raw shape of a single entry in `partner_keys.yaml`, before the hex `aes`
/// field is decoded into a fixed-size key. The file nests credentials under
/// a `keys` map, matching `partner_keys[id]['keys']['aes'|'api']` upstream.
#[derive(Debug, Deserialize)]
struct RawPartnerEntry {
    keys: RawPartnerCredentials,
}

#[derive(Debug, Deserialize)]
struct RawPartnerCredentials {
    aes: String,
    api: String,
}

/// Raw shape of the whole file: `partner_id -> entry`.
#[derive(Debug, Deserialize)]
struct RawPartnerKeys {
    #[serde(flatten)]
    partners: HashMap<String, RawPartnerEntry>,
}

/// The partner directory: `partner_id -> credentials`.
#[derive(Debug, Clone, Default)]
pub struct PartnerKeys {
    partners: HashMap<u32, PartnerEntry>,
}

impl PartnerKeys {
    /// Load and validate `partner_keys.yaml` from `path`.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, GatewayError> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .build()
            .map_err(|e| {
                GatewayError::MalformedMessage(format!(
                    "failed to load partner key file {}: {e}",
                    path.display()
                ))
            })?;

        let raw: RawPartnerKeys = settings.try_deserialize().map_err(|e| {
            GatewayError::MalformedMessage(format!(
                "failed to parse partner key file {}: {e}",
                path.display()
            ))
        })?;

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawPartnerKeys) -> Result<Self, GatewayError> {
        let mut partners = HashMap::with_capacity(raw.partners.len());

        for (id_str, entry) in raw.partners {
            let partner_id: u32 = id_str.parse().map_err(|_| {
                GatewayError::MalformedMessage(format!("invalid partner id key: {id_str}"))
            })?;

            let key_bytes = hex::decode(&entry.keys.aes).map_err(|e| {
                GatewayError::MalformedMessage(format!(
                    "partner {partner_id} has non-hex aes key: {e}"
                ))
            })?;

            if key_bytes.len() != 16 {
                return Err(GatewayError::MalformedMessage(format!(
                    "partner {partner_id} aes key must decode to 16 bytes, got {}",
                    key_bytes.len()
                )));
            }

            let mut aes_key = [0u8; 16];
            aes_key.copy_from_slice(&key_bytes);

            partners.insert(
                partner_id,
                PartnerEntry {
                    aes_key,
                    api_key: entry.keys.api,
                },
            );
        }

        Ok(Self { partners })
    }

    /// Look up a partner's credentials, or `UnknownPartner` if absent.
    pub fn get(&self, partner_id: u32) -> Result<&PartnerEntry, GatewayError> {
        self.partners
            .get(&partner_id)
            .ok_or(GatewayError::UnknownPartner(partner_id))
    }

    /// Number of partners in the directory.
    pub fn len(&self) -> usize {
        self.partners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partners.is_empty()
    }
}
