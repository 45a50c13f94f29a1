//! Public keys and ed25519 keypairs in the formats Solana tooling produces.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use ed25519_dalek::{Signer, SigningKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::KeyError;

pub const PUBKEY_LEN: usize = 32;
pub const KEYPAIR_LEN: usize = 64;

/// A 32-byte account address, displayed as base58.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Pubkey([u8; PUBKEY_LEN]);

impl Pubkey {
    pub const fn new(bytes: [u8; PUBKEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(self) -> [u8; PUBKEY_LEN] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; PUBKEY_LEN] {
        &self.0
    }
}

impl TryFrom<&[u8]> for Pubkey {
    type Error = KeyError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; PUBKEY_LEN] = bytes.try_into().map_err(|_| KeyError::Length {
            expected: PUBKEY_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }
}

impl FromStr for Pubkey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| KeyError::Base58(e.to_string()))?;
        Self::try_from(bytes.as_slice())
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({self})")
    }
}

impl Serialize for Pubkey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Pubkey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// An ed25519 signing keypair.
#[derive(Clone)]
pub struct Keypair {
    signing: SigningKey,
}

impl Keypair {
    /// Build from the 64-byte `secret || public` layout Solana uses.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let arr: [u8; KEYPAIR_LEN] = bytes.try_into().map_err(|_| KeyError::Length {
            expected: KEYPAIR_LEN,
            actual: bytes.len(),
        })?;
        let signing = SigningKey::from_keypair_bytes(&arr).map_err(|_| KeyError::Mismatch)?;
        Ok(Self { signing })
    }

    /// Build from a 32-byte secret seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing: SigningKey::from_bytes(seed),
        }
    }

    /// Parse either a plain JSON byte array (Solana CLI) or the web export
    /// shape `{"_keypair": {"secretKey": {"0": n, "1": n, ...}}}`.
    pub fn from_json(json: &str) -> Result<Self, KeyError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| KeyError::Format(e.to_string()))?;
        let bytes = match &value {
            serde_json::Value::Array(items) => json_bytes(items.iter())?,
            serde_json::Value::Object(_) => {
                let secret = value
                    .pointer("/_keypair/secretKey")
                    .or_else(|| value.get("secretKey"))
                    .ok_or_else(|| KeyError::Format("missing secretKey".into()))?;
                match secret {
                    serde_json::Value::Array(items) => json_bytes(items.iter())?,
                    serde_json::Value::Object(map) => {
                        let mut indexed = map
                            .iter()
                            .map(|(k, v)| {
                                k.parse::<usize>()
                                    .map(|i| (i, v))
                                    .map_err(|_| KeyError::Format(format!("bad index {k:?}")))
                            })
                            .collect::<Result<Vec<_>, _>>()?;
                        indexed.sort_by_key(|(i, _)| *i);
                        json_bytes(indexed.into_iter().map(|(_, v)| v))?
                    }
                    _ => return Err(KeyError::Format("secretKey is not a byte list".into())),
                }
            }
            _ => return Err(KeyError::Format("expected array or object".into())),
        };
        Self::from_bytes(&bytes)
    }

    pub fn read_file(path: &Path) -> Result<Self, KeyError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| KeyError::Io(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    pub fn pubkey(&self) -> Pubkey {
        Pubkey(self.signing.verifying_key().to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing.sign(message).to_bytes()
    }

    pub fn to_bytes(&self) -> [u8; KEYPAIR_LEN] {
        self.signing.to_keypair_bytes()
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("pubkey", &self.pubkey())
            .finish_non_exhaustive()
    }
}

fn json_bytes<'a>(items: impl Iterator<Item = &'a serde_json::Value>) -> Result<Vec<u8>, KeyError> {
    items
        .map(|v| {
            v.as_u64()
                .and_then(|n| u8::try_from(n).ok())
                .ok_or_else(|| KeyError::Format(format!("not a byte: {v}")))
        })
        .collect()
}
