//! `serde(with = "...")` helpers that render fixed/variable byte buffers as
//! `0x`-prefixed hex strings over the wire (`spec.md` §6: "hex-encoded byte
//! strings"), mirroring the hex (de)serialization the id newtypes in
//! `ids.rs` already do by hand.

use serde::{Deserialize, Deserializer, Serializer};

/// For `[u8; N]` fields.
pub mod fixed {
    use super::*;

    pub fn serialize<S, const N: usize>(bytes: &[u8; N], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D, const N: usize>(deserializer: D) -> Result<[u8; N], D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        let trimmed = raw.strip_prefix("0x").unwrap_or(&raw);
        let bytes = hex::decode(trimmed).map_err(serde::de::Error::custom)?;
        let len = bytes.len();
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom(format!("expected {N} bytes, got {len}")))
    }
}

/// For `Vec<u8>` fields (e.g. raw proof bytes).
pub mod vec {
    use super::*;

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        let trimmed = raw.strip_prefix("0x").unwrap_or(&raw);
        hex::decode(trimmed).map_err(serde::de::Error::custom)
    }
}

/// For `Vec<[u8; N]>` fields (e.g. Merkle sibling paths).
pub mod fixed_vec {
    use super::*;

    pub fn serialize<S, const N: usize>(
        items: &[[u8; N]],
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeSeq;
        let mut seq = serializer.serialize_seq(Some(items.len()))?;
        for item in items {
            seq.serialize_element(&format!("0x{}", hex::encode(item)))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D, const N: usize>(deserializer: D) -> Result<Vec<[u8; N]>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Vec<String> = Vec::deserialize(deserializer)?;
        raw.into_iter()
            .map(|s| {
                let trimmed = s.strip_prefix("0x").unwrap_or(&s).to_string();
                let bytes = hex::decode(&trimmed).map_err(serde::de::Error::custom)?;
                let len = bytes.len();
                bytes
                    .try_into()
                    .map_err(|_| serde::de::Error::custom(format!("expected {N} bytes, got {len}")))
            })
            .collect()
    }
}

/// For `Option<Vec<u8>>` fields (e.g. a worker's not-yet-submitted
/// artifact): `None` over the wire is simply the field's absence
/// (pair with `#[serde(default, skip_serializing_if = "Option::is_none")]`).
pub mod option_vec {
    use super::*;

    pub fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(bytes) => serializer.serialize_str(&format!("0x{}", hex::encode(bytes))),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| {
            let trimmed = s.strip_prefix("0x").unwrap_or(&s);
            hex::decode(trimmed).map_err(serde::de::Error::custom)
        })
        .transpose()
    }
}

/// For `u64` BigInt-valued fields (`spec.md` §6: "BigInt values as decimal
/// strings"). Unlike byte buffers, these are numeric weights/counts, not
/// opaque data, so they render as plain decimal — not hex.
pub mod decimal {
    use super::*;

    pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
