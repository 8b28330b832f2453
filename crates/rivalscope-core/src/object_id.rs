//! Time-ordered 12-byte record identifiers.
//!
//! Layout: 4-byte big-endian seconds since the epoch, 5 bytes of per-process
//! randomness, 3-byte big-endian counter. Byte order, and therefore the
//! lowercase hex form, sorts by creation time.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

static PROCESS_UNIQUE: Lazy<[u8; 5]> = Lazy::new(rand::random::<[u8; 5]>);
static COUNTER: Lazy<AtomicU32> = Lazy::new(|| AtomicU32::new(rand::random::<u32>() & 0x00ff_ffff));

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Generate a fresh identifier stamped with the current time.
    pub fn new() -> Self {
        let secs = Utc::now().timestamp().clamp(0, u32::MAX as i64) as u32;
        let count = COUNTER.fetch_add(1, Ordering::Relaxed) & 0x00ff_ffff;

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&*PROCESS_UNIQUE);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);
        Self(bytes)
    }

    /// Smallest identifier carrying the given timestamp (all other bytes zero).
    pub fn from_timestamp(secs: u32) -> Self {
        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        Self(bytes)
    }

    /// Smallest identifier for an instant; instants before the epoch clamp to 0.
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self::from_timestamp(at.timestamp().clamp(0, u32::MAX as i64) as u32)
    }

    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> [u8; 12] {
        self.0
    }

    /// Embedded creation time in whole seconds.
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.timestamp() as i64, 0)
            .single()
            .unwrap_or_default()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn parse_str(s: &str) -> Result<Self> {
        if s.len() != 24 {
            return Err(Error::InvalidId(s.to_string()));
        }
        let decoded = hex::decode(s).map_err(|_| Error::InvalidId(s.to_string()))?;
        let mut bytes = [0u8; 12];
        bytes.copy_from_slice(&decoded);
        Ok(Self(bytes))
    }

    pub fn is_valid(s: &str) -> bool {
        Self::parse_str(s).is_ok()
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_str(s)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Accepts both the plain hex form and extended JSON (`{"$oid": "..."}`).
impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Hex(String),
            Extended {
                #[serde(rename = "$oid")]
                oid: String,
            },
        }

        let raw = match Repr::deserialize(deserializer)? {
            Repr::Hex(s) => s,
            Repr::Extended { oid } => oid,
        };
        Self::parse_str(&raw).map_err(serde::de::Error::custom)
    }
}
