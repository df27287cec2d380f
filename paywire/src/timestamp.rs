//! Seconds since the Unix epoch.
//!
//! Used for EIP-3009 `validAfter`/`validBefore`, for windows a server
//! advertises in its requirements, and for stamping cached decimals.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Add;
use std::time::SystemTime;

/// Whole seconds since 1970-01-01T00:00:00Z.
///
/// Written to JSON as a decimal string, since 64-bit integers do not survive a
/// JavaScript `Number`. Read from either a string or a bare number.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Ord, Eq, Hash)]
pub struct UnixTimestamp(u64);

impl UnixTimestamp {
    /// Wraps a raw seconds value.
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// The wall clock now. A clock set before the epoch reads as zero.
    #[must_use]
    pub fn now() -> Self {
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_or(Self(0), |elapsed| Self(elapsed.as_secs()))
    }

    /// Raw seconds.
    #[must_use]
    pub const fn as_secs(&self) -> u64 {
        self.0
    }

    /// Subtracts seconds, clamping at the epoch.
    #[must_use]
    pub const fn saturating_sub(self, secs: u64) -> Self {
        Self(self.0.saturating_sub(secs))
    }
}

impl Add<u64> for UnixTimestamp {
    type Output = Self;

    fn add(self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }
}

impl fmt::Display for UnixTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Serialize for UnixTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for UnixTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Number(u64),
            Text(String),
        }
        match Wire::deserialize(deserializer)? {
            Wire::Number(secs) => Ok(Self(secs)),
            Wire::Text(text) => text
                .trim()
                .parse()
                .map(Self)
                .map_err(|_| serde::de::Error::custom("timestamp must be a non-negative integer")),
        }
    }
}
