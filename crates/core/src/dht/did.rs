#![warn(missing_docs)]

//! This module defines the identifier space of the ring.
//!
//! Node identifiers and keys both live in `[0, MOD)`, where `MOD` is the size of the
//! ring. `MOD` and the finger table size are ring-wide constants grouped in
//! [RingParams]; every participant must use identical values.
//!
//! All ordering decisions on the ring are made by [RingParams::is_between_clockwise].
//! A plain `<` between two [Did]s says nothing about ring order, since the ring
//! wraps around at `MOD`.

use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::consts::DEFAULT_FINGER_TABLE_SIZE;
use crate::consts::DEFAULT_MODULUS;
use crate::error::Error;
use crate::error::Result;

/// Did is a position on the ring, in `[0, MOD)` once checked by [RingParams::check].
#[derive(Copy, Clone, Eq, Ord, PartialEq, PartialOrd, Debug, Serialize, Deserialize, Hash)]
pub struct Did(u64);

impl std::fmt::Display for Did {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Did {
    fn from(id: u64) -> Did {
        Did(id)
    }
}

impl From<Did> for u64 {
    fn from(did: Did) -> u64 {
        did.0
    }
}

impl FromStr for Did {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u64>()
            .map(Did)
            .map_err(|e| Error::InvalidRingParams(format!("bad did {s:?}: {e}")))
    }
}

impl Did {
    /// Raw value of the did.
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Ring-wide constants. Must be identical across all participants.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize, Hash)]
pub struct RingParams {
    /// Size of the identifier space, `MOD`.
    pub modulus: u64,
    /// Number of finger table entries, `FINGER_TABLE_SIZE`.
    pub finger_table_size: u8,
}

impl Default for RingParams {
    fn default() -> Self {
        Self {
            modulus: DEFAULT_MODULUS,
            finger_table_size: DEFAULT_FINGER_TABLE_SIZE,
        }
    }
}

impl std::fmt::Display for RingParams {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "(mod={}, fingers={})",
            self.modulus, self.finger_table_size
        )
    }
}

impl RingParams {
    /// Build and validate params.
    pub fn new(modulus: u64, finger_table_size: u8) -> Result<Self> {
        let params = Self {
            modulus,
            finger_table_size,
        };
        params.validate()?;
        Ok(params)
    }

    /// Fail fast on a ring that cannot work: the modulus must hold at least two
    /// ids and the largest finger offset `2^(size-1)` must stay below the modulus.
    pub fn validate(&self) -> Result<()> {
        if self.modulus < 2 {
            return Err(Error::InvalidRingParams(format!(
                "modulus must be at least 2, got {}",
                self.modulus
            )));
        }
        if self.finger_table_size == 0 || self.finger_table_size > 64 {
            return Err(Error::InvalidRingParams(format!(
                "finger table size must be in [1, 64], got {}",
                self.finger_table_size
            )));
        }
        let largest_offset = 1u128 << (self.finger_table_size - 1);
        if largest_offset >= self.modulus as u128 {
            return Err(Error::InvalidRingParams(format!(
                "finger offset 2^{} does not fit in modulus {}",
                self.finger_table_size - 1,
                self.modulus
            )));
        }
        Ok(())
    }

    /// Check a did lies in `[0, MOD)`.
    pub fn check(&self, did: Did) -> Result<Did> {
        if did.0 >= self.modulus {
            return Err(Error::InvalidDid {
                did,
                modulus: self.modulus,
            });
        }
        Ok(did)
    }

    /// Reduce any value onto the ring.
    pub fn reduce(&self, value: u64) -> Did {
        Did(value % self.modulus)
    }

    /// Does `middle` lie strictly clockwise between `prev` and `next`?
    ///
    /// With `inclusive_endpoints`, any pairwise equality among the three also yields
    /// true. When `next <= prev` the arc wraps through zero. Note `prev == next`
    /// describes the full ring, so every other id lies between them.
    pub fn is_between_clockwise(
        &self,
        prev: Did,
        middle: Did,
        next: Did,
        inclusive_endpoints: bool,
    ) -> bool {
        let (prev, middle, next) = (
            prev.0 % self.modulus,
            middle.0 % self.modulus,
            next.0 % self.modulus,
        );
        if inclusive_endpoints && (prev == middle || prev == next || middle == next) {
            return true;
        }
        if prev < next {
            prev < middle && middle < next
        } else {
            middle > prev || middle < next
        }
    }

    /// Start of the `index`-th finger interval: `(did + 2^index) mod MOD`.
    pub fn finger_start(&self, did: Did, index: usize) -> Did {
        let offset = 1u128 << index;
        let start = (did.0 as u128 + offset) % self.modulus as u128;
        Did(start as u64)
    }
}
