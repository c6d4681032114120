// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-instance transport policy and its bit-packed wire form.
//!
//! The flags word packs six sub-fields at fixed positions described by
//! [`FLAG_LAYOUT`]. One generic insert/extract pair walks that table, so the
//! encoder and decoder cannot disagree on a shift.
//!
//! ```text
//!  31                      8   7  6   5  4   3   2   1   0
//! +-------------------------+------+------+---+---+---+---+
//! |        reserved (0)     | GCS  | FLT  |GAK|FAK|GAC|FAC|
//! |                         | mode | mode |   |   |   |   |
//! +-------------------------+------+------+---+---+---+---+
//! ```
//!
//! Metadata travels on its own channel: the object id with
//! [`METADATA_ID_MARKER`] set, carrying the flags word and three periods
//! (4 bytes each, little-endian).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Marker bit distinguishing a metadata object id from its data object id.
pub const METADATA_ID_MARKER: u32 = 0x0000_0001;

/// Metadata object id for a data object id.
pub const fn metadata_object_id(object_id: u32) -> u32 {
    object_id | METADATA_ID_MARKER
}

/// True if `object_id` addresses a metadata object.
pub const fn is_metadata_id(object_id: u32) -> bool {
    object_id & METADATA_ID_MARKER != 0
}

/// Data object id for a (metadata or data) object id.
pub const fn data_object_id(object_id: u32) -> u32 {
    object_id & !METADATA_ID_MARKER
}

/// Whether a channel may write an instance's fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

/// When telemetry updates are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    Manual,
    Periodic,
    OnChange,
    Throttled,
}

/// Mapping between a symbolic sub-field value and its bit pattern.
pub trait FlagValue: Sized {
    fn to_bits(self) -> u32;
    /// `bits` is already masked to the sub-field width.
    fn from_bits(bits: u32) -> Self;
}

impl FlagValue for bool {
    fn to_bits(self) -> u32 {
        u32::from(self)
    }

    fn from_bits(bits: u32) -> Self {
        bits != 0
    }
}

impl FlagValue for AccessMode {
    fn to_bits(self) -> u32 {
        match self {
            Self::ReadOnly => 0,
            Self::ReadWrite => 1,
        }
    }

    fn from_bits(bits: u32) -> Self {
        if bits == 0 {
            Self::ReadOnly
        } else {
            Self::ReadWrite
        }
    }
}

impl FlagValue for UpdateMode {
    fn to_bits(self) -> u32 {
        match self {
            Self::Manual => 0,
            Self::Periodic => 1,
            Self::OnChange => 2,
            Self::Throttled => 3,
        }
    }

    fn from_bits(bits: u32) -> Self {
        match bits {
            0 => Self::Manual,
            1 => Self::Periodic,
            2 => Self::OnChange,
            _ => Self::Throttled,
        }
    }
}

/// Position of one sub-field inside the flags word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagField {
    pub name: &'static str,
    pub shift: u32,
    pub width: u32,
}

impl FlagField {
    pub const fn mask(&self) -> u32 {
        ((1u32 << self.width) - 1) << self.shift
    }

    /// Store `value` into `word`, replacing whatever the sub-field held.
    pub fn insert<T: FlagValue>(&self, word: u32, value: T) -> u32 {
        let bits = value.to_bits();
        debug_assert!(
            bits >> self.width == 0,
            "{} value {} exceeds {} bit(s)",
            self.name,
            bits,
            self.width
        );
        (word & !self.mask()) | ((bits << self.shift) & self.mask())
    }

    /// Read the sub-field out of `word`.
    pub fn extract<T: FlagValue>(&self, word: u32) -> T {
        T::from_bits((word & self.mask()) >> self.shift)
    }
}

pub const FLIGHT_ACCESS: FlagField = FlagField {
    name: "flight_access",
    shift: 0,
    width: 1,
};
pub const GCS_ACCESS: FlagField = FlagField {
    name: "gcs_access",
    shift: 1,
    width: 1,
};
pub const FLIGHT_TELEMETRY_ACKED: FlagField = FlagField {
    name: "flight_telemetry_acked",
    shift: 2,
    width: 1,
};
pub const GCS_TELEMETRY_ACKED: FlagField = FlagField {
    name: "gcs_telemetry_acked",
    shift: 3,
    width: 1,
};
pub const FLIGHT_UPDATE_MODE: FlagField = FlagField {
    name: "flight_update_mode",
    shift: 4,
    width: 2,
};
pub const GCS_UPDATE_MODE: FlagField = FlagField {
    name: "gcs_update_mode",
    shift: 6,
    width: 2,
};

/// Every sub-field of the flags word, in bit order.
pub const FLAG_LAYOUT: [FlagField; 6] = [
    FLIGHT_ACCESS,
    GCS_ACCESS,
    FLIGHT_TELEMETRY_ACKED,
    GCS_TELEMETRY_ACKED,
    FLIGHT_UPDATE_MODE,
    GCS_UPDATE_MODE,
];

/// Union of all defined flag bits.
pub const FLAGS_MASK: u32 = {
    let mut mask = 0;
    let mut i = 0;
    while i < FLAG_LAYOUT.len() {
        mask |= FLAG_LAYOUT[i].mask();
        i += 1;
    }
    mask
};

/// Transport policy of one object instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub flight_access: AccessMode,
    pub gcs_access: AccessMode,
    pub flight_telemetry_acked: bool,
    pub gcs_telemetry_acked: bool,
    pub flight_update_mode: UpdateMode,
    pub gcs_update_mode: UpdateMode,
    /// Milliseconds; 0 means no periodic updates.
    pub flight_update_period_ms: u32,
    pub gcs_update_period_ms: u32,
    pub logging_update_period_ms: u32,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            flight_access: AccessMode::ReadWrite,
            gcs_access: AccessMode::ReadWrite,
            flight_telemetry_acked: false,
            gcs_telemetry_acked: false,
            flight_update_mode: UpdateMode::Manual,
            gcs_update_mode: UpdateMode::Manual,
            flight_update_period_ms: 0,
            gcs_update_period_ms: 0,
            logging_update_period_ms: 0,
        }
    }
}

impl Metadata {
    /// Wire size: flags word plus three periods.
    pub const SIZE: usize = 16;

    /// Encode the six sub-fields into the flags word.
    pub fn flags(&self) -> u32 {
        let mut word = 0;
        word = FLIGHT_ACCESS.insert(word, self.flight_access);
        word = GCS_ACCESS.insert(word, self.gcs_access);
        word = FLIGHT_TELEMETRY_ACKED.insert(word, self.flight_telemetry_acked);
        word = GCS_TELEMETRY_ACKED.insert(word, self.gcs_telemetry_acked);
        word = FLIGHT_UPDATE_MODE.insert(word, self.flight_update_mode);
        GCS_UPDATE_MODE.insert(word, self.gcs_update_mode)
    }

    /// Decode a flags word plus periods. Bits outside [`FLAGS_MASK`] are dropped.
    pub fn from_flags(
        flags: u32,
        flight_update_period_ms: u32,
        gcs_update_period_ms: u32,
        logging_update_period_ms: u32,
    ) -> Self {
        if flags & !FLAGS_MASK != 0 {
            log::debug!(
                "[metadata] ignoring reserved flag bits 0x{:08X}",
                flags & !FLAGS_MASK
            );
        }
        Self {
            flight_access: FLIGHT_ACCESS.extract(flags),
            gcs_access: GCS_ACCESS.extract(flags),
            flight_telemetry_acked: FLIGHT_TELEMETRY_ACKED.extract(flags),
            gcs_telemetry_acked: GCS_TELEMETRY_ACKED.extract(flags),
            flight_update_mode: FLIGHT_UPDATE_MODE.extract(flags),
            gcs_update_mode: GCS_UPDATE_MODE.extract(flags),
            flight_update_period_ms,
            gcs_update_period_ms,
            logging_update_period_ms,
        }
    }

    /// Serialize to the metadata channel payload.
    pub fn pack(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        let words = [
            self.flags(),
            self.flight_update_period_ms,
            self.gcs_update_period_ms,
            self.logging_update_period_ms,
        ];
        for (chunk, word) in out.chunks_exact_mut(4).zip(words) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        out
    }

    /// Parse a metadata channel payload.
    pub fn unpack(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::SIZE {
            return Err(Error::SizeMismatch {
                expected: Self::SIZE,
                actual: bytes.len(),
            });
        }
        let mut words = [0u32; 4];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Ok(Self::from_flags(words[0], words[1], words[2], words[3]))
    }
}
