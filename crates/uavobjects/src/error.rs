// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error taxonomy for the object codec and registry.
//!
//! Every condition here is local and recoverable: callers get an explicit
//! `Err` and the instance involved is left unchanged.

use thiserror::Error;

/// Codec and registry errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Element index outside `[0, element_count)`.
    #[error("element index out of range: {field}[{index}] (count {count})")]
    OutOfRange {
        field: String,
        index: usize,
        count: usize,
    },

    /// Enum write (or typed enum read) with an index that has no label.
    #[error("invalid enum value for {field}: {value} (labels {label_count})")]
    InvalidEnumValue {
        field: String,
        value: u32,
        label_count: usize,
    },

    /// Payload length differs from the schema size.
    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// Field name lookup miss.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// No schema registered under this id or name.
    #[error("unknown schema: {0}")]
    UnknownSchema(String),

    /// Schema is known but the instance is not (or cannot exist).
    #[error("unknown instance {instance_id} of schema 0x{schema_id:08X}")]
    UnknownInstance { schema_id: u32, instance_id: u32 },

    /// Instance id already taken.
    #[error("instance {instance_id} of schema 0x{schema_id:08X} already exists")]
    DuplicateInstance { schema_id: u32, instance_id: u32 },

    /// A schema with the same id or name is already registered.
    #[error("schema already registered: {0}")]
    DuplicateSchema(String),

    /// Schema definition rejected by the builder.
    #[error("invalid schema {object}: {reason}")]
    InvalidSchema { object: String, reason: String },

    /// Value cannot be stored in the target field (type or label mismatch).
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "schema-files")]
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[cfg(feature = "snapshots")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid_schema(object: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSchema {
            object: object.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_value(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
