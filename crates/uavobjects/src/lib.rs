// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! UAV Object Codec
//!
//! Schema-driven binary codec for the telemetry objects exchanged between a
//! flight controller and a ground station.
//!
//! # Features
//!
//! - **ObjectSchema**: Runtime object layout (typed fields, fixed byte offsets)
//! - **ObjectInstance**: Lock-protected payload with field access and pack/unpack
//! - **Metadata**: Bit-packed transport policy and its 16-byte wire form
//! - **ObjectRegistry**: Keyed store with singleton lookup and update subscriptions
//! - **Schema files**: TOML object tables (feature `schema-files`)
//! - **Snapshots**: JSON settings backup (feature `snapshots`)
//!
//! # Wire Format
//!
//! A data payload is exactly `total_bytes` long: fields in declaration
//! order, elements little-endian, no padding. Enum elements are stored as
//! an index into the field's label set, in the fewest whole bytes able to
//! hold it. The metadata object of id `N` travels under id `N | 1`.
//!
//! # Example
//!
//! ```rust
//! use uavobjects::{FieldType, ObjectRegistry, ObjectSchema};
//!
//! let registry = ObjectRegistry::default();
//! let schema = ObjectSchema::builder(0x2F7E_2902, "FlightTelemetryStats")
//!     .scalar("TxDataRate", FieldType::Float32)
//!     .scalar("RxDataRate", FieldType::Float32)
//!     .scalar("TxFailures", FieldType::UInt32)
//!     .scalar("RxFailures", FieldType::UInt32)
//!     .scalar("TxRetries", FieldType::UInt32)
//!     .enumeration("Status", ["Disconnected", "HandshakeReq", "HandshakeAck", "Connected"])
//!     .build()
//!     .unwrap();
//! assert_eq!(schema.total_bytes(), 21);
//! registry.register(schema).unwrap();
//!
//! // Inbound bytes from the link
//! let mut payload = vec![0u8; 21];
//! payload[20] = 3;
//! registry.unpack_object(0x2F7E_2902, 0, &payload).unwrap();
//!
//! let stats = registry.get_singleton("FlightTelemetryStats").unwrap();
//! assert_eq!(stats.enum_label("Status", 0).unwrap(), "Connected");
//! ```

pub mod error;
pub mod field;
#[cfg(feature = "schema-files")]
pub mod loader;
pub mod metadata;
pub mod objects;
pub mod registry;
pub mod schema;
#[cfg(feature = "snapshots")]
pub mod snapshot;
pub mod value;

mod instance;

pub use error::{Error, Result};
pub use field::{enum_width, FieldSchema, FieldType};
pub use instance::{FieldsMut, FieldsRef, ObjectInstance, ObjectKey};
#[cfg(feature = "schema-files")]
pub use loader::SchemaFile;
pub use metadata::{AccessMode, Metadata, UpdateMode};
pub use registry::{
    EventKind, ObjectEvent, ObjectRegistry, RegistryConfig, Subscription, SubscriptionId,
};
pub use schema::{FieldLayout, ObjectSchema, ObjectSchemaBuilder};
#[cfg(feature = "snapshots")]
pub use snapshot::{FieldSnapshot, InstanceSnapshot};
pub use value::{FieldValue, FromFieldValue};
