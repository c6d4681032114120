// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::TELEMETRY_STATUS;
use crate::error::Result;
use crate::field::{FieldSchema, FieldType};
use crate::metadata::{AccessMode, Metadata, UpdateMode};
use crate::schema::ObjectSchema;

pub const GCS_TELEMETRY_STATS_ID: u32 = 0xCAD1_DC0A;

/// Telemetry link statistics kept by the ground station; mirror of
/// [`flight_telemetry_stats`](super::flight_telemetry_stats) with the
/// update roles swapped.
pub fn gcs_telemetry_stats() -> Result<ObjectSchema> {
    ObjectSchema::builder(GCS_TELEMETRY_STATS_ID, "GCSTelemetryStats")
        .description("The telemetry statistics from the ground computer")
        .default_metadata(Metadata {
            flight_access: AccessMode::ReadWrite,
            gcs_access: AccessMode::ReadWrite,
            flight_telemetry_acked: true,
            gcs_telemetry_acked: true,
            flight_update_mode: UpdateMode::Manual,
            gcs_update_mode: UpdateMode::Periodic,
            flight_update_period_ms: 0,
            gcs_update_period_ms: 5000,
            logging_update_period_ms: 0,
        })
        .field(FieldSchema::new("TxDataRate", FieldType::Float32, 1).with_units("bytes/sec"))
        .field(FieldSchema::new("RxDataRate", FieldType::Float32, 1).with_units("bytes/sec"))
        .field(FieldSchema::new("TxFailures", FieldType::UInt32, 1).with_units("count"))
        .field(FieldSchema::new("RxFailures", FieldType::UInt32, 1).with_units("count"))
        .field(FieldSchema::new("TxRetries", FieldType::UInt32, 1).with_units("count"))
        .field(FieldSchema::enumeration("Status", 1, TELEMETRY_STATUS))
        .build()
}
