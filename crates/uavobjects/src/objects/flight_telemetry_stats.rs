// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::TELEMETRY_STATUS;
use crate::error::Result;
use crate::field::{FieldSchema, FieldType};
use crate::metadata::{AccessMode, Metadata, UpdateMode};
use crate::schema::ObjectSchema;

pub const FLIGHT_TELEMETRY_STATS_ID: u32 = 0x2F7E_2902;

/// Telemetry link statistics reported by the flight controller.
pub fn flight_telemetry_stats() -> Result<ObjectSchema> {
    ObjectSchema::builder(FLIGHT_TELEMETRY_STATS_ID, "FlightTelemetryStats")
        .description("Maintains the telemetry statistics from the OpenPilot flight computer.")
        .default_metadata(Metadata {
            flight_access: AccessMode::ReadWrite,
            gcs_access: AccessMode::ReadWrite,
            flight_telemetry_acked: true,
            gcs_telemetry_acked: true,
            flight_update_mode: UpdateMode::Periodic,
            gcs_update_mode: UpdateMode::Manual,
            flight_update_period_ms: 5000,
            gcs_update_period_ms: 0,
            logging_update_period_ms: 5000,
        })
        .field(FieldSchema::new("TxDataRate", FieldType::Float32, 1).with_units("bytes/sec"))
        .field(FieldSchema::new("RxDataRate", FieldType::Float32, 1).with_units("bytes/sec"))
        .field(FieldSchema::new("TxFailures", FieldType::UInt32, 1).with_units("count"))
        .field(FieldSchema::new("RxFailures", FieldType::UInt32, 1).with_units("count"))
        .field(FieldSchema::new("TxRetries", FieldType::UInt32, 1).with_units("count"))
        .field(FieldSchema::enumeration("Status", 1, TELEMETRY_STATUS))
        .build()
}
