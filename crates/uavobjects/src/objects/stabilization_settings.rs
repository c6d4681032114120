// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use crate::error::Result;
use crate::field::{FieldSchema, FieldType};
use crate::metadata::{AccessMode, Metadata, UpdateMode};
use crate::schema::ObjectSchema;
use crate::value::FieldValue;

pub const STABILIZATION_SETTINGS_ID: u32 = 0x3D03_D5D2;

const AXES: [&str; 3] = ["Roll", "Pitch", "Yaw"];
const PID: [&str; 4] = ["Kp", "Ki", "Kd", "ILimit"];
const PI: [&str; 3] = ["Kp", "Ki", "ILimit"];

fn float_defaults(values: &[f32]) -> Vec<FieldValue> {
    values.iter().copied().map(FieldValue::Float32).collect()
}

fn pid(name: &str, defaults: [f32; 4]) -> FieldSchema {
    FieldSchema::new(name, FieldType::Float32, 0)
        .with_element_names(PID)
        .with_defaults(float_defaults(&defaults))
}

fn pi(name: &str, defaults: [f32; 3]) -> FieldSchema {
    FieldSchema::new(name, FieldType::Float32, 0)
        .with_element_names(PI)
        .with_defaults(float_defaults(&defaults))
}

/// Attitude and rate loop tuning.
///
/// Settings objects are only sent on request or change, and acked both ways.
pub fn stabilization_settings() -> Result<ObjectSchema> {
    ObjectSchema::builder(STABILIZATION_SETTINGS_ID, "StabilizationSettings")
        .description("PID settings used by the Stabilization module to combine the AttitudeActual and AttitudeDesired into actuator commands")
        .settings(true)
        .default_metadata(Metadata {
            flight_access: AccessMode::ReadWrite,
            gcs_access: AccessMode::ReadWrite,
            flight_telemetry_acked: true,
            gcs_telemetry_acked: true,
            flight_update_mode: UpdateMode::OnChange,
            gcs_update_mode: UpdateMode::OnChange,
            flight_update_period_ms: 0,
            gcs_update_period_ms: 0,
            logging_update_period_ms: 0,
        })
        .field(
            FieldSchema::new("ManualRate", FieldType::Float32, 0)
                .with_element_names(AXES)
                .with_units("degrees/sec")
                .with_defaults(float_defaults(&[150.0, 150.0, 175.0])),
        )
        .field(
            FieldSchema::new("MaximumRate", FieldType::Float32, 0)
                .with_element_names(AXES)
                .with_units("degrees/sec")
                .with_defaults(float_defaults(&[300.0, 300.0, 300.0])),
        )
        .field(
            FieldSchema::new("RollMax", FieldType::UInt8, 1)
                .with_units("degrees")
                .with_defaults([FieldValue::UInt8(55)]),
        )
        .field(
            FieldSchema::new("PitchMax", FieldType::UInt8, 1)
                .with_units("degrees")
                .with_defaults([FieldValue::UInt8(55)]),
        )
        .field(
            FieldSchema::new("YawMax", FieldType::UInt8, 1)
                .with_units("degrees")
                .with_defaults([FieldValue::UInt8(35)]),
        )
        .field(pid("RollRatePID", [0.0030, 0.0065, 0.000_033, 0.3]))
        .field(pid("PitchRatePID", [0.0030, 0.0065, 0.000_033, 0.3]))
        .field(pid("YawRatePID", [0.0062, 0.01, 0.0, 0.3]))
        .field(pi("RollPI", [2.5, 0.0, 50.0]))
        .field(pi("PitchPI", [2.5, 0.0, 50.0]))
        .field(pi("YawPI", [2.5, 0.0, 50.0]))
        .field(
            FieldSchema::new("VbarSensitivity", FieldType::Float32, 0)
                .with_element_names(AXES)
                .with_defaults(float_defaults(&[0.5, 0.5, 0.5])),
        )
        .field(
            FieldSchema::enumeration("LowThrottleZeroIntegral", 1, ["FALSE", "TRUE"])
                .with_defaults([FieldValue::Enum(1)]),
        )
        .build()
}
