// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Built-in object definitions.
//!
//! Each constructor returns the schema exactly as the ground station and the
//! flight side agree on it: object id, field order, units, enum labels,
//! defaults and default metadata.

mod flight_telemetry_stats;
mod gcs_telemetry_stats;
mod stabilization_settings;

pub use flight_telemetry_stats::{flight_telemetry_stats, FLIGHT_TELEMETRY_STATS_ID};
pub use gcs_telemetry_stats::{gcs_telemetry_stats, GCS_TELEMETRY_STATS_ID};
pub use stabilization_settings::{stabilization_settings, STABILIZATION_SETTINGS_ID};

use crate::error::Result;
use crate::registry::ObjectRegistry;

/// Link states shared by both telemetry statistics objects.
pub const TELEMETRY_STATUS: [&str; 4] =
    ["Disconnected", "HandshakeReq", "HandshakeAck", "Connected"];

/// Register every built-in object.
pub fn register_builtin(registry: &ObjectRegistry) -> Result<()> {
    registry.register(flight_telemetry_stats()?)?;
    registry.register(gcs_telemetry_stats()?)?;
    registry.register(stabilization_settings()?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_builtin() {
        let registry = ObjectRegistry::default();
        register_builtin(&registry).unwrap();
        assert_eq!(registry.schemas().len(), 3);
        for name in [
            "FlightTelemetryStats",
            "GCSTelemetryStats",
            "StabilizationSettings",
        ] {
            assert!(registry.get_singleton(name).is_some(), "{} missing", name);
        }
        assert!(register_builtin(&registry).is_err());
    }
}
