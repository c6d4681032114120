// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! JSON export/import of instance values, used for settings backups.
//!
//! Enum elements are written as labels so a backup stays readable and
//! survives label reordering; numeric elements are plain JSON numbers.
//! Non-finite floats have no JSON number form and are written as the
//! strings `"NaN"`, `"inf"` and `"-inf"`.

use crate::error::{Error, Result};
use crate::field::{FieldSchema, FieldType};
use crate::instance::ObjectInstance;
use crate::value::FieldValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Values of one instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceSnapshot {
    pub object: String,
    pub object_id: u32,
    pub instance_id: u32,
    pub fields: Vec<FieldSnapshot>,
}

/// Values of one field, one entry per element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSnapshot {
    pub name: String,
    pub values: Vec<Value>,
}

impl InstanceSnapshot {
    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a snapshot.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Get field values by name.
    pub fn field(&self, name: &str) -> Option<&FieldSnapshot> {
        self.fields.iter().find(|f| f.name == name)
    }
}

fn to_json_value(field: &FieldSchema, value: FieldValue) -> Value {
    match value {
        FieldValue::Enum(v) => match field.enum_label(v) {
            Some(label) => Value::from(label),
            None => Value::from(v),
        },
        FieldValue::Float32(v) if v.is_nan() => Value::from("NaN"),
        FieldValue::Float32(v) if v.is_infinite() => {
            Value::from(if v > 0.0 { "inf" } else { "-inf" })
        }
        FieldValue::Float32(v) => Value::from(f64::from(v)),
        other => Value::from(other.as_i64()),
    }
}

fn from_json_value(field: &FieldSchema, value: &Value) -> Result<FieldValue> {
    let bad = || Error::invalid_value(field.name(), format!("cannot store {}", value));
    match (field.field_type(), value) {
        (FieldType::Enum, Value::String(label)) => field
            .enum_index(label)
            .map(FieldValue::Enum)
            .ok_or_else(|| Error::invalid_value(field.name(), format!("no enum label {:?}", label))),
        (FieldType::Float32, Value::String(s)) => match s.as_str() {
            "NaN" => Ok(FieldValue::Float32(f32::NAN)),
            "inf" => Ok(FieldValue::Float32(f32::INFINITY)),
            "-inf" => Ok(FieldValue::Float32(f32::NEG_INFINITY)),
            _ => Err(bad()),
        },
        (FieldType::Float32, Value::Number(n)) => {
            n.as_f64().map(|v| FieldValue::Float32(v as f32)).ok_or_else(bad)
        }
        (field_type, Value::Number(n)) => n
            .as_i64()
            .and_then(|v| FieldValue::from_integer(field_type, v))
            .ok_or_else(bad),
        _ => Err(bad()),
    }
}

impl ObjectInstance {
    /// Capture every field's current values.
    ///
    /// Enum bytes without a label are exported as their raw index.
    pub fn snapshot(&self) -> InstanceSnapshot {
        let schema = self.schema();
        let data = self.pack();
        let fields = schema
            .fields()
            .iter()
            .map(|layout| {
                let field = layout.field();
                let slice = &data[layout.range()];
                let values = (0..field.element_count())
                    .filter_map(|i| field.read_raw(slice, i).ok())
                    .map(|v| to_json_value(field, v))
                    .collect();
                FieldSnapshot {
                    name: field.name().to_string(),
                    values,
                }
            })
            .collect();
        InstanceSnapshot {
            object: schema.name().to_string(),
            object_id: schema.id(),
            instance_id: self.instance_id(),
            fields,
        }
    }

    /// Apply a snapshot as one batch; nothing is written if any value is rejected.
    ///
    /// Fields missing from the snapshot keep their current values.
    pub fn apply_snapshot(&self, snapshot: &InstanceSnapshot) -> Result<()> {
        if snapshot.object != self.name() {
            return Err(Error::UnknownSchema(format!(
                "snapshot of {} applied to {}",
                snapshot.object,
                self.name()
            )));
        }
        let schema = self.schema().clone();
        self.update(|fields| {
            for entry in &snapshot.fields {
                let layout = schema
                    .field(&entry.name)
                    .ok_or_else(|| Error::UnknownField(entry.name.clone()))?;
                let field = layout.field();
                if entry.values.len() != field.element_count() {
                    return Err(Error::OutOfRange {
                        field: entry.name.clone(),
                        index: entry.values.len(),
                        count: field.element_count(),
                    });
                }
                for (i, value) in entry.values.iter().enumerate() {
                    fields.set(&entry.name, i, from_json_value(field, value)?)?;
                }
            }
            Ok(())
        })?;
        log::debug!(
            "[snapshot] applied {} field(s) to {} inst {}",
            snapshot.fields.len(),
            self.name(),
            self.instance_id()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ObjectSchema;
    use std::sync::Arc;

    fn settings() -> Arc<ObjectSchema> {
        Arc::new(
            ObjectSchema::builder(0x40, "AltitudeHoldSettings")
                .settings(true)
                .named_array("Gains", FieldType::Float32, ["Kp", "Ki", "Kd"])
                .scalar("MaxRate", FieldType::UInt8)
                .with_default(100u8)
                .scalar("Offset", FieldType::Int16)
                .enumeration("Mode", ["Off", "Hold", "Cruise"])
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_export_import() {
        let schema = settings();
        let a = ObjectInstance::new(&schema, 0);
        a.update(|f| {
            f.set_element("Gains", "Kp", 0.25f32)?;
            f.set_element("Gains", "Kd", 2.0f32)?;
            f.set("Offset", 0, -12i16)?;
            f.set_label("Mode", 0, "Cruise")
        })
        .unwrap();

        let snap = a.snapshot();
        assert_eq!(snap.field("Mode").unwrap().values, [Value::from("Cruise")]);
        assert_eq!(snap.field("MaxRate").unwrap().values, [Value::from(100)]);

        let json = snap.to_json().unwrap();
        let restored = InstanceSnapshot::from_json(&json).unwrap();
        assert_eq!(restored, snap);

        let b = ObjectInstance::new(&schema, 1);
        b.apply_snapshot(&restored).unwrap();
        assert_eq!(a.pack(), b.pack());
    }

    #[test]
    fn test_apply_is_all_or_nothing() {
        let schema = settings();
        let inst = ObjectInstance::new(&schema, 0);
        let before = inst.pack();

        let mut snap = inst.snapshot();
        snap.fields[1].values = vec![Value::from(7)];
        snap.fields[3].values = vec![Value::from("Warp")];
        assert!(inst.apply_snapshot(&snap).is_err());
        assert_eq!(inst.pack(), before);

        let mut snap = inst.snapshot();
        snap.fields.push(FieldSnapshot {
            name: "Missing".into(),
            values: vec![Value::from(1)],
        });
        assert!(matches!(
            inst.apply_snapshot(&snap),
            Err(Error::UnknownField(_))
        ));

        let mut snap = inst.snapshot();
        snap.fields[0].values.pop();
        assert!(matches!(
            inst.apply_snapshot(&snap),
            Err(Error::OutOfRange { .. })
        ));

        let mut snap = inst.snapshot();
        snap.fields[2].values = vec![Value::from("ten")];
        assert!(matches!(
            inst.apply_snapshot(&snap),
            Err(Error::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_rejects_other_object() {
        let inst = ObjectInstance::new(&settings(), 0);
        let mut snap = inst.snapshot();
        snap.object = "SomethingElse".into();
        assert!(matches!(
            inst.apply_snapshot(&snap),
            Err(Error::UnknownSchema(_))
        ));
    }

    #[test]
    fn test_non_finite_floats_restore() {
        let schema = Arc::new(
            ObjectSchema::builder(0x42, "Raw")
                .array("F", FieldType::Float32, 4)
                .build()
                .unwrap(),
        );
        let inst = ObjectInstance::new(&schema, 0);
        let mut bytes = Vec::new();
        for v in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY, 1.5] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        inst.unpack(&bytes).unwrap();

        let json = inst.snapshot().to_json().unwrap();
        assert!(!json.contains("null"));
        let snap = InstanceSnapshot::from_json(&json).unwrap();
        assert_eq!(
            snap.field("F").unwrap().values,
            [
                Value::from("NaN"),
                Value::from("inf"),
                Value::from("-inf"),
                Value::from(1.5)
            ]
        );

        let restored = ObjectInstance::new(&schema, 1);
        restored.apply_snapshot(&snap).unwrap();
        assert!(restored.get::<f32>("F", 0).unwrap().is_nan());
        assert_eq!(restored.get::<f32>("F", 1).unwrap(), f32::INFINITY);
        assert_eq!(restored.get::<f32>("F", 2).unwrap(), f32::NEG_INFINITY);
        assert_eq!(restored.get::<f32>("F", 3).unwrap(), 1.5);

        let mut bad = snap;
        bad.fields[0].values[3] = Value::from("nan-ish");
        assert!(matches!(
            restored.apply_snapshot(&bad),
            Err(Error::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_invalid_enum_exported_raw() {
        let schema = settings();
        let inst = ObjectInstance::new(&schema, 0);
        let mut bytes = inst.pack();
        *bytes.last_mut().unwrap() = 9;
        inst.unpack(&bytes).unwrap();
        let snap = inst.snapshot();
        assert_eq!(snap.field("Mode").unwrap().values, [Value::from(9)]);
        // Re-applying the raw index is rejected.
        assert!(inst.apply_snapshot(&snap).is_err());
    }
}
