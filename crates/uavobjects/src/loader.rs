// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema tables loaded from TOML.
//!
//! A schema file carries an optional `[registry]` section and one
//! `[[object]]` table per object, each with its `[[object.field]]` list in
//! wire order:
//!
//! ```toml
//! [registry]
//! event_capacity = 64
//!
//! [[object]]
//! name = "FlightTelemetryStats"
//! id = 0x2F7E2902
//! metadata = { flight_update_mode = "periodic", flight_update_period_ms = 5000 }
//!
//! [[object.field]]
//! name = "Status"
//! type = "enum"
//! options = ["Disconnected", "HandshakeReq", "HandshakeAck", "Connected"]
//! defaults = ["Disconnected"]
//! ```

use crate::error::{Error, Result};
use crate::field::{FieldSchema, FieldType};
use crate::metadata::Metadata;
use crate::registry::{ObjectRegistry, RegistryConfig};
use crate::schema::ObjectSchema;
use crate::value::FieldValue;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parsed schema file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaFile {
    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default, rename = "object")]
    pub objects: Vec<ObjectDef>,
}

/// One `[[object]]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectDef {
    pub name: String,
    pub id: u32,

    #[serde(default)]
    pub description: String,

    #[serde(default = "default_true")]
    pub single_instance: bool,

    #[serde(default)]
    pub settings: bool,

    #[serde(default)]
    pub metadata: Metadata,

    #[serde(default, rename = "field")]
    pub fields: Vec<FieldDef>,
}

/// One `[[object.field]]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    #[serde(default)]
    pub units: String,

    /// Element count when elements are unnamed.
    #[serde(default)]
    pub elements: Option<usize>,

    /// Element names; the count follows from them.
    #[serde(default)]
    pub element_names: Option<Vec<String>>,

    /// Enum labels.
    #[serde(default)]
    pub options: Vec<String>,

    #[serde(default)]
    pub defaults: Vec<DefaultValue>,
}

/// A declared default: a number, or an enum label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Integer(i64),
    Float(f64),
    Label(String),
}

fn default_true() -> bool {
    true
}

impl SchemaFile {
    /// Load and validate a schema file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let file = Self::from_toml(&content)?;
        log::debug!(
            "[loader] {} object(s) from {}",
            file.objects.len(),
            path.as_ref().display()
        );
        Ok(file)
    }

    /// Parse and validate schema tables from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: Self = toml::from_str(content)?;
        file.validate()?;
        Ok(file)
    }

    /// Structural checks that do not need a built schema.
    pub fn validate(&self) -> Result<()> {
        let mut ids = std::collections::HashSet::new();
        let mut names = std::collections::HashSet::new();
        for object in &self.objects {
            if !ids.insert(object.id) {
                return Err(Error::DuplicateSchema(format!("0x{:08X}", object.id)));
            }
            if !names.insert(object.name.as_str()) {
                return Err(Error::DuplicateSchema(object.name.clone()));
            }
            for field in &object.fields {
                if field.elements.is_some() && field.element_names.is_some() {
                    return Err(Error::invalid_schema(
                        &object.name,
                        format!(
                            "field {} sets both elements and element_names",
                            field.name
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Build every object, in file order.
    pub fn build_schemas(&self) -> Result<Vec<ObjectSchema>> {
        self.objects.iter().map(ObjectDef::build).collect()
    }

    /// New registry configured by `[registry]` with every object registered.
    pub fn into_registry(self) -> Result<ObjectRegistry> {
        let schemas = self.build_schemas()?;
        let registry = ObjectRegistry::new(self.registry);
        for schema in schemas {
            registry.register(schema)?;
        }
        Ok(registry)
    }
}

impl ObjectDef {
    /// Build the schema described by this table.
    pub fn build(&self) -> Result<ObjectSchema> {
        let mut builder = ObjectSchema::builder(self.id, self.name.clone())
            .description(self.description.clone())
            .single_instance(self.single_instance)
            .settings(self.settings)
            .default_metadata(self.metadata);
        for field in &self.fields {
            builder = builder.field(field.to_field_schema(&self.name)?);
        }
        builder.build()
    }
}

impl FieldDef {
    fn to_field_schema(&self, object: &str) -> Result<FieldSchema> {
        let mut field = match &self.element_names {
            Some(names) => {
                FieldSchema::new(self.name.clone(), self.field_type, 0).with_element_names(names)
            }
            None => FieldSchema::new(self.name.clone(), self.field_type, self.elements.unwrap_or(1)),
        }
        .with_units(self.units.clone())
        .with_labels(&self.options);

        if !self.defaults.is_empty() {
            let defaults = self
                .defaults
                .iter()
                .map(|d| self.resolve_default(object, d))
                .collect::<Result<Vec<_>>>()?;
            field = field.with_defaults(defaults);
        }
        Ok(field)
    }

    fn resolve_default(&self, object: &str, value: &DefaultValue) -> Result<FieldValue> {
        let resolved = match value {
            DefaultValue::Integer(v) => FieldValue::from_integer(self.field_type, *v),
            DefaultValue::Float(v) if self.field_type == FieldType::Float32 => {
                Some(FieldValue::Float32(*v as f32))
            }
            DefaultValue::Float(_) => None,
            DefaultValue::Label(label) => self
                .options
                .iter()
                .position(|o| o == label)
                .map(|i| FieldValue::Enum(i as u32)),
        };
        resolved.ok_or_else(|| {
            Error::invalid_schema(
                object,
                format!("default {:?} does not fit field {}", value, self.name),
            )
        })
    }
}
