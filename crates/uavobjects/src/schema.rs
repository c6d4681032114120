// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object schemas and the field layout algorithm.
//!
//! Fields are laid out back to back in declaration order: each field's
//! offset is the sum of the sizes of all fields before it, with no padding.
//! Reordering fields therefore changes the wire format.

use crate::error::{Error, Result};
use crate::field::{FieldSchema, FieldType};
use crate::metadata::{is_metadata_id, metadata_object_id, Metadata};
use crate::value::FieldValue;
use std::collections::HashMap;

/// A field together with its byte offset inside the object buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldLayout {
    field: FieldSchema,
    offset: usize,
}

impl FieldLayout {
    /// Get the field description.
    pub fn field(&self) -> &FieldSchema {
        &self.field
    }

    /// Byte offset inside the object buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes occupied by the field.
    pub fn size_bytes(&self) -> usize {
        self.field.size_bytes()
    }

    pub(crate) fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.field.size_bytes()
    }
}

/// Immutable layout and identity of one object kind.
///
/// Built once through [`ObjectSchemaBuilder`] and shared by `Arc` across
/// every instance of the object.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSchema {
    id: u32,
    name: String,
    description: String,
    single_instance: bool,
    settings: bool,
    fields: Vec<FieldLayout>,
    index: HashMap<String, usize>,
    total_bytes: usize,
    default_metadata: Metadata,
    default_image: Box<[u8]>,
}

impl ObjectSchema {
    /// Start building a schema.
    pub fn builder(id: u32, name: impl Into<String>) -> ObjectSchemaBuilder {
        ObjectSchemaBuilder::new(id, name)
    }

    /// Object id (bit 0 clear).
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Id of the companion metadata object.
    pub fn metadata_id(&self) -> u32 {
        metadata_object_id(self.id)
    }

    /// Object name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether only instance 0 may exist.
    pub fn is_single_instance(&self) -> bool {
        self.single_instance
    }

    /// Whether this is a persisted settings object.
    pub fn is_settings(&self) -> bool {
        self.settings
    }

    /// Payload size in bytes; fixed at construction.
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Fields in wire order.
    pub fn fields(&self) -> &[FieldLayout] {
        &self.fields
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    /// Position of a field in wire order.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub(crate) fn layout(&self, name: &str) -> Result<&FieldLayout> {
        self.field(name)
            .ok_or_else(|| Error::UnknownField(name.to_string()))
    }

    /// Metadata every new instance starts with.
    pub fn default_metadata(&self) -> Metadata {
        self.default_metadata
    }

    /// Overwrite `data` with the declared defaults (zero where none are declared).
    pub fn default_values(&self, data: &mut [u8]) {
        data.copy_from_slice(&self.default_image);
    }
}

/// Fluent builder for [`ObjectSchema`].
#[derive(Debug)]
pub struct ObjectSchemaBuilder {
    id: u32,
    name: String,
    description: String,
    single_instance: bool,
    settings: bool,
    fields: Vec<FieldSchema>,
    default_metadata: Metadata,
}

impl ObjectSchemaBuilder {
    /// New single-instance, non-settings schema with default metadata.
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            single_instance: true,
            settings: false,
            fields: Vec::new(),
            default_metadata: Metadata::default(),
        }
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Allow or forbid instances other than 0.
    pub fn single_instance(mut self, single: bool) -> Self {
        self.single_instance = single;
        self
    }

    /// Mark as a settings object.
    pub fn settings(mut self, settings: bool) -> Self {
        self.settings = settings;
        self
    }

    /// Metadata every new instance starts with.
    pub fn default_metadata(mut self, metadata: Metadata) -> Self {
        self.default_metadata = metadata;
        self
    }

    /// Append a field.
    pub fn field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    /// Declare a default for every element of the last appended field.
    pub fn with_default(mut self, value: impl Into<FieldValue>) -> Self {
        if let Some(last) = self.fields.pop() {
            self.fields.push(last.with_defaults([value.into()]));
        }
        self
    }

    /// Append a one-element field.
    pub fn scalar(self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.field(FieldSchema::new(name, field_type, 1))
    }

    /// Append a fixed-length array field.
    pub fn array(self, name: impl Into<String>, field_type: FieldType, count: usize) -> Self {
        self.field(FieldSchema::new(name, field_type, count))
    }

    /// Append an array field whose elements are named.
    pub fn named_array<S: Into<String>>(
        self,
        name: impl Into<String>,
        field_type: FieldType,
        element_names: impl IntoIterator<Item = S>,
    ) -> Self {
        self.field(FieldSchema::new(name, field_type, 0).with_element_names(element_names))
    }

    /// Append a one-element enum field.
    pub fn enumeration<S: Into<String>>(
        self,
        name: impl Into<String>,
        labels: impl IntoIterator<Item = S>,
    ) -> Self {
        self.field(FieldSchema::enumeration(name, 1, labels))
    }

    /// Validate, lay out the fields and freeze the schema.
    pub fn build(self) -> Result<ObjectSchema> {
        if self.name.is_empty() {
            return Err(Error::invalid_schema("<unnamed>", "empty object name"));
        }
        if is_metadata_id(self.id) {
            return Err(Error::invalid_schema(
                &self.name,
                format!("object id 0x{:08X} has the metadata marker bit set", self.id),
            ));
        }
        if self.fields.is_empty() {
            return Err(Error::invalid_schema(&self.name, "no fields"));
        }

        let mut fields = Vec::with_capacity(self.fields.len());
        let mut index = HashMap::with_capacity(self.fields.len());
        let mut offset = 0usize;
        for field in self.fields {
            field.validate(&self.name)?;
            if index.insert(field.name().to_string(), fields.len()).is_some() {
                return Err(Error::invalid_schema(
                    &self.name,
                    format!("duplicate field {}", field.name()),
                ));
            }
            let size = field.size_bytes();
            fields.push(FieldLayout { field, offset });
            offset += size;
        }
        let total_bytes = offset;

        let mut default_image = vec![0u8; total_bytes].into_boxed_slice();
        for layout in &fields {
            layout
                .field
                .write_defaults(&mut default_image[layout.range()])
                .map_err(|e| {
                    Error::invalid_schema(
                        &self.name,
                        format!("bad default for {}: {}", layout.field.name(), e),
                    )
                })?;
        }

        log::debug!(
            "[schema] built {} (0x{:08X}): {} fields, {} bytes",
            self.name,
            self.id,
            fields.len(),
            total_bytes
        );

        Ok(ObjectSchema {
            id: self.id,
            name: self.name,
            description: self.description,
            single_instance: self.single_instance,
            settings: self.settings,
            fields,
            index,
            total_bytes,
            default_metadata: self.default_metadata,
            default_image,
        })
    }
}
