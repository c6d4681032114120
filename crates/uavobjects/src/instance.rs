// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Buffer-backed object instances.
//!
//! Each instance owns a byte buffer of exactly `schema.total_bytes()` plus
//! its metadata, both behind one `RwLock`. Readers (`pack`, `get_field`,
//! [`ObjectInstance::read`]) share the lock; `unpack`, `set_field` and
//! [`ObjectInstance::update`] batches take it exclusively, so nobody sees a
//! half-applied payload. Locks are per instance: independent instances never
//! contend.

use crate::error::{Error, Result};
use crate::metadata::Metadata;
use crate::schema::ObjectSchema;
use crate::value::{FieldValue, FromFieldValue};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Registry key of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub schema_id: u32,
    pub instance_id: u32,
}

impl ObjectKey {
    /// Key of one instance.
    pub const fn new(schema_id: u32, instance_id: u32) -> Self {
        Self {
            schema_id,
            instance_id,
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}/{}", self.schema_id, self.instance_id)
    }
}

#[derive(Debug)]
struct InstanceState {
    data: Box<[u8]>,
    metadata: Metadata,
}

/// One live value of a schema.
#[derive(Debug)]
pub struct ObjectInstance {
    schema: Arc<ObjectSchema>,
    instance_id: u32,
    state: RwLock<InstanceState>,
}

impl ObjectInstance {
    /// Allocate a zeroed buffer, then apply the schema defaults and default metadata.
    pub fn new(schema: &Arc<ObjectSchema>, instance_id: u32) -> Self {
        let mut data = vec![0u8; schema.total_bytes()].into_boxed_slice();
        schema.default_values(&mut data);
        Self {
            schema: Arc::clone(schema),
            instance_id,
            state: RwLock::new(InstanceState {
                data,
                metadata: schema.default_metadata(),
            }),
        }
    }

    /// Shared schema.
    pub fn schema(&self) -> &Arc<ObjectSchema> {
        &self.schema
    }

    /// Instance id within the object.
    pub fn instance_id(&self) -> u32 {
        self.instance_id
    }

    /// Object id of the schema.
    pub fn object_id(&self) -> u32 {
        self.schema.id()
    }

    /// Object name.
    pub fn name(&self) -> &str {
        self.schema.name()
    }

    /// Registry key of this instance.
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.schema.id(), self.instance_id)
    }

    /// Copy of the current payload, exactly `total_bytes` long.
    pub fn pack(&self) -> Vec<u8> {
        self.state.read().data.to_vec()
    }

    /// Replace the payload with `bytes` verbatim.
    ///
    /// Only the length is checked. Enum bytes are not validated here; typed
    /// reads reject bad indices later.
    pub fn unpack(&self, bytes: &[u8]) -> Result<()> {
        let expected = self.schema.total_bytes();
        if bytes.len() != expected {
            return Err(Error::SizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        self.state.write().data.copy_from_slice(bytes);
        Ok(())
    }

    /// Read element `index` of field `name`.
    pub fn get_field(&self, name: &str, index: usize) -> Result<FieldValue> {
        self.read(|fields| fields.get(name, index))
    }

    /// Read element `index` of field `name` as a native value.
    pub fn get<T: FromFieldValue>(&self, name: &str, index: usize) -> Result<T> {
        let value = self.get_field(name, index)?;
        T::from_field_value(&value).ok_or_else(|| {
            Error::invalid_value(
                name,
                format!("requested type does not match {}", value.field_type().as_str()),
            )
        })
    }

    /// All elements of field `name`.
    pub fn field_values(&self, name: &str) -> Result<Vec<FieldValue>> {
        self.read(|fields| fields.values(name))
    }

    /// Label of an enum element.
    pub fn enum_label(&self, name: &str, index: usize) -> Result<String> {
        self.read(|fields| fields.enum_label(name, index).map(str::to_string))
    }

    /// Write element `index` of field `name`.
    pub fn set_field(&self, name: &str, index: usize, value: impl Into<FieldValue>) -> Result<()> {
        let value = value.into();
        self.update(|fields| fields.set(name, index, value))
    }

    /// Write an enum element by label.
    pub fn set_enum_label(&self, name: &str, index: usize, label: &str) -> Result<()> {
        self.update(|fields| fields.set_label(name, index, label))
    }

    /// Run `f` against a consistent view of the payload.
    pub fn read<R>(&self, f: impl FnOnce(&FieldsRef<'_>) -> R) -> R {
        let state = self.state.read();
        f(&FieldsRef {
            schema: self.schema.as_ref(),
            data: &state.data[..],
        })
    }

    /// Apply a batch of writes as one critical section.
    ///
    /// The batch runs against a scratch copy; it is committed only if `f`
    /// returns `Ok`, so a failing write leaves the instance untouched.
    pub fn update<R>(&self, f: impl FnOnce(&mut FieldsMut<'_>) -> Result<R>) -> Result<R> {
        let mut state = self.state.write();
        let mut scratch = state.data.clone();
        let result = f(&mut FieldsMut {
            schema: self.schema.as_ref(),
            data: &mut scratch[..],
        })?;
        state.data = scratch;
        Ok(result)
    }

    /// Restore declared defaults (payload only).
    pub fn set_defaults(&self) {
        let mut state = self.state.write();
        self.schema.default_values(&mut state.data);
    }

    /// Current metadata.
    pub fn metadata(&self) -> Metadata {
        self.state.read().metadata
    }

    /// Replace the metadata.
    pub fn set_metadata(&self, metadata: Metadata) {
        self.state.write().metadata = metadata;
    }

    /// Metadata channel payload.
    pub fn pack_metadata(&self) -> [u8; Metadata::SIZE] {
        self.metadata().pack()
    }

    /// Apply a metadata channel payload.
    pub fn unpack_metadata(&self, bytes: &[u8]) -> Result<()> {
        let metadata = Metadata::unpack(bytes)?;
        self.set_metadata(metadata);
        Ok(())
    }

    /// New instance under the same schema with a copy of this payload and metadata.
    ///
    /// The source lock is held only for the copy.
    pub fn clone_as(&self, instance_id: u32) -> ObjectInstance {
        let (data, metadata) = {
            let state = self.state.read();
            (state.data.clone(), state.metadata)
        };
        ObjectInstance {
            schema: Arc::clone(&self.schema),
            instance_id,
            state: RwLock::new(InstanceState { data, metadata }),
        }
    }
}

impl fmt::Display for ObjectInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        writeln!(
            f,
            "{} (0x{:08X}) inst {} [{} bytes]",
            self.schema.name(),
            self.schema.id(),
            self.instance_id,
            self.schema.total_bytes()
        )?;
        for layout in self.schema.fields() {
            let field = layout.field();
            let data = &state.data[layout.range()];
            write!(f, "  {}:", field.name())?;
            for i in 0..field.element_count() {
                match field.read_raw(data, i) {
                    Ok(FieldValue::Enum(v)) => match field.enum_label(v) {
                        Some(label) => write!(f, " {}", label)?,
                        None => write!(f, " <invalid {}>", v)?,
                    },
                    Ok(v) => write!(f, " {}", v)?,
                    Err(_) => write!(f, " ?")?,
                }
            }
            if !field.units().is_empty() {
                write!(f, " ({})", field.units())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Read access to one instance's fields under its lock.
pub struct FieldsRef<'a> {
    schema: &'a ObjectSchema,
    data: &'a [u8],
}

impl FieldsRef<'_> {
    /// Read element `index` of field `name`.
    pub fn get(&self, name: &str, index: usize) -> Result<FieldValue> {
        let layout = self.schema.layout(name)?;
        layout.field().read(&self.data[layout.range()], index)
    }

    /// All elements of field `name`.
    pub fn values(&self, name: &str) -> Result<Vec<FieldValue>> {
        let layout = self.schema.layout(name)?;
        let data = &self.data[layout.range()];
        (0..layout.field().element_count())
            .map(|i| layout.field().read(data, i))
            .collect()
    }

    /// Label of an enum element.
    pub fn enum_label(&self, name: &str, index: usize) -> Result<&str> {
        enum_label_at(self.schema, self.data, name, index)
    }
}

/// Write access to one instance's fields inside an [`ObjectInstance::update`] batch.
pub struct FieldsMut<'a> {
    schema: &'a ObjectSchema,
    data: &'a mut [u8],
}

impl FieldsMut<'_> {
    /// Read element `index`, including writes made earlier in this batch.
    pub fn get(&self, name: &str, index: usize) -> Result<FieldValue> {
        let layout = self.schema.layout(name)?;
        layout.field().read(&self.data[layout.range()], index)
    }

    /// Label of an enum element.
    pub fn enum_label(&self, name: &str, index: usize) -> Result<&str> {
        enum_label_at(self.schema, self.data, name, index)
    }

    /// Write element `index` of field `name`.
    pub fn set(&mut self, name: &str, index: usize, value: impl Into<FieldValue>) -> Result<()> {
        let layout = self.schema.layout(name)?;
        layout
            .field()
            .write(&mut self.data[layout.range()], index, value.into())
    }

    /// Write an enum element by label.
    pub fn set_label(&mut self, name: &str, index: usize, label: &str) -> Result<()> {
        let layout = self.schema.layout(name)?;
        layout
            .field()
            .write_label(&mut self.data[layout.range()], index, label)
    }

    /// Write by element name (e.g. `"Ki"` of a PID array).
    pub fn set_element(
        &mut self,
        name: &str,
        element: &str,
        value: impl Into<FieldValue>,
    ) -> Result<()> {
        let layout = self.schema.layout(name)?;
        let index = layout.field().element_index(element).ok_or_else(|| {
            Error::invalid_value(name, format!("no element named {:?}", element))
        })?;
        layout
            .field()
            .write(&mut self.data[layout.range()], index, value.into())
    }
}

fn enum_label_at<'s>(
    schema: &'s ObjectSchema,
    data: &[u8],
    name: &str,
    index: usize,
) -> Result<&'s str> {
    let layout = schema.layout(name)?;
    let field = layout.field();
    match field.read(&data[layout.range()], index)? {
        FieldValue::Enum(v) => field.enum_label(v).ok_or(Error::InvalidEnumValue {
            field: name.to_string(),
            value: v,
            label_count: field.enum_labels().len(),
        }),
        _ => Err(Error::invalid_value(name, "not an enum field")),
    }
}
