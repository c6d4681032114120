// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Field schema and per-element little-endian codec.
//!
//! A field is a fixed-length array of elements of one wire type. Element
//! `i` of a field lives at byte `i * width` inside the field's slice of the
//! object buffer. All multi-byte values are little-endian.

use crate::error::{Error, Result};
use crate::value::FieldValue;
use serde::{Deserialize, Serialize};

/// Wire type of a field element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Int8,
    Int16,
    Int32,
    UInt8,
    UInt16,
    UInt32,
    Float32,
    Enum,
}

impl FieldType {
    /// Bytes per element. `label_count` only matters for `Enum`.
    pub fn width(self, label_count: usize) -> usize {
        match self {
            Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Enum => enum_width(label_count),
        }
    }

    /// Lowercase type name as used in schema files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::Float32 => "float32",
            Self::Enum => "enum",
        }
    }
}

/// Smallest whole number of bytes able to index `label_count` labels (min 1).
pub fn enum_width(label_count: usize) -> usize {
    let bits = if label_count <= 1 {
        0
    } else {
        (usize::BITS - (label_count - 1).leading_zeros()) as usize
    };
    bits.div_ceil(8).max(1)
}

macro_rules! le_codec {
    ($read:ident, $write:ident, $ty:ty) => {
        fn $read(src: &[u8]) -> $ty {
            let mut bytes = [0u8; std::mem::size_of::<$ty>()];
            bytes.copy_from_slice(src);
            <$ty>::from_le_bytes(bytes)
        }

        fn $write(dst: &mut [u8], value: $ty) {
            dst.copy_from_slice(&value.to_le_bytes());
        }
    };
}

le_codec!(read_i8, write_i8, i8);
le_codec!(read_i16, write_i16, i16);
le_codec!(read_i32, write_i32, i32);
le_codec!(read_u8, write_u8, u8);
le_codec!(read_u16, write_u16, u16);
le_codec!(read_u32, write_u32, u32);
le_codec!(read_f32, write_f32, f32);

// Enum indices use a variable width of 1..=4 bytes.
fn read_index(src: &[u8]) -> u32 {
    src.iter()
        .rev()
        .fold(0u32, |acc, b| (acc << 8) | u32::from(*b))
}

fn write_index(dst: &mut [u8], index: u32) {
    for (i, b) in dst.iter_mut().enumerate() {
        *b = (index >> (8 * i)) as u8;
    }
}

/// Description of one named field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    name: String,
    units: String,
    field_type: FieldType,
    element_names: Vec<String>,
    enum_labels: Vec<String>,
    defaults: Vec<FieldValue>,
}

impl FieldSchema {
    /// Create a field with `element_count` elements named "0".."n-1".
    pub fn new(name: impl Into<String>, field_type: FieldType, element_count: usize) -> Self {
        Self {
            name: name.into(),
            units: String::new(),
            field_type,
            element_names: (0..element_count).map(|i| i.to_string()).collect(),
            enum_labels: Vec::new(),
            defaults: Vec::new(),
        }
    }

    /// Create an enum field with one element per `element_count`.
    pub fn enumeration<S: Into<String>>(
        name: impl Into<String>,
        element_count: usize,
        labels: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::new(name, FieldType::Enum, element_count).with_labels(labels)
    }

    /// Set the units string.
    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    /// Name each element; the element count becomes the number of names.
    pub fn with_element_names<S: Into<String>>(
        mut self,
        names: impl IntoIterator<Item = S>,
    ) -> Self {
        self.element_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the ordered enum label set.
    pub fn with_labels<S: Into<String>>(mut self, labels: impl IntoIterator<Item = S>) -> Self {
        self.enum_labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Declared defaults: one value (applied to every element) or one per element.
    pub fn with_defaults(mut self, defaults: impl IntoIterator<Item = FieldValue>) -> Self {
        self.defaults = defaults.into_iter().collect();
        self
    }

    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Units string (empty when unitless).
    pub fn units(&self) -> &str {
        &self.units
    }

    /// Wire type of every element.
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Number of elements.
    pub fn element_count(&self) -> usize {
        self.element_names.len()
    }

    /// Element names in index order.
    pub fn element_names(&self) -> &[String] {
        &self.element_names
    }

    /// Ordered enum labels (empty unless `Enum`).
    pub fn enum_labels(&self) -> &[String] {
        &self.enum_labels
    }

    /// Declared defaults, if any.
    pub fn defaults(&self) -> &[FieldValue] {
        &self.defaults
    }

    /// Bytes per element.
    pub fn width(&self) -> usize {
        self.field_type.width(self.enum_labels.len())
    }

    /// Total bytes occupied by this field.
    pub fn size_bytes(&self) -> usize {
        self.element_count() * self.width()
    }

    /// Position of a named element.
    pub fn element_index(&self, element_name: &str) -> Option<usize> {
        self.element_names.iter().position(|n| n == element_name)
    }

    /// Label for an enum index.
    pub fn enum_label(&self, index: u32) -> Option<&str> {
        self.enum_labels.get(index as usize).map(String::as_str)
    }

    /// Index of an enum label.
    pub fn enum_index(&self, label: &str) -> Option<u32> {
        self.enum_labels
            .iter()
            .position(|l| l == label)
            .map(|i| i as u32)
    }

    /// Check the field invariants. `object` only feeds the error message.
    pub(crate) fn validate(&self, object: &str) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::invalid_schema(object, "field with empty name"));
        }
        if self.element_names.is_empty() {
            return Err(Error::invalid_schema(
                object,
                format!("field {} has no elements", self.name),
            ));
        }
        match self.field_type {
            FieldType::Enum if self.enum_labels.is_empty() => {
                return Err(Error::invalid_schema(
                    object,
                    format!("enum field {} has no labels", self.name),
                ));
            }
            FieldType::Enum if self.enum_labels.len() > u32::MAX as usize => {
                return Err(Error::invalid_schema(
                    object,
                    format!("enum field {} has too many labels", self.name),
                ));
            }
            FieldType::Enum => {}
            _ if !self.enum_labels.is_empty() => {
                return Err(Error::invalid_schema(
                    object,
                    format!("non-enum field {} declares labels", self.name),
                ));
            }
            _ => {}
        }
        if !self.defaults.is_empty()
            && self.defaults.len() != 1
            && self.defaults.len() != self.element_count()
        {
            return Err(Error::invalid_schema(
                object,
                format!(
                    "field {} has {} defaults for {} elements",
                    self.name,
                    self.defaults.len(),
                    self.element_count()
                ),
            ));
        }
        Ok(())
    }

    fn check_len(&self, data: &[u8]) -> Result<()> {
        if data.len() != self.size_bytes() {
            return Err(Error::SizeMismatch {
                expected: self.size_bytes(),
                actual: data.len(),
            });
        }
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.element_count() {
            return Err(Error::OutOfRange {
                field: self.name.clone(),
                index,
                count: self.element_count(),
            });
        }
        Ok(())
    }

    fn check_enum(&self, value: u32) -> Result<u32> {
        if (value as usize) < self.enum_labels.len() {
            Ok(value)
        } else {
            Err(Error::InvalidEnumValue {
                field: self.name.clone(),
                value,
                label_count: self.enum_labels.len(),
            })
        }
    }

    fn element<'a>(&self, data: &'a [u8], index: usize) -> &'a [u8] {
        let width = self.width();
        &data[index * width..(index + 1) * width]
    }

    /// Decode element `index` without validating enum indices.
    ///
    /// `data` is this field's slice of the object buffer; any other length
    /// fails with `SizeMismatch`.
    pub fn read_raw(&self, data: &[u8], index: usize) -> Result<FieldValue> {
        self.check_len(data)?;
        self.check_index(index)?;
        let src = self.element(data, index);
        Ok(match self.field_type {
            FieldType::Int8 => FieldValue::Int8(read_i8(src)),
            FieldType::Int16 => FieldValue::Int16(read_i16(src)),
            FieldType::Int32 => FieldValue::Int32(read_i32(src)),
            FieldType::UInt8 => FieldValue::UInt8(read_u8(src)),
            FieldType::UInt16 => FieldValue::UInt16(read_u16(src)),
            FieldType::UInt32 => FieldValue::UInt32(read_u32(src)),
            FieldType::Float32 => FieldValue::Float32(read_f32(src)),
            FieldType::Enum => FieldValue::Enum(read_index(src)),
        })
    }

    /// Decode element `index`.
    ///
    /// Enum bytes that do not name a label fail with `InvalidEnumValue`;
    /// this is where inbound payloads get validated.
    pub fn read(&self, data: &[u8], index: usize) -> Result<FieldValue> {
        let value = self.read_raw(data, index)?;
        if let FieldValue::Enum(v) = value {
            self.check_enum(v)?;
        }
        Ok(value)
    }

    /// Encode `value` into element `index`.
    ///
    /// Numeric values are converted to the declared type with `as`-cast
    /// semantics: integers wrap to the field width, floats saturate at the
    /// field's range (NaN stores 0). Enum fields accept
    /// integer values only and reject indices without a label.
    pub fn write(&self, data: &mut [u8], index: usize, value: FieldValue) -> Result<()> {
        self.check_len(data)?;
        self.check_index(index)?;
        let width = self.width();
        let dst = &mut data[index * width..(index + 1) * width];
        // Floats saturate at the target range, integers wrap to its width.
        macro_rules! narrow {
            ($ty:ty) => {
                match value {
                    FieldValue::Float32(v) => v as $ty,
                    other => other.as_i64() as $ty,
                }
            };
        }
        match self.field_type {
            FieldType::Int8 => write_i8(dst, narrow!(i8)),
            FieldType::Int16 => write_i16(dst, narrow!(i16)),
            FieldType::Int32 => write_i32(dst, narrow!(i32)),
            FieldType::UInt8 => write_u8(dst, narrow!(u8)),
            FieldType::UInt16 => write_u16(dst, narrow!(u16)),
            FieldType::UInt32 => write_u32(dst, narrow!(u32)),
            FieldType::Float32 => write_f32(dst, value.as_f64() as f32),
            FieldType::Enum => {
                if matches!(value, FieldValue::Float32(_)) {
                    return Err(Error::invalid_value(
                        &self.name,
                        "enum fields take an index, not a float",
                    ));
                }
                let raw = value.as_i64();
                let index = u32::try_from(raw).map_err(|_| {
                    Error::invalid_value(&self.name, format!("negative enum index {}", raw))
                })?;
                write_index(dst, self.check_enum(index)?);
            }
        }
        Ok(())
    }

    /// Encode the label `label` into element `index`.
    pub fn write_label(&self, data: &mut [u8], index: usize, label: &str) -> Result<()> {
        let value = self.enum_index(label).ok_or_else(|| {
            Error::invalid_value(&self.name, format!("no enum label {:?}", label))
        })?;
        self.write(data, index, FieldValue::Enum(value))
    }

    /// Fill `data` with the declared defaults; fields without defaults are left as-is.
    pub(crate) fn write_defaults(&self, data: &mut [u8]) -> Result<()> {
        match self.defaults.as_slice() {
            [] => Ok(()),
            [single] => {
                for i in 0..self.element_count() {
                    self.write(data, i, *single)?;
                }
                Ok(())
            }
            many => {
                for (i, v) in many.iter().enumerate() {
                    self.write(data, i, *v)?;
                }
                Ok(())
            }
        }
    }
}
