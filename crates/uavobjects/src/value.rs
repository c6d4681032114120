// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed field values.

use crate::field::FieldType;
use std::fmt;

/// One element of a field, tagged with its wire type.
///
/// Reads always return the variant matching the field's declared type.
/// Writes accept any variant and convert it to the declared type (see
/// [`FieldSchema::write`](crate::FieldSchema::write)).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    Float32(f32),
    /// Index into the field's label set.
    Enum(u32),
}

impl FieldValue {
    /// Wire type this value naturally maps to.
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::Int8(_) => FieldType::Int8,
            Self::Int16(_) => FieldType::Int16,
            Self::Int32(_) => FieldType::Int32,
            Self::UInt8(_) => FieldType::UInt8,
            Self::UInt16(_) => FieldType::UInt16,
            Self::UInt32(_) => FieldType::UInt32,
            Self::Float32(_) => FieldType::Float32,
            Self::Enum(_) => FieldType::Enum,
        }
    }

    /// Build a value of `field_type` from an integer, wrapping to its width.
    ///
    /// Returns `None` for enum fields given a negative or oversized index.
    pub fn from_integer(field_type: FieldType, value: i64) -> Option<Self> {
        Some(match field_type {
            FieldType::Int8 => Self::Int8(value as i8),
            FieldType::Int16 => Self::Int16(value as i16),
            FieldType::Int32 => Self::Int32(value as i32),
            FieldType::UInt8 => Self::UInt8(value as u8),
            FieldType::UInt16 => Self::UInt16(value as u16),
            FieldType::UInt32 => Self::UInt32(value as u32),
            FieldType::Float32 => Self::Float32(value as f32),
            FieldType::Enum => Self::Enum(u32::try_from(value).ok()?),
        })
    }

    /// Numeric view as f64 (enum yields its index).
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Int8(v) => v.into(),
            Self::Int16(v) => v.into(),
            Self::Int32(v) => v.into(),
            Self::UInt8(v) => v.into(),
            Self::UInt16(v) => v.into(),
            Self::UInt32(v) => v.into(),
            Self::Float32(v) => v.into(),
            Self::Enum(v) => v.into(),
        }
    }

    /// Integer view; floats truncate toward zero and saturate at the `i64` range.
    pub(crate) fn as_i64(&self) -> i64 {
        match *self {
            Self::Int8(v) => v.into(),
            Self::Int16(v) => v.into(),
            Self::Int32(v) => v.into(),
            Self::UInt8(v) => v.into(),
            Self::UInt16(v) => v.into(),
            Self::UInt32(v) => v.into(),
            Self::Float32(v) => v as i64,
            Self::Enum(v) => v.into(),
        }
    }

    /// Enum index, if this is an enum value.
    pub fn as_enum(&self) -> Option<u32> {
        match self {
            Self::Enum(v) => Some(*v),
            _ => None,
        }
    }

    /// Float value, if this is a float.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Float32(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int8(v) => write!(f, "{}", v),
            Self::Int16(v) => write!(f, "{}", v),
            Self::Int32(v) => write!(f, "{}", v),
            Self::UInt8(v) => write!(f, "{}", v),
            Self::UInt16(v) => write!(f, "{}", v),
            Self::UInt32(v) => write!(f, "{}", v),
            Self::Float32(v) => write!(f, "{}", v),
            Self::Enum(v) => write!(f, "#{}", v),
        }
    }
}

/// Extract a native Rust value from a [`FieldValue`] of the exact variant.
pub trait FromFieldValue: Sized {
    fn from_field_value(value: &FieldValue) -> Option<Self>;
}

macro_rules! impl_field_value {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for FieldValue {
            fn from(v: $ty) -> Self {
                FieldValue::$variant(v)
            }
        }

        impl FromFieldValue for $ty {
            fn from_field_value(value: &FieldValue) -> Option<Self> {
                match value {
                    FieldValue::$variant(v) => Some(*v),
                    _ => None,
                }
            }
        }
    };
}

impl_field_value!(i8, Int8);
impl_field_value!(i16, Int16);
impl_field_value!(i32, Int32);
impl_field_value!(u8, UInt8);
impl_field_value!(u16, UInt16);
impl_field_value!(f32, Float32);

// u32 reads back from both UINT32 and ENUM fields; writes map to UINT32.
impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::UInt32(v)
    }
}

impl FromFieldValue for u32 {
    fn from_field_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::UInt32(v) | FieldValue::Enum(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromFieldValue for FieldValue {
    fn from_field_value(value: &FieldValue) -> Option<Self> {
        Some(*value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_integer_wraps() {
        assert_eq!(
            FieldValue::from_integer(FieldType::UInt8, 300),
            Some(FieldValue::UInt8(44))
        );
        assert_eq!(
            FieldValue::from_integer(FieldType::Int16, 40_000),
            Some(FieldValue::Int16(-25_536))
        );
        assert_eq!(FieldValue::from_integer(FieldType::Enum, -1), None);
    }

    #[test]
    fn test_typed_extraction() {
        let v = FieldValue::from(2.5f32);
        assert_eq!(f32::from_field_value(&v), Some(2.5));
        assert_eq!(u8::from_field_value(&v), None);
        assert_eq!(u32::from_field_value(&FieldValue::Enum(3)), Some(3));
    }

    #[test]
    fn test_float_to_integer_saturates() {
        assert_eq!(FieldValue::Float32(-1.0e20).as_i64(), i64::MIN);
        assert_eq!(FieldValue::Float32(3.9).as_i64(), 3);
    }
}
