//! Typed key-value fields attached to log entries
//!
//! This module provides:
//! - `FieldValue`: every value type an encoder knows how to render
//! - `Field`: a key plus a value, rendered in insertion order
//! - `Reflect`: bridge for arbitrary `serde::Serialize` values

use super::error::{LoggerError, Result};
use crate::encoder::{ArrayEncoder, ArrayMarshaler, ObjectEncoder, ObjectMarshaler};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Values serialized through `serde_json`
pub trait Reflect: Send + Sync {
    fn to_json(&self) -> serde_json::Result<Vec<u8>>;
}

impl<T: Serialize + Send + Sync + ?Sized> Reflect for T {
    fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

#[derive(Clone)]
pub enum FieldValue {
    Bool(bool),
    Int64(i64),
    Int32(i32),
    Int16(i16),
    Int8(i8),
    Uint64(u64),
    Uint32(u32),
    Uint16(u16),
    Uint8(u8),
    Uintptr(usize),
    Float64(f64),
    Float32(f32),
    Complex128(f64, f64),
    Complex64(f32, f32),
    String(String),
    /// Raw bytes rendered as text; invalid UTF-8 becomes U+FFFD
    ByteString(Vec<u8>),
    /// Raw bytes rendered as base64
    Binary(Vec<u8>),
    Duration(Duration),
    Time(DateTime<Utc>),
    Object(Arc<dyn ObjectMarshaler>),
    Array(Arc<dyn ArrayMarshaler>),
    Reflected(Arc<dyn Reflect>),
    /// Opens a nested object holding every field that follows
    Namespace,
}

impl FieldValue {
    /// Append this value as an array element
    pub fn append_to(&self, enc: &mut dyn ArrayEncoder) -> Result<()> {
        match self {
            FieldValue::Bool(v) => enc.append_bool(*v),
            FieldValue::Int64(v) => enc.append_i64(*v),
            FieldValue::Int32(v) => enc.append_i64(i64::from(*v)),
            FieldValue::Int16(v) => enc.append_i64(i64::from(*v)),
            FieldValue::Int8(v) => enc.append_i64(i64::from(*v)),
            FieldValue::Uint64(v) => enc.append_u64(*v),
            FieldValue::Uint32(v) => enc.append_u64(u64::from(*v)),
            FieldValue::Uint16(v) => enc.append_u64(u64::from(*v)),
            FieldValue::Uint8(v) => enc.append_u64(u64::from(*v)),
            FieldValue::Uintptr(v) => enc.append_u64(*v as u64),
            FieldValue::Float64(v) => enc.append_f64(*v),
            FieldValue::Float32(v) => enc.append_f32(*v),
            FieldValue::Complex128(re, im) => enc.append_complex128(*re, *im),
            FieldValue::Complex64(re, im) => enc.append_complex64(*re, *im),
            FieldValue::String(v) => enc.append_str(v),
            FieldValue::ByteString(v) => enc.append_byte_string(v),
            FieldValue::Binary(v) => enc.append_str(&general_purpose::STANDARD.encode(v)),
            FieldValue::Duration(v) => enc.append_duration(*v),
            FieldValue::Time(v) => enc.append_time(*v),
            FieldValue::Object(v) => return enc.append_object(v.as_ref()),
            FieldValue::Array(v) => return enc.append_array(v.as_ref()),
            FieldValue::Reflected(v) => return enc.append_reflected(v.as_ref()),
            FieldValue::Namespace => {
                return Err(LoggerError::encoder(
                    "array",
                    "a namespace cannot be an array element",
                ))
            }
        }
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Bool(_) => "Bool",
            FieldValue::Int64(_) => "Int64",
            FieldValue::Int32(_) => "Int32",
            FieldValue::Int16(_) => "Int16",
            FieldValue::Int8(_) => "Int8",
            FieldValue::Uint64(_) => "Uint64",
            FieldValue::Uint32(_) => "Uint32",
            FieldValue::Uint16(_) => "Uint16",
            FieldValue::Uint8(_) => "Uint8",
            FieldValue::Uintptr(_) => "Uintptr",
            FieldValue::Float64(_) => "Float64",
            FieldValue::Float32(_) => "Float32",
            FieldValue::Complex128(..) => "Complex128",
            FieldValue::Complex64(..) => "Complex64",
            FieldValue::String(_) => "String",
            FieldValue::ByteString(_) => "ByteString",
            FieldValue::Binary(_) => "Binary",
            FieldValue::Duration(_) => "Duration",
            FieldValue::Time(_) => "Time",
            FieldValue::Object(_) => "Object",
            FieldValue::Array(_) => "Array",
            FieldValue::Reflected(_) => "Reflected",
            FieldValue::Namespace => "Namespace",
        }
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(v) => write!(f, "Bool({})", v),
            FieldValue::Int64(v) => write!(f, "Int64({})", v),
            FieldValue::Int32(v) => write!(f, "Int32({})", v),
            FieldValue::Int16(v) => write!(f, "Int16({})", v),
            FieldValue::Int8(v) => write!(f, "Int8({})", v),
            FieldValue::Uint64(v) => write!(f, "Uint64({})", v),
            FieldValue::Uint32(v) => write!(f, "Uint32({})", v),
            FieldValue::Uint16(v) => write!(f, "Uint16({})", v),
            FieldValue::Uint8(v) => write!(f, "Uint8({})", v),
            FieldValue::Uintptr(v) => write!(f, "Uintptr({:#x})", v),
            FieldValue::Float64(v) => write!(f, "Float64({})", v),
            FieldValue::Float32(v) => write!(f, "Float32({})", v),
            FieldValue::Complex128(re, im) => write!(f, "Complex128({}+{}i)", re, im),
            FieldValue::Complex64(re, im) => write!(f, "Complex64({}+{}i)", re, im),
            FieldValue::String(v) => write!(f, "String({:?})", v),
            FieldValue::ByteString(v) => write!(f, "ByteString({:?})", String::from_utf8_lossy(v)),
            FieldValue::Binary(v) => write!(f, "Binary({} bytes)", v.len()),
            FieldValue::Duration(v) => write!(f, "Duration({:?})", v),
            FieldValue::Time(v) => write!(f, "Time({})", v.to_rfc3339()),
            other => f.write_str(other.type_name()),
        }
    }
}

macro_rules! impl_from_for_field_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(v: $ty) -> Self {
                    FieldValue::$variant(v)
                }
            }
        )*
    };
}

impl_from_for_field_value! {
    bool => Bool,
    i64 => Int64,
    i32 => Int32,
    i16 => Int16,
    i8 => Int8,
    u64 => Uint64,
    u32 => Uint32,
    u16 => Uint16,
    u8 => Uint8,
    usize => Uintptr,
    f64 => Float64,
    f32 => Float32,
    String => String,
    Duration => Duration,
    DateTime<Utc> => Time,
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

impl From<&String> for FieldValue {
    fn from(v: &String) -> Self {
        FieldValue::String(v.clone())
    }
}

/// A structured key-value pair
#[derive(Debug, Clone)]
pub struct Field {
    pub key: String,
    pub value: FieldValue,
}

impl Field {
    pub fn new(key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn binary(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: FieldValue::Binary(value.into()),
        }
    }

    pub fn byte_string(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: FieldValue::ByteString(value.into()),
        }
    }

    pub fn complex(key: impl Into<String>, re: f64, im: f64) -> Self {
        Self {
            key: key.into(),
            value: FieldValue::Complex128(re, im),
        }
    }

    pub fn complex64(key: impl Into<String>, re: f32, im: f32) -> Self {
        Self {
            key: key.into(),
            value: FieldValue::Complex64(re, im),
        }
    }

    /// Any serde-serializable value, rendered as JSON
    pub fn reflected<T: Serialize + Send + Sync + 'static>(key: impl Into<String>, value: T) -> Self {
        Self {
            key: key.into(),
            value: FieldValue::Reflected(Arc::new(value)),
        }
    }

    pub fn object<T: ObjectMarshaler + 'static>(key: impl Into<String>, value: T) -> Self {
        Self {
            key: key.into(),
            value: FieldValue::Object(Arc::new(value)),
        }
    }

    pub fn array<T: ArrayMarshaler + 'static>(key: impl Into<String>, value: T) -> Self {
        Self {
            key: key.into(),
            value: FieldValue::Array(Arc::new(value)),
        }
    }

    pub fn namespace(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: FieldValue::Namespace,
        }
    }

    /// `error` field carrying the error's display text
    pub fn error(err: &dyn std::error::Error) -> Self {
        Self::new("error", err.to_string())
    }

    /// Add this field to an object encoder
    ///
    /// A value that fails to encode is reported in place as a string field
    /// named `<key>Error` instead of aborting the entry.
    pub fn add_to<E: ObjectEncoder + ?Sized>(&self, enc: &mut E) {
        let key = self.key.as_str();
        let result = match &self.value {
            FieldValue::Bool(v) => {
                enc.add_bool(key, *v);
                Ok(())
            }
            FieldValue::Int64(v) => {
                enc.add_i64(key, *v);
                Ok(())
            }
            FieldValue::Int32(v) => {
                enc.add_i64(key, i64::from(*v));
                Ok(())
            }
            FieldValue::Int16(v) => {
                enc.add_i64(key, i64::from(*v));
                Ok(())
            }
            FieldValue::Int8(v) => {
                enc.add_i64(key, i64::from(*v));
                Ok(())
            }
            FieldValue::Uint64(v) => {
                enc.add_u64(key, *v);
                Ok(())
            }
            FieldValue::Uint32(v) => {
                enc.add_u64(key, u64::from(*v));
                Ok(())
            }
            FieldValue::Uint16(v) => {
                enc.add_u64(key, u64::from(*v));
                Ok(())
            }
            FieldValue::Uint8(v) => {
                enc.add_u64(key, u64::from(*v));
                Ok(())
            }
            FieldValue::Uintptr(v) => {
                enc.add_u64(key, *v as u64);
                Ok(())
            }
            FieldValue::Float64(v) => {
                enc.add_f64(key, *v);
                Ok(())
            }
            FieldValue::Float32(v) => {
                enc.add_f32(key, *v);
                Ok(())
            }
            FieldValue::Complex128(re, im) => {
                enc.add_complex128(key, *re, *im);
                Ok(())
            }
            FieldValue::Complex64(re, im) => {
                enc.add_complex64(key, *re, *im);
                Ok(())
            }
            FieldValue::String(v) => {
                enc.add_str(key, v);
                Ok(())
            }
            FieldValue::ByteString(v) => {
                enc.add_byte_string(key, v);
                Ok(())
            }
            FieldValue::Binary(v) => {
                enc.add_binary(key, v);
                Ok(())
            }
            FieldValue::Duration(v) => {
                enc.add_duration(key, *v);
                Ok(())
            }
            FieldValue::Time(v) => {
                enc.add_time(key, *v);
                Ok(())
            }
            FieldValue::Object(v) => enc.add_object(key, v.as_ref()),
            FieldValue::Array(v) => enc.add_array(key, v.as_ref()),
            FieldValue::Reflected(v) => enc.add_reflected(key, v.as_ref()),
            FieldValue::Namespace => {
                enc.open_namespace(key);
                Ok(())
            }
        };

        if let Err(e) = result {
            enc.add_str(&format!("{}Error", key), &e.to_string());
        }
    }
}

impl ObjectMarshaler for Vec<Field> {
    fn marshal_object(&self, enc: &mut dyn ObjectEncoder) -> Result<()> {
        for field in self {
            field.add_to(enc);
        }
        Ok(())
    }
}

impl ArrayMarshaler for Vec<FieldValue> {
    fn marshal_array(&self, enc: &mut dyn ArrayEncoder) -> Result<()> {
        for value in self {
            value.append_to(enc)?;
        }
        Ok(())
    }
}
