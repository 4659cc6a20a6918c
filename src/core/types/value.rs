//! Fixed-size value codec and scatter write payloads

use super::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A plain value with a fixed little-endian memory representation
pub trait MemoryPrimitive: Copy + Sized {
    /// Size in bytes of the in-memory representation
    const SIZE: usize;

    /// Decodes from the first `SIZE` bytes of `bytes`
    ///
    /// Callers must pass at least `SIZE` bytes.
    fn from_bytes(bytes: &[u8]) -> Self;

    /// Appends the in-memory representation to `out`
    fn write_bytes(&self, out: &mut Vec<u8>);

    /// Encodes into a fresh buffer of exactly `SIZE` bytes
    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        self.write_bytes(&mut out);
        out
    }
}

macro_rules! impl_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl MemoryPrimitive for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn from_bytes(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&bytes[..Self::SIZE]);
                    <$ty>::from_le_bytes(raw)
                }

                fn write_bytes(&self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_primitive!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

impl MemoryPrimitive for bool {
    const SIZE: usize = 1;

    fn from_bytes(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    fn write_bytes(&self, out: &mut Vec<u8>) {
        out.push(u8::from(*self));
    }
}

impl MemoryPrimitive for Address {
    const SIZE: usize = 8;

    fn from_bytes(bytes: &[u8]) -> Self {
        Address(u64::from_bytes(bytes))
    }

    fn write_bytes(&self, out: &mut Vec<u8>) {
        self.0.write_bytes(out);
    }
}

impl<T: MemoryPrimitive, const N: usize> MemoryPrimitive for [T; N] {
    const SIZE: usize = T::SIZE * N;

    fn from_bytes(bytes: &[u8]) -> Self {
        std::array::from_fn(|i| T::from_bytes(&bytes[i * T::SIZE..]))
    }

    fn write_bytes(&self, out: &mut Vec<u8>) {
        for item in self {
            item.write_bytes(out);
        }
    }
}

/// Payload of a single scatter write
///
/// The set of variants is closed: serialization is a total match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum WriteValue {
    I32(i32),
    F32(f32),
    U64(u64),
    Bool(bool),
    U8(u8),
}

impl WriteValue {
    /// Returns the exact byte width written to memory
    pub fn size(&self) -> usize {
        match self {
            WriteValue::I32(_) => i32::SIZE,
            WriteValue::F32(_) => f32::SIZE,
            WriteValue::U64(_) => u64::SIZE,
            WriteValue::Bool(_) => bool::SIZE,
            WriteValue::U8(_) => u8::SIZE,
        }
    }

    /// Converts the value to its in-memory bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            WriteValue::I32(v) => v.to_bytes(),
            WriteValue::F32(v) => v.to_bytes(),
            WriteValue::U64(v) => v.to_bytes(),
            WriteValue::Bool(v) => v.to_bytes(),
            WriteValue::U8(v) => v.to_bytes(),
        }
    }

    /// Short name of the payload kind, for logs
    pub fn kind(&self) -> &'static str {
        match self {
            WriteValue::I32(_) => "i32",
            WriteValue::F32(_) => "f32",
            WriteValue::U64(_) => "u64",
            WriteValue::Bool(_) => "bool",
            WriteValue::U8(_) => "u8",
        }
    }
}

impl fmt::Display for WriteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteValue::I32(v) => write!(f, "{}i32", v),
            WriteValue::F32(v) => write!(f, "{}f32", v),
            WriteValue::U64(v) => write!(f, "{}u64", v),
            WriteValue::Bool(v) => write!(f, "{}", v),
            WriteValue::U8(v) => write!(f, "{}u8", v),
        }
    }
}

impl From<i32> for WriteValue {
    fn from(v: i32) -> Self {
        WriteValue::I32(v)
    }
}

impl From<f32> for WriteValue {
    fn from(v: f32) -> Self {
        WriteValue::F32(v)
    }
}

impl From<u64> for WriteValue {
    fn from(v: u64) -> Self {
        WriteValue::U64(v)
    }
}

impl From<bool> for WriteValue {
    fn from(v: bool) -> Self {
        WriteValue::Bool(v)
    }
}

impl From<u8> for WriteValue {
    fn from(v: u8) -> Self {
        WriteValue::U8(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_primitive_sizes() {
        assert_eq!(u8::SIZE, 1);
        assert_eq!(i32::SIZE, 4);
        assert_eq!(f64::SIZE, 8);
        assert_eq!(bool::SIZE, 1);
        assert_eq!(Address::SIZE, 8);
        assert_eq!(<[f32; 3]>::SIZE, 12);
    }

    #[test]
    fn test_primitive_decoding() {
        assert_eq!(u32::from_bytes(&[0x78, 0x56, 0x34, 0x12]), 0x12345678);
        assert_eq!(i16::from_bytes(&[0xFF, 0xFF, 0xAA]), -1);
        assert!(bool::from_bytes(&[2]));
        assert!(!bool::from_bytes(&[0]));
        assert_eq!(
            Address::from_bytes(&0x7FF6_0000_1000u64.to_le_bytes()),
            Address::new(0x7FF6_0000_1000)
        );
    }

    #[test]
    fn test_array_codec() {
        let vector = [1.0f32, -2.5, 3.25];
        let bytes = vector.to_bytes();
        assert_eq!(bytes.len(), 12);
        assert_eq!(<[f32; 3]>::from_bytes(&bytes), vector);
    }

    #[test]
    fn test_write_value_bytes() {
        assert_eq!(WriteValue::I32(-1).to_bytes(), vec![0xFF; 4]);
        assert_eq!(WriteValue::F32(1.0).to_bytes(), 1.0f32.to_le_bytes().to_vec());
        assert_eq!(WriteValue::U64(1).to_bytes(), vec![1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(WriteValue::Bool(true).to_bytes(), vec![1]);
        assert_eq!(WriteValue::U8(0xAB).to_bytes(), vec![0xAB]);
    }

    #[test]
    fn test_write_value_size_matches_bytes() {
        let values = [
            WriteValue::I32(7),
            WriteValue::F32(1.8),
            WriteValue::U64(u64::MAX),
            WriteValue::Bool(false),
            WriteValue::U8(3),
        ];
        for value in values {
            assert_eq!(value.size(), value.to_bytes().len(), "{}", value.kind());
        }
    }

    #[test]
    fn test_write_value_serde() {
        let json = serde_json::to_string(&WriteValue::F32(1.5)).unwrap();
        assert_eq!(json, r#"{"type":"f32","value":1.5}"#);
        let back: WriteValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, WriteValue::F32(1.5));
    }
}
