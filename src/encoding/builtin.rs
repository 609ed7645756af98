//! Ready-made primitive encodings.

use super::codec::Codec;
use super::primitive::PrimitiveEncoding;
use super::Value;
use crate::config::DEFAULT_BLOCK_SIZE;
use crate::error::Error;
use crate::io::DurableInput;
use bincode::Options;
use bytes::Buf;

fn mismatch(expected: &str, value: &Value) -> Error {
    Error::encoding(format!("expected {}, got {}", expected, value.kind()))
}

/// Big-endian 32-bit integers. Values must be `Int`s in `i32` range.
pub fn int32() -> PrimitiveEncoding {
    let codec = Codec::self_delimited(
        |value, out| {
            let v = value.as_int().ok_or_else(|| mismatch("int", value))?;
            let v = i32::try_from(v)
                .map_err(|_| Error::encoding(format!("{} does not fit in 32 bits", v)))?;
            out.write_i32(v)
        },
        |input, _| Ok(Value::Int(input.read_i32()? as i64)),
    );
    PrimitiveEncoding::new("int32", DEFAULT_BLOCK_SIZE, codec)
}

/// Big-endian 64-bit integers.
pub fn int64() -> PrimitiveEncoding {
    let codec = Codec::self_delimited(
        |value, out| out.write_i64(value.as_int().ok_or_else(|| mismatch("int", value))?),
        |input, _| Ok(Value::Int(input.read_i64()?)),
    );
    PrimitiveEncoding::new("int64", DEFAULT_BLOCK_SIZE, codec)
}

/// Big-endian IEEE-754 doubles.
pub fn float64() -> PrimitiveEncoding {
    let codec = Codec::self_delimited(
        |value, out| out.write_f64(value.as_float().ok_or_else(|| mismatch("float", value))?),
        |input, _| Ok(Value::Float(input.read_f64()?)),
    );
    PrimitiveEncoding::new("float64", DEFAULT_BLOCK_SIZE, codec)
}

/// UTF-8 strings, each written as a VLQ byte length followed by the bytes.
pub fn utf8() -> PrimitiveEncoding {
    let codec = Codec::self_delimited(
        |value, out| {
            let s = value.as_str().ok_or_else(|| mismatch("str", value))?;
            out.write_vlq(s.len() as u64)?;
            out.write_all(s.as_bytes())
        },
        |input, _| {
            let len = input.read_vlq()?;
            let len = usize::try_from(len)
                .map_err(|_| Error::corruption(format!("string length {} too large", len)))?;
            let bytes = input.read_bytes(len)?;
            let s = std::str::from_utf8(&bytes)
                .map_err(|e| Error::encoding(format!("invalid UTF-8: {}", e)))?;
            Ok(Value::Str(s.to_string()))
        },
    );
    PrimitiveEncoding::new("utf8", DEFAULT_BLOCK_SIZE, codec)
}

/// Opaque byte strings. Each value fills its own block, so no length is
/// written and skipping never touches the payload.
pub fn bytes() -> PrimitiveEncoding {
    let codec = Codec::undelimited(
        |value, out| out.write_all(value.as_bytes().ok_or_else(|| mismatch("bytes", value))?),
        |input, _| {
            let len = input.remaining();
            Ok(Value::Bytes(input.read_bytes(len)?))
        },
    );
    PrimitiveEncoding::new("bytes", DEFAULT_BLOCK_SIZE, codec)
}

/// Any [`Value`], serialized with `bincode`.
///
/// Decoding never reads past the end of the block, so a corrupt length
/// prefix fails instead of allocating.
///
/// Suited to schema-free collections, typically through
/// [`unityped`](super::unityped).
pub fn bincode_values() -> PrimitiveEncoding {
    let codec = Codec::self_delimited(
        |value, out| {
            let encoded = bincode::serialize(value)?;
            out.write_all(&encoded)
        },
        |input, _| {
            let limit = input.remaining() as u64;
            let value: Value = bincode::DefaultOptions::new()
                .with_fixint_encoding()
                .allow_trailing_bytes()
                .with_limit(limit)
                .deserialize_from(Buf::reader(&mut *input))?;
            Ok(value)
        },
    );
    PrimitiveEncoding::new("bincode", DEFAULT_BLOCK_SIZE, codec)
}
