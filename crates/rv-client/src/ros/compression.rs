//! Message compression and CBOR decoding
//!
//! With CBOR compression rosbridge publishes binary frames in which numeric
//! arrays (such as the `data` of an occupancy grid) are RFC 8746 typed
//! arrays: a tag wrapping a byte string. They are unpacked into plain JSON
//! number arrays so messages look the same as with JSON transport.

use ciborium::value::Value as CborValue;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::RosError;

/// Transport compression requested for a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    None,
    #[default]
    Cbor,
}

impl Compression {
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Cbor => "cbor",
        }
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Compression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Compression::None),
            "cbor" => Ok(Compression::Cbor),
            other => Err(format!("unknown compression '{other}'")),
        }
    }
}

const TAG_UINT8: u64 = 64;
const TAG_UINT8_CLAMPED: u64 = 68;
const TAG_UINT16_LE: u64 = 69;
const TAG_UINT32_LE: u64 = 70;
const TAG_UINT64_LE: u64 = 71;
const TAG_INT8: u64 = 72;
const TAG_INT16_LE: u64 = 77;
const TAG_INT32_LE: u64 = 78;
const TAG_INT64_LE: u64 = 79;
const TAG_FLOAT32_LE: u64 = 85;
const TAG_FLOAT64_LE: u64 = 86;

/// Decode a CBOR frame into a JSON value
pub fn decode_cbor(bytes: &[u8]) -> Result<Value, RosError> {
    let value: CborValue =
        ciborium::de::from_reader(bytes).map_err(|e| RosError::Cbor(e.to_string()))?;
    cbor_to_json(value)
}

fn cbor_to_json(value: CborValue) -> Result<Value, RosError> {
    Ok(match value {
        CborValue::Null => Value::Null,
        CborValue::Bool(b) => Value::Bool(b),
        CborValue::Text(s) => Value::String(s),
        CborValue::Integer(i) => integer_to_json(i128::from(i))?,
        CborValue::Float(f) => float_to_json(f),
        // Untagged byte strings are uint8 arrays
        CborValue::Bytes(bytes) => typed_array(TAG_UINT8, &bytes)?,
        CborValue::Tag(tag, inner) => match *inner {
            CborValue::Bytes(bytes) => typed_array(tag, &bytes)?,
            other => cbor_to_json(other)?,
        },
        CborValue::Array(items) => Value::Array(
            items
                .into_iter()
                .map(cbor_to_json)
                .collect::<Result<_, _>>()?,
        ),
        CborValue::Map(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (key, value) in entries {
                let key = match key {
                    CborValue::Text(s) => s,
                    CborValue::Integer(i) => i128::from(i).to_string(),
                    other => {
                        return Err(RosError::Cbor(format!("unsupported map key {other:?}")));
                    }
                };
                map.insert(key, cbor_to_json(value)?);
            }
            Value::Object(map)
        }
        other => return Err(RosError::Cbor(format!("unsupported value {other:?}"))),
    })
}

fn integer_to_json(i: i128) -> Result<Value, RosError> {
    if let Ok(v) = i64::try_from(i) {
        Ok(Value::Number(v.into()))
    } else if let Ok(v) = u64::try_from(i) {
        Ok(Value::Number(v.into()))
    } else {
        Err(RosError::Cbor(format!("integer {i} out of range")))
    }
}

fn float_to_json(f: f64) -> Value {
    Number::from_f64(f).map_or(Value::Null, Value::Number)
}

/// Unpack an RFC 8746 typed array
fn typed_array(tag: u64, bytes: &[u8]) -> Result<Value, RosError> {
    fn chunks<const N: usize>(bytes: &[u8]) -> Result<impl Iterator<Item = [u8; N]> + '_, RosError> {
        if bytes.len() % N != 0 {
            return Err(RosError::Cbor(format!(
                "typed array of {} bytes is not a multiple of {}",
                bytes.len(),
                N
            )));
        }
        Ok(bytes
            .chunks_exact(N)
            .map(|c| <[u8; N]>::try_from(c).unwrap_or([0; N])))
    }

    let values: Vec<Value> = match tag {
        TAG_UINT8 | TAG_UINT8_CLAMPED => bytes.iter().map(|b| Value::from(*b)).collect(),
        TAG_INT8 => bytes.iter().map(|b| Value::from(*b as i8)).collect(),
        TAG_UINT16_LE => chunks::<2>(bytes)?.map(|c| Value::from(u16::from_le_bytes(c))).collect(),
        TAG_UINT32_LE => chunks::<4>(bytes)?.map(|c| Value::from(u32::from_le_bytes(c))).collect(),
        TAG_UINT64_LE => chunks::<8>(bytes)?.map(|c| Value::from(u64::from_le_bytes(c))).collect(),
        TAG_INT16_LE => chunks::<2>(bytes)?.map(|c| Value::from(i16::from_le_bytes(c))).collect(),
        TAG_INT32_LE => chunks::<4>(bytes)?.map(|c| Value::from(i32::from_le_bytes(c))).collect(),
        TAG_INT64_LE => chunks::<8>(bytes)?.map(|c| Value::from(i64::from_le_bytes(c))).collect(),
        TAG_FLOAT32_LE => chunks::<4>(bytes)?
            .map(|c| float_to_json(f32::from_le_bytes(c) as f64))
            .collect(),
        TAG_FLOAT64_LE => chunks::<8>(bytes)?
            .map(|c| float_to_json(f64::from_le_bytes(c)))
            .collect(),
        other => return Err(RosError::Cbor(format!("unsupported typed array tag {other}"))),
    };
    Ok(Value::Array(values))
}
