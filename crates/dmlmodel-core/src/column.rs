//! Column kinds and their codecs.
//!
//! Every persistent field is declared with one of six [`ColumnKind`]s. A kind
//! owns a [`ColumnCodec`] that turns an in-memory [`Value`] into an
//! [`Encoded`] SQL literal (`dumps`) and turns the raw bytes of a result
//! column back into a `Value` (`loads`).
//!
//! Empty containers and empty JSON documents are written as SQL `NULL`, and
//! a `NULL` column reads back as the kind's canonical empty value.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use crate::error::{DecodeError, EncodeError};
use crate::escape::escape_string;
use crate::value::Value;

/// The closed set of column kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    /// UTF-8 text, escaped and quoted in SQL.
    String,
    /// Sequence of values, stored as an opaque binary object.
    List,
    /// String-keyed map of values, stored as an opaque binary object.
    Dict,
    /// JSON document, stored as escaped and quoted JSON text.
    Json,
    /// 64-bit signed integer.
    Int,
    /// 64-bit float.
    Float,
}

impl ColumnKind {
    /// All kinds, in declaration order.
    pub const ALL: [ColumnKind; 6] = [
        ColumnKind::String,
        ColumnKind::List,
        ColumnKind::Dict,
        ColumnKind::Json,
        ColumnKind::Int,
        ColumnKind::Float,
    ];

    /// Upper-case kind name.
    pub const fn as_str(self) -> &'static str {
        match self {
            ColumnKind::String => "STRING",
            ColumnKind::List => "LIST",
            ColumnKind::Dict => "DICT",
            ColumnKind::Json => "JSON",
            ColumnKind::Int => "INT",
            ColumnKind::Float => "FLOAT",
        }
    }

    /// Whether encoded values of this kind are wrapped in `'...'`.
    pub const fn is_quoted(self) -> bool {
        matches!(self, ColumnKind::String | ColumnKind::Json)
    }

    /// Whether this kind goes through the opaque binary object format.
    pub const fn is_opaque_binary(self) -> bool {
        matches!(self, ColumnKind::List | ColumnKind::Dict)
    }

    /// Whether `IN (...)` filters are allowed on this kind.
    pub const fn supports_membership(self) -> bool {
        matches!(self, ColumnKind::String | ColumnKind::Int)
    }

    /// The codec for this kind.
    pub fn codec(self) -> &'static dyn ColumnCodec {
        match self {
            ColumnKind::String => &StringCodec,
            ColumnKind::List => &ListCodec,
            ColumnKind::Dict => &DictCodec,
            ColumnKind::Json => &JsonCodec,
            ColumnKind::Int => &IntCodec,
            ColumnKind::Float => &FloatCodec,
        }
    }

    /// Shorthand for `self.codec().encode(value)`.
    pub fn dumps(self, value: &Value) -> Result<Encoded, EncodeError> {
        self.codec().encode(value)
    }

    /// Shorthand for `self.codec().decode(raw)`.
    pub fn loads(self, raw: Option<&[u8]>) -> Result<Value, DecodeError> {
        self.codec().decode(raw)
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value encoded for embedding in SQL text.
#[derive(Debug, Clone, PartialEq)]
pub enum Encoded {
    /// The `NULL` sentinel.
    Null,
    Int(i64),
    Float(f64),
    /// Escaped text, not yet quoted.
    Text(String),
    /// Opaque binary object bytes.
    Blob(Vec<u8>),
}

impl Encoded {
    /// Check if this is the `NULL` sentinel.
    pub const fn is_null(&self) -> bool {
        matches!(self, Encoded::Null)
    }

    /// Render as a SQL literal.
    ///
    /// `quoted` wraps text in single quotes. `NULL` is always bare and blobs
    /// always render as hexadecimal literals (`X'0A1B'`).
    pub fn render(&self, quoted: bool) -> String {
        match self {
            Encoded::Null => "NULL".to_string(),
            Encoded::Int(n) => n.to_string(),
            Encoded::Float(f) => f.to_string(),
            Encoded::Text(s) if quoted => format!("'{s}'"),
            Encoded::Text(s) => s.clone(),
            Encoded::Blob(bytes) => {
                let mut out = String::with_capacity(bytes.len() * 2 + 3);
                out.push_str("X'");
                for b in bytes {
                    let _ = write!(out, "{b:02X}");
                }
                out.push('\'');
                out
            }
        }
    }
}

/// Encode/decode behaviour for one column kind.
pub trait ColumnCodec: Send + Sync + fmt::Debug {
    /// The kind this codec serves.
    fn kind(&self) -> ColumnKind;

    /// `dumps`: in-memory value to SQL literal.
    fn encode(&self, value: &Value) -> Result<Encoded, EncodeError>;

    /// `loads`: raw result column (`None` for SQL NULL) to in-memory value.
    fn decode(&self, raw: Option<&[u8]>) -> Result<Value, DecodeError>;

    /// Whether this codec uses the opaque binary object format.
    fn is_opaque_binary(&self) -> bool {
        self.kind().is_opaque_binary()
    }
}

fn utf8(kind: ColumnKind, raw: &[u8]) -> Result<&str, DecodeError> {
    std::str::from_utf8(raw).map_err(|e| DecodeError::new(kind, format!("invalid UTF-8: {e}")))
}

fn mismatch(kind: ColumnKind, value: &Value) -> EncodeError {
    EncodeError::new(kind, format!("unsupported value type `{}`", value.type_name()))
}

/// `STRING` codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringCodec;

impl ColumnCodec for StringCodec {
    fn kind(&self) -> ColumnKind {
        ColumnKind::String
    }

    fn encode(&self, value: &Value) -> Result<Encoded, EncodeError> {
        Ok(match value {
            Value::Null => Encoded::Null,
            Value::Text(s) => Encoded::Text(escape_string(s)),
            other => Encoded::Text(escape_string(&other.to_string())),
        })
    }

    fn decode(&self, raw: Option<&[u8]>) -> Result<Value, DecodeError> {
        match raw {
            None | Some([]) => Ok(Value::Text(String::new())),
            Some(bytes) => Ok(Value::Text(utf8(ColumnKind::String, bytes)?.to_string())),
        }
    }
}

/// `INT` codec. `NULL` passes through both ways.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntCodec;

impl ColumnCodec for IntCodec {
    fn kind(&self) -> ColumnKind {
        ColumnKind::Int
    }

    #[allow(clippy::cast_possible_truncation)]
    fn encode(&self, value: &Value) -> Result<Encoded, EncodeError> {
        match value {
            Value::Null => Ok(Encoded::Null),
            Value::Int(n) => Ok(Encoded::Int(*n)),
            Value::Bool(b) => Ok(Encoded::Int(i64::from(*b))),
            Value::Float(f) if f.is_finite() && *f >= i64::MIN as f64 && *f < i64::MAX as f64 => {
                Ok(Encoded::Int(f.trunc() as i64))
            }
            Value::Text(s) => s.trim().parse::<i64>().map(Encoded::Int).map_err(|_| {
                EncodeError::new(ColumnKind::Int, format!("not an integer: {s:?}"))
            }),
            other => Err(mismatch(ColumnKind::Int, other)),
        }
    }

    fn decode(&self, raw: Option<&[u8]>) -> Result<Value, DecodeError> {
        let Some(bytes) = raw else {
            return Ok(Value::Null);
        };
        let text = utf8(ColumnKind::Int, bytes)?;
        text.trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| DecodeError::new(ColumnKind::Int, format!("not an integer: {text:?}")))
    }
}

/// `FLOAT` codec. `NULL` is written as `0.0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatCodec;

impl ColumnCodec for FloatCodec {
    fn kind(&self) -> ColumnKind {
        ColumnKind::Float
    }

    fn encode(&self, value: &Value) -> Result<Encoded, EncodeError> {
        let f = match value {
            Value::Null => 0.0,
            Value::Float(f) => *f,
            Value::Int(n) => *n as f64,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Text(s) => s.trim().parse::<f64>().map_err(|_| {
                EncodeError::new(ColumnKind::Float, format!("not a number: {s:?}"))
            })?,
            other => return Err(mismatch(ColumnKind::Float, other)),
        };
        if !f.is_finite() {
            return Err(EncodeError::new(
                ColumnKind::Float,
                format!("non-finite value {f} has no SQL literal"),
            ));
        }
        Ok(Encoded::Float(f))
    }

    fn decode(&self, raw: Option<&[u8]>) -> Result<Value, DecodeError> {
        let Some(bytes) = raw else {
            return Ok(Value::Null);
        };
        let text = utf8(ColumnKind::Float, bytes)?;
        text.trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| DecodeError::new(ColumnKind::Float, format!("not a number: {text:?}")))
    }
}

/// `JSON` codec.
///
/// Any truthy value is serialized to JSON text. Loading rebuilds the natural
/// value for the document (see [`Value::from_json`]), so `Dict`, `List`,
/// `Text`, `Int`, `Float` and `Bool` values read back unchanged while a
/// `Value::Json` reads back in that natural form.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl ColumnCodec for JsonCodec {
    fn kind(&self) -> ColumnKind {
        ColumnKind::Json
    }

    fn encode(&self, value: &Value) -> Result<Encoded, EncodeError> {
        if value.is_falsy() {
            return Ok(Encoded::Null);
        }
        let text = serde_json::to_string(&value.to_json())
            .map_err(|e| EncodeError::new(ColumnKind::Json, e.to_string()))?;
        Ok(Encoded::Text(escape_string(&text)))
    }

    fn decode(&self, raw: Option<&[u8]>) -> Result<Value, DecodeError> {
        match raw {
            None | Some([]) => Ok(Value::Null),
            Some(bytes) => {
                let text = utf8(ColumnKind::Json, bytes)?;
                serde_json::from_str(text)
                    .map(Value::from_json)
                    .map_err(|e| DecodeError::new(ColumnKind::Json, e.to_string()))
            }
        }
    }
}

/// `LIST` codec (opaque binary, CBOR).
#[derive(Debug, Clone, Copy, Default)]
pub struct ListCodec;

impl ColumnCodec for ListCodec {
    fn kind(&self) -> ColumnKind {
        ColumnKind::List
    }

    fn encode(&self, value: &Value) -> Result<Encoded, EncodeError> {
        if value.is_falsy() {
            return Ok(Encoded::Null);
        }
        let Value::List(items) = value else {
            return Err(mismatch(ColumnKind::List, value));
        };
        serde_cbor::to_vec(items)
            .map(Encoded::Blob)
            .map_err(|e| EncodeError::new(ColumnKind::List, e.to_string()))
    }

    fn decode(&self, raw: Option<&[u8]>) -> Result<Value, DecodeError> {
        match raw {
            None | Some([]) => Ok(Value::List(Vec::new())),
            Some(bytes) => serde_cbor::from_slice::<Vec<Value>>(bytes)
                .map(Value::List)
                .map_err(|e| DecodeError::new(ColumnKind::List, e.to_string())),
        }
    }
}

/// `DICT` codec (opaque binary, CBOR).
#[derive(Debug, Clone, Copy, Default)]
pub struct DictCodec;

impl ColumnCodec for DictCodec {
    fn kind(&self) -> ColumnKind {
        ColumnKind::Dict
    }

    fn encode(&self, value: &Value) -> Result<Encoded, EncodeError> {
        if value.is_falsy() {
            return Ok(Encoded::Null);
        }
        let Value::Dict(map) = value else {
            return Err(mismatch(ColumnKind::Dict, value));
        };
        serde_cbor::to_vec(map)
            .map(Encoded::Blob)
            .map_err(|e| EncodeError::new(ColumnKind::Dict, e.to_string()))
    }

    fn decode(&self, raw: Option<&[u8]>) -> Result<Value, DecodeError> {
        match raw {
            None | Some([]) => Ok(Value::Dict(BTreeMap::new())),
            Some(bytes) => serde_cbor::from_slice::<BTreeMap<String, Value>>(bytes)
                .map(Value::Dict)
                .map_err(|e| DecodeError::new(ColumnKind::Dict, e.to_string())),
        }
    }
}
