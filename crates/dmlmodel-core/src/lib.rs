//! Core types and traits for DmlModel.
//!
//! `dmlmodel-core` is the **foundation layer**: everything the query builder
//! needs to turn typed values into SQL text and raw result bytes back into
//! typed values.
//!
//! # Role In The Architecture
//!
//! - **Column system**: `ColumnKind` and the per-kind `ColumnCodec`
//!   implementations own value encoding (`dumps`) and decoding (`loads`),
//!   including string escaping and the opaque binary format for containers.
//! - **Model metadata**: the `Model` trait and `ModelDescriptor` describe a
//!   table, its fields and its shard layout.
//! - **Contract layer**: `ExecutionChannel` is the only thing a host has to
//!   implement to plug in a real database.
//! - **Structured concurrency**: re-exports `Cx` and `Outcome` from asupersync so every
//!   dispatched statement is cancel-correct.
//!
//! Most applications should use the `dmlmodel` facade; reach for `dmlmodel-core`
//! directly when implementing an execution channel.

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Cx, Outcome};

pub mod channel;
pub mod column;
pub mod error;
pub mod escape;
pub mod model;
pub mod record;
pub mod value;

pub use channel::{Completion, ContextToken, ExecutionChannel, RawRow};
pub use column::{
    ColumnCodec, ColumnKind, DictCodec, Encoded, FloatCodec, IntCodec, JsonCodec, ListCodec,
    StringCodec,
};
pub use error::{
    ChannelError, DecodeError, EncodeError, Error, Result, UsageError, UsageErrorKind,
};
pub use escape::escape_string;
pub use model::{FieldInfo, Model, ModelDescriptor, is_valid_identifier};
pub use record::Record;
pub use value::Value;
