//! DmlModel: typed query building and result marshalling over a raw SQL
//! execution channel.
//!
//! Declare a model once, bind a [`Dml`] builder to it and an
//! [`ExecutionChannel`], then chain filters and finish with a terminal
//! operation:
//!
//! ```ignore
//! use dmlmodel::prelude::*;
//!
//! struct Player;
//!
//! impl Model for Player {
//!     const TABLE_NAME: &'static str = "player";
//!     const SHARD_COUNT: u32 = 4;
//!
//!     fn fields() -> &'static [FieldInfo] {
//!         const FIELDS: &[FieldInfo] = &[
//!             FieldInfo::new("id", ColumnKind::Int),
//!             FieldInfo::new("name", ColumnKind::String),
//!             FieldInfo::new("bag", ColumnKind::List),
//!         ];
//!         FIELDS
//!     }
//! }
//!
//! let mut players = Dml::for_model::<Player>(channel)?;
//! let id = players
//!     .shard(7)
//!     .insert(&cx, &Record::new().with("id", 7).with("name", "ayla"))
//!     .await;
//! let rows = players.shard(7).eq("id", 7).find(&cx, &["name", "bag"]).await;
//! ```
//!
//! The crate re-exports `dmlmodel-core` (values, column codecs, models,
//! errors, the channel contract) and `dmlmodel-query` (the builder, the
//! renderer and configuration).

pub use dmlmodel_core::{
    ChannelError, ColumnCodec, ColumnKind, Completion, ContextToken, Cx, DecodeError,
    EncodeError, Encoded, Error, ExecutionChannel, FieldInfo, Model, ModelDescriptor, Outcome,
    RawRow, Record, Result, UsageError, UsageErrorKind, Value, escape_string,
};
pub use dmlmodel_query::{Direction, Dml, DmlConfig, FilterOp, FilterSet, Statement};

// Sub-crates, for access to everything they export.
pub use dmlmodel_core;
pub use dmlmodel_query;

/// Everything an application usually needs.
pub mod prelude {
    pub use dmlmodel_core::{
        ColumnKind, Completion, ContextToken, Cx, Error, ExecutionChannel, FieldInfo, Model,
        ModelDescriptor, Outcome, Record, Value,
    };
    pub use dmlmodel_query::{Direction, Dml, DmlConfig, Statement};
}
