//! Model declarations and the runtime descriptor built from them.
//!
//! A model is declared once, statically, with its table name, its fields
//! and their column kinds, and optionally a shard count:
//!
//! ```
//! use dmlmodel_core::{ColumnKind, FieldInfo, Model, ModelDescriptor};
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
//!         ];
//!         FIELDS
//!     }
//! }
//!
//! let descriptor = ModelDescriptor::of::<Player>().unwrap();
//! assert_eq!(descriptor.resolve_table(7), "player_3");
//! ```

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::column::ColumnKind;
use crate::error::{Error, Result, UsageErrorKind};

/// Static metadata for one persistent field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
    /// Column name
    pub name: &'static str,
    /// Declared column kind
    pub kind: ColumnKind,
}

impl FieldInfo {
    pub const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self { name, kind }
    }
}

/// Static declaration of a persistent entity.
pub trait Model {
    /// Base table name.
    const TABLE_NAME: &'static str;

    /// Number of physical tables the entity is split across (0 = unsharded).
    const SHARD_COUNT: u32 = 0;

    /// Declared fields.
    fn fields() -> &'static [FieldInfo];
}

const IDENTIFIER_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

fn identifier_regex() -> Option<&'static Regex> {
    static IDENT: OnceLock<Option<Regex>> = OnceLock::new();
    IDENT
        .get_or_init(|| match Regex::new(IDENTIFIER_PATTERN) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::error!(error = %e, "identifier pattern failed to compile");
                None
            }
        })
        .as_ref()
}

/// Check that `name` is a bare SQL identifier.
pub fn is_valid_identifier(name: &str) -> bool {
    identifier_regex().is_some_and(|re| re.is_match(name))
}

/// Immutable runtime description of a model.
///
/// Shared by every query builder bound to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDescriptor {
    table: String,
    fields: Vec<(String, ColumnKind)>,
    index: HashMap<String, usize>,
    shard_count: u32,
}

impl ModelDescriptor {
    /// Build a descriptor from a table name and `(field, kind)` pairs.
    ///
    /// Fails with [`UsageErrorKind::InvalidModel`] for an empty table, an
    /// empty field list, a duplicated field or a name that is not a bare
    /// identifier.
    pub fn new<I, S>(table: impl Into<String>, fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, ColumnKind)>,
        S: Into<String>,
    {
        let table = table.into();
        if table.is_empty() {
            return Err(Error::usage(UsageErrorKind::InvalidModel, "table name is empty"));
        }
        if !is_valid_identifier(&table) {
            return Err(Error::usage(
                UsageErrorKind::InvalidModel,
                format!("invalid table name `{table}`"),
            ));
        }

        let mut ordered = Vec::new();
        let mut index = HashMap::new();
        for (name, kind) in fields {
            let name = name.into();
            if !is_valid_identifier(&name) {
                return Err(Error::usage(
                    UsageErrorKind::InvalidModel,
                    format!("invalid field name `{name}` on `{table}`"),
                ));
            }
            if index.insert(name.clone(), ordered.len()).is_some() {
                return Err(Error::usage(
                    UsageErrorKind::InvalidModel,
                    format!("field `{name}` declared twice on `{table}`"),
                ));
            }
            ordered.push((name, kind));
        }
        if ordered.is_empty() {
            return Err(Error::usage(
                UsageErrorKind::InvalidModel,
                format!("model `{table}` declares no fields"),
            ));
        }

        Ok(Self {
            table,
            fields: ordered,
            index,
            shard_count: 0,
        })
    }

    /// Build the descriptor for a statically declared model.
    pub fn of<M: Model>() -> Result<Self> {
        let descriptor = Self::new(
            M::TABLE_NAME,
            M::fields().iter().map(|f| (f.name, f.kind)),
        )?;
        Ok(descriptor.with_shards(M::SHARD_COUNT))
    }

    /// Set the shard count (0 = unsharded).
    #[must_use]
    pub fn with_shards(mut self, shard_count: u32) -> Self {
        self.shard_count = shard_count;
        self
    }

    /// Base table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Declared fields, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, ColumnKind)> {
        self.fields.iter().map(|(name, kind)| (name.as_str(), *kind))
    }

    /// Number of declared fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Column kind of `field`, if declared.
    pub fn field_kind(&self, field: &str) -> Option<ColumnKind> {
        self.index.get(field).map(|&i| self.fields[i].1)
    }

    pub fn shard_count(&self) -> u32 {
        self.shard_count
    }

    pub fn is_sharded(&self) -> bool {
        self.shard_count > 0
    }

    /// Physical table for `shard_key`.
    ///
    /// Unsharded models always return the base table; otherwise the result
    /// is `{table}_{shard_key mod shard_count}` with a non-negative remainder.
    pub fn resolve_table(&self, shard_key: i64) -> String {
        if self.shard_count == 0 {
            return self.table.clone();
        }
        let slot = shard_key.rem_euclid(i64::from(self.shard_count));
        format!("{}_{}", self.table, slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Player;

    impl Model for Player {
        const TABLE_NAME: &'static str = "player";
        const SHARD_COUNT: u32 = 4;

        fn fields() -> &'static [FieldInfo] {
            const FIELDS: &[FieldInfo] = &[
                FieldInfo::new("id", ColumnKind::Int),
                FieldInfo::new("name", ColumnKind::String),
                FieldInfo::new("bag", ColumnKind::List),
            ];
            FIELDS
        }
    }

    #[test]
    fn test_resolve_table_sharded() {
        let descriptor = ModelDescriptor::of::<Player>().unwrap();
        assert_eq!(descriptor.resolve_table(7), "player_3");
        assert_eq!(descriptor.resolve_table(8), "player_0");
        assert_eq!(descriptor.resolve_table(-1), "player_3");
    }

    #[test]
    fn test_resolve_table_unsharded() {
        let descriptor = ModelDescriptor::of::<Player>().unwrap().with_shards(0);
        assert_eq!(descriptor.resolve_table(7), "player");
        assert!(!descriptor.is_sharded());
    }

    #[test]
    fn test_field_lookup() {
        let descriptor = ModelDescriptor::of::<Player>().unwrap();
        assert_eq!(descriptor.field_kind("bag"), Some(ColumnKind::List));
        assert_eq!(descriptor.field_kind("missing"), None);
        assert_eq!(descriptor.field_count(), 3);
        let names: Vec<_> = descriptor.fields().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["id", "name", "bag"]);
    }

    #[test]
    fn test_rejects_invalid_declarations() {
        let empty_table = ModelDescriptor::new("", [("id", ColumnKind::Int)]).unwrap_err();
        assert_eq!(empty_table.usage_kind(), Some(UsageErrorKind::InvalidModel));

        let no_fields = ModelDescriptor::new("t", Vec::<(String, ColumnKind)>::new());
        assert!(no_fields.is_err());

        let bad_field = ModelDescriptor::new("t", [("a b", ColumnKind::Int)]);
        assert!(bad_field.is_err());

        let bad_table = ModelDescriptor::new("t;drop", [("a", ColumnKind::Int)]);
        assert!(bad_table.is_err());

        let duplicate =
            ModelDescriptor::new("t", [("a", ColumnKind::Int), ("a", ColumnKind::Float)]);
        assert!(duplicate.is_err());
    }

    #[test]
    fn test_identifier_validation() {
        assert!(is_valid_identifier("_avatar2"));
        assert!(!is_valid_identifier("2fast"));
        assert!(!is_valid_identifier("name`"));
    }
}
