//! Sample models.

use dmlmodel::{ColumnKind, FieldInfo, Model};

/// Unsharded model using every column kind.
pub struct Hero;

impl Model for Hero {
    const TABLE_NAME: &'static str = "hero";

    fn fields() -> &'static [FieldInfo] {
        const FIELDS: &[FieldInfo] = &[
            FieldInfo::new("id", ColumnKind::Int),
            FieldInfo::new("name", ColumnKind::String),
            FieldInfo::new("power", ColumnKind::Float),
            FieldInfo::new("skills", ColumnKind::List),
            FieldInfo::new("stats", ColumnKind::Dict),
            FieldInfo::new("profile", ColumnKind::Json),
        ];
        FIELDS
    }
}

/// Model split across four physical tables.
pub struct Player;

impl Model for Player {
    const TABLE_NAME: &'static str = "player";
    const SHARD_COUNT: u32 = 4;

    fn fields() -> &'static [FieldInfo] {
        const FIELDS: &[FieldInfo] = &[
            FieldInfo::new("id", ColumnKind::Int),
            FieldInfo::new("name", ColumnKind::String),
            FieldInfo::new("level", ColumnKind::Int),
        ];
        FIELDS
    }
}
