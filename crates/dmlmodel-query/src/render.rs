//! Stateless statement rendering.
//!
//! Every function here is pure: it takes already-validated inputs and returns
//! SQL text in the MySQL dialect (bare identifiers, `'...'` strings, comma
//! separated lists without spaces).

use dmlmodel_core::{
    ColumnKind, ContextToken, Encoded, Error, ModelDescriptor, Record, Result, UsageErrorKind,
    Value,
};

use crate::filter::FilterSet;

/// A fully rendered statement, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// SQL text.
    pub sql: String,
    /// Physical table the statement targets.
    pub table: String,
    /// Execution context forwarded to the channel.
    pub context: Option<ContextToken>,
}

/// Encode `value` for `field` into a SQL literal.
///
/// Quotes `STRING`/`JSON` values; `NULL` stays bare.
pub fn encode_literal(model: &ModelDescriptor, field: &str, value: &Value) -> Result<String> {
    let (kind, encoded) = encode(model, field, value)?;
    Ok(encoded.render(kind.is_quoted()))
}

/// Encode `value` as the right-hand side of a filter on `field`.
///
/// A comparison with `NULL` never matches, so a `Null` value, or one the
/// field's kind stores as `NULL` (an empty list, say), is a
/// [`UsageErrorKind::NullFilter`] error.
pub fn encode_filter_literal(
    model: &ModelDescriptor,
    field: &str,
    value: &Value,
) -> Result<String> {
    let (kind, encoded) = encode(model, field, value)?;
    if value.is_null() || matches!(encoded, Encoded::Null) {
        return Err(Error::usage(
            UsageErrorKind::NullFilter,
            format!("`{field}` cannot be compared with NULL"),
        ));
    }
    Ok(encoded.render(kind.is_quoted()))
}

fn encode(model: &ModelDescriptor, field: &str, value: &Value) -> Result<(ColumnKind, Encoded)> {
    let Some(kind) = model.field_kind(field) else {
        return Err(Error::usage(
            UsageErrorKind::UnknownField,
            format!("`{field}` is not a field of `{}`", model.table()),
        ));
    };
    let encoded = kind.dumps(value).map_err(|source| Error::Encode {
        field: field.to_string(),
        source,
    })?;
    Ok((kind, encoded))
}

/// Encode every entry of `record`, keeping its field order.
///
/// Fails with [`UsageErrorKind::EmptyData`] for an empty record.
pub fn encode_record(model: &ModelDescriptor, record: &Record) -> Result<Vec<(String, String)>> {
    if record.is_empty() {
        return Err(Error::usage(
            UsageErrorKind::EmptyData,
            format!("no data given for `{}`", model.table()),
        ));
    }
    record
        .iter()
        .map(|(field, value)| Ok((field.to_string(), encode_literal(model, field, value)?)))
        .collect()
}

fn assignments(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(field, literal)| format!("{field}={literal}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn push_where(sql: &mut String, filters: &FilterSet) {
    if let Some(condition) = filters.where_clause() {
        sql.push_str(" WHERE ");
        sql.push_str(&condition);
    }
}

/// `INSERT INTO t (a,b) VALUES (1,'x')`, with an optional
/// `ON DUPLICATE KEY UPDATE a=2` tail.
pub fn insert_sql(table: &str, row: &[(String, String)], on_duplicate: Option<&[(String, String)]>) -> String {
    let columns: Vec<&str> = row.iter().map(|(f, _)| f.as_str()).collect();
    let values: Vec<&str> = row.iter().map(|(_, v)| v.as_str()).collect();
    let mut sql = format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        columns.join(","),
        values.join(",")
    );
    if let Some(update) = on_duplicate {
        sql.push_str(" ON DUPLICATE KEY UPDATE ");
        sql.push_str(&assignments(update));
    }
    sql
}

/// `INSERT INTO t (a,b) VALUES (1,'x'),(2,'y')`.
pub fn insert_many_sql(table: &str, columns: &[String], rows: &[Vec<String>]) -> String {
    let groups: Vec<String> = rows.iter().map(|row| format!("({})", row.join(","))).collect();
    format!(
        "INSERT INTO {table} ({}) VALUES {}",
        columns.join(","),
        groups.join(",")
    )
}

/// `SELECT a,b FROM t [WHERE ..] [ORDER BY ..] [LIMIT n]`.
pub fn select_sql(table: &str, fields: &[String], filters: &FilterSet) -> String {
    let mut sql = format!("SELECT {} FROM {table}", fields.join(","));
    push_where(&mut sql, filters);
    sql.push_str(&filters.order_clause());
    sql.push_str(&filters.limit_clause());
    sql
}

/// `UPDATE t SET a=1,b='x' WHERE ..`.
pub fn update_sql(table: &str, data: &[(String, String)], filters: &FilterSet) -> String {
    let mut sql = format!("UPDATE {table} SET {}", assignments(data));
    push_where(&mut sql, filters);
    sql
}

/// `DELETE FROM t [WHERE ..]`.
pub fn delete_sql(table: &str, filters: &FilterSet) -> String {
    let mut sql = format!("DELETE FROM {table}");
    push_where(&mut sql, filters);
    sql
}

/// `SELECT COUNT(*) FROM t [WHERE ..]`.
pub fn count_sql(table: &str, filters: &FilterSet) -> String {
    let mut sql = format!("SELECT COUNT(*) FROM {table}");
    push_where(&mut sql, filters);
    sql
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Direction, FilterOp};

    fn player() -> ModelDescriptor {
        ModelDescriptor::new(
            "player",
            [
                ("id", ColumnKind::Int),
                ("name", ColumnKind::String),
                ("gold", ColumnKind::Float),
                ("bag", ColumnKind::List),
                ("profile", ColumnKind::Json),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_encode_literal_quotes_by_kind() {
        let model = player();
        assert_eq!(encode_literal(&model, "id", &Value::Int(3)).unwrap(), "3");
        assert_eq!(encode_literal(&model, "name", &"o'neil".into()).unwrap(), "'o\\'neil'");
        assert_eq!(encode_literal(&model, "name", &Value::Null).unwrap(), "NULL");
        assert_eq!(encode_literal(&model, "gold", &Value::Null).unwrap(), "0");
        assert_eq!(encode_literal(&model, "bag", &Value::List(vec![])).unwrap(), "NULL");
        assert_eq!(
            encode_literal(&model, "profile", &serde_json::json!({"a": 1}).into()).unwrap(),
            "'{\\\"a\\\":1}'"
        );
        assert!(encode_literal(&model, "bag", &Value::List(vec![1.into()]))
            .unwrap()
            .starts_with("X'"));
    }

    #[test]
    fn test_filter_literal_rejects_null() {
        let model = player();
        for (field, value) in [
            ("name", Value::Null),
            ("gold", Value::Null),
            ("bag", Value::List(vec![])),
        ] {
            let err = encode_filter_literal(&model, field, &value).unwrap_err();
            assert_eq!(err.usage_kind(), Some(UsageErrorKind::NullFilter));
        }
        assert_eq!(encode_filter_literal(&model, "name", &"".into()).unwrap(), "''");
        assert_eq!(encode_filter_literal(&model, "gold", &Value::Int(0)).unwrap(), "0");
        assert_eq!(encode_filter_literal(&model, "name", &"NULL".into()).unwrap(), "'NULL'");
    }

    #[test]
    fn test_encode_literal_rejects_unknown_and_bad_values() {
        let model = player();
        let unknown = encode_literal(&model, "mana", &Value::Int(1)).unwrap_err();
        assert_eq!(unknown.usage_kind(), Some(UsageErrorKind::UnknownField));
        let bad = encode_literal(&model, "id", &"ten".into()).unwrap_err();
        assert!(matches!(bad, Error::Encode { ref field, .. } if field == "id"));
    }

    #[test]
    fn test_encode_record_empty() {
        let err = encode_record(&player(), &Record::new()).unwrap_err();
        assert_eq!(err.usage_kind(), Some(UsageErrorKind::EmptyData));
    }

    #[test]
    fn test_insert_and_upsert_sql() {
        let model = player();
        let row = encode_record(&model, &Record::new().with("id", 1).with("name", "ayla")).unwrap();
        assert_eq!(
            insert_sql("player", &row, None),
            "INSERT INTO player (id,name) VALUES (1,'ayla')"
        );
        let update = encode_record(&model, &Record::new().with("name", "bo")).unwrap();
        assert_eq!(
            insert_sql("player", &row, Some(&update)),
            "INSERT INTO player (id,name) VALUES (1,'ayla') ON DUPLICATE KEY UPDATE name='bo'"
        );
    }

    #[test]
    fn test_insert_many_sql() {
        let sql = insert_many_sql(
            "player",
            &["id".to_string(), "name".to_string()],
            &[
                vec!["1".to_string(), "'a'".to_string()],
                vec!["2".to_string(), "'b'".to_string()],
            ],
        );
        assert_eq!(sql, "INSERT INTO player (id,name) VALUES (1,'a'),(2,'b')");
    }

    #[test]
    fn test_select_update_delete_count_sql() {
        let mut filters = FilterSet::new();
        assert_eq!(
            select_sql("player", &["id".to_string()], &filters),
            "SELECT id FROM player"
        );
        assert_eq!(delete_sql("player", &filters), "DELETE FROM player");
        assert_eq!(count_sql("player", &filters), "SELECT COUNT(*) FROM player");

        filters.push("id", FilterOp::Gt, "10");
        filters.push_order("id", Direction::Desc);
        filters.set_limit(2);
        assert_eq!(
            select_sql("player_1", &["id".to_string(), "name".to_string()], &filters),
            "SELECT id,name FROM player_1 WHERE id>10 ORDER BY id DESC LIMIT 2"
        );
        assert_eq!(
            update_sql("player", &[("name".to_string(), "'x'".to_string())], &filters),
            "UPDATE player SET name='x' WHERE id>10"
        );
        assert_eq!(delete_sql("player", &filters), "DELETE FROM player WHERE id>10");
        assert_eq!(
            count_sql("player", &filters),
            "SELECT COUNT(*) FROM player WHERE id>10"
        );
    }
}
