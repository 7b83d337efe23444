//! The per-model query builder.
//!
//! [`Dml`] accumulates filters, ordering, a limit, an optional shard key and
//! an optional execution context across fluent calls. Every terminal
//! operation renders its statement and clears that state *before* it returns
//! the future that dispatches it, so the builder is immediately reusable and
//! an unpolled future never leaks state into the next call.
//!
//! ```ignore
//! let mut dml = Dml::for_model::<Player>(channel)?;
//! let rows = dml
//!     .eq("guild", "north")
//!     .gte("level", 10)
//!     .order_by("level", Direction::Desc)
//!     .limit(20)
//!     .find(&cx, &["id", "name", "level"])
//!     .await;
//! ```

use std::fmt;
use std::future::Future;
use std::mem;
use std::sync::Arc;

use asupersync::{Cx, Outcome};
use dmlmodel_core::{
    ColumnKind, Completion, ContextToken, DecodeError, Error, ExecutionChannel, Model,
    ModelDescriptor, RawRow, Record, Result, UsageErrorKind, Value,
};

use crate::config::DmlConfig;
use crate::filter::{Direction, FilterOp, FilterSet};
use crate::render::{self, Statement};

#[derive(Debug, Default)]
struct QueryState {
    filters: FilterSet,
    shard: Option<i64>,
    context: Option<ContextToken>,
    pending: Option<Error>,
}

impl QueryState {
    fn is_clear(&self) -> bool {
        self.filters.is_empty()
            && self.shard.is_none()
            && self.context.is_none()
            && self.pending.is_none()
    }
}

/// State taken out of the builder by a terminal operation.
struct Taken {
    table: String,
    context: Option<ContextToken>,
    filters: FilterSet,
}

impl Taken {
    fn statement(self, sql: String) -> Statement {
        Statement {
            sql,
            table: self.table,
            context: self.context,
        }
    }
}

/// What a dispatch needs to know for logging.
#[derive(Debug, Clone)]
struct DispatchLog {
    statements: bool,
    data: Option<String>,
}

/// Input data kept for a failed-statement log is cut after this many bytes.
const LOGGED_DATA_LIMIT: usize = 1024;

/// `Debug` rendering of `value`, cut at [`LOGGED_DATA_LIMIT`] bytes.
///
/// Formatting stops as soon as the limit is reached, so large batches cost
/// no more than the kept prefix.
fn capped_debug(value: &impl fmt::Debug) -> String {
    let mut out = CappedWriter {
        buf: String::new(),
        limit: LOGGED_DATA_LIMIT,
    };
    if fmt::write(&mut out, format_args!("{value:?}")).is_err() {
        out.buf.push_str("...");
    }
    out.buf
}

struct CappedWriter {
    buf: String,
    limit: usize,
}

impl fmt::Write for CappedWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = self.limit.saturating_sub(self.buf.len());
        if s.len() <= room {
            self.buf.push_str(s);
            return Ok(());
        }
        let mut end = room;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        self.buf.push_str(&s[..end]);
        Err(fmt::Error)
    }
}

/// Stateful query builder bound to one model and one execution channel.
///
/// Not meant for concurrent use: filters for the next statement must be
/// accumulated after the previous terminal call has returned.
pub struct Dml<C> {
    model: Arc<ModelDescriptor>,
    channel: Arc<C>,
    config: DmlConfig,
    state: QueryState,
}

impl<C> fmt::Debug for Dml<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dml")
            .field("table", &self.model.table())
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<C: ExecutionChannel> Dml<C> {
    /// Create a builder with the default configuration.
    pub fn new(model: Arc<ModelDescriptor>, channel: Arc<C>) -> Self {
        Self::with_config(model, channel, DmlConfig::default())
    }

    /// Create a builder with an explicit configuration.
    pub fn with_config(model: Arc<ModelDescriptor>, channel: Arc<C>, config: DmlConfig) -> Self {
        Self {
            model,
            channel,
            config,
            state: QueryState::default(),
        }
    }

    /// Create a builder for a statically declared model.
    pub fn for_model<M: Model>(channel: Arc<C>) -> Result<Self> {
        Ok(Self::new(Arc::new(ModelDescriptor::of::<M>()?), channel))
    }

    pub fn model(&self) -> &ModelDescriptor {
        &self.model
    }

    pub fn config(&self) -> &DmlConfig {
        &self.config
    }

    /// Filters accumulated so far.
    pub fn filters(&self) -> &FilterSet {
        &self.state.filters
    }

    /// True when no filter, order, limit, shard, context or pending error is held.
    pub fn is_clear(&self) -> bool {
        self.state.is_clear()
    }

    // ========================================================================
    // Filter accumulation
    // ========================================================================

    fn record_error(&mut self, err: Error) {
        tracing::warn!(
            table = %self.model.table(),
            error = %err,
            "Ignoring invalid builder call"
        );
        if self.state.pending.is_none() {
            self.state.pending = Some(err);
        }
    }

    fn push_filter(&mut self, field: &str, op: FilterOp, value: &Value) -> &mut Self {
        match render::encode_filter_literal(&self.model, field, value) {
            Ok(literal) => self.state.filters.push(field, op, literal),
            Err(e) => self.record_error(e),
        }
        self
    }

    /// `field = value`
    pub fn eq(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.push_filter(field, FilterOp::Eq, &value.into())
    }

    /// `field != value`
    pub fn neq(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.push_filter(field, FilterOp::Neq, &value.into())
    }

    /// `field > value`
    pub fn gt(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.push_filter(field, FilterOp::Gt, &value.into())
    }

    /// `field >= value`
    pub fn gte(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.push_filter(field, FilterOp::Gte, &value.into())
    }

    /// `field < value`
    pub fn lt(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.push_filter(field, FilterOp::Lt, &value.into())
    }

    /// `field <= value`
    pub fn lte(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.push_filter(field, FilterOp::Lte, &value.into())
    }

    /// `field in (v1,v2,...)`.
    ///
    /// Only `STRING` and `INT` fields accept membership filters. Any other
    /// kind, an empty set or a `NULL` member is recorded as a usage error
    /// that fails the next terminal operation.
    pub fn in_<I>(&mut self, field: &str, values: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let Some(kind) = self.model.field_kind(field) else {
            self.record_error(Error::usage(
                UsageErrorKind::UnknownField,
                format!("`{field}` is not a field of `{}`", self.model.table()),
            ));
            return self;
        };
        if !kind.supports_membership() {
            self.record_error(Error::usage(
                UsageErrorKind::InvalidMembershipKind,
                format!("`{field}` is {kind}; membership filters need STRING or INT"),
            ));
            return self;
        }

        let mut literals = Vec::new();
        for value in values {
            match render::encode_filter_literal(&self.model, field, &value.into()) {
                Ok(literal) => literals.push(literal),
                Err(e) => {
                    self.record_error(e);
                    return self;
                }
            }
        }
        if literals.is_empty() {
            self.record_error(Error::usage(
                UsageErrorKind::EmptyData,
                format!("empty membership set for `{field}`"),
            ));
            return self;
        }

        self.state
            .filters
            .push(field, FilterOp::In, format!("({})", literals.join(",")));
        self
    }

    /// Append an `ORDER BY` term.
    pub fn order_by(&mut self, field: &str, direction: Direction) -> &mut Self {
        if self.model.field_kind(field).is_some() {
            self.state.filters.push_order(field, direction);
        } else {
            self.record_error(Error::usage(
                UsageErrorKind::UnknownField,
                format!("cannot order by `{field}`: not a field of `{}`", self.model.table()),
            ));
        }
        self
    }

    /// Limit the number of returned rows (0 = unlimited). Last call wins.
    pub fn limit(&mut self, n: u64) -> &mut Self {
        self.state.filters.set_limit(n);
        self
    }

    /// Target the physical table for `key` on a sharded model.
    pub fn shard(&mut self, key: i64) -> &mut Self {
        self.state.shard = Some(key);
        self
    }

    /// Run the next statement on the execution context `token`.
    pub fn context(&mut self, token: ContextToken) -> &mut Self {
        self.state.context = Some(token);
        self
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Clear the accumulated state and hand it over, failing with the first
    /// recorded usage error if there is one.
    fn take_state(&mut self) -> Result<Taken> {
        let state = mem::take(&mut self.state);
        if let Some(err) = state.pending {
            return Err(err);
        }
        let table = match state.shard {
            Some(key) => self.model.resolve_table(key),
            None => self.model.table().to_string(),
        };
        Ok(Taken {
            table,
            context: state.context.or(self.config.context),
            filters: state.filters,
        })
    }

    /// Render an `INSERT`.
    #[tracing::instrument(level = "debug", skip(self, data))]
    pub fn build_insert(&mut self, data: &Record) -> Result<Statement> {
        let taken = self.take_state()?;
        let row = render::encode_record(&self.model, data)?;
        let sql = render::insert_sql(&taken.table, &row, None);
        Ok(taken.statement(sql))
    }

    /// Render an `INSERT ... ON DUPLICATE KEY UPDATE`.
    #[tracing::instrument(level = "debug", skip(self, data, update_data))]
    pub fn build_upsert(&mut self, data: &Record, update_data: &Record) -> Result<Statement> {
        let taken = self.take_state()?;
        let row = render::encode_record(&self.model, data)?;
        let update = render::encode_record(&self.model, update_data)?;
        let sql = render::insert_sql(&taken.table, &row, Some(&update));
        Ok(taken.statement(sql))
    }

    /// Render a multi-row `INSERT`.
    ///
    /// Returns `Ok(None)` for an empty batch. Every row must carry exactly
    /// the fields of the first row.
    #[tracing::instrument(level = "debug", skip(self, rows))]
    pub fn build_insert_many(&mut self, rows: &[Record]) -> Result<Option<Statement>> {
        let taken = self.take_state()?;
        let Some(first) = rows.first() else {
            tracing::warn!(table = %taken.table, "insert_many called with no rows");
            return Ok(None);
        };
        let columns: Vec<String> = first.fields().map(str::to_string).collect();
        if columns.is_empty() {
            return Err(Error::usage(
                UsageErrorKind::EmptyData,
                format!("first row for `{}` has no fields", taken.table),
            ));
        }

        let mut encoded = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(mismatched_row(i));
            }
            let mut values = Vec::with_capacity(columns.len());
            for column in &columns {
                let Some(value) = row.get(column) else {
                    return Err(mismatched_row(i));
                };
                values.push(render::encode_literal(&self.model, column, value)?);
            }
            encoded.push(values);
        }

        let sql = render::insert_many_sql(&taken.table, &columns, &encoded);
        Ok(Some(taken.statement(sql)))
    }

    fn prepare_find(&mut self, fields: &[&str]) -> Result<(Statement, Vec<(String, ColumnKind)>)> {
        let taken = self.take_state()?;
        let columns: Vec<(String, ColumnKind)> = if fields.is_empty() {
            self.model
                .fields()
                .map(|(name, kind)| (name.to_string(), kind))
                .collect()
        } else {
            let mut columns = Vec::with_capacity(fields.len());
            for &field in fields {
                let Some(kind) = self.model.field_kind(field) else {
                    return Err(Error::usage(
                        UsageErrorKind::UnknownField,
                        format!("cannot select `{field}`: not a field of `{}`", taken.table),
                    ));
                };
                columns.push((field.to_string(), kind));
            }
            columns
        };
        let names: Vec<String> = columns.iter().map(|(name, _)| name.clone()).collect();
        let sql = render::select_sql(&taken.table, &names, &taken.filters);
        Ok((taken.statement(sql), columns))
    }

    /// Render a `SELECT` of `fields` (all declared fields when empty).
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn build_find(&mut self, fields: &[&str]) -> Result<Statement> {
        self.prepare_find(fields).map(|(statement, _)| statement)
    }

    /// Render an `UPDATE`. Refuses to run without a filter.
    #[tracing::instrument(level = "debug", skip(self, data))]
    pub fn build_update(&mut self, data: &Record) -> Result<Statement> {
        let taken = self.take_state()?;
        if !taken.filters.has_predicates() {
            tracing::warn!(table = %taken.table, "Refusing update without filter");
            return Err(Error::usage(
                UsageErrorKind::MissingFilter,
                format!("update on `{}` requires at least one filter", taken.table),
            ));
        }
        let assignments = render::encode_record(&self.model, data)?;
        let sql = render::update_sql(&taken.table, &assignments, &taken.filters);
        Ok(taken.statement(sql))
    }

    /// Render a `DELETE`. An unfiltered delete needs `dangerous = true`.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn build_delete(&mut self, dangerous: bool) -> Result<Statement> {
        let taken = self.take_state()?;
        if !taken.filters.has_predicates() {
            if !dangerous {
                tracing::warn!(table = %taken.table, "Refusing unfiltered delete");
                return Err(Error::usage(
                    UsageErrorKind::UnfilteredDelete,
                    format!("delete on `{}` without filter needs the dangerous flag", taken.table),
                ));
            }
            tracing::warn!(table = %taken.table, "Deleting every row");
        }
        let sql = render::delete_sql(&taken.table, &taken.filters);
        Ok(taken.statement(sql))
    }

    /// Render a `SELECT COUNT(*)`.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn build_count(&mut self) -> Result<Statement> {
        let taken = self.take_state()?;
        let sql = render::count_sql(&taken.table, &taken.filters);
        Ok(taken.statement(sql))
    }

    // ========================================================================
    // Terminal operations
    // ========================================================================

    fn dispatch_log(&self, data: impl FnOnce() -> String) -> DispatchLog {
        DispatchLog {
            statements: self.config.log_statements,
            data: self.config.log_data_on_error.then(data),
        }
    }

    /// Insert one row. Resolves to the insert id.
    pub fn insert<'a>(
        &mut self,
        cx: &'a Cx,
        data: &Record,
    ) -> impl Future<Output = Outcome<u64, Error>> + Send + use<'a, C> {
        let built = self.build_insert(data);
        let log = self.dispatch_log(|| capped_debug(data));
        let channel = Arc::clone(&self.channel);
        async move {
            let statement = match built {
                Ok(s) => s,
                Err(e) => return Outcome::Err(e),
            };
            and_then(dispatch(cx, &*channel, &statement, &log).await, |done| {
                Outcome::Ok(done.insert_id)
            })
        }
    }

    /// Insert one row, updating `update_data` when the key already exists.
    /// Resolves to the insert id.
    pub fn upsert<'a>(
        &mut self,
        cx: &'a Cx,
        data: &Record,
        update_data: &Record,
    ) -> impl Future<Output = Outcome<u64, Error>> + Send + use<'a, C> {
        let built = self.build_upsert(data, update_data);
        let log = self.dispatch_log(|| capped_debug(&(data, update_data)));
        let channel = Arc::clone(&self.channel);
        async move {
            let statement = match built {
                Ok(s) => s,
                Err(e) => return Outcome::Err(e),
            };
            and_then(dispatch(cx, &*channel, &statement, &log).await, |done| {
                Outcome::Ok(done.insert_id)
            })
        }
    }

    /// Insert several rows in one statement. Resolves to the insert id
    /// reported for the batch; an empty batch resolves to `0` without
    /// dispatching anything.
    pub fn insert_many<'a>(
        &mut self,
        cx: &'a Cx,
        rows: &[Record],
    ) -> impl Future<Output = Outcome<u64, Error>> + Send + use<'a, C> {
        let built = self.build_insert_many(rows);
        let log = self.dispatch_log(|| capped_debug(&rows));
        let channel = Arc::clone(&self.channel);
        async move {
            let statement = match built {
                Ok(Some(s)) => s,
                Ok(None) => return Outcome::Ok(0),
                Err(e) => return Outcome::Err(e),
            };
            and_then(dispatch(cx, &*channel, &statement, &log).await, |done| {
                Outcome::Ok(done.insert_id)
            })
        }
    }

    /// Select `fields` (all declared fields when empty) and decode each row.
    ///
    /// A value that fails to decode is logged and returned as `Null`; the
    /// rest of the row and the batch are unaffected.
    pub fn find<'a>(
        &mut self,
        cx: &'a Cx,
        fields: &[&str],
    ) -> impl Future<Output = Outcome<Vec<Record>, Error>> + Send + use<'a, C> {
        let built = self.prepare_find(fields);
        let log = self.dispatch_log(|| capped_debug(&fields));
        let channel = Arc::clone(&self.channel);
        async move {
            let (statement, columns) = match built {
                Ok(prepared) => prepared,
                Err(e) => return Outcome::Err(e),
            };
            and_then(dispatch(cx, &*channel, &statement, &log).await, |done| {
                Outcome::Ok(decode_rows(&statement, &columns, done.rows))
            })
        }
    }

    /// Update the filtered rows. Resolves to the affected-row count, or
    /// [`Error::UpdateNotFound`] when nothing matched.
    pub fn update<'a>(
        &mut self,
        cx: &'a Cx,
        data: &Record,
    ) -> impl Future<Output = Outcome<u64, Error>> + Send + use<'a, C> {
        let built = self.build_update(data);
        let log = self.dispatch_log(|| capped_debug(data));
        let channel = Arc::clone(&self.channel);
        async move {
            let statement = match built {
                Ok(s) => s,
                Err(e) => return Outcome::Err(e),
            };
            and_then(dispatch(cx, &*channel, &statement, &log).await, |done| {
                if done.affected_rows == 0 {
                    tracing::debug!(table = %statement.table, sql = %statement.sql, "Update matched no rows");
                    return Outcome::Err(Error::UpdateNotFound);
                }
                Outcome::Ok(done.affected_rows)
            })
        }
    }

    /// Delete the filtered rows. Resolves to the affected-row count, or
    /// [`Error::DeleteNotFound`] when nothing matched.
    pub fn delete<'a>(
        &mut self,
        cx: &'a Cx,
        dangerous: bool,
    ) -> impl Future<Output = Outcome<u64, Error>> + Send + use<'a, C> {
        let built = self.build_delete(dangerous);
        let log = self.dispatch_log(String::new);
        let channel = Arc::clone(&self.channel);
        async move {
            let statement = match built {
                Ok(s) => s,
                Err(e) => return Outcome::Err(e),
            };
            and_then(dispatch(cx, &*channel, &statement, &log).await, |done| {
                if done.affected_rows == 0 {
                    tracing::debug!(table = %statement.table, sql = %statement.sql, "Delete matched no rows");
                    return Outcome::Err(Error::DeleteNotFound);
                }
                tracing::info!(
                    table = %statement.table,
                    sql = %statement.sql,
                    affected_rows = done.affected_rows,
                    "Deleted rows"
                );
                Outcome::Ok(done.affected_rows)
            })
        }
    }

    /// Count the filtered rows.
    pub fn count<'a>(
        &mut self,
        cx: &'a Cx,
    ) -> impl Future<Output = Outcome<u64, Error>> + Send + use<'a, C> {
        let built = self.build_count();
        let log = self.dispatch_log(String::new);
        let channel = Arc::clone(&self.channel);
        async move {
            let statement = match built {
                Ok(s) => s,
                Err(e) => return Outcome::Err(e),
            };
            and_then(dispatch(cx, &*channel, &statement, &log).await, |done| {
                match parse_count(&done.rows) {
                    Ok(n) => Outcome::Ok(n),
                    Err(e) => {
                        tracing::error!(table = %statement.table, sql = %statement.sql, error = %e, "Unreadable count result");
                        Outcome::Err(e)
                    }
                }
            })
        }
    }

    /// Send `sql` to the channel verbatim and resolve to its raw completion.
    ///
    /// Accumulated builder state is discarded. Channel errors stay inside
    /// the returned [`Completion`].
    pub fn execute_custom_sql<'a>(
        &mut self,
        cx: &'a Cx,
        sql: &str,
    ) -> impl Future<Output = Outcome<Completion, Error>> + Send + use<'a, C> {
        let state = mem::take(&mut self.state);
        let context = state.context.or(self.config.context);
        let log_statements = self.config.log_statements;
        let sql = sql.to_string();
        let channel = Arc::clone(&self.channel);
        async move {
            if let Some(reason) = cx.cancel_reason() {
                return Outcome::Cancelled(reason);
            }
            if log_statements {
                tracing::debug!(sql = %sql, "Executing custom SQL");
            }
            Outcome::Ok(channel.execute(cx, &sql, context).await)
        }
    }
}

fn mismatched_row(index: usize) -> Error {
    Error::usage(
        UsageErrorKind::MismatchedRows,
        format!("row {index} does not carry the same fields as the first row"),
    )
}

fn and_then<T, U>(outcome: Outcome<T, Error>, f: impl FnOnce(T) -> Outcome<U, Error>) -> Outcome<U, Error> {
    match outcome {
        Outcome::Ok(v) => f(v),
        Outcome::Err(e) => Outcome::Err(e),
        Outcome::Cancelled(r) => Outcome::Cancelled(r),
        Outcome::Panicked(p) => Outcome::Panicked(p),
    }
}

async fn dispatch<C: ExecutionChannel>(
    cx: &Cx,
    channel: &C,
    statement: &Statement,
    log: &DispatchLog,
) -> Outcome<Completion, Error> {
    if let Some(reason) = cx.cancel_reason() {
        return Outcome::Cancelled(reason);
    }
    if log.statements {
        tracing::debug!(table = %statement.table, sql = %statement.sql, "Dispatching statement");
    }

    let mut done = channel.execute(cx, &statement.sql, statement.context).await;
    match done.error.take() {
        Some(err) => {
            tracing::error!(
                table = %statement.table,
                sql = %statement.sql,
                data = log.data.as_deref().unwrap_or("<omitted>"),
                error = %err,
                "Statement failed"
            );
            let err = if err.sql.is_some() {
                err
            } else {
                err.with_sql(statement.sql.clone())
            };
            Outcome::Err(Error::Channel(err))
        }
        None => Outcome::Ok(done),
    }
}

fn decode_rows(statement: &Statement, columns: &[(String, ColumnKind)], rows: Vec<RawRow>) -> Vec<Record> {
    let mut records = Vec::with_capacity(rows.len());
    for (index, raw) in rows.into_iter().enumerate() {
        if raw.len() < columns.len() {
            tracing::warn!(
                table = %statement.table,
                row = index,
                expected = columns.len(),
                got = raw.len(),
                "Short result row, missing columns read as NULL"
            );
        }
        let mut record = Record::with_capacity(columns.len());
        for (position, (field, kind)) in columns.iter().enumerate() {
            let bytes = raw.get(position).and_then(|column| column.as_deref());
            let value = kind.loads(bytes).unwrap_or_else(|e| {
                log_decode_failure(statement, field, index, &e);
                Value::Null
            });
            record.set(field.clone(), value);
        }
        records.push(record);
    }
    records
}

fn log_decode_failure(statement: &Statement, field: &str, row: usize, err: &DecodeError) {
    tracing::error!(
        table = %statement.table,
        field = field,
        row = row,
        sql = %statement.sql,
        error = %err,
        "Failed to decode field, using NULL"
    );
}

fn parse_count(rows: &[RawRow]) -> Result<u64> {
    let raw = rows
        .first()
        .and_then(|row| row.first())
        .and_then(|column| column.as_deref());
    let decode_err = |source| Error::Decode {
        field: "COUNT(*)".to_string(),
        source,
    };
    match ColumnKind::Int.loads(raw).map_err(decode_err)? {
        Value::Int(n) => u64::try_from(n).map_err(|_| {
            decode_err(DecodeError::new(ColumnKind::Int, format!("negative count {n}")))
        }),
        _ => Ok(0),
    }
}
