//! Accumulated WHERE / ORDER BY / LIMIT state.
//!
//! A [`FilterSet`] holds predicates whose values are already encoded into SQL
//! literals, so rendering never touches a codec. Predicates render grouped by
//! operator in a fixed order (`=`, `!=`, `in`, `>=`, `>`, `<=`, `<`), each
//! group in the order it was accumulated, all joined with `and`.

use std::fmt;

/// Comparison operator of one predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOp {
    Eq,
    Neq,
    In,
    Gte,
    Gt,
    Lte,
    Lt,
}

impl FilterOp {
    /// Operators in rendering order.
    pub const RENDER_ORDER: [FilterOp; 7] = [
        FilterOp::Eq,
        FilterOp::Neq,
        FilterOp::In,
        FilterOp::Gte,
        FilterOp::Gt,
        FilterOp::Lte,
        FilterOp::Lt,
    ];

    /// SQL operator text.
    pub const fn as_sql(self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Neq => "!=",
            FilterOp::In => " in ",
            FilterOp::Gte => ">=",
            FilterOp::Gt => ">",
            FilterOp::Lte => "<=",
            FilterOp::Lt => "<",
        }
    }
}

/// Sort direction for `ORDER BY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub const fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// One encoded predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub field: String,
    pub op: FilterOp,
    /// Encoded right-hand side; a parenthesized list for `In`.
    pub literal: String,
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.field, self.op.as_sql(), self.literal)
    }
}

/// Filter, ordering and limit state accumulated across builder calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    predicates: Vec<Predicate>,
    orders: Vec<(String, Direction)>,
    limit: u64,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a predicate.
    pub fn push(&mut self, field: impl Into<String>, op: FilterOp, literal: impl Into<String>) {
        self.predicates.push(Predicate {
            field: field.into(),
            op,
            literal: literal.into(),
        });
    }

    /// Append an ordering term.
    pub fn push_order(&mut self, field: impl Into<String>, direction: Direction) {
        self.orders.push((field.into(), direction));
    }

    /// Set the row limit (0 = unlimited). Last write wins.
    pub fn set_limit(&mut self, limit: u64) {
        self.limit = limit;
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn orders(&self) -> &[(String, Direction)] {
        &self.orders
    }

    /// Predicates in accumulation order.
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// True if at least one predicate was accumulated.
    pub fn has_predicates(&self) -> bool {
        !self.predicates.is_empty()
    }

    /// True if nothing at all was accumulated.
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty() && self.orders.is_empty() && self.limit == 0
    }

    /// Predicates in rendering order.
    pub fn ordered_predicates(&self) -> impl Iterator<Item = &Predicate> {
        FilterOp::RENDER_ORDER
            .into_iter()
            .flat_map(move |op| self.predicates.iter().filter(move |p| p.op == op))
    }

    /// The condition text after `WHERE`, or `None` without predicates.
    pub fn where_clause(&self) -> Option<String> {
        if self.predicates.is_empty() {
            return None;
        }
        let clauses: Vec<String> = self.ordered_predicates().map(ToString::to_string).collect();
        Some(clauses.join(" and "))
    }

    /// `" ORDER BY a ASC,b DESC"`, or empty.
    pub fn order_clause(&self) -> String {
        if self.orders.is_empty() {
            return String::new();
        }
        let terms: Vec<String> = self
            .orders
            .iter()
            .map(|(field, dir)| format!("{field} {dir}"))
            .collect();
        format!(" ORDER BY {}", terms.join(","))
    }

    /// `" LIMIT n"`, or empty when unlimited.
    pub fn limit_clause(&self) -> String {
        if self.limit == 0 {
            String::new()
        } else {
            format!(" LIMIT {}", self.limit)
        }
    }
}
