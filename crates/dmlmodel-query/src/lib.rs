//! Query building and dispatch for DmlModel.
//!
//! `dmlmodel-query` is the **statement layer**. It turns fluent filter calls
//! into an accumulated [`FilterSet`], renders MySQL statements from it without
//! any hidden state, and dispatches them through an
//! [`ExecutionChannel`](dmlmodel_core::ExecutionChannel).
//!
//! # Role In The Architecture
//!
//! - **Builder**: [`Dml`] is the per-model query builder exposing `eq`, `neq`,
//!   `gt`, `gte`, `lt`, `lte`, `in_`, `order_by`, `limit`, `shard` and the
//!   terminal operations.
//! - **Renderer**: [`render`] holds the pure functions producing SQL text.
//! - **Configuration**: [`DmlConfig`] controls the default execution context
//!   and statement logging.

pub mod config;
pub mod dml;
pub mod filter;
pub mod render;

pub use config::DmlConfig;
pub use dml::Dml;
pub use filter::{Direction, FilterOp, FilterSet, Predicate};
pub use render::Statement;
