//! Helpers for dynamically built WHERE clauses.
//!
//! Filters are assembled as `$n` placeholders plus a parallel list of typed
//! bind values, then bound in order onto the final query.

use pioneer_core::types::{DbId, Timestamp};
use sqlx::postgres::PgArguments;
use sqlx::query::{QueryAs, QueryScalar};
use sqlx::Postgres;

/// Typed bind value for dynamically built queries.
#[derive(Debug, Clone)]
pub enum BindValue {
    BigInt(DbId),
    Text(String),
    Timestamp(Timestamp),
}

/// Accumulates conditions and their bind values.
#[derive(Debug, Default)]
pub struct FilterBuilder {
    conditions: Vec<String>,
    binds: Vec<BindValue>,
}

impl FilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition with no bind values.
    pub fn push_raw(&mut self, condition: impl Into<String>) {
        self.conditions.push(condition.into());
    }

    /// Add a condition whose `{}` markers all refer to one new placeholder.
    pub fn push(&mut self, template: &str, value: BindValue) {
        self.binds.push(value);
        let placeholder = format!("${}", self.binds.len());
        self.conditions.push(template.replace("{}", &placeholder));
    }

    /// The next free placeholder index.
    pub fn next_index(&self) -> usize {
        self.binds.len() + 1
    }

    /// `WHERE a AND b ...`, or an empty string when there are no conditions.
    pub fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub fn binds(&self) -> &[BindValue] {
        &self.binds
    }
}

/// Bind a slice of `BindValue` to a sqlx `QueryAs`.
pub fn bind_values<'q, O>(
    mut q: QueryAs<'q, Postgres, O, PgArguments>,
    values: &'q [BindValue],
) -> QueryAs<'q, Postgres, O, PgArguments> {
    for val in values {
        match val {
            BindValue::BigInt(v) => q = q.bind(*v),
            BindValue::Text(v) => q = q.bind(v.as_str()),
            BindValue::Timestamp(v) => q = q.bind(*v),
        }
    }
    q
}

/// Bind a slice of `BindValue` to a sqlx `QueryScalar`.
pub fn bind_values_scalar<'q>(
    mut q: QueryScalar<'q, Postgres, i64, PgArguments>,
    values: &'q [BindValue],
) -> QueryScalar<'q, Postgres, i64, PgArguments> {
    for val in values {
        match val {
            BindValue::BigInt(v) => q = q.bind(*v),
            BindValue::Text(v) => q = q.bind(v.as_str()),
            BindValue::Timestamp(v) => q = q.bind(*v),
        }
    }
    q
}
