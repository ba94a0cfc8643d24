//! Fluent builder for `SELECT` statements.
//!
//! Assembles query text only; it neither connects to a database nor
//! validates identifiers. Values are embedded as quoted literals with
//! single quotes doubled.

use derive_more::Display;
use thiserror::Error as ThisError;

///
/// Sort
///

#[derive(Clone, Copy, Debug, Default, Display, Eq, PartialEq)]
#[remain::sorted]
pub enum Sort {
    #[default]
    #[display("ASC")]
    Asc,
    #[display("DESC")]
    Desc,
}

///
/// Query
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Query {
    pub text: String,
}

///
/// BuildError
///

#[derive(Debug, ThisError)]
pub enum BuildError {
    #[error("table name cannot be empty")]
    MissingTable,
}

///
/// QueryBuilder
/// Dialect entry point.
///

pub struct QueryBuilder;

impl QueryBuilder {
    #[must_use]
    pub fn postgres() -> SelectBuilder {
        SelectBuilder::default()
    }
}

#[derive(Clone, Debug)]
struct Table {
    name: String,
    alias: Option<String>,
}

///
/// SelectBuilder
///
/// Each call appends to the statement under construction; `build`
/// consumes the builder and renders the final text.
///

#[derive(Debug, Default)]
#[must_use]
pub struct SelectBuilder {
    table: Option<Table>,
    columns: Vec<String>,
    joins: Vec<String>,
    conditions: Vec<String>,
    orders: Vec<String>,
    pending_order: Option<String>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl SelectBuilder {
    pub fn table(mut self, name: &str) -> Self {
        self.table = Some(Table {
            name: name.to_string(),
            alias: None,
        });

        self
    }

    pub fn table_as(mut self, name: &str, alias: &str) -> Self {
        self.table = Some(Table {
            name: name.to_string(),
            alias: Some(alias.to_string()),
        });

        self
    }

    /// Project the given columns instead of `*`.
    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(ToString::to_string).collect();

        self
    }

    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);

        self
    }

    pub const fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);

        self
    }

    /// Start a join against `table`; the returned handle picks the join
    /// kind and key pair.
    pub fn join(self, table: &str) -> JoinBuilder {
        JoinBuilder {
            builder: self,
            table: table.to_string(),
            alias: None,
        }
    }

    pub fn join_as(self, table: &str, alias: &str) -> JoinBuilder {
        JoinBuilder {
            builder: self,
            table: table.to_string(),
            alias: Some(alias.to_string()),
        }
    }

    // -- conditions --

    pub fn equals(self, column: &str, value: &str) -> Self {
        let literal = quote(value);
        self.push_condition(format!("{column} = {literal}"))
    }

    pub fn equals_ignore_case(self, column: &str, value: &str) -> Self {
        let literal = quote(value);
        self.push_condition(format!("LOWER({column}) = LOWER({literal})"))
    }

    pub fn not_equals(self, column: &str, value: &str) -> Self {
        let literal = quote(value);
        self.push_condition(format!("{column} <> {literal}"))
    }

    pub fn not_equals_ignore_case(self, column: &str, value: &str) -> Self {
        let literal = quote(value);
        self.push_condition(format!("LOWER({column}) <> LOWER({literal})"))
    }

    pub fn greater_than(self, column: &str, value: &str) -> Self {
        let literal = quote(value);
        self.push_condition(format!("{column} > {literal}"))
    }

    pub fn greater_than_or_equal(self, column: &str, value: &str) -> Self {
        let literal = quote(value);
        self.push_condition(format!("{column} >= {literal}"))
    }

    pub fn less_than(self, column: &str, value: &str) -> Self {
        let literal = quote(value);
        self.push_condition(format!("{column} < {literal}"))
    }

    pub fn less_than_or_equal(self, column: &str, value: &str) -> Self {
        let literal = quote(value);
        self.push_condition(format!("{column} <= {literal}"))
    }

    pub fn between(self, column: &str, low: &str, high: &str) -> Self {
        let low = quote(low);
        let high = quote(high);
        self.push_condition(format!("{column} BETWEEN {low} AND {high}"))
    }

    pub fn is_null(self, column: &str) -> Self {
        self.push_condition(format!("{column} IS NULL"))
    }

    pub fn is_not_null(self, column: &str) -> Self {
        self.push_condition(format!("{column} IS NOT NULL"))
    }

    pub fn in_values(self, column: &str, values: &[&str]) -> Self {
        let list = quote_list(values);
        self.push_condition(format!("{column} IN ({list})"))
    }

    pub fn not_in_values(self, column: &str, values: &[&str]) -> Self {
        let list = quote_list(values);
        self.push_condition(format!("{column} NOT IN ({list})"))
    }

    pub fn is_true(self, column: &str) -> Self {
        self.push_condition(format!("{column} IS TRUE"))
    }

    pub fn is_false(self, column: &str) -> Self {
        self.push_condition(format!("{column} IS FALSE"))
    }

    pub fn like(self, column: &str, pattern: &str) -> Self {
        let literal = quote(pattern);
        self.push_condition(format!("{column} LIKE {literal}"))
    }

    pub fn starts_with(self, column: &str, value: &str) -> Self {
        let literal = quote(&format!("{value}%"));
        self.push_condition(format!("{column} LIKE {literal}"))
    }

    pub fn ends_with(self, column: &str, value: &str) -> Self {
        let literal = quote(&format!("%{value}"));
        self.push_condition(format!("{column} LIKE {literal}"))
    }

    pub fn and(self) -> Self {
        self.push_raw("AND")
    }

    pub fn or(self) -> Self {
        self.push_raw("OR")
    }

    /// Wrap the conditions built inside the closure in parentheses.
    pub fn grouped(mut self, inner: impl FnOnce(Self) -> Self) -> Self {
        self = self.push_raw("(");
        self = inner(self);
        self.push_raw(")")
    }

    // -- ordering --

    /// Queue a column for `ORDER BY`; direction defaults to ascending
    /// until [`Self::sort`] is called.
    pub fn order_by(mut self, column: &str) -> Self {
        self.flush_order(Sort::Asc);
        self.pending_order = Some(column.to_string());

        self
    }

    /// Set the direction of the most recent [`Self::order_by`] column.
    pub fn sort(mut self, sort: Sort) -> Self {
        self.flush_order(sort);

        self
    }

    /// Render the statement.
    pub fn build(mut self) -> Result<Query, BuildError> {
        let table = self.table.take().ok_or(BuildError::MissingTable)?;

        self.flush_order(Sort::Asc);

        let mut text = String::from("SELECT ");
        if self.columns.is_empty() {
            text.push('*');
        } else {
            text.push_str(&self.columns.join(", "));
        }

        text.push_str(" FROM ");
        text.push_str(&table.name);
        if let Some(alias) = &table.alias {
            text.push_str(" AS ");
            text.push_str(alias);
        }

        for join in &self.joins {
            text.push(' ');
            text.push_str(join);
        }

        if !self.conditions.is_empty() {
            text.push_str(" WHERE ");
            text.push_str(&render_conditions(&self.conditions));
        }

        if !self.orders.is_empty() {
            text.push_str(" ORDER BY ");
            text.push_str(&self.orders.join(", "));
        }

        if let Some(limit) = self.limit {
            text.push_str(" LIMIT ");
            text.push_str(&limit.to_string());
        }

        if let Some(offset) = self.offset {
            text.push_str(" OFFSET ");
            text.push_str(&offset.to_string());
        }

        Ok(Query { text })
    }

    fn push_condition(mut self, condition: String) -> Self {
        self.conditions.push(condition);

        self
    }

    fn push_raw(mut self, token: &str) -> Self {
        self.conditions.push(token.to_string());

        self
    }

    fn flush_order(&mut self, sort: Sort) {
        if let Some(column) = self.pending_order.take() {
            self.orders.push(format!("{column} {sort}"));
        }
    }
}

///
/// JoinBuilder
/// Pending join target; choosing the kind completes the clause.
///

#[must_use]
pub struct JoinBuilder {
    builder: SelectBuilder,
    table: String,
    alias: Option<String>,
}

impl JoinBuilder {
    pub fn inner(self, other_table: &str, key: &str, other_key: &str) -> SelectBuilder {
        self.complete("INNER JOIN", other_table, key, other_key)
    }

    pub fn left(self, other_table: &str, key: &str, other_key: &str) -> SelectBuilder {
        self.complete("LEFT JOIN", other_table, key, other_key)
    }

    pub fn right(self, other_table: &str, key: &str, other_key: &str) -> SelectBuilder {
        self.complete("RIGHT JOIN", other_table, key, other_key)
    }

    pub fn full(self, other_table: &str, key: &str, other_key: &str) -> SelectBuilder {
        self.complete("FULL JOIN", other_table, key, other_key)
    }

    fn complete(
        mut self,
        kind: &str,
        other_table: &str,
        key: &str,
        other_key: &str,
    ) -> SelectBuilder {
        let target = self.alias.as_deref().unwrap_or(&self.table);

        let mut clause = format!("{kind} {}", self.table);
        if let Some(alias) = &self.alias {
            clause.push_str(" AS ");
            clause.push_str(alias);
        }
        clause.push_str(&format!(" ON {target}.{key} = {other_table}.{other_key}"));

        self.builder.joins.push(clause);

        self.builder
    }
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn quote_list(values: &[&str]) -> String {
    values
        .iter()
        .map(|value| quote(value))
        .collect::<Vec<_>>()
        .join(", ")
}

// Joins condition tokens, skipping the space after an opening parenthesis
// and before a closing one.
fn render_conditions(tokens: &[String]) -> String {
    let mut out = String::new();

    for token in tokens {
        if !out.is_empty() && token != ")" && !out.ends_with('(') {
            out.push(' ');
        }
        out.push_str(token);
    }

    out
}
