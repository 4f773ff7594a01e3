// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The boundary to the database driver.
//!
//! A [`Runner`] executes statements produced by the SQL generator over a single connection. It is
//! not shared: a Dao borrows it mutably for the duration of an operation, and every statement of a
//! cascade is awaited before the next one is issued.

use async_trait::async_trait;

use crate::{
    database_error::DatabaseError,
    sql::{Dialect, SqlStatement, SqlValue},
};

#[cfg(feature = "postgres")]
mod postgres;
mod transaction;

#[cfg(feature = "postgres")]
pub use postgres::PostgresRunner;
pub use transaction::with_transaction;

#[async_trait]
pub trait Runner: Send {
    /// Placeholder syntax of the statements this runner accepts
    fn dialect(&self) -> Dialect;

    /// Execute a statement that returns no rows, returning the number of affected rows
    async fn execute(&mut self, statement: &SqlStatement) -> Result<u64, DatabaseError>;

    async fn query(&mut self, statement: &SqlStatement) -> Result<Vec<Row>, DatabaseError>;

    /// Reserve the next value of a sequence
    async fn next_sequence_value(&mut self, sequence: &str) -> Result<i64, DatabaseError>;

    async fn begin(&mut self) -> Result<(), DatabaseError>;

    async fn commit(&mut self) -> Result<(), DatabaseError>;

    async fn rollback(&mut self) -> Result<(), DatabaseError>;
}

/// A result row: column labels and their values
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn new(columns: Vec<(String, SqlValue)>) -> Self {
        Self { columns }
    }

    /// The value of a column by its label, ignoring case (databases differ in how they fold
    /// unquoted labels)
    pub fn get(&self, label: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(label))
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// The value of `column` of the table aliased `alias` in a select
    pub(crate) fn value(&self, alias: &str, column: &str) -> Result<SqlValue, DatabaseError> {
        let label = crate::transform::label(alias, column);
        self.get(&label).cloned().ok_or_else(|| {
            DatabaseError::Conversion(format!("Column {label} is missing from the result row"))
        })
    }
}
