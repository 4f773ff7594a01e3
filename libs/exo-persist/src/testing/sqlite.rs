// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::HashMap;

use async_trait::async_trait;
use rusqlite::{params_from_iter, types::Value, types::ValueRef, Connection};
use tracing::{debug, error};

use crate::{
    database_error::DatabaseError,
    runner::{Row, Runner},
    schema::validation::SchemaInspector,
    sql::{Dialect, SqlStatement, SqlValue},
};

/// A [`Runner`] over an in-memory SQLite database.
///
/// SQLite has no sequences, so they are kept by the runner: create them with
/// [`SqliteRunner::create_sequence`] along with the tables. Like PostgreSQL sequences, they are
/// not rolled back with a transaction.
pub struct SqliteRunner {
    connection: Connection,
    sequences: HashMap<String, i64>,
}

impl SqliteRunner {
    pub fn new() -> Result<Self, DatabaseError> {
        let connection =
            Connection::open_in_memory().map_err(|e| DatabaseError::execution(":memory:", e))?;

        Ok(Self {
            connection,
            sequences: HashMap::new(),
        })
    }

    /// Run several statements without parameters, typically to create the schema
    pub fn execute_batch(&self, sql: &str) -> Result<(), DatabaseError> {
        self.connection
            .execute_batch(sql)
            .map_err(|e| DatabaseError::execution(sql, e))
    }

    pub fn create_sequence(&mut self, name: &str) {
        self.sequences.insert(name.to_string(), 0);
    }

    fn run<X>(
        &self,
        statement: &SqlStatement,
        run: impl FnOnce(&mut rusqlite::Statement<'_>, Vec<Value>) -> rusqlite::Result<X>,
    ) -> Result<X, DatabaseError> {
        debug!(
            "Executing SQL operation: {} ({} params)",
            statement,
            statement.params.len()
        );

        let params = statement.params.iter().map(to_value).collect();

        self.connection
            .prepare(&statement.sql)
            .and_then(|mut prepared| run(&mut prepared, params))
            .map_err(|e| {
                error!("Failed to execute statement: {e:?}");
                DatabaseError::execution(statement.sql.clone(), e)
            })
    }
}

#[async_trait]
impl Runner for SqliteRunner {
    fn dialect(&self) -> Dialect {
        Dialect::Standard
    }

    async fn execute(&mut self, statement: &SqlStatement) -> Result<u64, DatabaseError> {
        let count = self.run(statement, |prepared, params| {
            prepared.execute(params_from_iter(params))
        })?;
        Ok(count as u64)
    }

    async fn query(&mut self, statement: &SqlStatement) -> Result<Vec<Row>, DatabaseError> {
        self.run(statement, |prepared, params| {
            let names: Vec<String> = prepared
                .column_names()
                .into_iter()
                .map(String::from)
                .collect();

            let mut rows = prepared.query(params_from_iter(params))?;
            let mut result = vec![];
            while let Some(row) = rows.next()? {
                let columns = names
                    .iter()
                    .enumerate()
                    .map(|(index, name)| Ok((name.clone(), from_value(row.get_ref(index)?))))
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                result.push(Row::new(columns));
            }
            Ok(result)
        })
    }

    async fn next_sequence_value(&mut self, sequence: &str) -> Result<i64, DatabaseError> {
        let value = self.sequences.get_mut(sequence).ok_or_else(|| {
            DatabaseError::execution(
                format!("nextval('{sequence}')"),
                format!("Sequence {sequence} does not exist"),
            )
        })?;
        *value += 1;
        Ok(*value)
    }

    async fn begin(&mut self) -> Result<(), DatabaseError> {
        self.execute_batch("BEGIN")
    }

    async fn commit(&mut self) -> Result<(), DatabaseError> {
        self.execute_batch("COMMIT")
    }

    async fn rollback(&mut self) -> Result<(), DatabaseError> {
        self.execute_batch("ROLLBACK")
    }
}

#[async_trait]
impl SchemaInspector for SqliteRunner {
    async fn table_exists(&mut self, table: &str) -> Result<bool, DatabaseError> {
        let sql = "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE";
        let count: i64 = self
            .connection
            .query_row(sql, [table], |row| row.get(0))
            .map_err(|e| DatabaseError::execution(sql, e))?;
        Ok(count > 0)
    }

    async fn sequence_exists(&mut self, sequence: &str) -> Result<bool, DatabaseError> {
        Ok(self.sequences.contains_key(sequence))
    }

    async fn column_type(
        &mut self,
        table: &str,
        column: &str,
    ) -> Result<Option<String>, DatabaseError> {
        let sql = "SELECT type FROM pragma_table_info(?1) WHERE name = ?2 COLLATE NOCASE";
        let mut prepared = self
            .connection
            .prepare(sql)
            .map_err(|e| DatabaseError::execution(sql, e))?;
        let mut rows = prepared
            .query([table, column])
            .map_err(|e| DatabaseError::execution(sql, e))?;

        match rows.next().map_err(|e| DatabaseError::execution(sql, e))? {
            Some(row) => Ok(Some(
                row.get(0).map_err(|e| DatabaseError::execution(sql, e))?,
            )),
            None => Ok(None),
        }
    }
}

fn to_value(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Bool(v) => Value::Integer(i64::from(*v)),
        SqlValue::SmallInt(v) => Value::Integer(i64::from(*v)),
        SqlValue::Int(v) => Value::Integer(i64::from(*v)),
        SqlValue::BigInt(v) => Value::Integer(*v),
        SqlValue::Real(v) => Value::Real(f64::from(*v)),
        SqlValue::Double(v) => Value::Real(*v),
        SqlValue::Text(v) => Value::Text(v.clone()),
        SqlValue::Bytes(v) => Value::Blob(v.clone()),
        other => other.to_text().map(Value::Text).unwrap_or(Value::Null),
    }
}

fn from_value(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(v) => SqlValue::BigInt(v),
        ValueRef::Real(v) => SqlValue::Double(v),
        ValueRef::Text(v) => SqlValue::Text(String::from_utf8_lossy(v).into_owned()),
        ValueRef::Blob(v) => SqlValue::Bytes(v.to_vec()),
    }
}
