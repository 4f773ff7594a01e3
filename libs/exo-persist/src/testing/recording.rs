// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use async_trait::async_trait;

use crate::{
    database_error::DatabaseError,
    runner::{Row, Runner},
    sql::{Dialect, SqlStatement},
};

/// Everything a [`RecordingRunner`] was asked to do, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Execute(SqlStatement),
    Query(SqlStatement),
    NextSequenceValue(String),
    Begin,
    Commit,
    Rollback,
}

/// Wraps a runner and records every call that reaches it
pub struct RecordingRunner<R: Runner> {
    inner: R,
    recorded: Vec<Recorded>,
}

impl<R: Runner> RecordingRunner<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            recorded: vec![],
        }
    }

    pub fn recorded(&self) -> &[Recorded] {
        &self.recorded
    }

    /// The SQL of every executed statement and query
    pub fn statements(&self) -> Vec<&str> {
        self.recorded
            .iter()
            .filter_map(|recorded| match recorded {
                Recorded::Execute(statement) | Recorded::Query(statement) => {
                    Some(statement.sql.as_str())
                }
                _ => None,
            })
            .collect()
    }

    pub fn query_count(&self) -> usize {
        self.recorded
            .iter()
            .filter(|recorded| matches!(recorded, Recorded::Query(_)))
            .count()
    }

    pub fn clear(&mut self) {
        self.recorded.clear();
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut R {
        &mut self.inner
    }
}

#[async_trait]
impl<R: Runner> Runner for RecordingRunner<R> {
    fn dialect(&self) -> Dialect {
        self.inner.dialect()
    }

    async fn execute(&mut self, statement: &SqlStatement) -> Result<u64, DatabaseError> {
        self.recorded.push(Recorded::Execute(statement.clone()));
        self.inner.execute(statement).await
    }

    async fn query(&mut self, statement: &SqlStatement) -> Result<Vec<Row>, DatabaseError> {
        self.recorded.push(Recorded::Query(statement.clone()));
        self.inner.query(statement).await
    }

    async fn next_sequence_value(&mut self, sequence: &str) -> Result<i64, DatabaseError> {
        self.recorded
            .push(Recorded::NextSequenceValue(sequence.to_string()));
        self.inner.next_sequence_value(sequence).await
    }

    async fn begin(&mut self) -> Result<(), DatabaseError> {
        self.recorded.push(Recorded::Begin);
        self.inner.begin().await
    }

    async fn commit(&mut self) -> Result<(), DatabaseError> {
        self.recorded.push(Recorded::Commit);
        self.inner.commit().await
    }

    async fn rollback(&mut self) -> Result<(), DatabaseError> {
        self.recorded.push(Recorded::Rollback);
        self.inner.rollback().await
    }
}
