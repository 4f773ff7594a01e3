// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    /// A descriptor, Dao, or environment setting is not usable. Raised while building the
    /// descriptor graph, never while executing statements.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A value violates a declared column constraint. Raised before any statement is executed.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// A value read from the database could not be mapped to the declared type.
    #[error("Conversion: {0}")]
    Conversion(String),

    #[error("Failed to execute `{sql}`: {source}")]
    Execution {
        sql: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("Failed to execute transaction {0}")]
    Transaction(String),

    #[error("Validation: {0}")]
    Validation(String),

    #[cfg(feature = "postgres")]
    #[error("Delegate: {0}")]
    Delegate(#[from] tokio_postgres::Error),

    #[error("{0} {1}")]
    WithContext(String, #[source] Box<DatabaseError>),
}

impl DatabaseError {
    pub fn with_context(self, context: String) -> DatabaseError {
        DatabaseError::WithContext(context, Box::new(self))
    }

    /// Wrap a driver failure together with the SQL that caused it.
    pub fn execution(
        sql: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    ) -> DatabaseError {
        DatabaseError::Execution {
            sql: sql.into(),
            source: source.into(),
        }
    }
}

pub trait WithContext {
    fn with_context(self, context: String) -> Self;
}

impl<T> WithContext for Result<T, DatabaseError> {
    fn with_context(self, context: String) -> Result<T, DatabaseError> {
        self.map_err(|e| e.with_context(context))
    }
}
