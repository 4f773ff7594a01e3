// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::{
    database_error::DatabaseError,
    schema::metadata::EntityMetadata,
    sql::{delete::Delete, insert::Insert, update::Update, Dialect, ExpressionBuilder, SqlStatement, SqlValue},
};

use super::select_transformer::require_primary_key;

/// Insert a row. `values` follow [`EntityMetadata::ordered_columns`], so a keyed table binds its
/// (already reserved) primary key first.
pub(crate) fn insert(
    metadata: &EntityMetadata,
    values: Vec<SqlValue>,
    dialect: Dialect,
) -> Result<SqlStatement, DatabaseError> {
    let columns: Vec<&str> = metadata
        .ordered_columns()
        .map(|column| column.name.as_str())
        .collect();
    check_arity(metadata, columns.len(), values.len())?;

    Ok(Insert {
        table: &metadata.table,
        columns,
        values,
    }
    .to_sql(dialect))
}

/// Update a row by its primary key. `values` follow [`EntityMetadata::updatable_columns`]; the key
/// itself is only used in the predicate. The parent column is set only when `parent_key` is given,
/// which moves a child saved through another parent to that parent. Returns `None` if there is
/// nothing to set.
pub(crate) fn update(
    metadata: &EntityMetadata,
    key: SqlValue,
    values: Vec<SqlValue>,
    parent_key: Option<SqlValue>,
    dialect: Dialect,
) -> Result<Option<SqlStatement>, DatabaseError> {
    let key_column = require_primary_key(metadata)?;
    let columns: Vec<&str> = metadata
        .updatable_columns()
        .map(|column| column.name.as_str())
        .collect();
    check_arity(metadata, columns.len(), values.len())?;

    let mut assignments: Vec<(&str, SqlValue)> = columns.into_iter().zip(values).collect();
    if let (Some(parent), Some(parent_key)) = (metadata.parent(), parent_key) {
        assignments.push((parent.name.as_str(), parent_key));
    }

    if assignments.is_empty() {
        return Ok(None);
    }

    Ok(Some(
        Update {
            table: &metadata.table,
            assignments,
            key_column,
            key,
        }
        .to_sql(dialect),
    ))
}

pub(crate) fn delete(
    metadata: &EntityMetadata,
    key: SqlValue,
    dialect: Dialect,
) -> Result<SqlStatement, DatabaseError> {
    Ok(Delete {
        table: &metadata.table,
        key_column: require_primary_key(metadata)?,
        key,
    }
    .to_sql(dialect))
}

fn check_arity(
    metadata: &EntityMetadata,
    columns: usize,
    values: usize,
) -> Result<(), DatabaseError> {
    if columns == values {
        Ok(())
    } else {
        Err(DatabaseError::Config(format!(
            "Table {} has {columns} columns, but {values} values were bound",
            metadata.table
        )))
    }
}
