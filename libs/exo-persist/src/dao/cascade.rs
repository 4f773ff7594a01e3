// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Write an entity together with the children it owns.
//!
//! Saving is not transactional by itself: a failure part way through leaves the statements
//! executed so far in place unless the caller runs the operation in a transaction.

use tracing::trace;

use crate::{
    database_error::DatabaseError,
    descriptor::{Descriptor, Entity},
    runner::Runner,
    sql::SqlValue,
    transform,
};

/// Insert an entity and then its children.
///
/// The key is reserved from the sequence before the row is written, since the children need it
/// for their parent reference. Returns the key (`NULL` for an entity without a primary key).
pub(crate) async fn insert_entity<T: Entity>(
    descriptor: &Descriptor<T>,
    runner: &mut dyn Runner,
    entity: &mut T,
    parent_key: Option<&SqlValue>,
) -> Result<SqlValue, DatabaseError> {
    let metadata = descriptor.metadata();

    // Bind before touching the database, so that a constraint violation executes nothing
    let values = descriptor.bind_updatable(entity)?;

    let parent_value = match &descriptor.parent {
        Some(parent) => {
            let parent_key = parent_key.cloned().ok_or_else(|| {
                DatabaseError::Config(format!(
                    "{} is owned by a parent and can only be saved through it",
                    metadata.table
                ))
            })?;
            parent.assign(entity, &parent_key)?;
            Some(parent_key)
        }
        None => None,
    };

    let key = match &descriptor.primary_key {
        Some(pk) => {
            if pk.get(entity).is_null() {
                let next = runner.next_sequence_value(&pk.sequence).await?;
                pk.assign(entity, SqlValue::BigInt(next))?;
            }
            Some(pk.get(entity))
        }
        None => None,
    };

    let row: Vec<SqlValue> = key
        .iter()
        .cloned()
        .chain(parent_value)
        .chain(values)
        .collect();

    let statement = transform::insert(metadata, row, runner.dialect())?;
    runner.execute(&statement).await?;

    let key = key.unwrap_or(SqlValue::Null);
    trace!("Inserted {} {key}", metadata.table);

    for children in &descriptor.children {
        children.save(runner, &key, entity, true).await?;
    }

    Ok(key)
}

/// Update an entity by its key and then save its children. The key itself never changes.
pub(crate) async fn update_entity<T: Entity>(
    descriptor: &Descriptor<T>,
    runner: &mut dyn Runner,
    entity: &mut T,
    parent_key: Option<&SqlValue>,
) -> Result<SqlValue, DatabaseError> {
    let metadata = descriptor.metadata();
    let key = descriptor.require_primary_key()?.get(entity);

    if key.is_null() {
        return Err(DatabaseError::Config(format!(
            "Cannot update {} without a primary key value",
            metadata.table
        )));
    }

    let values = descriptor.bind_updatable(entity)?;

    if let (Some(parent), Some(parent_key)) = (&descriptor.parent, parent_key) {
        parent.assign(entity, parent_key)?;
    }

    if let Some(statement) = transform::update(
        metadata,
        key.clone(),
        values,
        parent_key.cloned(),
        runner.dialect(),
    )? {
        runner.execute(&statement).await?;
    }
    trace!("Updated {} {key}", metadata.table);

    for children in &descriptor.children {
        children.save(runner, &key, entity, false).await?;
    }

    Ok(key)
}

/// Delete the row with the given key, after deleting its children (and theirs) bottom-up.
/// Joined entities are left alone.
pub(crate) async fn delete_by_key<T: Entity>(
    descriptor: &Descriptor<T>,
    runner: &mut dyn Runner,
    key: SqlValue,
) -> Result<(), DatabaseError> {
    for children in &descriptor.children {
        children.delete(runner, &key).await?;
    }

    let statement = transform::delete(descriptor.metadata(), key, runner.dialect())?;
    runner.execute(&statement).await?;

    Ok(())
}
