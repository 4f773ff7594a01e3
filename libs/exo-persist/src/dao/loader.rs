// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Materialize entities (with their joined entities and owned children) from select results.

use tracing::{debug, trace};

use crate::{
    database_error::DatabaseError,
    descriptor::{Descriptor, Entity},
    runner::{Row, Runner},
    sql::{order::Order, SqlValue},
    transform::{self, JoinAliases, Restriction},
};

/// An entity whose columns have been read but which has not been built yet
pub(crate) struct Pending<T: Entity> {
    pub key: SqlValue,
    pub builder: T::Builder,
}

pub(crate) struct Loaded<T> {
    pub key: SqlValue,
    /// The value of the parent reference, `NULL` for entities without one
    pub parent_key: SqlValue,
    pub value: T,
}

/// Select the entities matching `restriction`, and everything they join and own
pub(crate) async fn select_entities<T: Entity>(
    descriptor: &Descriptor<T>,
    runner: &mut dyn Runner,
    restriction: Restriction,
    order: Option<&Order>,
) -> Result<Vec<Loaded<T>>, DatabaseError> {
    let (statement, aliases) =
        transform::select(descriptor.metadata(), &restriction, order, runner.dialect())?;

    let rows = runner.query(&statement).await?;
    debug!("Selected {} rows from {}", rows.len(), descriptor.table());

    let rows: Vec<&Row> = rows.iter().collect();
    materialize(descriptor, runner, &rows, &aliases, Some(&restriction)).await
}

/// Build one entity per row. The columns of the entity are read with the alias of `aliases`, and
/// those of the joined entities with the nested aliases.
///
/// `restriction` is the restriction that selected the rows, which children may repeat in a
/// sub-select; it is `None` for entities reached through a join.
pub(crate) async fn materialize<T: Entity>(
    descriptor: &Descriptor<T>,
    runner: &mut dyn Runner,
    rows: &[&Row],
    aliases: &JoinAliases,
    restriction: Option<&Restriction>,
) -> Result<Vec<Loaded<T>>, DatabaseError> {
    let alias = &aliases.alias;

    let mut pending = Vec::with_capacity(rows.len());
    let mut parent_keys = Vec::with_capacity(rows.len());

    for row in rows {
        let mut builder = T::Builder::default();

        let key = match &descriptor.primary_key {
            Some(pk) => {
                let key = row.value(alias, &pk.name)?;
                pk.read(&mut builder, key.clone())?;
                key
            }
            None => SqlValue::Null,
        };

        let parent_key = match &descriptor.parent {
            Some(parent) => {
                let parent_key = row.value(alias, &parent.name)?;
                parent.read(&mut builder, parent_key.clone())?;
                parent_key
            }
            None => SqlValue::Null,
        };

        for column in &descriptor.columns {
            column.read(&mut builder, row.value(alias, &column.name)?)?;
        }

        pending.push(Pending { key, builder });
        parent_keys.push(parent_key);
    }

    for (join, join_aliases) in descriptor.joins.iter().zip(&aliases.joins) {
        trace!("Reading join {} of {}", join.name(), descriptor.table());
        join.populate(runner, rows, join_aliases, &mut pending).await?;
    }

    if !descriptor.children.is_empty() && !pending.is_empty() {
        let scope = descriptor
            .selection_strategy()
            .children_scope(descriptor.metadata(), restriction);

        for children in &descriptor.children {
            trace!(
                "Loading {} of {} {} ({})",
                children.name(),
                pending.len(),
                descriptor.table(),
                scope.id()
            );
            children.load(runner, &mut pending, &scope).await?;
        }
    }

    pending
        .into_iter()
        .zip(parent_keys)
        .map(|(pending, parent_key)| {
            Ok(Loaded {
                key: pending.key,
                parent_key,
                value: T::build(pending.builder)?,
            })
        })
        .collect()
}
