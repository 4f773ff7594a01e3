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
    sql::{
        join::LeftJoin,
        order::{Direction, Order},
        predicate::{Operator, Where},
        prefixer::Prefixer,
        select::{Filter, Select, SelectColumn},
        Dialect, ExpressionBuilder, SqlStatement,
    },
};

use super::Restriction;

/// Alias of the table a select is issued against
pub(crate) const ROOT_ALIAS: &str = "a";

/// Label of a selected column in the result row
pub(crate) fn label(alias: &str, column: &str) -> String {
    SelectColumn::label(alias, column)
}

/// Aliases assigned to a table and, transitively, to the tables it joins. `joins[i]` belongs to
/// the `i`-th join column of the table.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct JoinAliases {
    pub alias: String,
    pub joins: Vec<JoinAliases>,
}

/// Select every column of the table and of all tables it joins (transitively), restricted by
/// `restriction` and ordered by `order`.
///
/// Tables are aliased in depth-first pre-order: `a` for the root table, then each joined table
/// followed by the tables it joins. A table reached through two different join paths is joined
/// (and aliased) twice.
pub(crate) fn select(
    metadata: &EntityMetadata,
    restriction: &Restriction,
    order: Option<&Order>,
    dialect: Dialect,
) -> Result<(SqlStatement, JoinAliases), DatabaseError> {
    let mut prefixer = Prefixer::new();
    let alias = prefixer.next_alias();

    let mut columns = vec![];
    let mut joins = vec![];
    let aliases = flatten(metadata, alias.clone(), &mut prefixer, &mut columns, &mut joins)?;

    let filters = filters(metadata, &alias, restriction, &mut prefixer)?;

    let select = Select {
        columns,
        table: metadata.table.clone(),
        alias,
        joins,
        filters,
        order: order.cloned(),
    };

    Ok((select.to_sql(dialect), aliases))
}

/// Select only the primary key of the rows matching `restriction`, in key order
pub(crate) fn select_keys(
    metadata: &EntityMetadata,
    restriction: &Restriction,
    dialect: Dialect,
) -> Result<SqlStatement, DatabaseError> {
    let pk = require_primary_key(metadata)?;

    let mut prefixer = Prefixer::new();
    let alias = prefixer.next_alias();
    let filters = filters(metadata, &alias, restriction, &mut prefixer)?;

    let select = Select {
        columns: vec![SelectColumn {
            alias: alias.clone(),
            column: pk.to_string(),
            labelled: true,
        }],
        table: metadata.table.clone(),
        alias,
        joins: vec![],
        filters,
        order: Some(Order::by(pk, Direction::Asc)),
    };

    Ok(select.to_sql(dialect))
}

fn flatten(
    metadata: &EntityMetadata,
    alias: String,
    prefixer: &mut Prefixer,
    columns: &mut Vec<SelectColumn>,
    joins: &mut Vec<LeftJoin>,
) -> Result<JoinAliases, DatabaseError> {
    columns.extend(metadata.ordered_columns().map(|column| SelectColumn {
        alias: alias.clone(),
        column: column.name.clone(),
        labelled: true,
    }));

    let mut join_aliases = vec![];
    for column in metadata.join_columns() {
        let Some(target) = column.join_target() else {
            continue;
        };
        let target_pk = require_primary_key(target)?;
        let target_alias = prefixer.next_alias();

        joins.push(LeftJoin {
            table: target.table.clone(),
            alias: target_alias.clone(),
            left_alias: alias.clone(),
            left_column: column.name.clone(),
            right_column: target_pk.to_string(),
        });

        join_aliases.push(flatten(target, target_alias, prefixer, columns, joins)?);
    }

    Ok(JoinAliases {
        alias,
        joins: join_aliases,
    })
}

fn filters(
    metadata: &EntityMetadata,
    alias: &str,
    restriction: &Restriction,
    prefixer: &mut Prefixer,
) -> Result<Vec<Filter>, DatabaseError> {
    let predicate = |predicate: Where| Filter::Predicate {
        alias: alias.to_string(),
        predicate,
    };

    let filter = match restriction {
        Restriction::None => return Ok(vec![]),
        Restriction::Where(where_) => predicate(where_.clone()),
        Restriction::PrimaryKey(key) => predicate(Where::new(
            require_primary_key(metadata)?,
            Operator::Eq,
            key.clone(),
        )),
        Restriction::ParentKey(key) => predicate(Where::new(
            require_parent(metadata)?,
            Operator::Eq,
            key.clone(),
        )),
        Restriction::ParentKeys(keys) => {
            predicate(Where::is_in(require_parent(metadata)?, keys.iter().cloned()))
        }
        Restriction::ParentSubSelect(sub_select) => {
            let parent = &sub_select.parent;
            let parent_pk = require_primary_key(parent)?;
            let parent_alias = prefixer.next_alias();
            let parent_filters = filters(parent, &parent_alias, &sub_select.restriction, prefixer)?;

            Filter::InSubSelect {
                alias: alias.to_string(),
                column: require_parent(metadata)?.to_string(),
                select: Box::new(Select {
                    columns: vec![SelectColumn {
                        alias: parent_alias.clone(),
                        column: parent_pk.to_string(),
                        labelled: false,
                    }],
                    table: parent.table.clone(),
                    alias: parent_alias,
                    joins: vec![],
                    filters: parent_filters,
                    order: None,
                }),
            }
        }
    };

    Ok(vec![filter])
}

pub(super) fn require_primary_key(metadata: &EntityMetadata) -> Result<&str, DatabaseError> {
    metadata
        .primary_key()
        .map(|column| column.name.as_str())
        .ok_or_else(|| {
            DatabaseError::Config(format!("Table {} has no primary key", metadata.table))
        })
}

fn require_parent(metadata: &EntityMetadata) -> Result<&str, DatabaseError> {
    metadata
        .parent()
        .map(|column| column.name.as_str())
        .ok_or_else(|| {
            DatabaseError::Config(format!("Table {} has no parent column", metadata.table))
        })
}
