// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Transform the descriptor graph (through its [`EntityMetadata`]) into SQL statements.
//!
//! Every function here is pure: the same metadata, restriction and dialect always produce the same
//! statement text and aliases.

use std::{collections::HashMap, sync::Arc};

use crate::{
    schema::metadata::EntityMetadata,
    sql::{
        predicate::{Operator, Where},
        SqlValue,
    },
};

mod select_transformer;
mod write_transformer;

pub(crate) use select_transformer::{label, select, select_keys, JoinAliases, ROOT_ALIAS};
pub(crate) use write_transformer::{delete, insert, update};

/// Which rows of the root table a select returns
#[derive(Debug, Clone, PartialEq)]
pub enum Restriction {
    None,
    Where(Where),
    PrimaryKey(SqlValue),
    ParentKey(SqlValue),
    /// `<parent column> IN (<keys>)`
    ParentKeys(Vec<SqlValue>),
    /// `<parent column> IN (SELECT <parent key> FROM <parent> WHERE <restriction>)`
    ParentSubSelect(Box<SubSelect>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubSelect {
    pub parent: Arc<EntityMetadata>,
    pub restriction: Restriction,
}

impl Restriction {
    pub fn sub_select(parent: Arc<EntityMetadata>, restriction: Restriction) -> Self {
        Restriction::ParentSubSelect(Box::new(SubSelect {
            parent,
            restriction,
        }))
    }

    /// A conjunction of `<column> <operator> <value>` conditions. The operator of a column defaults
    /// to equality, and an equality with `NULL` becomes `IS NULL`. No columns select everything.
    pub fn by_columns(
        columns: &[(&str, SqlValue)],
        operators: &HashMap<String, Operator>,
    ) -> Self {
        let condition = |(column, value): &(&str, SqlValue)| {
            let operator = operators.get(*column).copied().unwrap_or(Operator::Eq);
            match (operator, value) {
                (Operator::Eq, SqlValue::Null) => Where::is_null(*column),
                (Operator::Ne, SqlValue::Null) => Where::is_not_null(*column),
                _ => Where::new(*column, operator, value.clone()),
            }
        };

        let mut conditions = columns.iter().map(condition);
        match conditions.next() {
            Some(first) => {
                Restriction::Where(conditions.fold(first, |acc, next| acc.and_where(next)))
            }
            None => Restriction::None,
        }
    }
}
