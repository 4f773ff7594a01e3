// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! How owned children are fetched when several parents are materialized at once.
//!
//! All strategies yield the same object graph; they differ in the number of round trips and the
//! shape of the queries:
//! - [`SelectionStrategy::Standard`] issues one query per parent row,
//! - [`SelectionStrategy::ByKeysInClause`] issues one query with `IN (<parent keys>)`,
//! - [`SelectionStrategy::SubSelectInClause`] issues one query with `IN (SELECT <parent key> ...)`
//!   repeating the restriction that selected the parents.

use std::{collections::HashMap, fmt::Display, str::FromStr, sync::Arc};

use tracing::debug;

use crate::{
    database_error::DatabaseError,
    schema::metadata::EntityMetadata,
    sql::{KeyValue, SqlValue},
    transform::Restriction,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum SelectionStrategy {
    #[default]
    Standard,
    ByKeysInClause,
    SubSelectInClause,
}

impl SelectionStrategy {
    /// A unique identifier for this strategy (also its configuration value)
    pub fn id(&self) -> &'static str {
        match self {
            SelectionStrategy::Standard => "standard",
            SelectionStrategy::ByKeysInClause => "by-keys-in-clause",
            SelectionStrategy::SubSelectInClause => "sub-select-in-clause",
        }
    }

    /// The scope to load the children of parents that were selected with `restriction` from the
    /// `parent` table. Without a restriction (parents reached through a join rather than a query of
    /// their own), there is nothing to repeat in a sub-select, so the keys are used instead.
    pub(crate) fn children_scope(
        &self,
        parent: &Arc<EntityMetadata>,
        restriction: Option<&Restriction>,
    ) -> ParentScope {
        let scope = match (self, restriction) {
            (SelectionStrategy::Standard, _) => ParentScope::EachParent,
            (SelectionStrategy::ByKeysInClause, _) | (SelectionStrategy::SubSelectInClause, None) => {
                ParentScope::ParentKeys
            }
            (SelectionStrategy::SubSelectInClause, Some(restriction)) => ParentScope::SubSelect {
                parent: parent.clone(),
                restriction: restriction.clone(),
            },
        };

        debug!(
            "Using selection strategy {} for children of {}",
            scope.id(),
            parent.table
        );

        scope
    }
}

impl Display for SelectionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for SelectionStrategy {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "standard" => Ok(SelectionStrategy::Standard),
            "by-keys-in-clause" => Ok(SelectionStrategy::ByKeysInClause),
            "sub-select-in-clause" => Ok(SelectionStrategy::SubSelectInClause),
            _ => Err(DatabaseError::Config(format!(
                "Unknown selection strategy '{s}'. Expected standard, by-keys-in-clause or sub-select-in-clause"
            ))),
        }
    }
}

/// The resolved way to restrict the children of a batch of parents
#[derive(Debug, Clone)]
pub(crate) enum ParentScope {
    /// One query per parent key
    EachParent,
    /// One query over all parent keys
    ParentKeys,
    /// One query over the parents selected by a restriction
    SubSelect {
        parent: Arc<EntityMetadata>,
        restriction: Restriction,
    },
}

impl ParentScope {
    pub(crate) fn id(&self) -> &'static str {
        match self {
            ParentScope::EachParent => "each-parent",
            ParentScope::ParentKeys => "parent-keys",
            ParentScope::SubSelect { .. } => "sub-select",
        }
    }
}

/// Group children by the value of their parent reference. The order of the children within each
/// group is the order of `children`; no order is assumed between the groups.
pub(crate) fn distribute<C>(children: Vec<(SqlValue, C)>) -> HashMap<KeyValue, Vec<C>> {
    let mut by_parent: HashMap<KeyValue, Vec<C>> = HashMap::new();

    for (parent_key, child) in children {
        if let Some(parent_key) = parent_key.as_key() {
            by_parent.entry(parent_key).or_default().push(child);
        }
    }

    by_parent
}
