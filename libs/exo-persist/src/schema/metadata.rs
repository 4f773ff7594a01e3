// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The untyped view of a descriptor graph.
//!
//! Every entity is described by one flat [`EntityMetadata`] record whose columns carry a
//! [`ColumnKind`] tag. Joined and owned entities are referenced through an [`Arc`] to their own
//! record, so the SQL generator and the validator can walk the graph without knowing any of the
//! entity types.

use std::sync::Arc;

use crate::selection::SelectionStrategy;

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnKind {
    Data,
    PrimaryKey {
        /// Sequence to draw new keys from
        sequence: String,
    },
    /// Foreign key to the owning parent
    ParentReference,
    /// Foreign key to an independently persisted entity
    JoinReference { target: Arc<EntityMetadata> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMetadata {
    pub name: String,
    pub kind: ColumnKind,
    pub nullable: bool,
    /// Overrides `supported_types` when validating against the live schema
    pub sql_type_name: Option<String>,
    /// Database type names the column's Rust type can be read from and written to. Empty when
    /// unknown, in which case validation does not check the type.
    pub supported_types: &'static [&'static str],
}

impl ColumnMetadata {
    pub fn is_primary_key(&self) -> bool {
        matches!(self.kind, ColumnKind::PrimaryKey { .. })
    }

    pub fn join_target(&self) -> Option<&Arc<EntityMetadata>> {
        match &self.kind {
            ColumnKind::JoinReference { target } => Some(target),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChildrenMetadata {
    /// Name of the relationship (for diagnostics)
    pub name: String,
    pub child: Arc<EntityMetadata>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniqueConstraint {
    pub name: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityMetadata {
    pub table: String,
    /// All columns in declaration order
    pub columns: Vec<ColumnMetadata>,
    pub children: Vec<ChildrenMetadata>,
    pub unique_constraints: Vec<UniqueConstraint>,
    pub selection_strategy: SelectionStrategy,
}

impl EntityMetadata {
    pub fn primary_key(&self) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|column| column.is_primary_key())
    }

    /// The sequence of the primary key, if any
    pub fn sequence(&self) -> Option<&str> {
        self.columns.iter().find_map(|column| match &column.kind {
            ColumnKind::PrimaryKey { sequence } => Some(sequence.as_str()),
            _ => None,
        })
    }

    pub fn parent(&self) -> Option<&ColumnMetadata> {
        self.columns
            .iter()
            .find(|column| column.kind == ColumnKind::ParentReference)
    }

    pub fn data_columns(&self) -> impl Iterator<Item = &ColumnMetadata> {
        self.columns
            .iter()
            .filter(|column| column.kind == ColumnKind::Data)
    }

    pub fn join_columns(&self) -> impl Iterator<Item = &ColumnMetadata> {
        self.columns
            .iter()
            .filter(|column| column.join_target().is_some())
    }

    /// Columns of this table in the order they are selected and inserted: primary key, parent,
    /// data columns and then join columns.
    pub fn ordered_columns(&self) -> impl Iterator<Item = &ColumnMetadata> {
        self.primary_key()
            .into_iter()
            .chain(self.parent())
            .chain(self.data_columns())
            .chain(self.join_columns())
    }

    /// Columns written by an update: data columns and then join columns. The primary key and the
    /// parent reference never change once a row exists.
    pub fn updatable_columns(&self) -> impl Iterator<Item = &ColumnMetadata> {
        self.data_columns().chain(self.join_columns())
    }

    pub fn column(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns
            .iter()
            .find(|column| column.name.eq_ignore_ascii_case(name))
    }

    pub fn unique_constraint(&self, name: &str) -> Option<&UniqueConstraint> {
        self.unique_constraints
            .iter()
            .find(|constraint| constraint.name == name)
    }

    /// Whether this entity or any entity reachable through its joins owns children
    pub fn has_children_through_joins(&self) -> bool {
        !self.children.is_empty()
            || self
                .join_columns()
                .filter_map(ColumnMetadata::join_target)
                .any(|target| target.has_children_through_joins())
    }
}


#[cfg(test)]
mod tests {
    use super::{test_helper::*, *};

    #[test]
    fn columns_are_ordered_by_kind() {
        let venue = Arc::new(table("venues", vec![pk_column("id"), data_column("name")]));
        let concert = table(
            "concerts",
            vec![
                data_column("title"),
                join_column("venue_id", &venue),
                parent_column("festival_id"),
                pk_column("id"),
            ],
        );

        let names: Vec<_> = concert
            .ordered_columns()
            .map(|column| column.name.as_str())
            .collect();
        assert_eq!(names, ["id", "festival_id", "title", "venue_id"]);
        assert_eq!(concert.sequence(), Some("id_seq"));
        assert!(!concert.has_children_through_joins());
    }
}
