// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The typed descriptor graph.
//!
//! A [`Descriptor`] describes how an entity type maps to its table: the primary key, the parent
//! reference of an owned child, data columns, joins to independently persisted entities and owned
//! children. Descriptors are assembled with a [`DescriptorBuilder`] once, and shared (through an
//! [`Arc`]) by every Dao and by the descriptors of the entities that join or own them.

use std::sync::Arc;

use crate::{
    database_error::DatabaseError,
    schema::metadata::EntityMetadata,
    selection::SelectionStrategy,
    sql::SqlValue,
};

mod builder;
mod children;
mod column;
pub mod converter;
mod join_column;
pub mod sql_type;

pub use builder::{ColumnOptions, DescriptorBuilder};
pub(crate) use children::ChildrenRelation;
pub use column::{Column, ParentColumn, PrimaryKey};
pub(crate) use join_column::JoinReference;

/// A type persisted through a [`Descriptor`].
///
/// Entities are materialized in two phases: column values are written into a mutable
/// [`Entity::Builder`], which is then turned into the entity by [`Entity::build`].
pub trait Entity: Send + Sync + Sized + 'static {
    type Builder: Default + Send + Sync + 'static;

    fn build(builder: Self::Builder) -> Result<Self, DatabaseError>;
}

pub struct Descriptor<T: Entity> {
    pub(crate) metadata: Arc<EntityMetadata>,
    pub(crate) primary_key: Option<PrimaryKey<T>>,
    pub(crate) parent: Option<ParentColumn<T>>,
    pub(crate) columns: Vec<Column<T>>,
    pub(crate) joins: Vec<Box<dyn JoinReference<T>>>,
    pub(crate) children: Vec<Box<dyn ChildrenRelation<T>>>,
}

impl<T: Entity> Descriptor<T> {
    pub fn builder(table: impl Into<String>) -> DescriptorBuilder<T> {
        DescriptorBuilder::new(table)
    }

    pub fn metadata(&self) -> &Arc<EntityMetadata> {
        &self.metadata
    }

    pub fn table(&self) -> &str {
        &self.metadata.table
    }

    pub fn selection_strategy(&self) -> SelectionStrategy {
        self.metadata.selection_strategy
    }

    pub fn is_keyed(&self) -> bool {
        self.primary_key.is_some()
    }

    /// The primary key of an entity; `NULL` if it has none yet or the entity is not keyed
    pub fn key_of(&self, entity: &T) -> SqlValue {
        self.primary_key
            .as_ref()
            .map(|pk| pk.get(entity))
            .unwrap_or(SqlValue::Null)
    }

    pub(crate) fn require_primary_key(&self) -> Result<&PrimaryKey<T>, DatabaseError> {
        self.primary_key.as_ref().ok_or_else(|| {
            DatabaseError::Config(format!("{} has no primary key", self.metadata.table))
        })
    }

    /// Values of the data and join columns, in [`EntityMetadata::updatable_columns`] order.
    /// Fails with a constraint violation if a non-nullable column has no value.
    pub(crate) fn bind_updatable(&self, entity: &T) -> Result<Vec<SqlValue>, DatabaseError> {
        let values = self
            .columns
            .iter()
            .map(|column| column.get(entity))
            .chain(self.joins.iter().map(|join| Ok(join.foreign_key(entity))));

        self.metadata
            .updatable_columns()
            .zip(values)
            .map(|(column, value)| {
                let value = value?;
                if value.is_null() && !column.nullable {
                    Err(DatabaseError::ConstraintViolation(format!(
                        "{}.{} must not be null",
                        self.metadata.table, column.name
                    )))
                } else {
                    Ok(value)
                }
            })
            .collect()
    }

    /// Check the constraints of an entity and all its owned descendants without touching the
    /// database
    pub(crate) fn check(&self, entity: &mut T) -> Result<(), DatabaseError> {
        self.bind_updatable(entity)?;
        for children in &self.children {
            children.check(entity)?;
        }
        Ok(())
    }
}

impl<T: Entity> std::fmt::Debug for Descriptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Descriptor")
            .field("table", &self.metadata.table)
            .field("columns", &self.metadata.columns.len())
            .field("children", &self.children.len())
            .finish()
    }
}
