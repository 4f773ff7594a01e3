// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Public persistence operations over a descriptor graph.
//!
//! A [`Dao`] binds a shared [`Descriptor`] to one runner for the duration of some operations. It
//! is cheap to create, so the usual pattern is one Dao per unit of work.

use std::{collections::HashMap, sync::Arc};

use tracing::{debug, instrument};

use crate::{
    database_error::DatabaseError,
    descriptor::{Descriptor, Entity},
    runner::Runner,
    sql::{order::Order, predicate::Operator, predicate::Where, SqlValue},
    transform::Restriction,
};

pub(crate) mod cascade;
pub(crate) mod loader;

#[cfg(test)]
mod tests;

pub struct Dao<'r, T: Entity> {
    descriptor: Arc<Descriptor<T>>,
    runner: &'r mut dyn Runner,
}

impl<'r, T: Entity> Dao<'r, T> {
    /// A Dao for any descriptor. Operations that identify rows by key fail for descriptors
    /// without a primary key.
    pub fn new(descriptor: Arc<Descriptor<T>>, runner: &'r mut dyn Runner) -> Self {
        Self { descriptor, runner }
    }

    /// A Dao for a descriptor that must have a primary key
    pub fn keyed(
        descriptor: Arc<Descriptor<T>>,
        runner: &'r mut dyn Runner,
    ) -> Result<Self, DatabaseError> {
        descriptor.require_primary_key()?;
        Ok(Self::new(descriptor, runner))
    }

    pub fn descriptor(&self) -> &Arc<Descriptor<T>> {
        &self.descriptor
    }

    #[instrument(name = "Dao::select_by_id", skip_all, fields(table = %self.descriptor.table()))]
    pub async fn select_by_id(
        &mut self,
        key: impl Into<SqlValue>,
    ) -> Result<Option<T>, DatabaseError> {
        self.descriptor.require_primary_key()?;

        let key = key.into();
        if key.is_null() {
            return Ok(None);
        }

        self.select_one(Restriction::PrimaryKey(key)).await
    }

    #[instrument(name = "Dao::select_all", skip_all, fields(table = %self.descriptor.table()))]
    pub async fn select_all(&mut self) -> Result<Vec<T>, DatabaseError> {
        self.select(Restriction::None, None).await
    }

    #[instrument(name = "Dao::select_where", skip_all, fields(table = %self.descriptor.table()))]
    pub async fn select_where(
        &mut self,
        predicate: &Where,
        order: Option<&Order>,
    ) -> Result<Vec<T>, DatabaseError> {
        self.select(Restriction::Where(predicate.clone()), order)
            .await
    }

    /// Entities whose columns equal the given values
    #[instrument(name = "Dao::select_by_columns", skip_all, fields(table = %self.descriptor.table()))]
    pub async fn select_by_columns(
        &mut self,
        columns: &[(&str, SqlValue)],
    ) -> Result<Vec<T>, DatabaseError> {
        self.select(Restriction::by_columns(columns, &HashMap::new()), None)
            .await
    }

    /// Like [`Dao::select_by_columns`], comparing the columns present in `operators` with their
    /// operator instead of equality
    #[instrument(
        name = "Dao::select_by_columns_with",
        skip_all,
        fields(table = %self.descriptor.table())
    )]
    pub async fn select_by_columns_with(
        &mut self,
        columns: &[(&str, SqlValue)],
        operators: &HashMap<String, Operator>,
    ) -> Result<Vec<T>, DatabaseError> {
        self.select(Restriction::by_columns(columns, operators), None)
            .await
    }

    /// The entity identified by the values of a declared uniqueness constraint
    #[instrument(name = "Dao::select_by_unique", skip_all, fields(table = %self.descriptor.table()))]
    pub async fn select_by_unique(
        &mut self,
        constraint: &str,
        values: &[SqlValue],
    ) -> Result<Option<T>, DatabaseError> {
        let metadata = self.descriptor.metadata().clone();
        let unique = metadata.unique_constraint(constraint).ok_or_else(|| {
            DatabaseError::Config(format!(
                "{} has no unique constraint {constraint}",
                metadata.table
            ))
        })?;

        if unique.columns.len() != values.len() {
            return Err(DatabaseError::Config(format!(
                "Unique constraint {constraint} of {} has {} columns, but {} values were given",
                metadata.table,
                unique.columns.len(),
                values.len()
            )));
        }

        let columns: Vec<(&str, SqlValue)> = unique
            .columns
            .iter()
            .map(String::as_str)
            .zip(values.iter().cloned())
            .collect();

        self.select_one(Restriction::by_columns(&columns, &HashMap::new()))
            .await
    }

    /// Insert an entity and its children, assigning keys from the sequences as needed. Returns
    /// the key of the entity.
    #[instrument(name = "Dao::insert", skip_all, fields(table = %self.descriptor.table()))]
    pub async fn insert(&mut self, entity: &mut T) -> Result<SqlValue, DatabaseError> {
        self.descriptor.check(entity)?;
        cascade::insert_entity(&self.descriptor, &mut *self.runner, entity, None).await
    }

    /// Update an entity by key, and save its children: new children are inserted, existing ones
    /// updated, and children no longer on the entity deleted.
    #[instrument(name = "Dao::update", skip_all, fields(table = %self.descriptor.table()))]
    pub async fn update(&mut self, entity: &mut T) -> Result<SqlValue, DatabaseError> {
        self.descriptor.check(entity)?;
        cascade::update_entity(&self.descriptor, &mut *self.runner, entity, None).await
    }

    /// Insert the entity if it has no key yet, update it otherwise
    #[instrument(name = "Dao::save", skip_all, fields(table = %self.descriptor.table()))]
    pub async fn save(&mut self, entity: &mut T) -> Result<SqlValue, DatabaseError> {
        let pk = self.descriptor.require_primary_key()?;

        if pk.get(entity).is_null() {
            self.insert(entity).await
        } else {
            self.update(entity).await
        }
    }

    /// Delete an entity and, bottom-up, the children it owns
    #[instrument(name = "Dao::delete", skip_all, fields(table = %self.descriptor.table()))]
    pub async fn delete(&mut self, entity: &T) -> Result<(), DatabaseError> {
        let key = self.descriptor.require_primary_key()?.get(entity);
        self.delete_by_id(key).await
    }

    #[instrument(name = "Dao::delete_by_id", skip_all, fields(table = %self.descriptor.table()))]
    pub async fn delete_by_id(&mut self, key: impl Into<SqlValue>) -> Result<(), DatabaseError> {
        self.descriptor.require_primary_key()?;

        let key = key.into();
        if key.is_null() {
            return Err(DatabaseError::Config(format!(
                "Cannot delete from {} without a primary key value",
                self.descriptor.table()
            )));
        }

        cascade::delete_by_key(&self.descriptor, &mut *self.runner, key).await
    }

    async fn select(
        &mut self,
        restriction: Restriction,
        order: Option<&Order>,
    ) -> Result<Vec<T>, DatabaseError> {
        debug!(
            "Using selection strategy {} for {}",
            self.descriptor.selection_strategy(),
            self.descriptor.table()
        );

        let loaded =
            loader::select_entities(&self.descriptor, &mut *self.runner, restriction, order).await?;
        Ok(loaded.into_iter().map(|loaded| loaded.value).collect())
    }

    async fn select_one(&mut self, restriction: Restriction) -> Result<Option<T>, DatabaseError> {
        let mut entities = self.select(restriction, None).await?;

        match entities.len() {
            0 | 1 => Ok(entities.pop()),
            count => Err(DatabaseError::ConstraintViolation(format!(
                "Expected at most one row of {}, found {count}",
                self.descriptor.table()
            ))),
        }
    }
}
