// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;

use crate::{
    dao::{
        cascade,
        loader::{self, Loaded, Pending},
    },
    database_error::DatabaseError,
    runner::Runner,
    selection::{self, ParentScope},
    sql::{
        order::{Direction, Order},
        SqlValue,
    },
    transform::{self, Restriction},
};

use super::{Descriptor, Entity};

/// A one-to-many relationship from `T` to the children it owns.
///
/// The relationship holds no per-operation state: everything an operation needs is passed in.
#[async_trait]
pub(crate) trait ChildrenRelation<T: Entity>: Send + Sync {
    fn name(&self) -> &str;

    /// Check the constraints of the children (and their descendants) of `parent`
    fn check(&self, parent: &mut T) -> Result<(), DatabaseError>;

    /// Load the children of the pending parents and set them on the parents' builders
    async fn load(
        &self,
        runner: &mut dyn Runner,
        parents: &mut [Pending<T>],
        scope: &ParentScope,
    ) -> Result<(), DatabaseError>;

    /// Save the children of `parent`, whose key is `parent_key`. Children without a key are
    /// inserted and the others updated. Unless the parent was just inserted (`fresh`), rows of
    /// children no longer present on the parent are deleted along with their own children.
    async fn save(
        &self,
        runner: &mut dyn Runner,
        parent_key: &SqlValue,
        parent: &mut T,
        fresh: bool,
    ) -> Result<(), DatabaseError>;

    /// Delete all children of the parent with key `parent_key`, bottom-up
    async fn delete(
        &self,
        runner: &mut dyn Runner,
        parent_key: &SqlValue,
    ) -> Result<(), DatabaseError>;
}

pub(crate) struct ChildrenDescriptor<T: Entity, C: Entity> {
    name: String,
    child: Arc<Descriptor<C>>,
    get: Arc<dyn Fn(&mut T) -> &mut Vec<C> + Send + Sync>,
    set: Arc<dyn Fn(&mut T::Builder, Vec<C>) + Send + Sync>,
}

impl<T: Entity, C: Entity> ChildrenDescriptor<T, C> {
    pub fn new(
        name: impl Into<String>,
        child: Arc<Descriptor<C>>,
        get: impl Fn(&mut T) -> &mut Vec<C> + Send + Sync + 'static,
        set: impl Fn(&mut T::Builder, Vec<C>) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            child,
            get: Arc::new(get),
            set: Arc::new(set),
        }
    }

    fn child_order(&self) -> Result<Order, DatabaseError> {
        let pk = self.child.require_primary_key()?;
        Ok(Order::by(pk.name.clone(), Direction::Asc))
    }

    /// Keys of the rows of the children of `parent_key`, in key order
    async fn existing_keys(
        &self,
        runner: &mut dyn Runner,
        parent_key: &SqlValue,
    ) -> Result<Vec<SqlValue>, DatabaseError> {
        let statement = transform::select_keys(
            self.child.metadata(),
            &Restriction::ParentKey(parent_key.clone()),
            runner.dialect(),
        )?;
        let pk = self.child.require_primary_key()?;

        runner
            .query(&statement)
            .await?
            .iter()
            .map(|row| row.value(transform::ROOT_ALIAS, &pk.name))
            .collect()
    }

    fn distribute(&self, parents: &mut [Pending<T>], children: Vec<Loaded<C>>) {
        let mut by_parent = selection::distribute(
            children
                .into_iter()
                .map(|child| (child.parent_key, child.value))
                .collect(),
        );

        for parent in parents {
            let children = parent
                .key
                .as_key()
                .and_then(|key| by_parent.remove(&key))
                .unwrap_or_default();
            (self.set)(&mut parent.builder, children);
        }
    }
}

#[async_trait]
impl<T: Entity, C: Entity> ChildrenRelation<T> for ChildrenDescriptor<T, C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, parent: &mut T) -> Result<(), DatabaseError> {
        for child in (self.get)(parent).iter_mut() {
            self.child.check(child)?;
        }
        Ok(())
    }

    async fn load(
        &self,
        runner: &mut dyn Runner,
        parents: &mut [Pending<T>],
        scope: &ParentScope,
    ) -> Result<(), DatabaseError> {
        let order = self.child_order()?;

        match scope {
            ParentScope::EachParent => {
                for parent in parents.iter_mut() {
                    let children = if parent.key.is_null() {
                        vec![]
                    } else {
                        loader::select_entities(
                            &self.child,
                            runner,
                            Restriction::ParentKey(parent.key.clone()),
                            Some(&order),
                        )
                        .await?
                        .into_iter()
                        .map(|child| child.value)
                        .collect()
                    };
                    (self.set)(&mut parent.builder, children);
                }
            }
            ParentScope::ParentKeys => {
                let keys: Vec<SqlValue> = parents
                    .iter()
                    .filter(|parent| !parent.key.is_null())
                    .map(|parent| parent.key.clone())
                    .collect();

                let children = if keys.is_empty() {
                    vec![]
                } else {
                    loader::select_entities(
                        &self.child,
                        runner,
                        Restriction::ParentKeys(keys),
                        Some(&order),
                    )
                    .await?
                };
                self.distribute(parents, children);
            }
            ParentScope::SubSelect {
                parent,
                restriction,
            } => {
                let children = loader::select_entities(
                    &self.child,
                    runner,
                    Restriction::sub_select(parent.clone(), restriction.clone()),
                    Some(&order),
                )
                .await?;
                self.distribute(parents, children);
            }
        }

        Ok(())
    }

    async fn save(
        &self,
        runner: &mut dyn Runner,
        parent_key: &SqlValue,
        parent: &mut T,
        fresh: bool,
    ) -> Result<(), DatabaseError> {
        let mut found = if fresh {
            vec![]
        } else {
            self.existing_keys(runner, parent_key).await?
        };

        for child in (self.get)(parent).iter_mut() {
            let key = self.child.key_of(child);

            if key.is_null() {
                trace!("Inserting new {} child of {parent_key}", self.name);
                cascade::insert_entity(&self.child, runner, child, Some(parent_key)).await?;
            } else {
                trace!("Updating {} child {key} of {parent_key}", self.name);
                let key = key.as_key();
                found.retain(|existing| existing.as_key() != key);
                cascade::update_entity(&self.child, runner, child, Some(parent_key)).await?;
            }
        }

        for orphan in found {
            trace!("Deleting orphaned {} child {orphan} of {parent_key}", self.name);
            cascade::delete_by_key(&self.child, runner, orphan).await?;
        }

        Ok(())
    }

    async fn delete(
        &self,
        runner: &mut dyn Runner,
        parent_key: &SqlValue,
    ) -> Result<(), DatabaseError> {
        for key in self.existing_keys(runner, parent_key).await? {
            cascade::delete_by_key(&self.child, runner, key).await?;
        }
        Ok(())
    }
}
