// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use tracing::trace;

use crate::{
    dao::loader::{self, Pending},
    database_error::DatabaseError,
    runner::{Row, Runner},
    sql::{KeyValue, SqlValue},
    transform::JoinAliases,
};

use super::{Descriptor, Entity};

/// A reference from an entity of type `T` to an independently persisted entity. Joined entities
/// are read along with the referencing entity, but never saved or deleted with it.
#[async_trait]
pub(crate) trait JoinReference<T: Entity>: Send + Sync {
    fn name(&self) -> &str;

    /// The key of the referenced entity, `NULL` if there is none
    fn foreign_key(&self, entity: &T) -> SqlValue;

    /// Materialize the referenced entities from the joined columns of `rows` (labelled with the
    /// aliases in `aliases`) and set them on the corresponding pending entities.
    async fn populate(
        &self,
        runner: &mut dyn Runner,
        rows: &[&Row],
        aliases: &JoinAliases,
        pending: &mut [Pending<T>],
    ) -> Result<(), DatabaseError>;
}

pub(crate) struct JoinColumn<T: Entity, U: Entity + Clone> {
    name: String,
    target: Arc<Descriptor<U>>,
    get: Arc<dyn Fn(&T) -> Option<&U> + Send + Sync>,
    set: Arc<dyn Fn(&mut T::Builder, Option<U>) + Send + Sync>,
}

impl<T: Entity, U: Entity + Clone> JoinColumn<T, U> {
    pub fn new(
        name: impl Into<String>,
        target: Arc<Descriptor<U>>,
        get: impl Fn(&T) -> Option<&U> + Send + Sync + 'static,
        set: impl Fn(&mut T::Builder, Option<U>) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            target,
            get: Arc::new(get),
            set: Arc::new(set),
        }
    }
}

#[async_trait]
impl<T: Entity, U: Entity + Clone> JoinReference<T> for JoinColumn<T, U> {
    fn name(&self) -> &str {
        &self.name
    }

    fn foreign_key(&self, entity: &T) -> SqlValue {
        (self.get)(entity)
            .map(|target| self.target.key_of(target))
            .unwrap_or(SqlValue::Null)
    }

    async fn populate(
        &self,
        runner: &mut dyn Runner,
        rows: &[&Row],
        aliases: &JoinAliases,
        pending: &mut [Pending<T>],
    ) -> Result<(), DatabaseError> {
        let target_pk = self.target.require_primary_key()?;

        let keys = rows
            .iter()
            .map(|row| Ok(row.value(&aliases.alias, &target_pk.name)?.as_key()))
            .collect::<Result<Vec<Option<KeyValue>>, DatabaseError>>()?;

        // The same entity may be referenced from many rows; materialize it once
        let mut seen = HashSet::new();
        let mut distinct_rows: Vec<&Row> = vec![];
        for (row, key) in rows.iter().zip(&keys) {
            if key.as_ref().is_some_and(|key| seen.insert(key.clone())) {
                distinct_rows.push(*row);
            }
        }

        trace!(
            "Join {}: {} distinct {} for {} rows",
            self.name,
            distinct_rows.len(),
            self.target.table(),
            rows.len()
        );

        let by_key: HashMap<KeyValue, U> = if distinct_rows.is_empty() {
            HashMap::new()
        } else {
            loader::materialize(&self.target, runner, &distinct_rows, aliases, None)
                .await?
                .into_iter()
                .filter_map(|loaded| loaded.key.as_key().map(|key| (key, loaded.value)))
                .collect()
        };

        for (entity, key) in pending.iter_mut().zip(keys) {
            let target = key.and_then(|key| by_key.get(&key).cloned());
            (self.set)(&mut entity.builder, target);
        }

        Ok(())
    }
}
