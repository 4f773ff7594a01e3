// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Typed accessors between entity fields and single columns.
//!
//! Values are read from an entity (`&T`) when writing rows, and written into the entity's builder
//! (`&mut T::Builder`) when materializing rows. Nullability lives in the column metadata and is
//! enforced by the [`Descriptor`](super::Descriptor) that owns the columns.

use std::sync::Arc;

use crate::{database_error::DatabaseError, sql::SqlValue};

use super::{converter::Converter, sql_type::SqlType, Entity};

type Getter<T> = Arc<dyn Fn(&T) -> Result<SqlValue, DatabaseError> + Send + Sync>;
type Setter<B> = Arc<dyn Fn(&mut B, SqlValue) -> Result<(), DatabaseError> + Send + Sync>;
type Assigner<T> = Arc<dyn Fn(&mut T, SqlValue) -> Result<(), DatabaseError> + Send + Sync>;

fn setter<B, V: SqlType>(set: impl Fn(&mut B, V) + Send + Sync + 'static) -> Setter<B> {
    Arc::new(move |builder: &mut B, value: SqlValue| {
        set(builder, V::from_sql_value(value)?);
        Ok(())
    })
}

fn assigner<T, V: SqlType>(assign: impl Fn(&mut T, V) + Send + Sync + 'static) -> Assigner<T> {
    Arc::new(move |entity: &mut T, value: SqlValue| {
        assign(entity, V::from_sql_value(value)?);
        Ok(())
    })
}

/// A data column
pub struct Column<T: Entity> {
    pub(crate) name: String,
    get: Getter<T>,
    set: Setter<T::Builder>,
}

impl<T: Entity> Column<T> {
    pub(crate) fn new<V: SqlType>(
        name: impl Into<String>,
        get: impl Fn(&T) -> V + Send + Sync + 'static,
        set: impl Fn(&mut T::Builder, V) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            get: Arc::new(move |entity: &T| Ok(get(entity).to_sql_value())),
            set: setter(set),
        }
    }

    pub(crate) fn converted<C: Converter>(
        name: impl Into<String>,
        converter: C,
        get: impl Fn(&T) -> C::Domain + Send + Sync + 'static,
        set: impl Fn(&mut T::Builder, C::Domain) + Send + Sync + 'static,
    ) -> Self {
        let converter = Arc::new(converter);
        let read_converter = converter.clone();

        Self {
            name: name.into(),
            get: Arc::new(move |entity: &T| {
                Ok(converter.to_storage(get(entity))?.to_sql_value())
            }),
            set: Arc::new(move |builder: &mut T::Builder, value: SqlValue| {
                let stored = C::Storage::from_sql_value(value)?;
                set(builder, read_converter.from_storage(stored)?);
                Ok(())
            }),
        }
    }

    pub(crate) fn get(&self, entity: &T) -> Result<SqlValue, DatabaseError> {
        (self.get)(entity)
    }

    pub(crate) fn read(&self, builder: &mut T::Builder, value: SqlValue) -> Result<(), DatabaseError> {
        (self.set)(builder, value)
    }
}

/// The primary key, whose values are drawn from a sequence
pub struct PrimaryKey<T: Entity> {
    pub(crate) name: String,
    pub(crate) sequence: String,
    get: Arc<dyn Fn(&T) -> SqlValue + Send + Sync>,
    assign: Assigner<T>,
    set: Setter<T::Builder>,
}

impl<T: Entity> PrimaryKey<T> {
    pub(crate) fn new<K: SqlType>(
        name: impl Into<String>,
        sequence: impl Into<String>,
        get: impl Fn(&T) -> Option<K> + Send + Sync + 'static,
        assign: impl Fn(&mut T, K) + Send + Sync + 'static,
        set: impl Fn(&mut T::Builder, K) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            sequence: sequence.into(),
            get: Arc::new(move |entity: &T| get(entity).to_sql_value()),
            assign: assigner(assign),
            set: setter(set),
        }
    }

    /// The key of the entity, or `NULL` if it has not been persisted yet
    pub(crate) fn get(&self, entity: &T) -> SqlValue {
        (self.get)(entity)
    }

    /// Set a freshly reserved key on an entity that is being inserted
    pub(crate) fn assign(&self, entity: &mut T, key: SqlValue) -> Result<(), DatabaseError> {
        (self.assign)(entity, key)
    }

    pub(crate) fn read(&self, builder: &mut T::Builder, value: SqlValue) -> Result<(), DatabaseError> {
        (self.set)(builder, value)
    }
}

/// The reference from a child row to its owning parent.
///
/// The value always comes from the parent being saved or loaded. An entity may carry it as a field
/// (a back-reference), but does not have to.
pub struct ParentColumn<T: Entity> {
    pub(crate) name: String,
    back_reference: Option<BackReference<T>>,
}

struct BackReference<T: Entity> {
    assign: Assigner<T>,
    set: Setter<T::Builder>,
}

impl<T: Entity> ParentColumn<T> {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            back_reference: None,
        }
    }

    pub(crate) fn with_back_reference<K: SqlType>(
        name: impl Into<String>,
        assign: impl Fn(&mut T, K) + Send + Sync + 'static,
        set: impl Fn(&mut T::Builder, K) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            back_reference: Some(BackReference {
                assign: assigner(assign),
                set: setter(set),
            }),
        }
    }

    pub(crate) fn assign(&self, entity: &mut T, parent_key: &SqlValue) -> Result<(), DatabaseError> {
        match &self.back_reference {
            Some(back_reference) => (back_reference.assign)(entity, parent_key.clone()),
            None => Ok(()),
        }
    }

    pub(crate) fn read(&self, builder: &mut T::Builder, value: SqlValue) -> Result<(), DatabaseError> {
        match &self.back_reference {
            Some(back_reference) => (back_reference.set)(builder, value),
            None => Ok(()),
        }
    }
}
