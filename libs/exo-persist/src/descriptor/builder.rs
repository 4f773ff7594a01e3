// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{collections::HashSet, sync::Arc};

use crate::{
    database_error::DatabaseError,
    schema::metadata::{
        ChildrenMetadata, ColumnKind, ColumnMetadata, EntityMetadata, UniqueConstraint,
    },
    selection::SelectionStrategy,
};

use super::{
    children::{ChildrenDescriptor, ChildrenRelation},
    column::{Column, ParentColumn, PrimaryKey},
    converter::Converter,
    join_column::{JoinColumn, JoinReference},
    sql_type::SqlType,
    Descriptor, Entity,
};

/// Assembles a [`Descriptor`].
///
/// Mistakes in the description (a second primary key, a child without a parent reference, ...)
/// are collected as they are made and reported together by [`DescriptorBuilder::build`].
///
/// ```no_run
/// let mut builder = Descriptor::<Person>::builder("people");
/// builder.primary_key("id", "people_seq", |p| p.id, |p, id| p.id = Some(id), |b, id| b.id = Some(id));
/// builder.column("name", |p| p.name.clone(), |b, name| b.name = name).not_null();
/// let people = builder.build()?;
/// ```
pub struct DescriptorBuilder<T: Entity> {
    table: String,
    columns: Vec<ColumnMetadata>,
    primary_key: Option<PrimaryKey<T>>,
    parent: Option<ParentColumn<T>>,
    data: Vec<Column<T>>,
    joins: Vec<Box<dyn JoinReference<T>>>,
    children: Vec<Box<dyn ChildrenRelation<T>>>,
    children_metadata: Vec<ChildrenMetadata>,
    unique_constraints: Vec<UniqueConstraint>,
    selection_strategy: SelectionStrategy,
    errors: Vec<String>,
}

/// Options of the column just added to a [`DescriptorBuilder`]
pub struct ColumnOptions<'a> {
    column: &'a mut ColumnMetadata,
    errors: &'a mut Vec<String>,
}

impl ColumnOptions<'_> {
    pub fn not_null(self) -> Self {
        self.column.nullable = false;
        self
    }

    pub fn nullable(self) -> Self {
        match self.column.kind {
            ColumnKind::PrimaryKey { .. } | ColumnKind::ParentReference => {
                self.errors.push(format!(
                    "Column {} is a key and cannot be nullable",
                    self.column.name
                ));
            }
            _ => self.column.nullable = true,
        }
        self
    }

    /// The database type name of the column, checked instead of the types supported by the Rust
    /// type when validating against the live schema
    pub fn sql_type(self, type_name: impl Into<String>) -> Self {
        self.column.sql_type_name = Some(type_name.into());
        self
    }
}

impl<T: Entity> DescriptorBuilder<T> {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: vec![],
            primary_key: None,
            parent: None,
            data: vec![],
            joins: vec![],
            children: vec![],
            children_metadata: vec![],
            unique_constraints: vec![],
            selection_strategy: SelectionStrategy::default(),
            errors: vec![],
        }
    }

    fn push_column(
        &mut self,
        name: String,
        kind: ColumnKind,
        nullable: bool,
        supported_types: &'static [&'static str],
    ) -> ColumnOptions<'_> {
        self.columns.push(ColumnMetadata {
            name,
            kind,
            nullable,
            sql_type_name: None,
            supported_types,
        });

        let index = self.columns.len() - 1;
        ColumnOptions {
            column: &mut self.columns[index],
            errors: &mut self.errors,
        }
    }

    /// The primary key. `get` returns `None` for an entity that has not been inserted yet, which
    /// then receives the next value of `sequence` through `assign`.
    pub fn primary_key<K: SqlType>(
        &mut self,
        name: impl Into<String>,
        sequence: impl Into<String>,
        get: impl Fn(&T) -> Option<K> + Send + Sync + 'static,
        assign: impl Fn(&mut T, K) + Send + Sync + 'static,
        set: impl Fn(&mut T::Builder, K) + Send + Sync + 'static,
    ) -> ColumnOptions<'_> {
        let name = name.into();
        let sequence = sequence.into();

        if self.primary_key.is_some() {
            self.errors
                .push(format!("Primary key {name} declared after another primary key"));
        } else {
            self.primary_key = Some(PrimaryKey::new(
                name.clone(),
                sequence.clone(),
                get,
                assign,
                set,
            ));
        }

        self.push_column(
            name,
            ColumnKind::PrimaryKey { sequence },
            false,
            K::SUPPORTED_TYPES,
        )
    }

    /// The reference to the owning parent, for entity types without a field holding it
    pub fn parent(&mut self, name: impl Into<String>) -> ColumnOptions<'_> {
        let name = name.into();
        self.set_parent(ParentColumn::new(name.clone()));
        self.push_column(name, ColumnKind::ParentReference, false, &[])
    }

    /// The reference to the owning parent, kept in a field of the entity as well
    pub fn parent_with_back_reference<K: SqlType>(
        &mut self,
        name: impl Into<String>,
        assign: impl Fn(&mut T, K) + Send + Sync + 'static,
        set: impl Fn(&mut T::Builder, K) + Send + Sync + 'static,
    ) -> ColumnOptions<'_> {
        let name = name.into();
        self.set_parent(ParentColumn::with_back_reference(name.clone(), assign, set));
        self.push_column(name, ColumnKind::ParentReference, false, K::SUPPORTED_TYPES)
    }

    fn set_parent(&mut self, parent: ParentColumn<T>) {
        if self.parent.is_some() {
            self.errors.push(format!(
                "Parent column {} declared after another parent column",
                parent.name
            ));
        } else {
            self.parent = Some(parent);
        }
    }

    pub fn column<V: SqlType>(
        &mut self,
        name: impl Into<String>,
        get: impl Fn(&T) -> V + Send + Sync + 'static,
        set: impl Fn(&mut T::Builder, V) + Send + Sync + 'static,
    ) -> ColumnOptions<'_> {
        let name = name.into();
        self.data.push(Column::new(name.clone(), get, set));
        self.push_column(name, ColumnKind::Data, true, V::SUPPORTED_TYPES)
    }

    /// A column storing a domain value through a [`Converter`]
    pub fn column_converted<C: Converter>(
        &mut self,
        name: impl Into<String>,
        converter: C,
        get: impl Fn(&T) -> C::Domain + Send + Sync + 'static,
        set: impl Fn(&mut T::Builder, C::Domain) + Send + Sync + 'static,
    ) -> ColumnOptions<'_> {
        let name = name.into();
        self.data
            .push(Column::converted(name.clone(), converter, get, set));
        self.push_column(
            name,
            ColumnKind::Data,
            true,
            <C::Storage as SqlType>::SUPPORTED_TYPES,
        )
    }

    /// A foreign key to an independently persisted entity, which is read along with this entity
    /// (through a `LEFT JOIN`) but never saved or deleted with it.
    pub fn join<U: Entity + Clone>(
        &mut self,
        name: impl Into<String>,
        target: &Arc<Descriptor<U>>,
        get: impl Fn(&T) -> Option<&U> + Send + Sync + 'static,
        set: impl Fn(&mut T::Builder, Option<U>) + Send + Sync + 'static,
    ) -> ColumnOptions<'_> {
        let name = name.into();

        let supported_types: &'static [&'static str] = match target.metadata.primary_key() {
            Some(pk) => pk.supported_types,
            None => {
                self.errors.push(format!(
                    "Join {name} references {}, which has no primary key",
                    target.table()
                ));
                &[]
            }
        };

        self.joins
            .push(Box::new(JoinColumn::new(name.clone(), target.clone(), get, set)));
        self.push_column(
            name,
            ColumnKind::JoinReference {
                target: target.metadata.clone(),
            },
            true,
            supported_types,
        )
    }

    /// Children owned by this entity. The child descriptor must have a primary key and a parent
    /// column.
    pub fn children<C: Entity>(
        &mut self,
        name: impl Into<String>,
        child: &Arc<Descriptor<C>>,
        get: impl Fn(&mut T) -> &mut Vec<C> + Send + Sync + 'static,
        set: impl Fn(&mut T::Builder, Vec<C>) + Send + Sync + 'static,
    ) -> &mut Self {
        let name = name.into();

        if child.primary_key.is_none() {
            self.errors.push(format!(
                "Children {name}: {} has no primary key",
                child.table()
            ));
        }
        if child.parent.is_none() {
            self.errors.push(format!(
                "Children {name}: {} has no parent column",
                child.table()
            ));
        }

        self.children_metadata.push(ChildrenMetadata {
            name: name.clone(),
            child: child.metadata.clone(),
        });
        self.children
            .push(Box::new(ChildrenDescriptor::new(name, child.clone(), get, set)));
        self
    }

    /// Declare a set of columns whose values identify at most one row
    pub fn unique(&mut self, name: impl Into<String>, columns: &[&str]) -> &mut Self {
        self.unique_constraints.push(UniqueConstraint {
            name: name.into(),
            columns: columns.iter().map(|column| column.to_string()).collect(),
        });
        self
    }

    pub fn selection_strategy(&mut self, strategy: SelectionStrategy) -> &mut Self {
        self.selection_strategy = strategy;
        self
    }

    pub fn build(self) -> Result<Arc<Descriptor<T>>, DatabaseError> {
        let mut errors = self.errors;

        if !self.children.is_empty() && self.primary_key.is_none() {
            errors.push("Children declared without a primary key".to_string());
        }

        let mut names = HashSet::new();
        for column in &self.columns {
            if !names.insert(column.name.to_lowercase()) {
                errors.push(format!("Column {} declared more than once", column.name));
            }
        }

        for constraint in &self.unique_constraints {
            if constraint.columns.is_empty() {
                errors.push(format!("Unique constraint {} has no columns", constraint.name));
            }
            for column in &constraint.columns {
                if !names.contains(&column.to_lowercase()) {
                    errors.push(format!(
                        "Unique constraint {} references unknown column {column}",
                        constraint.name
                    ));
                }
            }
        }

        for column in &self.columns {
            let Some(target) = column.join_target() else {
                continue;
            };
            if target.has_children_through_joins()
                && target.selection_strategy != self.selection_strategy
            {
                errors.push(format!(
                    "Join {} uses selection strategy {}, but {} uses {}",
                    column.name, self.selection_strategy, target.table, target.selection_strategy
                ));
            }
        }

        if !errors.is_empty() {
            return Err(DatabaseError::Config(format!(
                "Invalid descriptor for {}:\n  {}",
                self.table,
                errors.join("\n  ")
            )));
        }

        let metadata = EntityMetadata {
            table: self.table,
            columns: self.columns,
            children: self.children_metadata,
            unique_constraints: self.unique_constraints,
            selection_strategy: self.selection_strategy,
        };

        Ok(Arc::new(Descriptor {
            metadata: Arc::new(metadata),
            primary_key: self.primary_key,
            parent: self.parent,
            columns: self.data,
            joins: self.joins,
            children: self.children,
        }))
    }
}
