// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Persistence of typed entity graphs in a relational database.
//!
//! An entity type is described once by a [`Descriptor`]: its primary key, its data columns, the
//! entities it joins (independently persisted, read along with it) and the children it owns
//! (saved and deleted with it). A [`Dao`] then selects, inserts, updates and deletes whole
//! graphs over a [`Runner`], generating the SQL from the descriptors.
//!
//! Saving a parent saves its children: new children are inserted with keys reserved from their
//! sequence, existing ones are updated, and rows of children that are no longer on the parent
//! (orphans) are deleted bottom-up. How children are fetched for a batch of parents is decided
//! by the [`SelectionStrategy`] of the parent's descriptor.
//!
//! Nothing here is transactional by itself. Run a Dao operation through [`with_transaction`] to
//! make it atomic.

#[macro_use]
mod sql;
mod transform;

pub mod config;
pub mod dao;
pub mod database_error;
pub mod descriptor;
pub mod runner;
pub mod schema;
pub mod selection;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use config::{DatabaseConfig, Environment, MapEnvironment, SystemEnvironment};
pub use dao::Dao;
pub use database_error::{DatabaseError, WithContext};
pub use descriptor::{
    converter::{BoolAsChar, BoolAsInteger, Converter, DisplayFromStr, Optional},
    sql_type::SqlType,
    ColumnOptions, Descriptor, DescriptorBuilder, Entity,
};
pub use runner::{with_transaction, Row, Runner};
pub use schema::{
    issue::Issue,
    metadata::EntityMetadata,
    validation::{validate, SchemaInspector},
};
pub use selection::SelectionStrategy;
pub use sql::{
    order::{Direction, Order, OrderByElement},
    predicate::{Condition, Operator, Where},
    prefixer::Prefixer,
    Dialect, KeyValue, SqlStatement, SqlValue,
};

#[cfg(feature = "postgres")]
pub use runner::PostgresRunner;
