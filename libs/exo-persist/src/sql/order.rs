// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::database_error::DatabaseError;

use super::{
    expression_builder::{AliasedExpressionBuilder, WithAlias},
    Dialect, ExpressionBuilder, SQLBuilder, SqlStatement,
};

#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByElement {
    pub column: String,
    pub direction: Direction,
}

/// Columns of the root table to sort by, rendered as `ORDER BY a.c1 ASC, a.c2 DESC`.
#[derive(Debug, Clone, PartialEq)]
pub struct Order(Vec<OrderByElement>);

impl Order {
    pub fn new<S: Into<String>>(
        columns: impl IntoIterator<Item = (S, Direction)>,
    ) -> Result<Self, DatabaseError> {
        let elements: Vec<_> = columns
            .into_iter()
            .map(|(column, direction)| OrderByElement {
                column: column.into(),
                direction,
            })
            .collect();

        if elements.is_empty() {
            return Err(DatabaseError::Config(
                "Order requires at least one column".into(),
            ));
        }

        Ok(Self(elements))
    }

    pub fn ascending<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
    ) -> Result<Self, DatabaseError> {
        Self::new(columns.into_iter().map(|column| (column, Direction::Asc)))
    }

    pub fn descending<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
    ) -> Result<Self, DatabaseError> {
        Self::new(columns.into_iter().map(|column| (column, Direction::Desc)))
    }

    /// A single column order, which can never be empty
    pub(crate) fn by(column: impl Into<String>, direction: Direction) -> Self {
        Self(vec![OrderByElement {
            column: column.into(),
            direction,
        }])
    }

    pub fn then(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.0.push(OrderByElement {
            column: column.into(),
            direction,
        });
        self
    }

    pub fn elements(&self) -> &[OrderByElement] {
        &self.0
    }

    pub fn render(&self, alias: &str, dialect: Dialect) -> SqlStatement {
        WithAlias::new(alias, self).to_sql(dialect)
    }
}

impl AliasedExpressionBuilder for OrderByElement {
    fn build_with_alias(&self, alias: &str, builder: &mut SQLBuilder) {
        builder.push_column(alias, &self.column);
        builder.push_space();

        if self.direction == Direction::Asc {
            builder.push_str("ASC");
        } else {
            builder.push_str("DESC");
        }
    }
}

impl AliasedExpressionBuilder for Order {
    fn build_with_alias(&self, alias: &str, builder: &mut SQLBuilder) {
        builder.push_str("ORDER BY ");
        builder.push_iter(self.0.iter(), ", ", |builder, element| {
            element.build_with_alias(alias, builder)
        });
    }
}
