// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use super::{Dialect, SQLBuilder, SqlStatement};

/// A trait for types that can build themselves into an SQL expression.
///
/// Each constituent of a statement (join, predicate, select, etc.) implements this trait, which
/// is then used to hierarchically build an SQL string and the list of parameters to be supplied
/// to it.
pub(crate) trait ExpressionBuilder {
    /// Build the SQL expression into the given SQL builder
    fn build(&self, builder: &mut SQLBuilder);

    /// Build the SQL expression into a statement. Useful to build the top-level statement as well
    /// as for testing, where we want to assert on the generated SQL directly.
    fn to_sql(&self, dialect: Dialect) -> SqlStatement
    where
        Self: Sized,
    {
        let mut builder = SQLBuilder::new(dialect);
        self.build(&mut builder);
        builder.into_sql()
    }
}

impl<T> ExpressionBuilder for Box<T>
where
    T: ExpressionBuilder + ?Sized,
{
    fn build(&self, builder: &mut SQLBuilder) {
        self.as_ref().build(builder)
    }
}

impl<T> ExpressionBuilder for &T
where
    T: ExpressionBuilder + ?Sized,
{
    fn build(&self, builder: &mut SQLBuilder) {
        (**self).build(builder)
    }
}

/// An expression over the columns of a single table, rendered against whatever alias that table
/// received in the enclosing statement.
pub(crate) trait AliasedExpressionBuilder {
    fn build_with_alias(&self, alias: &str, builder: &mut SQLBuilder);
}

/// Binds an [`AliasedExpressionBuilder`] to a table alias.
pub(crate) struct WithAlias<'a, T: ?Sized> {
    pub alias: &'a str,
    pub expr: &'a T,
}

impl<'a, T: AliasedExpressionBuilder + ?Sized> WithAlias<'a, T> {
    pub fn new(alias: &'a str, expr: &'a T) -> Self {
        Self { alias, expr }
    }
}

impl<T: AliasedExpressionBuilder + ?Sized> ExpressionBuilder for WithAlias<'_, T> {
    fn build(&self, builder: &mut SQLBuilder) {
        self.expr.build_with_alias(self.alias, builder)
    }
}
