// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Column predicates combined with AND/OR.
//!
//! A [`Where`] only names columns; the table alias is supplied when it is rendered, so the same
//! predicate can restrict the root table of a select as well as a subselect over that table.
//! Parameters are bound in the same left-to-right order the atoms appear in the rendered text.

use super::{
    expression_builder::{AliasedExpressionBuilder, WithAlias},
    Dialect, ExpressionBuilder, SQLBuilder, SqlStatement, SqlValue,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    NotLike,
    IsNull,
    IsNotNull,
    In,
}

impl Operator {
    fn sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
            Operator::In => "IN",
        }
    }
}

/// A single `column operator value` comparison
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    column: String,
    operator: Operator,
    values: Vec<SqlValue>,
}

impl Condition {
    fn new(column: impl Into<String>, operator: Operator, values: Vec<SqlValue>) -> Self {
        let values = match operator {
            Operator::IsNull | Operator::IsNotNull => vec![],
            _ => values,
        };

        Self {
            column: column.into(),
            operator,
            values,
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Where {
    Atom(Condition),
    And(Box<Where>, Box<Where>),
    Or(Box<Where>, Box<Where>),
    /// A parenthesized sub-predicate
    Group(Box<Where>),
}

impl Where {
    /// A comparison of a column with a value. The value is ignored for [`Operator::IsNull`] and
    /// [`Operator::IsNotNull`]; for [`Operator::In`] it is the single element of the list (see
    /// [`Where::is_in`] for more).
    pub fn new(column: impl Into<String>, operator: Operator, value: impl Into<SqlValue>) -> Self {
        Where::Atom(Condition::new(column, operator, vec![value.into()]))
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Where::Atom(Condition::new(column, Operator::IsNull, vec![]))
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Where::Atom(Condition::new(column, Operator::IsNotNull, vec![]))
    }

    pub fn is_in<V: Into<SqlValue>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Where::Atom(Condition::new(
            column,
            Operator::In,
            values.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn and(
        self,
        column: impl Into<String>,
        operator: Operator,
        value: impl Into<SqlValue>,
    ) -> Self {
        Where::And(Box::new(self), Box::new(Where::new(column, operator, value)))
    }

    pub fn or(
        self,
        column: impl Into<String>,
        operator: Operator,
        value: impl Into<SqlValue>,
    ) -> Self {
        Where::Or(Box::new(self), Box::new(Where::new(column, operator, value)))
    }

    /// Combine with another predicate, which is kept as a parenthesized group
    pub fn and_where(self, other: Where) -> Self {
        Where::And(Box::new(self), Box::new(other.grouped()))
    }

    /// Combine with another predicate, which is kept as a parenthesized group
    pub fn or_where(self, other: Where) -> Self {
        Where::Or(Box::new(self), Box::new(other.grouped()))
    }

    fn grouped(self) -> Self {
        match self {
            Where::Atom(_) | Where::Group(_) => self,
            _ => Where::Group(Box::new(self)),
        }
    }

    /// Render against the given table alias
    pub fn render(&self, alias: &str, dialect: Dialect) -> SqlStatement {
        WithAlias::new(alias, self).to_sql(dialect)
    }

    /// Atoms in rendering order
    pub fn conditions(&self) -> Vec<&Condition> {
        match self {
            Where::Atom(condition) => vec![condition],
            Where::And(lhs, rhs) | Where::Or(lhs, rhs) => {
                let mut conditions = lhs.conditions();
                conditions.extend(rhs.conditions());
                conditions
            }
            Where::Group(inner) => inner.conditions(),
        }
    }

    pub(crate) fn is_disjunction(&self) -> bool {
        matches!(self, Where::Or(_, _))
    }
}

impl AliasedExpressionBuilder for Condition {
    fn build_with_alias(&self, alias: &str, builder: &mut SQLBuilder) {
        match self.operator {
            Operator::IsNull | Operator::IsNotNull => {
                builder.push_column(alias, &self.column);
                builder.push_space();
                builder.push_str(self.operator.sql());
            }
            // An empty list matches nothing and `IN ()` is not valid SQL
            Operator::In if self.values.is_empty() => builder.push_str("1 = 0"),
            Operator::In => {
                builder.push_column(alias, &self.column);
                builder.push_str(" IN (");
                builder.push_iter(self.values.iter(), ", ", |builder, value| {
                    builder.push_param(value.clone())
                });
                builder.push(')');
            }
            _ => {
                builder.push_column(alias, &self.column);
                builder.push_space();
                builder.push_str(self.operator.sql());
                builder.push_space();
                match self.values.first() {
                    Some(value) => builder.push_param(value.clone()),
                    None => builder.push_param(SqlValue::Null),
                }
            }
        }
    }
}

impl AliasedExpressionBuilder for Where {
    fn build_with_alias(&self, alias: &str, builder: &mut SQLBuilder) {
        match self {
            Where::Atom(condition) => condition.build_with_alias(alias, builder),
            Where::And(lhs, rhs) => {
                // AND binds tighter than OR, so a disjunction operand keeps its own parentheses
                for (i, operand) in [lhs, rhs].into_iter().enumerate() {
                    if i > 0 {
                        builder.push_str(" AND ");
                    }
                    if operand.is_disjunction() {
                        builder.push_str("( ");
                        operand.build_with_alias(alias, builder);
                        builder.push_str(" )");
                    } else {
                        operand.build_with_alias(alias, builder);
                    }
                }
            }
            Where::Or(lhs, rhs) => {
                lhs.build_with_alias(alias, builder);
                builder.push_str(" OR ");
                rhs.build_with_alias(alias, builder);
            }
            Where::Group(inner) => {
                builder.push_str("( ");
                inner.build_with_alias(alias, builder);
                builder.push_str(" )");
            }
        }
    }
}
