// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use super::{
    expression_builder::WithAlias, join::LeftJoin, order::Order, predicate::Where,
    ExpressionBuilder, SQLBuilder,
};

/// A column of a (possibly joined) table in the select list
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SelectColumn {
    pub alias: String,
    pub column: String,
    /// Emit `AS <alias>_<column>`, so that same-named columns of different tables stay apart in
    /// the result row
    pub labelled: bool,
}

impl SelectColumn {
    pub fn label(alias: &str, column: &str) -> String {
        format!("{alias}_{column}")
    }
}

impl ExpressionBuilder for SelectColumn {
    fn build(&self, builder: &mut SQLBuilder) {
        builder.push_column(&self.alias, &self.column);
        if self.labelled {
            builder.push_str(" AS ");
            builder.push_str(Self::label(&self.alias, &self.column));
        }
    }
}

/// A conjunct appended to the `WHERE 1=1` of a select
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Filter {
    Predicate { alias: String, predicate: Where },
    /// `<alias>.<column> IN (<select>)`
    InSubSelect {
        alias: String,
        column: String,
        select: Box<Select>,
    },
}

impl ExpressionBuilder for Filter {
    fn build(&self, builder: &mut SQLBuilder) {
        match self {
            Filter::Predicate { alias, predicate } => {
                // Keep a disjunction from escaping the surrounding conjunction
                if predicate.is_disjunction() {
                    builder.push_str("( ");
                    WithAlias::new(alias, predicate).build(builder);
                    builder.push_str(" )");
                } else {
                    WithAlias::new(alias, predicate).build(builder);
                }
            }
            Filter::InSubSelect {
                alias,
                column,
                select,
            } => {
                builder.push_column(alias, column);
                builder.push_str(" IN (");
                select.build(builder);
                builder.push(')');
            }
        }
    }
}

/// A select statement of the shape `SELECT ... FROM <table> <alias> [LEFT JOIN ...]* WHERE 1=1 [AND
/// ...]* [ORDER BY ...]`. The `1=1` lets every filter be appended with `AND`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Select {
    pub columns: Vec<SelectColumn>,
    pub table: String,
    pub alias: String,
    pub joins: Vec<LeftJoin>,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
}

impl ExpressionBuilder for Select {
    fn build(&self, builder: &mut SQLBuilder) {
        builder.push_str("SELECT ");
        builder.push_elems(&self.columns, ", ");
        builder.push_str(" FROM ");
        builder.push_str(&self.table);
        builder.push_space();
        builder.push_str(&self.alias);

        for join in &self.joins {
            builder.push_space();
            join.build(builder);
        }

        builder.push_str(" WHERE 1=1");
        for filter in &self.filters {
            builder.push_str(" AND ");
            filter.build(builder);
        }

        if let Some(order) = &self.order {
            builder.push_space();
            WithAlias::new(&self.alias, order).build(builder);
        }
    }
}
