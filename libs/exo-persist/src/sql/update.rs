// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use super::{ExpressionBuilder, SQLBuilder, SqlValue};

/// `UPDATE <table> SET <column> = <param>, ... WHERE <key column> = <param>`
#[derive(Debug)]
pub(crate) struct Update<'a> {
    pub table: &'a str,
    pub assignments: Vec<(&'a str, SqlValue)>,
    pub key_column: &'a str,
    pub key: SqlValue,
}

impl ExpressionBuilder for Update<'_> {
    fn build(&self, builder: &mut SQLBuilder) {
        builder.push_str("UPDATE ");
        builder.push_str(self.table);
        builder.push_str(" SET ");
        builder.push_iter(self.assignments.iter(), ", ", |builder, (column, value)| {
            builder.push_str(column);
            builder.push_str(" = ");
            builder.push_param(value.clone());
        });
        builder.push_str(" WHERE ");
        builder.push_str(self.key_column);
        builder.push_str(" = ");
        builder.push_param(self.key.clone());
    }
}
