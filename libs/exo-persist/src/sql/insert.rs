// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use super::{ExpressionBuilder, SQLBuilder, SqlValue};

/// `INSERT INTO <table> (<columns>) VALUES (<params>)`
#[derive(Debug)]
pub(crate) struct Insert<'a> {
    pub table: &'a str,
    pub columns: Vec<&'a str>,
    pub values: Vec<SqlValue>,
}

impl ExpressionBuilder for Insert<'_> {
    fn build(&self, builder: &mut SQLBuilder) {
        builder.push_str("INSERT INTO ");
        builder.push_str(self.table);
        builder.push_str(" (");
        builder.push_iter(self.columns.iter(), ", ", |builder, column| {
            builder.push_str(column)
        });
        builder.push_str(") VALUES (");
        builder.push_iter(self.values.iter(), ", ", |builder, value| {
            builder.push_param(value.clone())
        });
        builder.push(')');
    }
}
