// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use super::{ExpressionBuilder, SQLBuilder, SqlValue};

/// `DELETE FROM <table> WHERE <key column> = <param>`
#[derive(Debug)]
pub(crate) struct Delete<'a> {
    pub table: &'a str,
    pub key_column: &'a str,
    pub key: SqlValue,
}

impl ExpressionBuilder for Delete<'_> {
    fn build(&self, builder: &mut SQLBuilder) {
        builder.push_str("DELETE FROM ");
        builder.push_str(self.table);
        builder.push_str(" WHERE ");
        builder.push_str(self.key_column);
        builder.push_str(" = ");
        builder.push_param(self.key.clone());
    }
}
