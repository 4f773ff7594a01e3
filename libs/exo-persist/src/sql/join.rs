// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use super::{ExpressionBuilder, SQLBuilder};

/// Represents a join between two tables. Currently, supports only left join.
#[derive(Debug, PartialEq, Clone)]
pub(crate) struct LeftJoin {
    /// The joined table such as `venues`
    pub table: String,
    /// Alias of the joined table
    pub alias: String,
    /// Alias of the table holding the foreign key
    pub left_alias: String,
    /// The foreign key column such as `venue_id`
    pub left_column: String,
    /// The primary key of the joined table
    pub right_column: String,
}

impl ExpressionBuilder for LeftJoin {
    /// Build expression of the form `LEFT JOIN <table> <alias> ON <left>.<fk> = <alias>.<pk>`.
    fn build(&self, builder: &mut SQLBuilder) {
        builder.push_str("LEFT JOIN ");
        builder.push_str(&self.table);
        builder.push_space();
        builder.push_str(&self.alias);
        builder.push_str(" ON ");
        builder.push_column(&self.left_alias, &self.left_column);
        builder.push_str(" = ");
        builder.push_column(&self.alias, &self.right_column);
    }
}

#[cfg(test)]
mod tests {
    use crate::sql::Dialect;

    use super::*;

    #[test]
    fn basic_join() {
        let join = LeftJoin {
            table: "venues".into(),
            alias: "b".into(),
            left_alias: "a".into(),
            left_column: "venue_id".into(),
            right_column: "id".into(),
        };

        assert_binding!(
            join.to_sql(Dialect::Standard),
            "LEFT JOIN venues b ON a.venue_id = b.id"
        );
    }
}
