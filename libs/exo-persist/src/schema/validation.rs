// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Check a descriptor graph against the live schema.
//!
//! Validation is optional: it is meant to run once at startup, after the descriptors are built,
//! to report mismatches before the first statement fails.

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::database_error::DatabaseError;

use super::{
    issue::Issue,
    metadata::{ColumnKind, ColumnMetadata, EntityMetadata},
};

/// Read access to the schema of the database
#[async_trait]
pub trait SchemaInspector: Send {
    async fn table_exists(&mut self, table: &str) -> Result<bool, DatabaseError>;

    async fn sequence_exists(&mut self, sequence: &str) -> Result<bool, DatabaseError>;

    /// The declared type of a column, `None` if the table has no such column
    async fn column_type(
        &mut self,
        table: &str,
        column: &str,
    ) -> Result<Option<String>, DatabaseError>;
}

/// Validate the tables of `metadata` and of every entity it joins or owns, transitively.
///
/// All problems are reported together in one [`DatabaseError::Validation`], one per line.
#[instrument(name = "schema::validate", skip_all, fields(table = %metadata.table))]
pub async fn validate(
    metadata: &EntityMetadata,
    inspector: &mut dyn SchemaInspector,
) -> Result<(), DatabaseError> {
    let issues = collect_issues(metadata, inspector).await?;

    if issues.iter().any(|issue| matches!(issue, Issue::Warning(_))) {
        let report = issues
            .iter()
            .map(|issue| issue.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        Err(DatabaseError::Validation(format!(
            "The schema does not match the descriptors of {}:\n{report}",
            metadata.table
        )))
    } else {
        Ok(())
    }
}

/// Every issue of the graph rooted at `metadata`. Each table is checked once, even when it is
/// reached through more than one path.
pub async fn collect_issues(
    metadata: &EntityMetadata,
    inspector: &mut dyn SchemaInspector,
) -> Result<Vec<Issue>, DatabaseError> {
    let mut issues = vec![];
    let mut visited = HashSet::new();
    let mut pending = vec![metadata];

    while let Some(entity) = pending.pop() {
        if !visited.insert(entity.table.to_lowercase()) {
            continue;
        }

        debug!("Validating table {}", entity.table);
        check_entity(entity, inspector, &mut issues).await?;

        // Reversed so that tables are checked (and reported) in declaration order
        let related: Vec<&EntityMetadata> = entity
            .join_columns()
            .filter_map(|column| column.join_target().map(|target| target.as_ref()))
            .chain(entity.children.iter().map(|children| children.child.as_ref()))
            .collect();
        pending.extend(related.into_iter().rev());
    }

    Ok(issues)
}

async fn check_entity(
    entity: &EntityMetadata,
    inspector: &mut dyn SchemaInspector,
    issues: &mut Vec<Issue>,
) -> Result<(), DatabaseError> {
    if !inspector.table_exists(&entity.table).await? {
        issues.push(Issue::Warning(format!("Table {} does not exist", entity.table)));
        return Ok(());
    }

    for column in &entity.columns {
        if let ColumnKind::PrimaryKey { sequence } = &column.kind {
            if !inspector.sequence_exists(sequence).await? {
                issues.push(Issue::Warning(format!(
                    "Sequence {sequence} for {}.{} does not exist",
                    entity.table, column.name
                )));
            }
        }

        match inspector.column_type(&entity.table, &column.name).await? {
            Some(actual) => check_column_type(entity, column, &actual, issues),
            None => issues.push(Issue::Warning(format!(
                "Column {}.{} does not exist",
                entity.table, column.name
            ))),
        }
    }

    Ok(())
}

fn check_column_type(
    entity: &EntityMetadata,
    column: &ColumnMetadata,
    actual: &str,
    issues: &mut Vec<Issue>,
) {
    let actual = normalize_type(actual);

    let expected: Vec<String> = match &column.sql_type_name {
        Some(declared) => vec![normalize_type(declared)],
        None => column
            .supported_types
            .iter()
            .map(|name| normalize_type(name))
            .collect(),
    };

    if expected.is_empty() || expected.contains(&actual) {
        return;
    }

    issues.push(Issue::Warning(format!(
        "Column {}.{} has type {actual}, expected one of: {}",
        entity.table,
        column.name,
        expected.join(", ")
    )));
    if column.sql_type_name.is_none() {
        issues.push(Issue::Hint(format!(
            "Declare the type of {}.{} explicitly if {actual} is compatible",
            entity.table, column.name
        )));
    }
}

/// Lowercase, without a length or precision (`VARCHAR(20)` is `varchar`)
fn normalize_type(type_name: &str) -> String {
    let base = match type_name.find('(') {
        Some(index) => &type_name[..index],
        None => type_name,
    };
    base.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Arc};

    use crate::schema::metadata::{test_helper::*, ChildrenMetadata};

    use super::*;

    #[derive(Default)]
    struct FakeInspector {
        tables: HashMap<String, Vec<(String, String)>>,
        sequences: Vec<String>,
        table_lookups: Vec<String>,
    }

    impl FakeInspector {
        fn table(mut self, name: &str, columns: &[(&str, &str)]) -> Self {
            self.tables.insert(
                name.to_string(),
                columns
                    .iter()
                    .map(|(column, type_name)| (column.to_string(), type_name.to_string()))
                    .collect(),
            );
            self
        }

        fn sequence(mut self, name: &str) -> Self {
            self.sequences.push(name.to_string());
            self
        }
    }

    #[async_trait]
    impl SchemaInspector for FakeInspector {
        async fn table_exists(&mut self, table: &str) -> Result<bool, DatabaseError> {
            self.table_lookups.push(table.to_string());
            Ok(self.tables.contains_key(table))
        }

        async fn sequence_exists(&mut self, sequence: &str) -> Result<bool, DatabaseError> {
            Ok(self.sequences.iter().any(|s| s == sequence))
        }

        async fn column_type(
            &mut self,
            table: &str,
            column: &str,
        ) -> Result<Option<String>, DatabaseError> {
            Ok(self.tables.get(table).and_then(|columns| {
                columns
                    .iter()
                    .find(|(name, _)| name == column)
                    .map(|(_, type_name)| type_name.clone())
            }))
        }
    }

    fn typed(mut column: ColumnMetadata, supported_types: &'static [&'static str]) -> ColumnMetadata {
        column.supported_types = supported_types;
        column
    }

    fn venues() -> Arc<EntityMetadata> {
        Arc::new(table(
            "venues",
            vec![pk_column("id"), typed(data_column("name"), &["text", "varchar"])],
        ))
    }

    #[tokio::test]
    async fn matching_schema() {
        let concerts = table(
            "concerts",
            vec![
                pk_column("id"),
                typed(data_column("title"), &["text", "varchar"]),
                join_column("venue_id", &venues()),
            ],
        );
        let mut inspector = FakeInspector::default()
            .table("concerts", &[("id", "INTEGER"), ("title", "VARCHAR(80)"), ("venue_id", "INTEGER")])
            .table("venues", &[("id", "INTEGER"), ("name", "TEXT")])
            .sequence("id_seq");

        validate(&concerts, &mut inspector).await.unwrap();
        assert_eq!(inspector.table_lookups, vec!["concerts", "venues"]);
    }

    #[tokio::test]
    async fn reports_every_problem() {
        let lines = Arc::new(table(
            "order_lines",
            vec![
                pk_column("id"),
                parent_column("order_id"),
                typed(data_column("quantity"), &["integer", "int4"]),
            ],
        ));
        let mut orders = table(
            "orders",
            vec![
                pk_column("id"),
                data_column("status"),
                join_column("venue_id", &venues()),
            ],
        );
        orders.children.push(ChildrenMetadata {
            name: "lines".to_string(),
            child: lines,
        });

        let mut inspector = FakeInspector::default()
            .table("orders", &[("id", "INTEGER"), ("venue_id", "INTEGER")])
            .table(
                "order_lines",
                &[("id", "INTEGER"), ("order_id", "INTEGER"), ("quantity", "TEXT")],
            )
            .sequence("id_seq");

        let issues = collect_issues(&orders, &mut inspector).await.unwrap();
        assert_eq!(
            issues,
            vec![
                Issue::Warning("Column orders.status does not exist".to_string()),
                Issue::Warning("Table venues does not exist".to_string()),
                Issue::Warning(
                    "Column order_lines.quantity has type text, expected one of: integer, int4"
                        .to_string()
                ),
                Issue::Hint(
                    "Declare the type of order_lines.quantity explicitly if text is compatible"
                        .to_string()
                ),
            ]
        );

        let error = validate(&orders, &mut inspector).await.unwrap_err();
        let DatabaseError::Validation(report) = error else {
            panic!("expected a validation error, got {error:?}");
        };
        assert_eq!(report.lines().count(), 5);
    }

    #[tokio::test]
    async fn declared_type_overrides_supported_types() {
        let mut status = typed(data_column("status"), &["text"]);
        status.sql_type_name = Some("order_status".to_string());
        let orders = table("orders", vec![pk_column("id"), status]);

        let mut inspector = FakeInspector::default()
            .table("orders", &[("id", "INTEGER"), ("status", "ORDER_STATUS")])
            .sequence("id_seq");

        validate(&orders, &mut inspector).await.unwrap();
    }

    #[tokio::test]
    async fn missing_sequence() {
        let orders = table("orders", vec![pk_column("id")]);
        let mut inspector = FakeInspector::default().table("orders", &[("id", "INTEGER")]);

        let issues = collect_issues(&orders, &mut inspector).await.unwrap();
        assert_eq!(
            issues,
            vec![Issue::Warning(
                "Sequence id_seq for orders.id does not exist".to_string()
            )]
        );
    }
}
