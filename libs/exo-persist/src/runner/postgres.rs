// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::str::FromStr;

use async_trait::async_trait;
use tokio_postgres::{
    types::{to_sql_checked, IsNull, ToSql, Type},
    Client, Config, NoTls,
};
use tracing::{debug, error, instrument};

use crate::{
    config::DatabaseConfig,
    database_error::{DatabaseError, WithContext},
    schema::validation::SchemaInspector,
    sql::{Dialect, SqlStatement, SqlValue},
};

use super::{Row, Runner};

/// A [`Runner`] over a single PostgreSQL connection
pub struct PostgresRunner {
    client: Client,
}

impl PostgresRunner {
    /// Connect without TLS. The connection is driven by a task spawned on the current tokio
    /// runtime.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let mut pg_config = Config::from_str(&config.url).map_err(|e| {
            DatabaseError::Delegate(e)
                .with_context("Failed to parse PostgreSQL connection string".into())
        })?;

        if let Some(user) = &config.user {
            pg_config.user(user);
        }
        if let Some(password) = &config.password {
            pg_config.password(password);
        }

        if pg_config.get_user().is_none() {
            return Err(DatabaseError::Config(
                "Database user must be specified as a part of EXO_POSTGRES_URL or through EXO_POSTGRES_USER".into(),
            ));
        }

        let (client, connection) = pg_config.connect(NoTls).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("Database connection error: {e}");
            }
        });

        let runner = Self::from_client(client);

        if config.check_connection_on_startup {
            runner
                .client
                .simple_query("SELECT 1")
                .await
                .map_err(DatabaseError::Delegate)
                .with_context("Failed to check the database connection".into())?;
        }

        Ok(runner)
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    fn params(statement: &SqlStatement) -> Vec<&(dyn ToSql + Sync)> {
        statement
            .params
            .iter()
            .map(|param| param as &(dyn ToSql + Sync))
            .collect()
    }

    async fn batch(&mut self, sql: &str) -> Result<(), DatabaseError> {
        debug!("Executing SQL operation: {sql}");
        self.client
            .batch_execute(sql)
            .await
            .map_err(|e| DatabaseError::Transaction(format!("{sql}: {e}")))
    }
}

#[async_trait]
impl Runner for PostgresRunner {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    #[instrument(name = "PostgresRunner::execute", level = "trace", skip_all)]
    async fn execute(&mut self, statement: &SqlStatement) -> Result<u64, DatabaseError> {
        debug!(
            "Executing SQL operation: {} ({} params)",
            statement,
            statement.params.len()
        );

        let params = Self::params(statement);
        self.client
            .execute(statement.sql.as_str(), &params[..])
            .await
            .map_err(|e| {
                error!("Failed to execute statement: {e:?}");
                DatabaseError::execution(statement.sql.clone(), e)
            })
    }

    #[instrument(name = "PostgresRunner::query", level = "trace", skip_all)]
    async fn query(&mut self, statement: &SqlStatement) -> Result<Vec<Row>, DatabaseError> {
        debug!(
            "Executing SQL operation: {} ({} params)",
            statement,
            statement.params.len()
        );

        let params = Self::params(statement);
        let rows = self
            .client
            .query(statement.sql.as_str(), &params[..])
            .await
            .map_err(|e| {
                error!("Failed to execute query: {e:?}");
                DatabaseError::execution(statement.sql.clone(), e)
            })?;

        rows.iter().map(read_row).collect()
    }

    async fn next_sequence_value(&mut self, sequence: &str) -> Result<i64, DatabaseError> {
        let sql = "SELECT nextval($1::text::regclass)";
        debug!("Executing SQL operation: {sql} ({sequence})");

        let row = self
            .client
            .query_one(sql, &[&sequence])
            .await
            .map_err(|e| DatabaseError::execution(sql, e))?;
        row.try_get(0).map_err(|e| DatabaseError::execution(sql, e))
    }

    async fn begin(&mut self) -> Result<(), DatabaseError> {
        self.batch("BEGIN").await
    }

    async fn commit(&mut self) -> Result<(), DatabaseError> {
        self.batch("COMMIT").await
    }

    async fn rollback(&mut self) -> Result<(), DatabaseError> {
        self.batch("ROLLBACK").await
    }
}

#[async_trait]
impl SchemaInspector for PostgresRunner {
    async fn table_exists(&mut self, table: &str) -> Result<bool, DatabaseError> {
        let sql = "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
                   WHERE table_schema = current_schema() AND table_name::text = lower($1::text))";
        let row = self.client.query_one(sql, &[&table]).await?;
        Ok(row.try_get(0)?)
    }

    async fn sequence_exists(&mut self, sequence: &str) -> Result<bool, DatabaseError> {
        let sql = "SELECT EXISTS (SELECT 1 FROM information_schema.sequences \
                   WHERE sequence_schema = current_schema() AND sequence_name::text = lower($1::text))";
        let row = self.client.query_one(sql, &[&sequence]).await?;
        Ok(row.try_get(0)?)
    }

    async fn column_type(
        &mut self,
        table: &str,
        column: &str,
    ) -> Result<Option<String>, DatabaseError> {
        let sql = "SELECT data_type::text FROM information_schema.columns \
                   WHERE table_schema = current_schema() AND table_name::text = lower($1::text) \
                   AND column_name::text = lower($2::text)";
        let row = self.client.query_opt(sql, &[&table, &column]).await?;
        row.map(|row| row.try_get(0))
            .transpose()
            .map_err(DatabaseError::Delegate)
    }
}

fn read_row(row: &tokio_postgres::Row) -> Result<Row, DatabaseError> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(index, column)| {
            let value = read_value(row, index, column.type_()).map_err(|e| {
                DatabaseError::Conversion(format!("Failed to read column {}: {e}", column.name()))
            })?;
            Ok((column.name().to_string(), value))
        })
        .collect::<Result<Vec<_>, DatabaseError>>()
        .map(Row::new)
}

fn read_value(
    row: &tokio_postgres::Row,
    index: usize,
    ty: &Type,
) -> Result<SqlValue, Box<dyn std::error::Error + Sync + Send>> {
    let value: SqlValue = if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(index)?.into()
    } else if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(index)?.into()
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(index)?.into()
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(index)?.into()
    } else if *ty == Type::FLOAT4 {
        row.try_get::<_, Option<f32>>(index)?.into()
    } else if *ty == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(index)?.into()
    } else if *ty == Type::BYTEA {
        row.try_get::<_, Option<Vec<u8>>>(index)?.into()
    } else if *ty == Type::DATE {
        row.try_get::<_, Option<chrono::NaiveDate>>(index)?.into()
    } else if *ty == Type::TIMESTAMP {
        row.try_get::<_, Option<chrono::NaiveDateTime>>(index)?.into()
    } else if *ty == Type::TIMESTAMPTZ {
        row.try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(index)?.into()
    } else if *ty == Type::UUID {
        row.try_get::<_, Option<uuid::Uuid>>(index)?.into()
    } else {
        // Text and anything with a textual representation (enums, varchar, ...)
        row.try_get::<_, Option<String>>(index)?.into()
    };

    Ok(value)
}

impl ToSql for SqlValue {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut tokio_postgres::types::private::BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>>
    where
        Self: Sized,
    {
        match self {
            SqlValue::Null => Ok(IsNull::Yes),
            SqlValue::Bool(v) => integer_to_sql(i64::from(*v), ty, out),
            SqlValue::SmallInt(v) => integer_to_sql(i64::from(*v), ty, out),
            SqlValue::Int(v) => integer_to_sql(i64::from(*v), ty, out),
            SqlValue::BigInt(v) => integer_to_sql(*v, ty, out),
            SqlValue::Real(v) => {
                if *ty == Type::FLOAT8 {
                    f64::from(*v).to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            SqlValue::Double(v) => {
                if *ty == Type::FLOAT4 {
                    (*v as f32).to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            SqlValue::Text(v) => v.to_sql(ty, out),
            SqlValue::Bytes(v) => v.to_sql(ty, out),
            other if is_textual(ty) => match other.to_text() {
                Some(text) => text.to_sql(ty, out),
                None => Err(format!("Cannot bind {} to {ty}", other.type_name()).into()),
            },
            SqlValue::Date(v) => v.to_sql(ty, out),
            SqlValue::Timestamp(v) => v.to_sql(ty, out),
            SqlValue::TimestampTz(v) => v.to_sql(ty, out),
            SqlValue::Uuid(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool
    where
        Self: Sized,
    {
        true
    }

    to_sql_checked!();
}

/// Columns declared as text hold dates, timestamps and uuids in their textual form
fn is_textual(ty: &Type) -> bool {
    [Type::TEXT, Type::VARCHAR, Type::BPCHAR, Type::NAME].contains(ty)
}

/// Integers (and booleans) are bound with the width of the parameter, so that an `i64` key can be compared with
/// an `INT4` column
fn integer_to_sql(
    value: i64,
    ty: &Type,
    out: &mut tokio_postgres::types::private::BytesMut,
) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
    if *ty == Type::INT2 {
        i16::try_from(value)?.to_sql(ty, out)
    } else if *ty == Type::INT4 {
        i32::try_from(value)?.to_sql(ty, out)
    } else if *ty == Type::BOOL {
        (value != 0).to_sql(ty, out)
    } else {
        value.to_sql(ty, out)
    }
}
