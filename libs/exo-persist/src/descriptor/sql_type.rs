// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Mapping between Rust types and [`SqlValue`]s.
//!
//! Reading is lenient about representation so that the same type works against databases with
//! different storage classes: integers of any width are accepted as long as the value fits,
//! booleans may be stored as integers, and temporal types and UUIDs may be stored as text.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use uuid::Uuid;

use crate::{database_error::DatabaseError, sql::SqlValue};

/// A Rust type that can be stored in a single column.
///
/// Implement this trait to persist additional types (or use a
/// [`Converter`](super::converter::Converter) to store a domain type through an existing one).
pub trait SqlType: Sized + Send + Sync + 'static {
    /// Database type names (lower case, without length or precision) this type can be stored in.
    const SUPPORTED_TYPES: &'static [&'static str];

    fn to_sql_value(&self) -> SqlValue;

    fn from_sql_value(value: SqlValue) -> Result<Self, DatabaseError>;
}

fn unexpected<T>(value: &SqlValue, expected: &str) -> Result<T, DatabaseError> {
    Err(DatabaseError::Conversion(format!(
        "Expected {expected}, found {} value {value}",
        value.type_name()
    )))
}

fn integer(value: &SqlValue) -> Option<i64> {
    match value {
        SqlValue::Bool(v) => Some(i64::from(*v)),
        SqlValue::SmallInt(v) => Some(i64::from(*v)),
        SqlValue::Int(v) => Some(i64::from(*v)),
        SqlValue::BigInt(v) => Some(*v),
        _ => None,
    }
}

macro_rules! integer_sql_type {
    ($ty:ty, $variant:ident, $name:literal, [$($supported:literal),*]) => {
        impl SqlType for $ty {
            const SUPPORTED_TYPES: &'static [&'static str] = &[$($supported),*];

            fn to_sql_value(&self) -> SqlValue {
                SqlValue::$variant(*self)
            }

            fn from_sql_value(value: SqlValue) -> Result<Self, DatabaseError> {
                match integer(&value) {
                    Some(v) => <$ty>::try_from(v).map_err(|_| {
                        DatabaseError::Conversion(format!("{v} does not fit into {}", $name))
                    }),
                    None => unexpected(&value, $name),
                }
            }
        }
    };
}

integer_sql_type!(i16, SmallInt, "i16", ["smallint", "int2", "integer"]);
integer_sql_type!(
    i32,
    Int,
    "i32",
    ["integer", "int", "int4", "serial", "smallint", "int2"]
);
integer_sql_type!(
    i64,
    BigInt,
    "i64",
    ["bigint", "int8", "bigserial", "integer", "int", "int4", "serial"]
);

impl SqlType for f32 {
    const SUPPORTED_TYPES: &'static [&'static str] = &["real", "float4", "float"];

    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Real(*self)
    }

    fn from_sql_value(value: SqlValue) -> Result<Self, DatabaseError> {
        match value {
            SqlValue::Real(v) => Ok(v),
            SqlValue::Double(v) => Ok(v as f32),
            other => match integer(&other) {
                Some(v) => Ok(v as f32),
                None => unexpected(&other, "f32"),
            },
        }
    }
}

impl SqlType for f64 {
    const SUPPORTED_TYPES: &'static [&'static str] =
        &["double precision", "float8", "double", "real", "float"];

    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Double(*self)
    }

    fn from_sql_value(value: SqlValue) -> Result<Self, DatabaseError> {
        match value {
            SqlValue::Double(v) => Ok(v),
            SqlValue::Real(v) => Ok(f64::from(v)),
            other => match integer(&other) {
                Some(v) => Ok(v as f64),
                None => unexpected(&other, "f64"),
            },
        }
    }
}

impl SqlType for bool {
    const SUPPORTED_TYPES: &'static [&'static str] = &["boolean", "bool", "integer"];

    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Bool(*self)
    }

    fn from_sql_value(value: SqlValue) -> Result<Self, DatabaseError> {
        match integer(&value) {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => unexpected(&value, "bool"),
        }
    }
}

impl SqlType for String {
    const SUPPORTED_TYPES: &'static [&'static str] = &[
        "text",
        "character varying",
        "varchar",
        "character",
        "char",
        "bpchar",
        "clob",
    ];

    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Text(self.clone())
    }

    fn from_sql_value(value: SqlValue) -> Result<Self, DatabaseError> {
        match value {
            SqlValue::Text(v) => Ok(v),
            other => unexpected(&other, "text"),
        }
    }
}

impl SqlType for Vec<u8> {
    const SUPPORTED_TYPES: &'static [&'static str] = &["bytea", "blob"];

    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Bytes(self.clone())
    }

    fn from_sql_value(value: SqlValue) -> Result<Self, DatabaseError> {
        match value {
            SqlValue::Bytes(v) => Ok(v),
            other => unexpected(&other, "bytes"),
        }
    }
}

fn parse<T: std::str::FromStr>(text: &str, expected: &str) -> Result<T, DatabaseError>
where
    T::Err: std::fmt::Display,
{
    text.parse()
        .map_err(|e| DatabaseError::Conversion(format!("Invalid {expected} '{text}': {e}")))
}

impl SqlType for NaiveDate {
    const SUPPORTED_TYPES: &'static [&'static str] = &["date", "text"];

    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Date(*self)
    }

    fn from_sql_value(value: SqlValue) -> Result<Self, DatabaseError> {
        match value {
            SqlValue::Date(v) => Ok(v),
            SqlValue::Text(v) => parse(&v, "date"),
            other => unexpected(&other, "date"),
        }
    }
}

impl SqlType for NaiveDateTime {
    const SUPPORTED_TYPES: &'static [&'static str] =
        &["timestamp without time zone", "timestamp", "datetime", "text"];

    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Timestamp(*self)
    }

    fn from_sql_value(value: SqlValue) -> Result<Self, DatabaseError> {
        match value {
            SqlValue::Timestamp(v) => Ok(v),
            SqlValue::Text(v) => parse(&v, "timestamp"),
            other => unexpected(&other, "timestamp"),
        }
    }
}

impl SqlType for DateTime<Utc> {
    const SUPPORTED_TYPES: &'static [&'static str] = &[
        "timestamp with time zone",
        "timestamptz",
        "timestamp",
        "datetime",
        "text",
    ];

    fn to_sql_value(&self) -> SqlValue {
        SqlValue::TimestampTz(*self)
    }

    fn from_sql_value(value: SqlValue) -> Result<Self, DatabaseError> {
        match value {
            SqlValue::TimestampTz(v) => Ok(v),
            SqlValue::Timestamp(v) => Ok(v.and_utc()),
            SqlValue::Text(v) => parse(&v, "timestamp with time zone"),
            other => unexpected(&other, "timestamp with time zone"),
        }
    }
}

impl SqlType for Uuid {
    const SUPPORTED_TYPES: &'static [&'static str] = &["uuid", "text", "blob"];

    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Uuid(*self)
    }

    fn from_sql_value(value: SqlValue) -> Result<Self, DatabaseError> {
        match value {
            SqlValue::Uuid(v) => Ok(v),
            SqlValue::Text(v) => parse(&v, "uuid"),
            SqlValue::Bytes(v) => Uuid::from_slice(&v)
                .map_err(|e| DatabaseError::Conversion(format!("Invalid uuid bytes: {e}"))),
            other => unexpected(&other, "uuid"),
        }
    }
}

/// `NULL` maps to `None`
impl<T: SqlType> SqlType for Option<T> {
    const SUPPORTED_TYPES: &'static [&'static str] = T::SUPPORTED_TYPES;

    fn to_sql_value(&self) -> SqlValue {
        match self {
            Some(v) => v.to_sql_value(),
            None => SqlValue::Null,
        }
    }

    fn from_sql_value(value: SqlValue) -> Result<Self, DatabaseError> {
        match value {
            SqlValue::Null => Ok(None),
            value => T::from_sql_value(value).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_accept_any_width_that_fits() {
        assert_eq!(i32::from_sql_value(SqlValue::BigInt(42)).unwrap(), 42);
        assert_eq!(i64::from_sql_value(SqlValue::SmallInt(-3)).unwrap(), -3);
        assert!(matches!(
            i16::from_sql_value(SqlValue::BigInt(1 << 20)),
            Err(DatabaseError::Conversion(_))
        ));
    }

    #[test]
    fn null_only_maps_to_option() {
        assert_eq!(Option::<String>::from_sql_value(SqlValue::Null).unwrap(), None);
        assert!(matches!(
            String::from_sql_value(SqlValue::Null),
            Err(DatabaseError::Conversion(_))
        ));
        assert_eq!(Some(5i64).to_sql_value(), SqlValue::BigInt(5));
        assert_eq!(None::<i64>.to_sql_value(), SqlValue::Null);
    }

    #[test]
    fn numeric_columns_are_not_claimed() {
        // NUMERIC has no binary mapping to a float
        assert!(!f64::SUPPORTED_TYPES.contains(&"numeric"));
        assert!(!f32::SUPPORTED_TYPES.contains(&"numeric"));
        assert!(bool::SUPPORTED_TYPES.contains(&"integer"));
    }

    #[test]
    fn text_storage() {
        assert!(bool::from_sql_value(SqlValue::BigInt(1)).unwrap());
        assert_eq!(
            NaiveDate::from_sql_value(SqlValue::Text("2024-02-29".into())).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );

        let id = Uuid::from_u128(0x9c3a_21f0_5e4b_4d7a_8f11_0c2d_3e4f_5a6b);
        assert_eq!(Uuid::from_sql_value(SqlValue::Text(id.to_string())).unwrap(), id);
    }
}
