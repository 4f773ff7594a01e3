// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Lower level SQL primitives: values, the statement builder, and the statement structures that
//! render themselves into SQL text.

use std::{borrow::Cow, fmt::Display};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use uuid::Uuid;

#[macro_use]
#[cfg(test)]
mod test_util;

mod expression_builder;
mod sql_builder;

pub(crate) mod delete;
pub(crate) mod insert;
pub(crate) mod join;
pub mod order;
pub mod predicate;
pub mod prefixer;
pub(crate) mod select;
pub(crate) mod update;

pub(crate) use expression_builder::ExpressionBuilder;
pub(crate) use sql_builder::SQLBuilder;

/// A value bound to a placeholder or read from a result row. The variant doubles as the semantic
/// type of the value, which the runner uses to bind it.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Real(f32),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Uuid(Uuid),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// The value normalized for identity comparisons (so that an `INT4` primary key matches an
    /// `INT8` foreign key). Returns `None` for `NULL`, which never identifies a row.
    pub fn as_key(&self) -> Option<KeyValue> {
        match self {
            SqlValue::Null => None,
            SqlValue::Bool(v) => Some(KeyValue::Integer(i64::from(*v))),
            SqlValue::SmallInt(v) => Some(KeyValue::Integer(i64::from(*v))),
            SqlValue::Int(v) => Some(KeyValue::Integer(i64::from(*v))),
            SqlValue::BigInt(v) => Some(KeyValue::Integer(*v)),
            SqlValue::Text(v) => Some(KeyValue::Text(v.clone())),
            SqlValue::Bytes(v) => Some(KeyValue::Bytes(v.clone())),
            SqlValue::Uuid(v) => Some(KeyValue::Uuid(*v)),
            other => Some(KeyValue::Text(other.to_string())),
        }
    }

    /// The textual form of a date, time or uuid, for databases (or columns) that store them as
    /// text. Parsing it back is the job of [`SqlType`](crate::descriptor::sql_type::SqlType).
    pub fn to_text(&self) -> Option<String> {
        match self {
            SqlValue::Date(v) => Some(v.format("%Y-%m-%d").to_string()),
            SqlValue::Timestamp(v) => Some(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            SqlValue::TimestampTz(v) => Some(v.to_rfc3339()),
            SqlValue::Uuid(v) => Some(v.to_string()),
            _ => None,
        }
    }

    /// Name of the variant, used in conversion error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Bool(_) => "bool",
            SqlValue::SmallInt(_) => "smallint",
            SqlValue::Int(_) => "int",
            SqlValue::BigInt(_) => "bigint",
            SqlValue::Real(_) => "real",
            SqlValue::Double(_) => "double",
            SqlValue::Text(_) => "text",
            SqlValue::Bytes(_) => "bytes",
            SqlValue::Date(_) => "date",
            SqlValue::Timestamp(_) => "timestamp",
            SqlValue::TimestampTz(_) => "timestamptz",
            SqlValue::Uuid(_) => "uuid",
        }
    }
}

impl Display for SqlValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Bool(v) => write!(f, "{v}"),
            SqlValue::SmallInt(v) => write!(f, "{v}"),
            SqlValue::Int(v) => write!(f, "{v}"),
            SqlValue::BigInt(v) => write!(f, "{v}"),
            SqlValue::Real(v) => write!(f, "{v}"),
            SqlValue::Double(v) => write!(f, "{v}"),
            SqlValue::Text(v) => write!(f, "'{v}'"),
            SqlValue::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            SqlValue::Date(v) => write!(f, "{v}"),
            SqlValue::Timestamp(v) => write!(f, "{v}"),
            SqlValue::TimestampTz(v) => write!(f, "{v}"),
            SqlValue::Uuid(v) => write!(f, "{v}"),
        }
    }
}

macro_rules! sql_value_from {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$source> for SqlValue {
                fn from(value: $source) -> Self {
                    SqlValue::$variant(value.into())
                }
            }
        )*
    };
}

sql_value_from! {
    bool => Bool,
    i16 => SmallInt,
    i32 => Int,
    i64 => BigInt,
    f32 => Real,
    f64 => Double,
    String => Text,
    &str => Text,
    Vec<u8> => Bytes,
    NaiveDate => Date,
    NaiveDateTime => Timestamp,
    DateTime<Utc> => TimestampTz,
    Uuid => Uuid,
}

impl<T> From<Option<T>> for SqlValue
where
    SqlValue: From<T>,
{
    fn from(value: Option<T>) -> Self {
        value.map(SqlValue::from).unwrap_or(SqlValue::Null)
    }
}

/// Hashable identity of a key value. See [`SqlValue::as_key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyValue {
    Integer(i64),
    Text(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
}

/// SQL text with positional placeholders and the values to bind to them, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Display for SqlStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Placeholder syntax understood by the target database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// `?` for every parameter
    #[default]
    Standard,
    /// `$1`, `$2`, ...
    Postgres,
}

impl Dialect {
    /// Render the placeholder for the parameter at the given 1-based index.
    pub fn placeholder(&self, index: usize) -> Cow<'static, str> {
        match self {
            Dialect::Standard => Cow::Borrowed("?"),
            Dialect::Postgres => Cow::Owned(format!("${index}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_keys_compare_across_widths() {
        assert_eq!(SqlValue::Int(7).as_key(), SqlValue::BigInt(7).as_key());
        assert_eq!(SqlValue::SmallInt(7).as_key(), SqlValue::BigInt(7).as_key());
        assert_ne!(SqlValue::Int(7).as_key(), SqlValue::Text("7".into()).as_key());
        assert_eq!(SqlValue::Null.as_key(), None);
    }

    #[test]
    fn textual_forms() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(SqlValue::Date(date).to_text().as_deref(), Some("2024-02-29"));
        assert_eq!(
            SqlValue::Timestamp(date.and_hms_opt(8, 30, 0).unwrap())
                .to_text()
                .as_deref(),
            Some("2024-02-29T08:30:00")
        );
        assert_eq!(SqlValue::Int(4).to_text(), None);
    }

    #[test]
    fn placeholders() {
        assert_eq!(Dialect::Standard.placeholder(3), "?");
        assert_eq!(Dialect::Postgres.placeholder(3), "$3");
    }
}
