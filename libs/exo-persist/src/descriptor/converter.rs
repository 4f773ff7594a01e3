// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{fmt::Display, marker::PhantomData, str::FromStr};

use crate::database_error::DatabaseError;

use super::sql_type::SqlType;

/// Maps a domain value to the representation stored in the column and back
pub trait Converter: Send + Sync + 'static {
    type Domain;
    type Storage: SqlType;

    fn to_storage(&self, value: Self::Domain) -> Result<Self::Storage, DatabaseError>;

    fn from_storage(&self, value: Self::Storage) -> Result<Self::Domain, DatabaseError>;
}

/// `true` as `"T"`, `false` as `"F"`
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolAsChar;

impl Converter for BoolAsChar {
    type Domain = bool;
    type Storage = String;

    fn to_storage(&self, value: bool) -> Result<String, DatabaseError> {
        Ok(if value { "T" } else { "F" }.to_string())
    }

    fn from_storage(&self, value: String) -> Result<bool, DatabaseError> {
        match value.as_str() {
            "T" => Ok(true),
            "F" => Ok(false),
            _ => Err(DatabaseError::Conversion(format!(
                "Expected 'T' or 'F', found '{value}'"
            ))),
        }
    }
}

/// `true` as `1`, `false` as `0`
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolAsInteger;

impl Converter for BoolAsInteger {
    type Domain = bool;
    type Storage = i32;

    fn to_storage(&self, value: bool) -> Result<i32, DatabaseError> {
        Ok(i32::from(value))
    }

    fn from_storage(&self, value: i32) -> Result<bool, DatabaseError> {
        match value {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(DatabaseError::Conversion(format!(
                "Expected 0 or 1, found {value}"
            ))),
        }
    }
}

/// Stores a domain type as text through its `Display` and `FromStr` implementations
pub struct DisplayFromStr<D>(PhantomData<fn() -> D>);

impl<D> DisplayFromStr<D> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<D> Default for DisplayFromStr<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Converter for DisplayFromStr<D>
where
    D: Display + FromStr + 'static,
    D::Err: Display,
{
    type Domain = D;
    type Storage = String;

    fn to_storage(&self, value: D) -> Result<String, DatabaseError> {
        Ok(value.to_string())
    }

    fn from_storage(&self, value: String) -> Result<D, DatabaseError> {
        value
            .parse()
            .map_err(|e| DatabaseError::Conversion(format!("Invalid value '{value}': {e}")))
    }
}

/// Lifts a converter to optional values, storing `None` as `NULL`
#[derive(Debug, Clone, Copy, Default)]
pub struct Optional<C>(pub C);

impl<C: Converter> Converter for Optional<C> {
    type Domain = Option<C::Domain>;
    type Storage = Option<C::Storage>;

    fn to_storage(&self, value: Self::Domain) -> Result<Self::Storage, DatabaseError> {
        value.map(|v| self.0.to_storage(v)).transpose()
    }

    fn from_storage(&self, value: Self::Storage) -> Result<Self::Domain, DatabaseError> {
        value.map(|v| self.0.from_storage(v)).transpose()
    }
}
