// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::HashMap;

/// Where settings come from. The process environment in production, a map in tests.
pub trait Environment: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// A boolean setting, `default_value` when unset
    fn flag(&self, key: &str, default_value: bool) -> Result<bool, EnvError> {
        let Some(value) = self.get(key) else {
            return Ok(default_value);
        };

        match value.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" | "enabled" | "enable" => Ok(true),
            "false" | "0" | "no" | "off" | "disabled" | "disable" => Ok(false),
            _ => Err(EnvError::InvalidFlag {
                key: key.to_string(),
                value,
            }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("Invalid value for {key}: {value}. Expected one of true, 1, yes, on, enabled, enable, false, 0, no, off, disabled, disable")]
    InvalidFlag { key: String, value: String },

    #[error("Invalid value for {key}: {value}. Expected one of {expected}")]
    InvalidChoice {
        key: &'static str,
        value: String,
        expected: String,
    },
}

impl From<EnvError> for crate::database_error::DatabaseError {
    fn from(e: EnvError) -> Self {
        crate::database_error::DatabaseError::Config(e.to_string())
    }
}

pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Settings given explicitly rather than read from the process
#[derive(Debug, Clone, Default)]
pub struct MapEnvironment(HashMap<String, String>);

impl Environment for MapEnvironment {
    fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }
}

impl<const N: usize> From<[(&str, &str); N]> for MapEnvironment {
    fn from(settings: [(&str, &str); N]) -> Self {
        Self(
            settings
                .into_iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        )
    }
}
