// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Settings read from the environment.

use crate::{database_error::DatabaseError, selection::SelectionStrategy};

mod env;

pub use env::{EnvError, Environment, MapEnvironment, SystemEnvironment};

pub const URL_PARAM: &str = "EXO_POSTGRES_URL";
const URL_FALLBACK_PARAM: &str = "DATABASE_URL";
pub const USER_PARAM: &str = "EXO_POSTGRES_USER";
pub const PASSWORD_PARAM: &str = "EXO_POSTGRES_PASSWORD";
pub const CHECK_CONNECTION_ON_STARTUP: &str = "EXO_CHECK_CONNECTION_ON_STARTUP";
pub const SELECTION_STRATEGY_PARAM: &str = "EXO_SELECTION_STRATEGY";

/// How to connect to the database
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub url: String,
    /// Overrides the user of the url
    pub user: Option<String>,
    /// Overrides the password of the url
    pub password: Option<String>,
    /// Run a trivial query right after connecting, so a bad configuration fails early
    pub check_connection_on_startup: bool,
    /// Strategy for descriptors that do not choose one themselves
    pub selection_strategy: Option<SelectionStrategy>,
}

impl DatabaseConfig {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user: None,
            password: None,
            check_connection_on_startup: true,
            selection_strategy: None,
        }
    }

    pub fn from_env(env: &dyn Environment) -> Result<Self, DatabaseError> {
        let url = env
            .get(URL_PARAM)
            .or_else(|| env.get(URL_FALLBACK_PARAM))
            .ok_or_else(|| DatabaseError::Config(format!("Env {URL_PARAM} must be provided")))?;

        let check_connection_on_startup = env.flag(CHECK_CONNECTION_ON_STARTUP, true)?;

        let selection_strategy = env
            .get(SELECTION_STRATEGY_PARAM)
            .map(|value| {
                value
                    .parse::<SelectionStrategy>()
                    .map_err(|_| EnvError::InvalidChoice {
                        key: SELECTION_STRATEGY_PARAM,
                        value: value.clone(),
                        expected: "standard, by-keys-in-clause, sub-select-in-clause".to_string(),
                    })
            })
            .transpose()?;

        Ok(Self {
            url,
            user: env.get(USER_PARAM),
            password: env.get(PASSWORD_PARAM),
            check_connection_on_startup,
            selection_strategy,
        })
    }
}
