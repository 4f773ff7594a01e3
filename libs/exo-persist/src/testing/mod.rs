// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Runners for tests: an in-memory SQLite database and a wrapper recording the statements it
//! runs.

mod recording;
mod sqlite;

pub use recording::{Recorded, RecordingRunner};
pub use sqlite::SqliteRunner;
