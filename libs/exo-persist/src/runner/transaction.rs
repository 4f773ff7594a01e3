// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use tracing::{debug, error, instrument};

use crate::database_error::DatabaseError;

use super::Runner;

/// Run `work` in a transaction: commit if it succeeds, roll back if it fails.
///
/// The error of `work` is returned even if the rollback fails as well (the rollback failure is
/// only logged).
#[instrument(name = "with_transaction", skip_all)]
pub async fn with_transaction<R, X, F>(runner: &mut R, work: F) -> Result<X, DatabaseError>
where
    R: Runner + ?Sized,
    F: AsyncFnOnce(&mut R) -> Result<X, DatabaseError>,
{
    runner.begin().await?;

    match work(&mut *runner).await {
        Ok(result) => {
            runner.commit().await?;
            debug!("Transaction committed");
            Ok(result)
        }
        Err(e) => {
            if let Err(rollback_error) = runner.rollback().await {
                error!("Failed to roll back transaction: {rollback_error}");
            } else {
                debug!("Transaction rolled back: {e}");
            }
            Err(e)
        }
    }
}
