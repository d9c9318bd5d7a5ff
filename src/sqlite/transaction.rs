use std::sync::atomic::Ordering;

use rusqlite::ErrorCode;
use tracing::{debug, warn};

use super::connection::LockedConnection;
use crate::error::SqliteOrmError;

impl LockedConnection<'_> {
    #[must_use]
    pub fn is_in_transaction(&self) -> bool {
        self.owner.transaction_depth.load(Ordering::Acquire) > 0
    }

    /// Open a transaction with `begin transaction`.
    ///
    /// # Errors
    /// Returns `SqliteOrmError::TransactionError` if a transaction or savepoint is already
    /// open, or the engine error if `begin` fails.
    pub fn begin_transaction(&self) -> Result<(), SqliteOrmError> {
        if self
            .owner
            .transaction_depth
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SqliteOrmError::TransactionError(
                "cannot begin a transaction while already in a transaction".into(),
            ));
        }
        self.execute_batch("begin transaction")
            .map_err(|err| self.abandon_start(err))
    }

    /// Create a savepoint, starting a transaction if none is open.
    ///
    /// Returns the savepoint name (`S<n>D<depth>`) to pass to [`Self::release`] or
    /// [`Self::rollback_to`].
    ///
    /// # Errors
    /// Returns the engine error if the `savepoint` statement fails.
    pub fn save_transaction_point(&self) -> Result<String, SqliteOrmError> {
        let depth = self.owner.transaction_depth.fetch_add(1, Ordering::AcqRel);
        let seq = self.owner.savepoint_seq.fetch_add(1, Ordering::Relaxed);
        let name = format!("S{seq}D{depth}");

        self.execute_batch(&format!("savepoint {name}"))
            .map_err(|err| self.abandon_start(err))?;
        debug!(savepoint = %name, "created savepoint");
        Ok(name)
    }

    /// Make the work since `savepoint` part of the enclosing transaction (or commit it when the
    /// savepoint opened the transaction).
    ///
    /// # Errors
    /// Returns `SqliteOrmError::TransactionError` for a name that does not belong to the open
    /// transaction, or the engine error.
    pub fn release(&self, savepoint: &str) -> Result<(), SqliteOrmError> {
        self.savepoint_command(savepoint, "release")
    }

    /// Undo the work since `savepoint`.
    ///
    /// # Errors
    /// Returns `SqliteOrmError::TransactionError` for a name that does not belong to the open
    /// transaction, or the engine error.
    pub fn rollback_to(&self, savepoint: &str) -> Result<(), SqliteOrmError> {
        self.savepoint_command(savepoint, "rollback to")
    }

    /// Roll back everything and leave the transaction stack empty. No-op outside a transaction.
    ///
    /// # Errors
    /// Returns the engine error if `rollback` fails.
    pub fn rollback(&self) -> Result<(), SqliteOrmError> {
        if self.owner.transaction_depth.swap(0, Ordering::AcqRel) > 0 {
            self.execute_batch("rollback")?;
        }
        Ok(())
    }

    /// Commit the open transaction. No-op outside a transaction.
    ///
    /// # Errors
    /// Returns the engine error if `commit` fails.
    pub fn commit(&self) -> Result<(), SqliteOrmError> {
        if self.owner.transaction_depth.swap(0, Ordering::AcqRel) != 0 {
            self.execute_batch("commit")?;
        }
        Ok(())
    }

    /// Run `action` inside a savepoint. Any error rolls back the whole transaction, not only
    /// this savepoint, and is returned unchanged.
    ///
    /// # Errors
    /// Returns the error produced by `action`, or by creating/releasing the savepoint.
    pub fn run_in_transaction<R>(
        &self,
        action: impl FnOnce(&Self) -> Result<R, SqliteOrmError>,
    ) -> Result<R, SqliteOrmError> {
        let outcome = self.save_transaction_point().and_then(|savepoint| {
            let value = action(self)?;
            self.release(&savepoint)?;
            Ok(value)
        });
        if outcome.is_err() {
            if let Err(rollback_err) = self.rollback() {
                warn!(error = %rollback_err, "rollback after failed transaction also failed");
            }
        }
        outcome
    }

    fn savepoint_command(&self, savepoint: &str, command: &str) -> Result<(), SqliteOrmError> {
        let depth = parse_savepoint_depth(savepoint).ok_or_else(|| invalid_savepoint(savepoint))?;
        let current = self.owner.transaction_depth.load(Ordering::Acquire);
        if depth >= current {
            return Err(invalid_savepoint(savepoint));
        }
        self.owner.transaction_depth.store(depth, Ordering::Release);
        self.execute_batch(&format!("{command} {savepoint}"))?;
        Ok(())
    }

    /// Undo the depth change of a failed `begin`/`savepoint`. Errors that leave the
    /// transaction in an unknown state roll it back entirely.
    fn abandon_start(&self, err: rusqlite::Error) -> SqliteOrmError {
        if requires_rollback(&err) {
            warn!(error = %err, "transaction start failed; rolling back");
            if let Err(rollback_err) = self.rollback() {
                debug!(error = %rollback_err, "quiet rollback failed");
            }
        } else {
            self.owner.transaction_depth.fetch_sub(1, Ordering::AcqRel);
        }
        err.into()
    }
}

fn requires_rollback(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(
            ErrorCode::SystemIoFailure
                | ErrorCode::DiskFull
                | ErrorCode::DatabaseBusy
                | ErrorCode::OutOfMemory
                | ErrorCode::OperationInterrupted
        )
    )
}

fn parse_savepoint_depth(savepoint: &str) -> Option<usize> {
    let split = savepoint.find('D')?;
    if split < 2 {
        return None;
    }
    savepoint[split + 1..].parse().ok()
}

fn invalid_savepoint(savepoint: &str) -> SqliteOrmError {
    SqliteOrmError::TransactionError(format!(
        "savepoint {savepoint} is not valid; use a name returned by save_transaction_point"
    ))
}
