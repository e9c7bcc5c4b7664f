//! Conversions from external infrastructure errors into domain errors.

use mailroom_common::storage::StorageError;
use mailroom_domain::MailroomError;
use rusqlite::Error as SqlError;
use tokio::task::JoinError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub MailroomError);

impl From<InfraError> for MailroomError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<MailroomError> for InfraError {
    fn from(value: MailroomError) -> Self {
        InfraError(value)
    }
}

trait IntoMailroomError {
    fn into_mailroom(self) -> MailroomError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → MailroomError */
/* -------------------------------------------------------------------------- */

impl IntoMailroomError for SqlError {
    fn into_mailroom(self) -> MailroomError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        MailroomError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        MailroomError::Database("database is locked".into())
                    }
                    // SQLITE_CONSTRAINT_PRIMARYKEY / SQLITE_CONSTRAINT_UNIQUE
                    (ErrorCode::ConstraintViolation, 1555 | 2067) => {
                        MailroomError::Database("unique constraint violation".into())
                    }
                    (ErrorCode::ConstraintViolation, 1299) => {
                        MailroomError::Database(format!("not null constraint violation: {message}"))
                    }
                    (ErrorCode::NotADatabase, _) => MailroomError::Database(
                        "SQLCipher key rejected or database not encrypted".into(),
                    ),
                    _ => MailroomError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => MailroomError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                MailroomError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                MailroomError::Database(format!("invalid column type: {ty}"))
            }
            RE::InvalidParameterName(parameter_name) => {
                MailroomError::Database(format!("invalid parameter name: {parameter_name}"))
            }
            RE::InvalidQuery => MailroomError::Database("invalid SQL query".into()),
            other => MailroomError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_mailroom())
    }
}

/* -------------------------------------------------------------------------- */
/* StorageError → MailroomError */
/* -------------------------------------------------------------------------- */

impl IntoMailroomError for StorageError {
    fn into_mailroom(self) -> MailroomError {
        match self {
            StorageError::Rusqlite(sql_err) => sql_err.into_mailroom(),
            StorageError::InvalidConfig(message) => MailroomError::Config(message),
            StorageError::WrongKeyOrNotEncrypted => MailroomError::Database(
                "SQLCipher key rejected or database not encrypted".into(),
            ),
            other => MailroomError::Database(other.to_string()),
        }
    }
}

impl From<StorageError> for InfraError {
    fn from(value: StorageError) -> Self {
        InfraError(value.into_mailroom())
    }
}

/// Map a failed `spawn_blocking` join into a domain error
pub fn map_join_error(err: JoinError) -> MailroomError {
    if err.is_cancelled() {
        MailroomError::Internal("database task cancelled".into())
    } else {
        MailroomError::Internal(format!("database task panic: {err}"))
    }
}

/// Shorthand for `MailroomError::from(InfraError::from(err))`
pub(crate) fn map_sql_error(err: SqlError) -> MailroomError {
    MailroomError::from(InfraError::from(err))
}
