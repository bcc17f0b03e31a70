//! Diesel and pool error mapping for the record repository.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use crate::domain::ports::RecordRepositoryError;

use super::pool::PoolError;

/// Pool failures mean no connection could be had, which is transient.
pub(crate) fn map_pool_error(error: PoolError) -> RecordRepositoryError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            RecordRepositoryError::connection(message)
        }
    }
}

/// Map a Diesel error onto the repository taxonomy.
///
/// Unique violations become [`RecordRepositoryError::Duplicate`] so a write
/// that loses a race with a concurrent insert reads like the pre-write check.
pub(crate) fn map_diesel_error(error: DieselError) -> RecordRepositoryError {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            RecordRepositoryError::duplicate(
                info.constraint_name()
                    .unwrap_or("merkmalstexte_identity_key")
                    .to_owned(),
            )
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            RecordRepositoryError::connection("database connection closed")
        }
        DieselError::DatabaseError(DatabaseErrorKind::CheckViolation, info) => {
            RecordRepositoryError::query(format!("check constraint violated: {}", info.message()))
        }
        DieselError::NotFound => RecordRepositoryError::query("record not found"),
        DieselError::QueryBuilderError(_) => RecordRepositoryError::query("database query error"),
        _ => RecordRepositoryError::query("database error"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn pool_errors_are_transient() {
        let mapped = map_pool_error(PoolError::checkout("timed out"));
        assert!(mapped.is_transient());
        assert!(mapped.to_string().contains("timed out"));
    }

    #[rstest]
    #[case(DieselError::NotFound)]
    #[case(DieselError::RollbackTransaction)]
    fn other_failures_are_query_errors(#[case] error: DieselError) {
        assert!(matches!(
            map_diesel_error(error),
            RecordRepositoryError::Query { .. }
        ));
    }
}
