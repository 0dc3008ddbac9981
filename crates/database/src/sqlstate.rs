use core_types::StoreErrorKind;
use store::StoreError;

/// Maps a PostgreSQL SQLSTATE code onto the closed error taxonomy.
pub fn kind_for_sqlstate(code: &str) -> StoreErrorKind {
    match code {
        "42P01" => StoreErrorKind::UndefinedTable,
        "42704" => StoreErrorKind::UndefinedObject,
        "42703" => StoreErrorKind::UndefinedColumn,
        "42883" => StoreErrorKind::UndefinedFunction,
        "3F000" => StoreErrorKind::UndefinedSchema,
        "42P07" => StoreErrorKind::DuplicateTable,
        "42710" => StoreErrorKind::DuplicateObject,
        "42701" => StoreErrorKind::DuplicateColumn,
        "42P06" => StoreErrorKind::DuplicateSchema,
        "23505" => StoreErrorKind::UniqueViolation,
        "23503" => StoreErrorKind::ForeignKeyViolation,
        "23502" => StoreErrorKind::NotNullViolation,
        "23514" => StoreErrorKind::CheckViolation,
        "2BP01" => StoreErrorKind::DependentObjectsStillExist,
        "42601" => StoreErrorKind::SyntaxError,
        "42501" => StoreErrorKind::InsufficientPrivilege,
        "57014" => StoreErrorKind::QueryCanceled,
        // Class 08: connection exception. Class 57P: operator intervention.
        c if c.starts_with("08") || c.starts_with("57P") => StoreErrorKind::Connection,
        _ => StoreErrorKind::Other,
    }
}

/// Converts a driver error into a classified [`StoreError`].
pub fn classify(error: sqlx::Error) -> StoreError {
    match &error {
        sqlx::Error::Database(db_err) => {
            let kind = db_err
                .code()
                .map(|code| kind_for_sqlstate(&code))
                .unwrap_or(StoreErrorKind::Other);
            let classified = StoreError::new(kind, db_err.message());
            match db_err.code() {
                Some(code) => classified.with_code(code.into_owned()),
                None => classified,
            }
        }
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StoreError::connection(error.to_string()),
        _ => StoreError::new(StoreErrorKind::Other, error.to_string()),
    }
}
