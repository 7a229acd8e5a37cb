// sqlx::Error -> AppError mapping (orphan rule keeps this out of core)

use cogdb_core::error::AppError;

pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => match db_err.code() {
            // SQLite error codes: https://www.sqlite.org/rescode.html
            Some(code) => match code.as_ref() {
                "5" => AppError::Database(format!(
                    "Database locked (SQLITE_BUSY): {}",
                    db_err.message()
                )),
                "8" => AppError::Database(format!(
                    "Database is read-only (SQLITE_READONLY): {}",
                    db_err.message()
                )),
                "14" => AppError::Database(format!(
                    "Unable to open database file (SQLITE_CANTOPEN): {}",
                    db_err.message()
                )),
                other => AppError::Database(format!(
                    "Database error [{}]: {}",
                    other,
                    db_err.message()
                )),
            },
            None => AppError::Database(format!("Database error: {}", db_err.message())),
        },
        sqlx::Error::PoolTimedOut => {
            AppError::Database("Timed out acquiring a pooled connection".to_string())
        }
        // Connection, pool, protocol errors
        _ => AppError::Database(err.to_string()),
    }
}
