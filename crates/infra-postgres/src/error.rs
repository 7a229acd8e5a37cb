// sqlx::Error -> AppError mapping (orphan rule keeps this out of core)

use cogdb_core::error::AppError;

pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            // SQLSTATE codes: https://www.postgresql.org/docs/current/errcodes-appendix.html
            match db_err.code().as_deref() {
                Some("42P04") => AppError::Database(format!(
                    "Database already exists: {}",
                    db_err.message()
                )),
                Some("28P01") | Some("28000") => AppError::Database(format!(
                    "Authentication failed: {}",
                    db_err.message()
                )),
                Some("3D000") => AppError::Database(format!(
                    "Database does not exist: {}",
                    db_err.message()
                )),
                Some("42501") => AppError::Database(format!(
                    "Insufficient privilege: {}",
                    db_err.message()
                )),
                Some(code) => AppError::Database(format!(
                    "Database error [{}]: {}",
                    code,
                    db_err.message()
                )),
                None => AppError::Database(format!("Database error: {}", db_err.message())),
            }
        }
        sqlx::Error::PoolTimedOut => {
            AppError::Database("Timed out acquiring a pooled connection".to_string())
        }
        // Connection, TLS, protocol errors
        _ => AppError::Database(err.to_string()),
    }
}
