pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Conflicting record: {0}")]
    Conflict(String),

    #[error("Database unavailable: {0}")]
    Unavailable(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl From<sqlx::Error> for Error {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => Error::RecordNotFound("Gun".to_string()),
            sqlx::Error::Database(db_error)
                if db_error.is_unique_violation()
                    || db_error.is_check_violation()
                    || db_error.is_foreign_key_violation() =>
            {
                Error::Conflict(db_error.message().to_string())
            }
            other => Error::Unavailable(Box::new(other)),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for Error {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        Error::Unavailable(Box::new(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_is_not_found() {
        let err: Error = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, Error::RecordNotFound(_)));
    }

    #[test]
    fn test_pool_errors_are_unavailable() {
        let err: Error = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, Error::Unavailable(_)));
        let err: Error = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, Error::Unavailable(_)));
    }
}
