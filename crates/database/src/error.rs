use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Invalid database URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid connection settings: {0}")]
    ConnectionConfigError(String),
}
