use thiserror::Error;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Pool wallet already configured")]
    PoolAlreadyConfigured,

    #[error("Claim {0} is not in processing state")]
    ClaimNotProcessing(i64),

    #[error("Eligibility for user {0} no longer covers the claimed amount")]
    EligibilityConflict(i64),

    #[error("Pool reservation release exceeds used balance")]
    ReservationUnderflow,

    #[error("Serialization error: {0}")]
    Serialization(String),
}
