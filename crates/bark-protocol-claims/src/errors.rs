use bark_protocol_client::ClientError;
use bark_protocol_db::DbError;
use thiserror::Error;

pub type ClaimResult<T> = Result<T, ClaimError>;

/// Failures of the claim workflow. The first seven variants are rejections
/// with messages safe to show to the end user verbatim; the rest are
/// infrastructure failures.
#[derive(Error, Debug)]
pub enum ClaimError {
    #[error("Invalid wallet address")]
    InvalidAddress,

    #[error("User not found")]
    UserNotFound,

    #[error("Not eligible: {0}")]
    Ineligible(crate::eligibility::IneligibleReason),

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Airdrop wallet not configured")]
    WalletNotConfigured,

    #[error("Insufficient funds in airdrop wallet")]
    InsufficientPoolFunds,

    #[error("Another claim for this wallet is already in progress")]
    ClaimInProgress,

    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    #[error("Transfer pending confirmation")]
    TransferPending,

    #[error("Store error: {0}")]
    Db(#[from] DbError),

    #[error("Ledger client error: {0}")]
    Client(#[from] ClientError),

    #[error("Roster error: {0}")]
    Roster(#[from] bark_protocol_csvs::CsvError),
}

impl From<crate::eligibility::IneligibleReason> for ClaimError {
    fn from(reason: crate::eligibility::IneligibleReason) -> Self {
        use crate::eligibility::IneligibleReason;

        match reason {
            IneligibleReason::InvalidAddress => ClaimError::InvalidAddress,
            IneligibleReason::UserNotFound => ClaimError::UserNotFound,
            other => ClaimError::Ineligible(other),
        }
    }
}

pub type DistributeResult<T> = Result<T, DistributeError>;

/// Failures of the admin-initiated distribution workflow
#[derive(Error, Debug)]
pub enum DistributeError {
    #[error("Invalid wallet address")]
    InvalidAddress,

    #[error("Amount must be greater than 0")]
    InvalidAmount,

    #[error("Airdrop wallet not configured")]
    WalletNotConfigured,

    #[error("Insufficient funds in airdrop wallet")]
    InsufficientPoolFunds,

    #[error("Store error: {0}")]
    Db(#[from] DbError),
}
