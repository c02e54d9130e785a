use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("RPC error: {0}")]
    Rpc(#[from] solana_client::client_error::ClientError),

    #[error("SPL Token error: {0}")]
    SplToken(String),

    #[error("Invalid account data: {0}")]
    InvalidAccountData(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
