/*!
# Ledger Client Implementation

`LedgerClient` trait and the RPC-backed production implementation.
*/

use crate::{
    errors::{ClientError, ClientResult},
    types::TransferOutcome,
};
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Keypair, signer::Signer,
    transaction::Transaction,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};
use tracing::{info, warn};

/// The chain-facing collaborator of the claim workflows.
///
/// `transfer` distinguishes three shapes of outcome: confirmed, definitively
/// rejected (`TransferOutcome::Failed`), and ambiguous transport failure
/// (`Err`). Callers must not treat the third as a rejection.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Transfer `amount` base units from the pool wallet to `recipient`
    async fn transfer(&self, recipient: &Pubkey, amount: u64) -> ClientResult<TransferOutcome>;

    /// Token balance held by `owner`, in base units. Zero when the owner has
    /// no token account for the mint.
    async fn get_balance(&self, owner: &Pubkey) -> ClientResult<u64>;
}

/// Production ledger client over Solana RPC and SPL token instructions
pub struct RpcLedgerClient {
    rpc_client: RpcClient,
    mint: Pubkey,
    authority: Keypair,
}

impl RpcLedgerClient {
    /// Create a client with default commitment (confirmed)
    pub fn new(rpc_url: String, mint: Pubkey, authority: Keypair) -> Self {
        Self::new_with_commitment(rpc_url, mint, authority, CommitmentConfig::confirmed())
    }

    /// Create a client with a specific commitment level
    pub fn new_with_commitment(
        rpc_url: String,
        mint: Pubkey,
        authority: Keypair,
        commitment: CommitmentConfig,
    ) -> Self {
        let rpc_client = RpcClient::new_with_commitment(rpc_url, commitment);

        Self {
            rpc_client,
            mint,
            authority,
        }
    }

    /// Public key of the pool authority funding the transfers
    pub fn authority_pubkey(&self) -> Pubkey {
        self.authority.pubkey()
    }
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn transfer(&self, recipient: &Pubkey, amount: u64) -> ClientResult<TransferOutcome> {
        let source = get_associated_token_address(&self.authority.pubkey(), &self.mint);
        let destination = get_associated_token_address(recipient, &self.mint);

        // Creating the recipient's token account is idempotent, so the
        // instruction is always included instead of probing first
        let create_destination = create_associated_token_account_idempotent(
            &self.authority.pubkey(),
            recipient,
            &self.mint,
            &spl_token::id(),
        );

        let transfer = spl_token::instruction::transfer(
            &spl_token::id(),
            &source,
            &destination,
            &self.authority.pubkey(),
            &[],
            amount,
        )
        .map_err(|e| ClientError::SplToken(format!("Failed to build transfer: {}", e)))?;

        let blockhash = self.rpc_client.get_latest_blockhash().await?;
        let transaction = Transaction::new_signed_with_payer(
            &[create_destination, transfer],
            Some(&self.authority.pubkey()),
            &[&self.authority],
            blockhash,
        );

        match self.rpc_client.send_and_confirm_transaction(&transaction).await {
            Ok(signature) => {
                info!(%recipient, amount, %signature, "transfer confirmed");
                Ok(TransferOutcome::Confirmed(signature.to_string()))
            }
            Err(e) => match e.get_transaction_error() {
                // The ledger itself rejected the transfer: a definitive failure
                Some(tx_error) => {
                    warn!(%recipient, amount, %tx_error, "transfer rejected");
                    Ok(TransferOutcome::Failed(tx_error.to_string()))
                }
                // Transport-level failure: the transfer may still have landed
                None => Err(ClientError::Rpc(e)),
            },
        }
    }

    async fn get_balance(&self, owner: &Pubkey) -> ClientResult<u64> {
        let token_account = get_associated_token_address(owner, &self.mint);

        let balance = match self
            .rpc_client
            .get_token_account_balance(&token_account)
            .await
        {
            Ok(balance) => balance,
            Err(solana_client::client_error::ClientError {
                kind:
                    solana_client::client_error::ClientErrorKind::RpcError(
                        solana_client::rpc_request::RpcError::RpcResponseError { .. },
                    ),
                ..
            }) => return Ok(0), // No token account for the mint
            Err(e) => return Err(ClientError::Rpc(e)),
        };

        balance.amount.parse::<u64>().map_err(|e| {
            ClientError::InvalidAccountData(format!("Unparseable token balance: {}", e))
        })
    }
}
