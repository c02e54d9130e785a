/*!
# BARK Protocol Ledger Client

This crate is the seam between the claim workflows and the chain: a small
`LedgerClient` trait covering exactly what the workflows need (a token
transfer and a balance read), plus `RpcLedgerClient`, the production
implementation over Solana RPC and SPL token instructions.

## Purpose

Workflow code never talks to an RPC endpoint directly. Everything
balance-affecting goes through the trait, so tests can substitute an
in-memory double and exercise the claim state machine without a validator.

## Usage

```rust,no_run
use bark_protocol_client::{ClientResult, LedgerClient, RpcLedgerClient};
use solana_sdk::{pubkey::Pubkey, signature::Keypair};
use std::str::FromStr;

async fn example() -> ClientResult<()> {
    let mint = Pubkey::from_str("BARKmint111111111111111111111111111111111111").unwrap();
    let client = RpcLedgerClient::new(
        "https://api.devnet.solana.com".to_string(),
        mint,
        Keypair::new(),
    );

    let recipient = Pubkey::new_unique();
    let outcome = client.transfer(&recipient, 1_000).await?;
    println!("transfer outcome: {:?}", outcome);
    Ok(())
}
```
*/

pub mod client;
pub mod errors;
pub mod types;

// Re-export main types for convenience
pub use client::{LedgerClient, RpcLedgerClient};
pub use errors::{ClientError, ClientResult};
pub use types::TransferOutcome;
