/*!
# BARK Protocol Claim Workflows

The engineering core of the airdrop service: input validation, eligibility
resolution, the claim state machine, admin distribution, roster import, and
campaign statistics — all behind a single `ClaimService` with an injected
store handle and ledger client.

## Purpose

HTTP handlers stay thin: they parse a request, call one method here, and map
the result. Everything that has to be correct under concurrency lives in this
crate and the store layer beneath it:

- A claim's pool debit is reserved with a conditional update before the
  transfer, so concurrent claims cannot overdraw the shared pool.
- Only one claim per user may be in flight; the loser of a race gets a
  conflict, never a silent double settlement.
- `completed` and `failed` are terminal; a ledger timeout is the one case
  that leaves a claim `processing`, queryable by age for reconciliation.

## Usage

```rust,no_run
use bark_protocol_claims::{ClaimService, ServiceConfig};
use bark_protocol_client::RpcLedgerClient;
use bark_protocol_db::AirdropDatabase;
use solana_sdk::{pubkey::Pubkey, signature::Keypair};
use std::str::FromStr;

async fn example() -> Result<(), Box<dyn std::error::Error>> {
    let db = AirdropDatabase::create_in_memory()?;
    let mint = Pubkey::from_str("BARKmint111111111111111111111111111111111111")?;
    let client = RpcLedgerClient::new("https://api.devnet.solana.com".into(), mint, Keypair::new());

    let service = ClaimService::new(db, client, ServiceConfig::default());
    let report = service
        .check_eligibility("BARKkeAwhTuFzcLHX4DjotRsmjXQ1MshGrZbn1CUQqMo")
        .await?;
    println!("eligible: {}", report.is_eligible);
    Ok(())
}
```
*/

pub mod claim;
pub mod distribution;
pub mod eligibility;
pub mod errors;
pub mod service;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export main types for convenience
pub use claim::ClaimReceipt;
pub use distribution::DistributionReceipt;
pub use eligibility::{EligibilityReport, IneligibleReason};
pub use errors::{ClaimError, ClaimResult, DistributeError, DistributeResult};
pub use service::{AirdropStats, ClaimService, RosterImportSummary, ServiceConfig};
