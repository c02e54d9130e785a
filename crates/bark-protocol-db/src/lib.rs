/*!
# BARK Protocol Store Layer

This crate provides unified database access for the BARK Protocol airdrop
service: users, eligibility records, the shared airdrop pool wallet, claims,
disbursement transactions, grant records, and the whitelist.

## Purpose

All workflow crates go through `AirdropDatabase` instead of opening their own
connections. The store is also where the two serialization points of the
system live:

- **Pool debits** are conditional updates (`reserve_pool_funds`) that only
  succeed when the observed available balance covers the amount, so two
  concurrent claims can never overdraw the pool.
- **Claim creation** (`begin_claim`) rejects a second `processing` claim for
  the same user inside a single SQL transaction, so concurrent claims for one
  user cannot double-spend an entitlement.

## Usage

```rust
use bark_protocol_db::{AirdropDatabase, DbResult};

fn example() -> DbResult<()> {
    let mut db = AirdropDatabase::create_in_memory()?;
    let pool = db.create_pool_wallet("BARKpoo1111111111111111111111111", 1_000_000)?;
    let user = db.get_or_create_user("BARKkeAwhTuFzcLHX4DjotRsmjXQ1MshGrZbn1CUQqMo")?;
    db.grant_eligibility(user.id, 1_000)?;
    assert!(db.reserve_pool_funds(pool.id, 1_000)?);
    Ok(())
}
```
*/

pub mod database;
pub mod errors;
pub mod schema;

// Re-export main types for convenience
pub use database::{
    AirdropDatabase, AirdropStatistics, ClaimRecord, ClaimStatus, EligibilityRecord, GrantRecord,
    GrantStatus, PoolWallet, TransactionRecord, UserRecord,
};
pub use errors::{DbError, DbResult};
pub use schema::{initialize_database, SCHEMA_VERSION};
