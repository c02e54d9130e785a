/*!
# BARK Protocol CSV Schema Definitions

This crate provides the **authoritative CSV schema** for airdrop roster files.

## Purpose

A roster file is the one-time seed for a campaign: it whitelists wallet
addresses and optionally grants initial eligibility amounts. The file is a
load step into the store, never a parallel source of truth at request time —
after import, the database decides who is whitelisted and for how much.

## Schema

### Roster CSV (`roster.csv`)
Columns:
- `wallet_address`: recipient public key (base58)
- `amount`: eligibility to grant at import, in token base units (u64);
  `0` whitelists the address without granting anything

## Usage

```rust
use bark_protocol_csvs::{read_roster_csv, validate_roster, CsvResult};

fn example() -> CsvResult<()> {
    let rows = read_roster_csv("roster.csv")?;
    validate_roster(&rows)?;
    Ok(())
}
```
*/

pub mod errors;
pub mod schemas;
pub mod validation;

// Re-export main types for convenience
pub use errors::{CsvError, CsvResult};
pub use schemas::{RosterRow, ROSTER_CSV_HEADERS};
pub use validation::{read_roster_csv, validate_roster, write_roster_csv};
