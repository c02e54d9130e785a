/*!
# CSV Schema Definitions

Row structures and serde helpers for the roster file format.
*/

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

/// Expected headers for roster.csv in exact order
pub const ROSTER_CSV_HEADERS: &[&str] = &["wallet_address", "amount"];

/// Row structure for roster.csv
///
/// **File**: `roster.csv`
/// **Purpose**: one-time whitelist + eligibility seed for a campaign
/// **Consumers**: the API server's startup import, admin tooling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RosterRow {
    /// Recipient's public key in base58 format
    #[serde(
        deserialize_with = "deserialize_pubkey",
        serialize_with = "serialize_pubkey"
    )]
    pub wallet_address: Pubkey,

    /// Eligibility to grant at import, in token base units.
    /// Zero whitelists the address without granting anything.
    pub amount: u64,
}

/// Deserialize base58 string to Pubkey
fn deserialize_pubkey<'de, D>(deserializer: D) -> Result<Pubkey, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Pubkey::from_str(&s).map_err(serde::de::Error::custom)
}

/// Serialize Pubkey to base58 string
fn serialize_pubkey<S>(pubkey: &Pubkey, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&pubkey.to_string())
}
