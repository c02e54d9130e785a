/*!
# Database Schema Management

Complete schema for the BARK Protocol airdrop store and its initialization.
*/

use crate::{DbError, DbResult};
use rusqlite::Connection;

/// Current database schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize database with complete schema
pub fn initialize_database(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- One row per wallet address that ever interacted with the airdrop
        CREATE TABLE users (
            id INTEGER PRIMARY KEY,
            wallet_address TEXT NOT NULL UNIQUE,
            created_at INTEGER NOT NULL
        );

        -- Per-user entitlement: cumulative total and unclaimed remainder
        CREATE TABLE eligibility (
            user_id INTEGER PRIMARY KEY,
            total_amount INTEGER NOT NULL,
            unclaimed_amount INTEGER NOT NULL,
            CHECK (unclaimed_amount >= 0 AND unclaimed_amount <= total_amount),
            FOREIGN KEY (user_id) REFERENCES users(id)
        );

        -- Pre-approved addresses; the store is the authoritative whitelist,
        -- roster files are imported into it
        CREATE TABLE whitelist (
            wallet_address TEXT PRIMARY KEY,
            added_at INTEGER NOT NULL
        );

        -- The shared pool funding all claims and grants (singleton row)
        CREATE TABLE airdrop_wallet (
            id INTEGER PRIMARY KEY,
            wallet_address TEXT NOT NULL,
            balance INTEGER NOT NULL,
            used_balance INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            CHECK (used_balance >= 0 AND used_balance <= balance)
        );

        -- Claim attempts; append-only audit trail, terminal rows never change
        CREATE TABLE claims (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            amount INTEGER NOT NULL,
            status TEXT NOT NULL, -- 'processing' | 'completed' | 'failed'
            transaction_signature TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id)
        );

        -- Completed disbursements from the pool wallet, claim or admin driven
        CREATE TABLE transactions (
            id INTEGER PRIMARY KEY,
            wallet_id INTEGER NOT NULL,
            amount INTEGER NOT NULL,
            recipient_address TEXT NOT NULL,
            status TEXT NOT NULL,
            transaction_signature TEXT,
            created_at INTEGER NOT NULL,
            FOREIGN KEY (wallet_id) REFERENCES airdrop_wallet(id)
        );

        -- Admin-issued grants; claim_status is a denormalized view of the
        -- authoritative claims table
        CREATE TABLE airdrops (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            amount INTEGER NOT NULL,
            claim_status TEXT NOT NULL, -- 'pending' | 'claimed'
            category TEXT NOT NULL,
            description TEXT,
            created_at INTEGER NOT NULL,
            claimed_at INTEGER,
            FOREIGN KEY (user_id) REFERENCES users(id)
        );

        -- Indexes for the workflow lookups
        CREATE INDEX idx_claims_user_status ON claims(user_id, status);
        CREATE INDEX idx_claims_status_created ON claims(status, created_at);
        CREATE INDEX idx_transactions_wallet ON transactions(wallet_id);
        CREATE INDEX idx_airdrops_user_status ON airdrops(user_id, claim_status);

        -- Schema version tracking
        CREATE TABLE schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        );
        "#,
    )
    .map_err(DbError::Database)?;

    conn.execute(
        "INSERT INTO schema_version (version, applied_at) VALUES (?1, strftime('%s', 'now'))",
        [SCHEMA_VERSION],
    )
    .map_err(DbError::Database)?;

    Ok(())
}

/// Check if database is properly initialized
pub fn check_schema(conn: &Connection) -> DbResult<bool> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name='airdrop_wallet'")
        .map_err(DbError::Database)?;

    let mut rows = stmt.query_map([], |_row| Ok(())).map_err(DbError::Database)?;

    Ok(rows.next().is_some())
}

/// Get current schema version from database
pub fn get_schema_version(conn: &Connection) -> DbResult<Option<i32>> {
    let table_exists = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name='schema_version'")
        .and_then(|mut stmt| {
            let mut rows = stmt.query_map([], |_| Ok(()))?;
            Ok(rows.next().is_some())
        })
        .unwrap_or(false);

    if !table_exists {
        return Ok(None);
    }

    let mut stmt = conn
        .prepare("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
        .map_err(DbError::Database)?;

    let mut rows = stmt
        .query_map([], |row| row.get::<_, i32>(0))
        .map_err(DbError::Database)?;

    if let Some(row) = rows.next() {
        Ok(Some(row.map_err(DbError::Database)?))
    } else {
        Ok(None)
    }
}
