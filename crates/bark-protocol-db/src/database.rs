/*!
# Database Operations

Unified store interface for all airdrop workflows. Balance-affecting writes
use conditional updates so the check and the mutation happen in one statement,
and the multi-row claim settlement runs inside a single SQL transaction.
*/

use crate::{
    schema::{check_schema, initialize_database},
    DbError, DbResult,
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Claim lifecycle states. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimStatus {
    Processing,
    Completed,
    Failed,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Processing => "processing",
            ClaimStatus::Completed => "completed",
            ClaimStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> DbResult<Self> {
        match s {
            "processing" => Ok(ClaimStatus::Processing),
            "completed" => Ok(ClaimStatus::Completed),
            "failed" => Ok(ClaimStatus::Failed),
            other => Err(DbError::Serialization(format!(
                "Unknown claim status: {}",
                other
            ))),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ClaimStatus::Completed | ClaimStatus::Failed)
    }
}

/// Grant redemption states for admin-issued airdrop records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantStatus {
    Pending,
    Claimed,
}

impl GrantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantStatus::Pending => "pending",
            GrantStatus::Claimed => "claimed",
        }
    }

    pub fn parse(s: &str) -> DbResult<Self> {
        match s {
            "pending" => Ok(GrantStatus::Pending),
            "claimed" => Ok(GrantStatus::Claimed),
            other => Err(DbError::Serialization(format!(
                "Unknown grant status: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: i64,
    pub wallet_address: String,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct EligibilityRecord {
    pub user_id: i64,
    pub total_amount: u64,
    pub unclaimed_amount: u64,
}

/// The shared pool wallet row. Available funds are `balance - used_balance`.
#[derive(Debug, Clone)]
pub struct PoolWallet {
    pub id: i64,
    pub wallet_address: String,
    pub balance: u64,
    pub used_balance: u64,
}

impl PoolWallet {
    pub fn available_balance(&self) -> u64 {
        self.balance.saturating_sub(self.used_balance)
    }
}

#[derive(Debug, Clone)]
pub struct ClaimRecord {
    pub id: i64,
    pub user_id: i64,
    pub amount: u64,
    pub status: ClaimStatus,
    pub transaction_signature: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone)]
pub struct TransactionRecord {
    pub id: i64,
    pub wallet_id: i64,
    pub amount: u64,
    pub recipient_address: String,
    pub status: String,
    pub transaction_signature: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct GrantRecord {
    pub id: i64,
    pub user_id: i64,
    pub amount: u64,
    pub claim_status: GrantStatus,
    pub category: String,
    pub description: Option<String>,
    pub created_at: i64,
    pub claimed_at: Option<i64>,
}

/// Campaign-wide aggregates for the stats endpoint
#[derive(Debug, Clone)]
pub struct AirdropStatistics {
    pub total_distributed: u64,
    pub total_claimed: u64,
    pub total_participants: u64,
}

/// Unified store interface for airdrop operations
pub struct AirdropDatabase {
    conn: Connection,
}

impl AirdropDatabase {
    /// Open an existing database file
    pub fn open(path: &Path) -> DbResult<Self> {
        if !path.exists() {
            return Err(DbError::InvalidConfig(format!(
                "Database file does not exist: {}",
                path.display()
            )));
        }

        let conn = Connection::open(path)
            .map_err(|e| DbError::Connection(format!("Failed to open database: {}", e)))?;

        let db = Self { conn };
        if !db.verify_schema()? {
            return Err(DbError::InvalidConfig(format!(
                "Database file has invalid schema: {}",
                path.display()
            )));
        }

        Ok(db)
    }

    /// Open a database file, initializing the schema when the file is new
    pub fn open_or_create(path: &Path) -> DbResult<Self> {
        if path.exists() {
            return Self::open(path);
        }

        let conn = Connection::open(path)
            .map_err(|e| DbError::Connection(format!("Failed to create database file: {}", e)))?;

        initialize_database(&conn)?;

        Ok(Self { conn })
    }

    /// Create a new in-memory database with initialized schema
    pub fn create_in_memory() -> DbResult<Self> {
        let conn = Connection::open(":memory:").map_err(|e| {
            DbError::Connection(format!("Failed to create in-memory database: {}", e))
        })?;

        initialize_database(&conn)?;

        Ok(Self { conn })
    }

    /// Check if database has proper schema
    pub fn verify_schema(&self) -> DbResult<bool> {
        check_schema(&self.conn)
    }

    /// Get underlying connection for advanced operations
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    // ============================================================================================
    // Users
    // ============================================================================================

    /// Look up a user by wallet address
    pub fn get_user_by_wallet(&self, wallet_address: &str) -> DbResult<Option<UserRecord>> {
        self.conn
            .query_row(
                "SELECT id, wallet_address, created_at FROM users WHERE wallet_address = ?1",
                [wallet_address],
                |row| {
                    Ok(UserRecord {
                        id: row.get(0)?,
                        wallet_address: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(DbError::Database)
    }

    /// Fetch the user for an address, creating the row on first interaction
    pub fn get_or_create_user(&mut self, wallet_address: &str) -> DbResult<UserRecord> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO users (wallet_address, created_at) VALUES (?1, ?2)",
                params![wallet_address, Utc::now().timestamp()],
            )
            .map_err(DbError::Database)?;

        self.get_user_by_wallet(wallet_address)?.ok_or_else(|| {
            DbError::Serialization(format!("User row missing after upsert: {}", wallet_address))
        })
    }

    // ============================================================================================
    // Eligibility
    // ============================================================================================

    /// Read a user's entitlement record
    pub fn get_eligibility(&self, user_id: i64) -> DbResult<Option<EligibilityRecord>> {
        self.conn
            .query_row(
                "SELECT user_id, total_amount, unclaimed_amount FROM eligibility WHERE user_id = ?1",
                [user_id],
                |row| {
                    Ok(EligibilityRecord {
                        user_id: row.get(0)?,
                        total_amount: row.get(1)?,
                        unclaimed_amount: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(DbError::Database)
    }

    /// Increase a user's entitlement, creating the record when absent.
    /// Both `total_amount` and `unclaimed_amount` grow by `amount`.
    pub fn grant_eligibility(&mut self, user_id: i64, amount: u64) -> DbResult<()> {
        self.conn
            .execute(
                "INSERT INTO eligibility (user_id, total_amount, unclaimed_amount)
                 VALUES (?1, ?2, ?2)
                 ON CONFLICT(user_id) DO UPDATE SET
                     total_amount = total_amount + excluded.total_amount,
                     unclaimed_amount = unclaimed_amount + excluded.unclaimed_amount",
                params![user_id, amount],
            )
            .map_err(DbError::Database)?;

        Ok(())
    }

    // ============================================================================================
    // Whitelist
    // ============================================================================================

    /// Check membership in the whitelist table
    pub fn is_whitelisted(&self, wallet_address: &str) -> DbResult<bool> {
        let row: Option<()> = self
            .conn
            .query_row(
                "SELECT 1 FROM whitelist WHERE wallet_address = ?1",
                [wallet_address],
                |_row| Ok(()),
            )
            .optional()
            .map_err(DbError::Database)?;

        Ok(row.is_some())
    }

    /// Add an address to the whitelist. Returns false if it was already there.
    pub fn add_to_whitelist(&mut self, wallet_address: &str) -> DbResult<bool> {
        let changed = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO whitelist (wallet_address, added_at) VALUES (?1, ?2)",
                params![wallet_address, Utc::now().timestamp()],
            )
            .map_err(DbError::Database)?;

        Ok(changed > 0)
    }

    // ============================================================================================
    // Pool wallet
    // ============================================================================================

    /// Read the pool wallet row, if one has been configured
    pub fn get_pool_wallet(&self) -> DbResult<Option<PoolWallet>> {
        self.conn
            .query_row(
                "SELECT id, wallet_address, balance, used_balance FROM airdrop_wallet LIMIT 1",
                [],
                |row| {
                    Ok(PoolWallet {
                        id: row.get(0)?,
                        wallet_address: row.get(1)?,
                        balance: row.get(2)?,
                        used_balance: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(DbError::Database)
    }

    /// Configure the singleton pool wallet. Fails if one already exists.
    pub fn create_pool_wallet(
        &mut self,
        wallet_address: &str,
        initial_balance: u64,
    ) -> DbResult<PoolWallet> {
        if self.get_pool_wallet()?.is_some() {
            return Err(DbError::PoolAlreadyConfigured);
        }

        self.conn
            .execute(
                "INSERT INTO airdrop_wallet (wallet_address, balance, used_balance, created_at)
                 VALUES (?1, ?2, 0, ?3)",
                params![wallet_address, initial_balance, Utc::now().timestamp()],
            )
            .map_err(DbError::Database)?;

        self.get_pool_wallet()?
            .ok_or_else(|| DbError::Serialization("Pool wallet row missing after insert".into()))
    }

    /// Conditionally debit the pool: the reservation only succeeds when the
    /// available balance observed by this statement covers `amount`. This is
    /// the compare-and-swap that keeps concurrent claims from overdrawing.
    pub fn reserve_pool_funds(&mut self, wallet_id: i64, amount: u64) -> DbResult<bool> {
        let changed = self
            .conn
            .execute(
                "UPDATE airdrop_wallet
                 SET used_balance = used_balance + ?1
                 WHERE id = ?2 AND balance - used_balance >= ?1",
                params![amount, wallet_id],
            )
            .map_err(DbError::Database)?;

        Ok(changed > 0)
    }

    /// Return a reservation to the pool after a failed transfer
    pub fn release_pool_funds(&mut self, wallet_id: i64, amount: u64) -> DbResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE airdrop_wallet
                 SET used_balance = used_balance - ?1
                 WHERE id = ?2 AND used_balance >= ?1",
                params![amount, wallet_id],
            )
            .map_err(DbError::Database)?;

        if changed == 0 {
            return Err(DbError::ReservationUnderflow);
        }

        Ok(())
    }

    // ============================================================================================
    // Claims
    // ============================================================================================

    /// Create a `processing` claim for the user, rejecting the attempt when
    /// another claim for the same user is already in flight. Returns the new
    /// claim id, or `None` on conflict.
    pub fn begin_claim(&mut self, user_id: i64, amount: u64) -> DbResult<Option<i64>> {
        let tx = self.conn.transaction().map_err(DbError::Database)?;

        let in_flight: Option<i64> = tx
            .query_row(
                "SELECT id FROM claims WHERE user_id = ?1 AND status = 'processing' LIMIT 1",
                [user_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(DbError::Database)?;

        if in_flight.is_some() {
            return Ok(None);
        }

        let now = Utc::now().timestamp();
        tx.execute(
            "INSERT INTO claims (user_id, amount, status, created_at, updated_at)
             VALUES (?1, ?2, 'processing', ?3, ?3)",
            params![user_id, amount, now],
        )
        .map_err(DbError::Database)?;

        let claim_id = tx.last_insert_rowid();
        tx.commit().map_err(DbError::Database)?;

        Ok(Some(claim_id))
    }

    /// Read a single claim by id
    pub fn get_claim(&self, claim_id: i64) -> DbResult<Option<ClaimRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, user_id, amount, status, transaction_signature, created_at, updated_at
                 FROM claims WHERE id = ?1",
                [claim_id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, u64>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, i64>(5)?,
                        row.get::<_, i64>(6)?,
                    ))
                },
            )
            .optional()
            .map_err(DbError::Database)?;

        match row {
            Some((id, user_id, amount, status, transaction_signature, created_at, updated_at)) => {
                Ok(Some(ClaimRecord {
                    id,
                    user_id,
                    amount,
                    status: ClaimStatus::parse(&status)?,
                    transaction_signature,
                    created_at,
                    updated_at,
                }))
            }
            None => Ok(None),
        }
    }

    /// Resolve a `processing` claim to `failed`. Terminal claims stay as-is.
    pub fn fail_claim(&mut self, claim_id: i64) -> DbResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE claims SET status = 'failed', updated_at = ?1
                 WHERE id = ?2 AND status = 'processing'",
                params![Utc::now().timestamp(), claim_id],
            )
            .map_err(DbError::Database)?;

        if changed == 0 {
            return Err(DbError::ClaimNotProcessing(claim_id));
        }

        Ok(())
    }

    /// Settle a successful transfer in one transaction: claim to `completed`
    /// with its signature, a disbursement row appended, the user's unclaimed
    /// amount decremented, and any pending grants marked `claimed`. All
    /// writes commit together or none do.
    pub fn finalize_claim(
        &mut self,
        claim_id: i64,
        user_id: i64,
        wallet_id: i64,
        recipient_address: &str,
        amount: u64,
        transfer_signature: &str,
    ) -> DbResult<()> {
        let now = Utc::now().timestamp();
        let tx = self.conn.transaction().map_err(DbError::Database)?;

        let changed = tx
            .execute(
                "UPDATE claims SET status = 'completed', transaction_signature = ?1, updated_at = ?2
                 WHERE id = ?3 AND status = 'processing'",
                params![transfer_signature, now, claim_id],
            )
            .map_err(DbError::Database)?;

        if changed == 0 {
            return Err(DbError::ClaimNotProcessing(claim_id));
        }

        tx.execute(
            "INSERT INTO transactions
                 (wallet_id, amount, recipient_address, status, transaction_signature, created_at)
             VALUES (?1, ?2, ?3, 'completed', ?4, ?5)",
            params![wallet_id, amount, recipient_address, transfer_signature, now],
        )
        .map_err(DbError::Database)?;

        let changed = tx
            .execute(
                "UPDATE eligibility SET unclaimed_amount = unclaimed_amount - ?1
                 WHERE user_id = ?2 AND unclaimed_amount >= ?1",
                params![amount, user_id],
            )
            .map_err(DbError::Database)?;

        if changed == 0 {
            return Err(DbError::EligibilityConflict(user_id));
        }

        tx.execute(
            "UPDATE airdrops SET claim_status = 'claimed', claimed_at = ?1
             WHERE user_id = ?2 AND claim_status = 'pending'",
            params![now, user_id],
        )
        .map_err(DbError::Database)?;

        tx.commit().map_err(DbError::Database)?;

        Ok(())
    }

    /// Claims stuck in `processing` longer than `older_than_secs`, oldest
    /// first. These are the reconciliation candidates after ledger timeouts.
    pub fn stale_processing_claims(&self, older_than_secs: i64) -> DbResult<Vec<ClaimRecord>> {
        let cutoff = Utc::now().timestamp() - older_than_secs;

        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, user_id, amount, status, transaction_signature, created_at, updated_at
                 FROM claims
                 WHERE status = 'processing' AND created_at <= ?1
                 ORDER BY created_at",
            )
            .map_err(DbError::Database)?;

        let rows = stmt
            .query_map([cutoff], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, u64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, i64>(6)?,
                ))
            })
            .map_err(DbError::Database)?;

        let mut claims = Vec::new();
        for row in rows {
            let (id, user_id, amount, status, transaction_signature, created_at, updated_at) =
                row.map_err(DbError::Database)?;

            claims.push(ClaimRecord {
                id,
                user_id,
                amount,
                status: ClaimStatus::parse(&status)?,
                transaction_signature,
                created_at,
                updated_at,
            });
        }

        Ok(claims)
    }

    // ============================================================================================
    // Grants
    // ============================================================================================

    /// Record an admin-issued grant in `pending` state
    pub fn create_grant(
        &mut self,
        user_id: i64,
        amount: u64,
        category: &str,
        description: Option<&str>,
    ) -> DbResult<i64> {
        self.conn
            .execute(
                "INSERT INTO airdrops (user_id, amount, claim_status, category, description, created_at)
                 VALUES (?1, ?2, 'pending', ?3, ?4, ?5)",
                params![user_id, amount, category, description, Utc::now().timestamp()],
            )
            .map_err(DbError::Database)?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Read all grants for a user, newest first
    pub fn get_grants_for_user(&self, user_id: i64) -> DbResult<Vec<GrantRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, user_id, amount, claim_status, category, description, created_at, claimed_at
                 FROM airdrops WHERE user_id = ?1 ORDER BY created_at DESC",
            )
            .map_err(DbError::Database)?;

        let rows = stmt
            .query_map([user_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, u64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, i64>(6)?,
                    row.get::<_, Option<i64>>(7)?,
                ))
            })
            .map_err(DbError::Database)?;

        let mut grants = Vec::new();
        for row in rows {
            let (id, user_id, amount, claim_status, category, description, created_at, claimed_at) =
                row.map_err(DbError::Database)?;

            grants.push(GrantRecord {
                id,
                user_id,
                amount,
                claim_status: GrantStatus::parse(&claim_status)?,
                category,
                description,
                created_at,
                claimed_at,
            });
        }

        Ok(grants)
    }

    // ============================================================================================
    // Transactions
    // ============================================================================================

    /// Append a disbursement record
    pub fn record_transaction(
        &mut self,
        wallet_id: i64,
        amount: u64,
        recipient_address: &str,
        status: &str,
        transaction_signature: Option<&str>,
    ) -> DbResult<i64> {
        self.conn
            .execute(
                "INSERT INTO transactions
                     (wallet_id, amount, recipient_address, status, transaction_signature, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    wallet_id,
                    amount,
                    recipient_address,
                    status,
                    transaction_signature,
                    Utc::now().timestamp()
                ],
            )
            .map_err(DbError::Database)?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Read all disbursements from the pool wallet, newest first
    pub fn get_transactions_for_wallet(&self, wallet_id: i64) -> DbResult<Vec<TransactionRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, wallet_id, amount, recipient_address, status, transaction_signature, created_at
                 FROM transactions WHERE wallet_id = ?1 ORDER BY created_at DESC",
            )
            .map_err(DbError::Database)?;

        let rows = stmt
            .query_map([wallet_id], |row| {
                Ok(TransactionRecord {
                    id: row.get(0)?,
                    wallet_id: row.get(1)?,
                    amount: row.get(2)?,
                    recipient_address: row.get(3)?,
                    status: row.get(4)?,
                    transaction_signature: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })
            .map_err(DbError::Database)?;

        let mut transactions = Vec::new();
        for row in rows {
            transactions.push(row.map_err(DbError::Database)?);
        }

        Ok(transactions)
    }

    // ============================================================================================
    // Statistics
    // ============================================================================================

    /// Campaign-wide aggregates: completed disbursements, completed claims,
    /// and users with at least one claim or grant
    pub fn airdrop_statistics(&self) -> DbResult<AirdropStatistics> {
        let total_distributed: u64 = self
            .conn
            .query_row(
                "SELECT COALESCE(SUM(amount), 0) FROM transactions WHERE status = 'completed'",
                [],
                |row| row.get(0),
            )
            .map_err(DbError::Database)?;

        let total_claimed: u64 = self
            .conn
            .query_row(
                "SELECT COALESCE(SUM(amount), 0) FROM claims WHERE status = 'completed'",
                [],
                |row| row.get(0),
            )
            .map_err(DbError::Database)?;

        let total_participants: u64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM users u
                 WHERE EXISTS (SELECT 1 FROM claims c WHERE c.user_id = u.id)
                    OR EXISTS (SELECT 1 FROM airdrops a WHERE a.user_id = u.id)",
                [],
                |row| row.get(0),
            )
            .map_err(DbError::Database)?;

        Ok(AirdropStatistics {
            total_distributed,
            total_claimed,
            total_participants,
        })
    }
}
