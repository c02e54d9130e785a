/*!
# Claim Service

`ClaimService` owns the store handle, the ledger client, and the campaign
configuration, and exposes every workflow the HTTP surface needs. The store
sits behind an async mutex; workflows release it before any ledger call so a
slow transfer never blocks unrelated requests.
*/

use crate::{
    eligibility::{EligibilityReport, IneligibleReason},
    errors::{ClaimError, ClaimResult},
    validation::is_valid_address,
};
use bark_protocol_client::LedgerClient;
use bark_protocol_csvs::{validate_roster, RosterRow};
use bark_protocol_db::{AirdropDatabase, ClaimRecord, PoolWallet};
use solana_sdk::pubkey::Pubkey;
use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;

/// Campaign configuration for the claim service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Token symbol used in the canonical claim message
    pub token_symbol: String,
    /// Static list of pre-approved addresses, checked before the whitelist
    /// table
    pub allow_list: HashSet<String>,
    /// When set, claims require membership in the allow list or the
    /// whitelist table
    pub enforce_whitelist: bool,
    /// When set, claims require a nonzero on-chain token balance
    pub require_token_holding: bool,
    /// Upper bound on a single ledger transfer; on expiry the claim stays
    /// `processing` for reconciliation
    pub transfer_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            token_symbol: "BARK".to_string(),
            allow_list: HashSet::new(),
            enforce_whitelist: false,
            require_token_holding: false,
            transfer_timeout: Duration::from_secs(30),
        }
    }
}

/// Internal resolver outcome carrying the ids the claim workflow needs
#[derive(Debug, Clone)]
pub(crate) enum Resolved {
    Eligible {
        user_id: i64,
        total_amount: u64,
        unclaimed_amount: u64,
    },
    Ineligible(IneligibleReason),
}

/// Campaign-wide aggregates for the stats endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AirdropStats {
    pub total_distributed: u64,
    pub total_claimed: u64,
    pub remaining_to_claim: u64,
    pub total_participants: u64,
}

/// Result of a roster import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterImportSummary {
    /// Addresses newly added to the whitelist
    pub whitelisted: usize,
    /// Rows that granted a nonzero eligibility amount
    pub granted: usize,
}

/// The claim, eligibility, distribution, and stats workflows behind one
/// injected store handle and ledger client
pub struct ClaimService<C> {
    pub(crate) db: Mutex<AirdropDatabase>,
    pub(crate) client: C,
    pub(crate) config: ServiceConfig,
}

impl<C: LedgerClient> ClaimService<C> {
    pub fn new(db: AirdropDatabase, client: C, config: ServiceConfig) -> Self {
        Self {
            db: Mutex::new(db),
            client,
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Read the pool wallet row, if configured
    pub async fn pool_wallet(&self) -> ClaimResult<Option<PoolWallet>> {
        let db = self.db.lock().await;
        Ok(db.get_pool_wallet()?)
    }

    /// Configure the singleton pool wallet
    pub async fn configure_pool(
        &self,
        wallet_address: &str,
        initial_balance: u64,
    ) -> ClaimResult<PoolWallet> {
        let mut db = self.db.lock().await;
        Ok(db.create_pool_wallet(wallet_address, initial_balance)?)
    }

    /// Determine whether `address` may claim, and how much. Read-only and
    /// idempotent; safe to call arbitrarily often.
    pub async fn check_eligibility(&self, address: &str) -> ClaimResult<EligibilityReport> {
        match self.resolve(address).await? {
            Resolved::Eligible {
                total_amount,
                unclaimed_amount,
                ..
            } => Ok(EligibilityReport::eligible(total_amount, unclaimed_amount)),
            Resolved::Ineligible(reason) => Ok(EligibilityReport::ineligible(reason)),
        }
    }

    /// The shared resolver behind the eligibility endpoint and the claim
    /// workflow. Store reads take the lock only for the duration of the
    /// query; the on-chain balance probe runs with no lock held, so no store
    /// borrow ever spans the RPC await.
    pub(crate) async fn resolve(&self, address: &str) -> ClaimResult<Resolved> {
        if !is_valid_address(address) {
            return Ok(Resolved::Ineligible(IneligibleReason::InvalidAddress));
        }

        if self.config.enforce_whitelist {
            let approved = if self.config.allow_list.contains(address) {
                true
            } else {
                let db = self.db.lock().await;
                db.is_whitelisted(address)?
            };
            if !approved {
                return Ok(Resolved::Ineligible(IneligibleReason::NotWhitelisted));
            }
        }

        if self.config.require_token_holding {
            let pubkey = Pubkey::from_str(address)
                .map_err(|_| ClaimError::InvalidAddress)?;
            if self.client.get_balance(&pubkey).await? == 0 {
                return Ok(Resolved::Ineligible(IneligibleReason::NotTokenHolder));
            }
        }

        let db = self.db.lock().await;

        let user = match db.get_user_by_wallet(address)? {
            Some(user) => user,
            None => return Ok(Resolved::Ineligible(IneligibleReason::UserNotFound)),
        };

        match db.get_eligibility(user.id)? {
            Some(eligibility) if eligibility.unclaimed_amount > 0 => Ok(Resolved::Eligible {
                user_id: user.id,
                total_amount: eligibility.total_amount,
                unclaimed_amount: eligibility.unclaimed_amount,
            }),
            _ => Ok(Resolved::Ineligible(IneligibleReason::NoUnclaimedTokens)),
        }
    }

    /// One-time roster load: whitelist every row, and grant eligibility for
    /// rows with a nonzero amount. The store is authoritative afterwards.
    pub async fn import_roster(&self, rows: &[RosterRow]) -> ClaimResult<RosterImportSummary> {
        validate_roster(rows)?;

        let mut db = self.db.lock().await;
        let mut summary = RosterImportSummary {
            whitelisted: 0,
            granted: 0,
        };

        for row in rows {
            let address = row.wallet_address.to_string();

            if db.add_to_whitelist(&address)? {
                summary.whitelisted += 1;
            }

            if row.amount > 0 {
                let user = db.get_or_create_user(&address)?;
                db.grant_eligibility(user.id, row.amount)?;
                summary.granted += 1;
            }
        }

        info!(
            whitelisted = summary.whitelisted,
            granted = summary.granted,
            "roster imported"
        );

        Ok(summary)
    }

    /// Campaign-wide aggregates, all amounts in base units
    pub async fn airdrop_stats(&self) -> ClaimResult<AirdropStats> {
        let db = self.db.lock().await;
        let stats = db.airdrop_statistics()?;

        Ok(AirdropStats {
            total_distributed: stats.total_distributed,
            total_claimed: stats.total_claimed,
            remaining_to_claim: stats.total_distributed.saturating_sub(stats.total_claimed),
            total_participants: stats.total_participants,
        })
    }

    /// Claims stuck in `processing` longer than `older_than_secs`: the
    /// reconciliation candidates left behind by ledger timeouts
    pub async fn stale_claims(&self, older_than_secs: i64) -> ClaimResult<Vec<ClaimRecord>> {
        let db = self.db.lock().await;
        Ok(db.stale_processing_claims(older_than_secs)?)
    }
}
