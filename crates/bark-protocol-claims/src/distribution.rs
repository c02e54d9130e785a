/*!
# Distribution Workflow

Admin-initiated grants: the inverse of a claim. A grant increases the
recipient's unclaimed entitlement and debits the pool, but performs no ledger
transfer — the tokens only move later when the recipient claims.
*/

use crate::{
    errors::{DistributeError, DistributeResult},
    service::ClaimService,
    validation::is_valid_address,
};
use bark_protocol_client::LedgerClient;
use bark_protocol_db::{AirdropDatabase, DbResult};
use tracing::{info, warn};

/// Successful grant issuance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionReceipt {
    pub grant_id: i64,
    pub user_id: i64,
    pub amount: u64,
}

impl<C: LedgerClient> ClaimService<C> {
    /// Issue a grant of `amount` base units to `wallet_address`, creating
    /// the user on first contact. Rejects a zero amount rather than
    /// clamping it.
    pub async fn distribute(
        &self,
        wallet_address: &str,
        amount: u64,
        category: &str,
        description: Option<&str>,
    ) -> DistributeResult<DistributionReceipt> {
        if amount == 0 {
            return Err(DistributeError::InvalidAmount);
        }
        if !is_valid_address(wallet_address) {
            return Err(DistributeError::InvalidAddress);
        }

        let mut db = self.db.lock().await;

        let pool = db
            .get_pool_wallet()?
            .ok_or(DistributeError::WalletNotConfigured)?;

        // Same conditional debit as the claim path; nothing mutated on loss
        if !db.reserve_pool_funds(pool.id, amount)? {
            return Err(DistributeError::InsufficientPoolFunds);
        }

        match settle_distribution(&mut db, pool.id, wallet_address, amount, category, description)
        {
            Ok(receipt) => {
                info!(
                    grant_id = receipt.grant_id,
                    wallet_address, amount, category, "grant issued"
                );
                Ok(receipt)
            }
            Err(e) => {
                if let Err(release) = db.release_pool_funds(pool.id, amount) {
                    warn!(%release, "failed to release reservation after grant error");
                }
                Err(e.into())
            }
        }
    }
}

fn settle_distribution(
    db: &mut AirdropDatabase,
    pool_id: i64,
    wallet_address: &str,
    amount: u64,
    category: &str,
    description: Option<&str>,
) -> DbResult<DistributionReceipt> {
    let user = db.get_or_create_user(wallet_address)?;
    let grant_id = db.create_grant(user.id, amount, category, description)?;
    db.grant_eligibility(user.id, amount)?;
    db.record_transaction(pool_id, amount, wallet_address, "completed", None)?;

    Ok(DistributionReceipt {
        grant_id,
        user_id: user.id,
        amount,
    })
}

#[cfg(test)]
mod tests {
    use crate::{
        errors::DistributeError,
        test_support::{signed_claim, MockLedgerClient, TestCampaign},
    };
    use bark_protocol_db::GrantStatus;
    use solana_sdk::{signature::Keypair, signer::Signer};

    #[tokio::test]
    async fn test_zero_amount_rejected() {
        let campaign = TestCampaign::builder()
            .pool_balance(5_000)
            .build(MockLedgerClient::confirming());

        let recipient = Keypair::new().pubkey().to_string();
        let result = campaign
            .service
            .distribute(&recipient, 0, "community", None)
            .await;

        assert!(matches!(result, Err(DistributeError::InvalidAmount)));
        assert_eq!(campaign.pool_used().await, 0);
    }

    #[tokio::test]
    async fn test_malformed_address_rejected() {
        let campaign = TestCampaign::builder()
            .pool_balance(5_000)
            .build(MockLedgerClient::confirming());

        let result = campaign
            .service
            .distribute("not-an-address", 100, "community", None)
            .await;

        assert!(matches!(result, Err(DistributeError::InvalidAddress)));
    }

    #[tokio::test]
    async fn test_grant_settles_all_records() {
        let campaign = TestCampaign::builder()
            .pool_balance(5_000)
            .build(MockLedgerClient::confirming());

        let recipient = Keypair::new().pubkey().to_string();
        let receipt = campaign
            .service
            .distribute(&recipient, 1_500, "community", Some("airdrop wave 2"))
            .await
            .unwrap();

        assert_eq!(receipt.amount, 1_500);

        let db = campaign.service.db.lock().await;
        let pool = db.get_pool_wallet().unwrap().unwrap();
        assert_eq!(pool.used_balance, 1_500);

        let user = db.get_user_by_wallet(&recipient).unwrap().unwrap();
        let eligibility = db.get_eligibility(user.id).unwrap().unwrap();
        assert_eq!(eligibility.total_amount, 1_500);
        assert_eq!(eligibility.unclaimed_amount, 1_500);

        let grants = db.get_grants_for_user(user.id).unwrap();
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].claim_status, GrantStatus::Pending);
        assert_eq!(grants[0].category, "community");

        // Grants are recorded as disbursements but carry no ledger signature
        let transactions = db.get_transactions_for_wallet(pool.id).unwrap();
        assert_eq!(transactions.len(), 1);
        assert!(transactions[0].transaction_signature.is_none());
    }

    #[tokio::test]
    async fn test_repeat_grants_accumulate() {
        let campaign = TestCampaign::builder()
            .pool_balance(5_000)
            .build(MockLedgerClient::confirming());

        let recipient = Keypair::new().pubkey().to_string();
        campaign
            .service
            .distribute(&recipient, 1_000, "community", None)
            .await
            .unwrap();
        campaign
            .service
            .distribute(&recipient, 500, "partners", None)
            .await
            .unwrap();

        let report = campaign.service.check_eligibility(&recipient).await.unwrap();
        assert!(report.is_eligible);
        assert_eq!(report.total_amount, Some(1_500));
        assert_eq!(report.unclaimed_amount, Some(1_500));
    }

    #[tokio::test]
    async fn test_insufficient_pool_rejected_without_mutation() {
        let campaign = TestCampaign::builder()
            .pool_balance(1_000)
            .build(MockLedgerClient::confirming());

        let recipient = Keypair::new().pubkey().to_string();
        let result = campaign
            .service
            .distribute(&recipient, 2_000, "community", None)
            .await;

        assert!(matches!(result, Err(DistributeError::InsufficientPoolFunds)));
        assert_eq!(campaign.pool_used().await, 0);

        let db = campaign.service.db.lock().await;
        assert!(db.get_user_by_wallet(&recipient).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_grant_then_claim_round_trip() {
        let campaign = TestCampaign::builder()
            .pool_balance(5_000)
            .build(MockLedgerClient::confirming());

        let recipient = Keypair::new();
        let address = recipient.pubkey().to_string();
        campaign
            .service
            .distribute(&address, 1_000, "community", None)
            .await
            .unwrap();

        let (address, signature) = signed_claim(&recipient, "BARK");
        let receipt = campaign
            .service
            .submit_claim(&address, &signature)
            .await
            .unwrap();
        assert_eq!(receipt.amount, 1_000);

        let db = campaign.service.db.lock().await;
        let user = db.get_user_by_wallet(&address).unwrap().unwrap();
        let grants = db.get_grants_for_user(user.id).unwrap();
        assert_eq!(grants[0].claim_status, GrantStatus::Claimed);

        // Grant debit plus claim debit: the pool carries both
        let pool = db.get_pool_wallet().unwrap().unwrap();
        assert_eq!(pool.used_balance, 2_000);
    }
}
