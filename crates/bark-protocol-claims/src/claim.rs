/*!
# Claim Workflow

The core state machine: a claim is created in `processing` and resolves to
`completed` or `failed`, both terminal. A retry is always a fresh claim row.

Two serialization points protect the shared state:

- The pool debit is a conditional reservation taken **before** the transfer;
  concurrent claims against a stale balance cannot overdraw the pool, and a
  failed transfer returns the reservation.
- Claim creation rejects a second in-flight claim for the same user, so only
  one of two concurrent claims for one wallet can proceed.

The store lock is dropped across the ledger call; only the claim's own
reservation is held while the transfer is in flight.
*/

use crate::{
    eligibility::IneligibleReason,
    errors::{ClaimError, ClaimResult},
    service::{ClaimService, Resolved},
    validation::{is_valid_address, verify_claim_signature},
};
use bark_protocol_client::{LedgerClient, TransferOutcome};
use bark_protocol_db::AirdropDatabase;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use tokio::time::timeout;
use tracing::{error, info, warn};

/// Successful claim settlement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimReceipt {
    pub claim_id: i64,
    pub amount: u64,
    pub transaction_signature: String,
}

impl<C: LedgerClient> ClaimService<C> {
    /// Redeem the caller's full unclaimed entitlement.
    ///
    /// Validation and business-rule rejections return before any state is
    /// created. After the claim row exists, every path resolves it to a
    /// terminal state except a ledger timeout, which leaves it `processing`
    /// with its reservation held for reconciliation.
    pub async fn submit_claim(
        &self,
        wallet_address: &str,
        signature_hex: &str,
    ) -> ClaimResult<ClaimReceipt> {
        if !is_valid_address(wallet_address) {
            return Err(ClaimError::InvalidAddress);
        }
        let recipient =
            Pubkey::from_str(wallet_address).map_err(|_| ClaimError::InvalidAddress)?;

        let user_id = match self.resolve(wallet_address).await? {
            Resolved::Eligible { user_id, .. } => user_id,
            Resolved::Ineligible(reason) => return Err(reason.into()),
        };

        if !verify_claim_signature(&self.config.token_symbol, wallet_address, signature_hex) {
            return Err(ClaimError::InvalidSignature);
        }

        let (claim_id, pool_id, amount) = {
            let mut db = self.db.lock().await;

            // Re-read the entitlement in the same critical section as the
            // reservation: it may have been settled since the gate checks ran
            let amount = match db.get_eligibility(user_id)? {
                Some(eligibility) if eligibility.unclaimed_amount > 0 => {
                    eligibility.unclaimed_amount
                }
                _ => {
                    return Err(ClaimError::Ineligible(
                        IneligibleReason::NoUnclaimedTokens,
                    ))
                }
            };

            let pool = db
                .get_pool_wallet()?
                .ok_or(ClaimError::WalletNotConfigured)?;

            // The conditional debit; nothing is mutated when it loses
            if !db.reserve_pool_funds(pool.id, amount)? {
                return Err(ClaimError::InsufficientPoolFunds);
            }

            let claim_id = match db.begin_claim(user_id, amount) {
                Ok(Some(claim_id)) => claim_id,
                Ok(None) => {
                    db.release_pool_funds(pool.id, amount)?;
                    return Err(ClaimError::ClaimInProgress);
                }
                Err(e) => {
                    db.release_pool_funds(pool.id, amount)?;
                    return Err(e.into());
                }
            };

            info!(claim_id, user_id, amount, "claim processing");
            (claim_id, pool.id, amount)
        };

        let transfer = timeout(
            self.config.transfer_timeout,
            self.client.transfer(&recipient, amount),
        )
        .await;

        match transfer {
            // The transfer may have landed despite the timeout: the claim
            // stays processing and keeps its reservation until reconciled
            Err(_elapsed) => {
                warn!(claim_id, "ledger transfer timed out; claim left for reconciliation");
                Err(ClaimError::TransferPending)
            }
            Ok(Ok(TransferOutcome::Confirmed(signature))) => {
                let mut db = self.db.lock().await;
                match db.finalize_claim(
                    claim_id,
                    user_id,
                    pool_id,
                    wallet_address,
                    amount,
                    &signature,
                ) {
                    Ok(()) => {
                        info!(claim_id, %signature, "claim completed");
                        Ok(ClaimReceipt {
                            claim_id,
                            amount,
                            transaction_signature: signature,
                        })
                    }
                    Err(e) => {
                        error!(claim_id, %e, "settlement failed after confirmed transfer");
                        self.abandon_claim(&mut db, claim_id, pool_id, amount);
                        Err(e.into())
                    }
                }
            }
            Ok(Ok(TransferOutcome::Failed(message))) => {
                let mut db = self.db.lock().await;
                self.abandon_claim(&mut db, claim_id, pool_id, amount);
                warn!(claim_id, reason = %message, "claim failed");
                Err(ClaimError::TransferFailed(message))
            }
            Ok(Err(client_error)) => {
                let mut db = self.db.lock().await;
                self.abandon_claim(&mut db, claim_id, pool_id, amount);
                error!(claim_id, %client_error, "claim failed");
                Err(client_error.into())
            }
        }
    }

    /// Best-effort resolution to `failed` after a rejected transfer or a
    /// settlement error. The status update and the reservation release each
    /// run regardless of the other's outcome, so a store error in one step
    /// cannot leak the reservation; a claim must never be left `processing`
    /// by anything but a timeout.
    fn abandon_claim(
        &self,
        db: &mut AirdropDatabase,
        claim_id: i64,
        pool_id: i64,
        amount: u64,
    ) {
        if let Err(e) = db.fail_claim(claim_id) {
            error!(claim_id, %e, "failed to resolve claim after settlement error");
        }
        if let Err(e) = db.release_pool_funds(pool_id, amount) {
            error!(claim_id, %e, "failed to release reservation after settlement error");
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        eligibility::IneligibleReason,
        errors::ClaimError,
        test_support::{signed_claim, MockLedgerClient, TestCampaign},
    };
    use bark_protocol_db::ClaimStatus;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_happy_path_settles_all_balances() {
        let campaign = TestCampaign::builder()
            .pool_balance(5_000)
            .entitlement(1_000)
            .build(MockLedgerClient::confirming());

        let (address, signature) = signed_claim(&campaign.claimant, "BARK");
        let receipt = campaign
            .service
            .submit_claim(&address, &signature)
            .await
            .unwrap();

        assert_eq!(receipt.amount, 1_000);

        let db = campaign.service.db.lock().await;
        let pool = db.get_pool_wallet().unwrap().unwrap();
        assert_eq!(pool.available_balance(), 4_000);

        let user = db.get_user_by_wallet(&address).unwrap().unwrap();
        let eligibility = db.get_eligibility(user.id).unwrap().unwrap();
        assert_eq!(eligibility.unclaimed_amount, 0);
        assert_eq!(eligibility.total_amount, 1_000);

        let transactions = db.get_transactions_for_wallet(pool.id).unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].amount, 1_000);

        let claim = db.get_claim(receipt.claim_id).unwrap().unwrap();
        assert_eq!(claim.status, ClaimStatus::Completed);
        assert_eq!(
            claim.transaction_signature.as_deref(),
            Some(receipt.transaction_signature.as_str())
        );
    }

    #[tokio::test]
    async fn test_malformed_address_creates_nothing() {
        let campaign = TestCampaign::builder()
            .pool_balance(5_000)
            .entitlement(1_000)
            .build(MockLedgerClient::confirming());

        let result = campaign.service.submit_claim("not-an-address", "00").await;
        assert!(matches!(result, Err(ClaimError::InvalidAddress)));

        assert_eq!(campaign.claim_count().await, 0);
        assert_eq!(campaign.pool_used().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_wallet_creates_nothing() {
        let campaign = TestCampaign::builder()
            .pool_balance(5_000)
            .build(MockLedgerClient::confirming());

        let stranger = solana_sdk::signature::Keypair::new();
        let (address, signature) = signed_claim(&stranger, "BARK");
        let result = campaign.service.submit_claim(&address, &signature).await;
        assert!(matches!(result, Err(ClaimError::UserNotFound)));

        assert_eq!(campaign.claim_count().await, 0);
        assert_eq!(campaign.pool_used().await, 0);
    }

    #[tokio::test]
    async fn test_invalid_signature_creates_nothing() {
        let campaign = TestCampaign::builder()
            .pool_balance(5_000)
            .entitlement(1_000)
            .build(MockLedgerClient::confirming());

        // Signed by a different keypair over the claimant's address
        let imposter = solana_sdk::signature::Keypair::new();
        let address = solana_sdk::signer::Signer::pubkey(&campaign.claimant).to_string();
        let (_, wrong_signature) = signed_claim(&imposter, "BARK");

        let result = campaign.service.submit_claim(&address, &wrong_signature).await;
        assert!(matches!(result, Err(ClaimError::InvalidSignature)));

        assert_eq!(campaign.claim_count().await, 0);
        assert_eq!(campaign.pool_used().await, 0);
        assert_eq!(campaign.client().transfer_count(), 0);
    }

    #[tokio::test]
    async fn test_insufficient_pool_funds_creates_nothing() {
        let campaign = TestCampaign::builder()
            .pool_balance(500)
            .entitlement(1_000)
            .build(MockLedgerClient::confirming());

        let (address, signature) = signed_claim(&campaign.claimant, "BARK");
        let result = campaign.service.submit_claim(&address, &signature).await;
        assert!(matches!(result, Err(ClaimError::InsufficientPoolFunds)));

        assert_eq!(campaign.claim_count().await, 0);
        assert_eq!(campaign.pool_used().await, 0);

        let report = campaign.service.check_eligibility(&address).await.unwrap();
        assert_eq!(report.unclaimed_amount, Some(1_000));
    }

    #[tokio::test]
    async fn test_rejected_transfer_fails_claim_and_releases_pool() {
        let campaign = TestCampaign::builder()
            .pool_balance(5_000)
            .entitlement(1_000)
            .build(MockLedgerClient::rejecting("mint frozen"));

        let (address, signature) = signed_claim(&campaign.claimant, "BARK");
        let result = campaign.service.submit_claim(&address, &signature).await;

        match result {
            Err(ClaimError::TransferFailed(message)) => assert_eq!(message, "mint frozen"),
            other => panic!("expected TransferFailed, got {:?}", other.map(|_| ())),
        }

        assert_eq!(campaign.pool_used().await, 0);
        assert_eq!(campaign.claim_count().await, 1);

        // Entitlement untouched; a retry is permitted as a fresh claim
        let report = campaign.service.check_eligibility(&address).await.unwrap();
        assert_eq!(report.unclaimed_amount, Some(1_000));
    }

    #[tokio::test]
    async fn test_abandon_releases_reservation_despite_terminal_claim() {
        let campaign = TestCampaign::builder()
            .pool_balance(5_000)
            .entitlement(1_000)
            .build(MockLedgerClient::confirming());

        let (address, signature) = signed_claim(&campaign.claimant, "BARK");
        let receipt = campaign
            .service
            .submit_claim(&address, &signature)
            .await
            .unwrap();
        assert_eq!(campaign.pool_used().await, 1_000);

        // A reservation held against an already-terminal claim: the status
        // update errors, but the release must still run
        let mut db = campaign.service.db.lock().await;
        let pool = db.get_pool_wallet().unwrap().unwrap();
        assert!(db.reserve_pool_funds(pool.id, 500).unwrap());

        campaign
            .service
            .abandon_claim(&mut db, receipt.claim_id, pool.id, 500);

        let pool = db.get_pool_wallet().unwrap().unwrap();
        assert_eq!(pool.used_balance, 1_000);

        let claim = db.get_claim(receipt.claim_id).unwrap().unwrap();
        assert_eq!(claim.status, ClaimStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transfer_timeout_leaves_claim_for_reconciliation() {
        let campaign = TestCampaign::builder()
            .pool_balance(5_000)
            .entitlement(1_000)
            .transfer_timeout(Duration::from_millis(100))
            .build(MockLedgerClient::stalling());

        let (address, signature) = signed_claim(&campaign.claimant, "BARK");
        let result = campaign.service.submit_claim(&address, &signature).await;
        assert!(matches!(result, Err(ClaimError::TransferPending)));

        // Reservation stays held: the transfer may have landed on-chain
        assert_eq!(campaign.pool_used().await, 1_000);

        let stale = campaign.service.stale_claims(0).await.unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].amount, 1_000);
        assert_eq!(stale[0].status, ClaimStatus::Processing);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_user_double_claim_settles_once() {
        let campaign = TestCampaign::builder()
            .pool_balance(5_000)
            .entitlement(1_000)
            .build(MockLedgerClient::confirming().with_delay(Duration::from_millis(50)));

        let service = Arc::new(campaign.service);
        let (address, signature) = signed_claim(&campaign.claimant, "BARK");

        let a = tokio::spawn({
            let service = Arc::clone(&service);
            let (address, signature) = (address.clone(), signature.clone());
            async move { service.submit_claim(&address, &signature).await }
        });
        let b = tokio::spawn({
            let service = Arc::clone(&service);
            let (address, signature) = (address.clone(), signature.clone());
            async move { service.submit_claim(&address, &signature).await }
        });

        let outcomes = [a.await.unwrap(), b.await.unwrap()];
        let successes = outcomes.iter().filter(|o| o.is_ok()).count();
        assert_eq!(successes, 1);

        // The loser must fail with a conflict, not silently succeed twice
        let conflicts = outcomes
            .iter()
            .filter(|o| {
                matches!(
                    o,
                    Err(ClaimError::ClaimInProgress)
                        | Err(ClaimError::Ineligible(IneligibleReason::NoUnclaimedTokens))
                )
            })
            .count();
        assert_eq!(conflicts, 1);

        let db = service.db.lock().await;
        let pool = db.get_pool_wallet().unwrap().unwrap();
        assert_eq!(pool.used_balance, 1_000);

        let user = db.get_user_by_wallet(&address).unwrap().unwrap();
        let eligibility = db.get_eligibility(user.id).unwrap().unwrap();
        assert_eq!(eligibility.unclaimed_amount, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_claims_never_overdraw_pool() {
        use rand::Rng;

        // Pool covers only two of four claimants. Each claimant gets its own
        // random start offset, and each transfer its own random duration, so
        // every run exercises a different interleaving.
        let mut builder = TestCampaign::builder().pool_balance(2_000);
        let claimants: Vec<_> = (0..4)
            .map(|_| builder.add_claimant(1_000))
            .collect();
        let campaign = builder.build(MockLedgerClient::confirming().with_jitter(40));

        let service = Arc::new(campaign.service);
        let mut handles = Vec::new();
        for claimant in &claimants {
            let (address, signature) = signed_claim(claimant, "BARK");
            let service = Arc::clone(&service);
            let start_after =
                Duration::from_millis(rand::thread_rng().gen_range(0..25));
            handles.push(tokio::spawn(async move {
                tokio::time::sleep(start_after).await;
                service.submit_claim(&address, &signature).await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }

        // Exactly two claims fit the pool
        assert_eq!(successes, 2);

        let db = service.db.lock().await;
        let pool = db.get_pool_wallet().unwrap().unwrap();
        assert!(pool.used_balance <= pool.balance);
        assert_eq!(pool.used_balance, 2_000);
    }

    #[tokio::test]
    async fn test_whitelist_gate() {
        let campaign = TestCampaign::builder()
            .pool_balance(5_000)
            .entitlement(1_000)
            .enforce_whitelist()
            .build(MockLedgerClient::confirming());

        let (address, signature) = signed_claim(&campaign.claimant, "BARK");
        let result = campaign.service.submit_claim(&address, &signature).await;
        assert!(matches!(
            result,
            Err(ClaimError::Ineligible(IneligibleReason::NotWhitelisted))
        ));

        {
            let mut db = campaign.service.db.lock().await;
            db.add_to_whitelist(&address).unwrap();
        }

        campaign
            .service
            .submit_claim(&address, &signature)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_settled_wallet_cannot_claim_again() {
        let campaign = TestCampaign::builder()
            .pool_balance(5_000)
            .entitlement(1_000)
            .build(MockLedgerClient::confirming());

        let (address, signature) = signed_claim(&campaign.claimant, "BARK");
        campaign
            .service
            .submit_claim(&address, &signature)
            .await
            .unwrap();

        let result = campaign.service.submit_claim(&address, &signature).await;
        assert!(matches!(
            result,
            Err(ClaimError::Ineligible(IneligibleReason::NoUnclaimedTokens))
        ));

        // Still exactly one transfer and one completed claim
        assert_eq!(campaign.client().transfer_count(), 1);
    }
}
