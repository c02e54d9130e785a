/*!
Shared fixtures for workflow tests: an in-memory campaign builder and a
scriptable ledger client double.
*/

use crate::service::{ClaimService, ServiceConfig};
use crate::validation::claim_message;
use async_trait::async_trait;
use bark_protocol_client::{ClientResult, LedgerClient, TransferOutcome};
use bark_protocol_db::AirdropDatabase;
use solana_sdk::{pubkey::Pubkey, signature::Keypair, signer::Signer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const POOL_ADDRESS: &str = "BARKpoo1111111111111111111111111111111111111";

#[derive(Debug, Clone)]
enum MockBehavior {
    Confirm,
    Reject(String),
    Stall,
}

/// Scriptable ledger client double
pub struct MockLedgerClient {
    behavior: MockBehavior,
    delay: Duration,
    jitter_millis: Option<u64>,
    balance: u64,
    transfers: AtomicUsize,
}

impl MockLedgerClient {
    pub fn confirming() -> Self {
        Self::with_behavior(MockBehavior::Confirm)
    }

    pub fn rejecting(message: &str) -> Self {
        Self::with_behavior(MockBehavior::Reject(message.to_string()))
    }

    /// Never resolves within any realistic timeout
    pub fn stalling() -> Self {
        Self::with_behavior(MockBehavior::Stall)
    }

    fn with_behavior(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            delay: Duration::ZERO,
            jitter_millis: None,
            balance: 0,
            transfers: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sleep a fresh random duration up to `max_millis` on every transfer,
    /// so concurrent callers complete in a different order each run
    pub fn with_jitter(mut self, max_millis: u64) -> Self {
        self.jitter_millis = Some(max_millis);
        self
    }

    pub fn with_balance(mut self, balance: u64) -> Self {
        self.balance = balance;
        self
    }

    pub fn transfer_count(&self) -> usize {
        self.transfers.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerClient for MockLedgerClient {
    async fn transfer(&self, recipient: &Pubkey, amount: u64) -> ClientResult<TransferOutcome> {
        let n = self.transfers.fetch_add(1, Ordering::SeqCst) + 1;

        let delay = match self.jitter_millis {
            Some(max) => Duration::from_millis(rand::Rng::gen_range(
                &mut rand::thread_rng(),
                0..=max,
            )),
            None => self.delay,
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match &self.behavior {
            MockBehavior::Confirm => Ok(TransferOutcome::Confirmed(format!(
                "mock-signature-{}-{}-{}",
                n, recipient, amount
            ))),
            MockBehavior::Reject(message) => Ok(TransferOutcome::Failed(message.clone())),
            MockBehavior::Stall => {
                tokio::time::sleep(Duration::from_secs(3_600)).await;
                Ok(TransferOutcome::Failed("stalled".to_string()))
            }
        }
    }

    async fn get_balance(&self, _owner: &Pubkey) -> ClientResult<u64> {
        Ok(self.balance)
    }
}

/// Builder for a seeded in-memory campaign
pub struct TestCampaignBuilder {
    pool_balance: u64,
    entitlement: Option<u64>,
    enforce_whitelist: bool,
    require_token_holding: bool,
    transfer_timeout: Duration,
    extra_claimants: Vec<(Keypair, u64)>,
}

impl TestCampaignBuilder {
    pub fn pool_balance(mut self, balance: u64) -> Self {
        self.pool_balance = balance;
        self
    }

    /// Entitlement granted to the campaign's default claimant
    pub fn entitlement(mut self, amount: u64) -> Self {
        self.entitlement = Some(amount);
        self
    }

    pub fn enforce_whitelist(mut self) -> Self {
        self.enforce_whitelist = true;
        self
    }

    pub fn require_token_holding(mut self) -> Self {
        self.require_token_holding = true;
        self
    }

    pub fn transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout = timeout;
        self
    }

    /// Seed an additional claimant with the given entitlement
    pub fn add_claimant(&mut self, entitlement: u64) -> Keypair {
        let keypair = Keypair::new();
        self.extra_claimants
            .push((keypair.insecure_clone(), entitlement));
        keypair
    }

    pub fn build(self, client: MockLedgerClient) -> TestCampaign {
        let mut db = AirdropDatabase::create_in_memory().unwrap();
        db.create_pool_wallet(POOL_ADDRESS, self.pool_balance)
            .unwrap();

        let claimant = Keypair::new();
        if let Some(amount) = self.entitlement {
            let user = db
                .get_or_create_user(&claimant.pubkey().to_string())
                .unwrap();
            if amount > 0 {
                db.grant_eligibility(user.id, amount).unwrap();
            }
        }

        for (keypair, entitlement) in &self.extra_claimants {
            let user = db
                .get_or_create_user(&keypair.pubkey().to_string())
                .unwrap();
            if *entitlement > 0 {
                db.grant_eligibility(user.id, *entitlement).unwrap();
            }
        }

        let config = ServiceConfig {
            enforce_whitelist: self.enforce_whitelist,
            require_token_holding: self.require_token_holding,
            transfer_timeout: self.transfer_timeout,
            ..ServiceConfig::default()
        };

        TestCampaign {
            service: ClaimService::new(db, client, config),
            claimant,
        }
    }
}

/// A seeded campaign plus its default claimant keypair
pub struct TestCampaign {
    pub service: ClaimService<MockLedgerClient>,
    pub claimant: Keypair,
}

impl TestCampaign {
    pub fn builder() -> TestCampaignBuilder {
        TestCampaignBuilder {
            pool_balance: 0,
            entitlement: None,
            enforce_whitelist: false,
            require_token_holding: false,
            transfer_timeout: Duration::from_secs(5),
            extra_claimants: Vec::new(),
        }
    }

    pub fn client(&self) -> &MockLedgerClient {
        &self.service.client
    }

    pub async fn pool_used(&self) -> u64 {
        let db = self.service.db.lock().await;
        db.get_pool_wallet().unwrap().unwrap().used_balance
    }

    pub async fn claim_count(&self) -> i64 {
        let db = self.service.db.lock().await;
        db.connection()
            .query_row("SELECT COUNT(*) FROM claims", [], |row| row.get(0))
            .unwrap()
    }
}

/// Address and hex-encoded signature over the canonical claim message
pub fn signed_claim(keypair: &Keypair, token_symbol: &str) -> (String, String) {
    let address = keypair.pubkey().to_string();
    let message = claim_message(token_symbol, &address);
    let signature = keypair.sign_message(message.as_bytes());
    let signature_hex = hex::encode(AsRef::<[u8]>::as_ref(&signature));

    (address, signature_hex)
}
