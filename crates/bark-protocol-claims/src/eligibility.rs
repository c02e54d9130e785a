/*!
# Eligibility Resolution

Read-only determination of whether a wallet may claim and how much. The
resolver never mutates state and may be called arbitrarily often; two calls
with no intervening claim return identical results.
*/

use std::fmt;

/// The fixed vocabulary of ineligibility reasons. Callers and tests key off
/// these values, not free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IneligibleReason {
    InvalidAddress,
    NotTokenHolder,
    UserNotFound,
    NoUnclaimedTokens,
    NotWhitelisted,
}

impl IneligibleReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            IneligibleReason::InvalidAddress => "invalid address",
            IneligibleReason::NotTokenHolder => "not a token holder",
            IneligibleReason::UserNotFound => "user not found",
            IneligibleReason::NoUnclaimedTokens => "no unclaimed tokens",
            IneligibleReason::NotWhitelisted => "not whitelisted",
        }
    }
}

impl fmt::Display for IneligibleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an eligibility check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityReport {
    pub is_eligible: bool,
    pub total_amount: Option<u64>,
    pub unclaimed_amount: Option<u64>,
    pub reason: Option<IneligibleReason>,
}

impl EligibilityReport {
    pub fn eligible(total_amount: u64, unclaimed_amount: u64) -> Self {
        Self {
            is_eligible: true,
            total_amount: Some(total_amount),
            unclaimed_amount: Some(unclaimed_amount),
            reason: None,
        }
    }

    pub fn ineligible(reason: IneligibleReason) -> Self {
        Self {
            is_eligible: false,
            total_amount: None,
            unclaimed_amount: None,
            reason: Some(reason),
        }
    }
}
