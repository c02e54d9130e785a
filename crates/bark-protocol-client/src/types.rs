/*!
# Client Data Types

Result structures for ledger transfer operations.
*/

/// Result of a token transfer attempt.
///
/// A `Failed` outcome means the ledger definitively rejected the transfer;
/// transport-level problems surface as `ClientError` instead, because the
/// caller must treat those as ambiguous (the transfer may have landed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Transfer confirmed; carries the transaction signature
    Confirmed(String),
    /// Ledger rejected the transfer with the given message
    Failed(String),
}
