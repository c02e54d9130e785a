/*!
# Address & Signature Validation

Pure input checks that run before any state-mutating work. Both functions are
side-effect free and fail closed: anything that does not parse cleanly is
invalid, never "valid by default".
*/

use solana_sdk::{pubkey::Pubkey, signature::Signature};
use std::str::FromStr;

/// Check that a string is a well-formed wallet address: base58 alphabet,
/// 32-44 characters, decoding to a 32-byte key.
pub fn is_valid_address(address: &str) -> bool {
    if address.len() < 32 || address.len() > 44 {
        return false;
    }

    Pubkey::from_str(address).is_ok()
}

/// The canonical message a wallet signs to claim its airdrop
pub fn claim_message(token_symbol: &str, address: &str) -> String {
    format!("Claim {} tokens for {}", token_symbol, address)
}

/// Verify a hex-encoded ed25519 detached signature over the canonical claim
/// message, against the key the address encodes.
pub fn verify_claim_signature(token_symbol: &str, address: &str, signature_hex: &str) -> bool {
    let pubkey = match Pubkey::from_str(address) {
        Ok(pubkey) => pubkey,
        Err(_) => return false,
    };

    let signature_bytes = match hex::decode(signature_hex) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let signature = match Signature::try_from(signature_bytes.as_slice()) {
        Ok(signature) => signature,
        Err(_) => return false,
    };

    let message = claim_message(token_symbol, address);
    signature.verify(pubkey.as_ref(), message.as_bytes())
}
