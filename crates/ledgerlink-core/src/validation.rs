//! Transaction-level validity checks.
//!
//! Pure and local: nothing here touches the network or chain state. Checks
//! run in a fixed order and stop at the first failure:
//!
//! 1. No fee component is negative
//! 2. At least one signature is present
//! 3. Signature count equals the number of distinct required signers
//! 4. Memo is at most [`MAX_MEMO_CHARACTERS`] characters
//! 5. Total signature weight is at most [`TX_SIG_LIMIT`]

use crate::crypto::PubKey;
use crate::error::ValidationError;
use crate::tx::{StdSignature, StdTx};

/// Maximum memo length in characters.
pub const MAX_MEMO_CHARACTERS: usize = 100;

/// Maximum total signature weight of a transaction.
pub const TX_SIG_LIMIT: usize = 7;

/// Validate a transaction before broadcast.
pub fn validate_tx(tx: &StdTx) -> Result<(), ValidationError> {
    if tx.fee.amount.is_any_negative() {
        return Err(ValidationError::NegativeFee(tx.fee.amount.to_string()));
    }

    let signatures = &tx.signatures;
    if signatures.is_empty() {
        return Err(ValidationError::NoSigners);
    }

    let signers = tx.signers();
    if signatures.len() != signers.len() {
        return Err(ValidationError::WrongSignerCount {
            expected: signers.len(),
            got: signatures.len(),
        });
    }

    let memo_len = tx.memo.chars().count();
    if memo_len > MAX_MEMO_CHARACTERS {
        return Err(ValidationError::MemoTooLong {
            max: MAX_MEMO_CHARACTERS,
            got: memo_len,
        });
    }

    let weight = signature_weight(signatures);
    if weight > TX_SIG_LIMIT {
        return Err(ValidationError::TooManySignatures {
            count: weight,
            limit: TX_SIG_LIMIT,
        });
    }

    Ok(())
}

/// Sum of leaf keys across all signatures. A placeholder without a key
/// weighs 1.
pub fn signature_weight(signatures: &[StdSignature]) -> usize {
    signatures
        .iter()
        .map(|sig| sig.pub_key.as_ref().map_or(1, PubKey::leaf_count))
        .sum()
}
