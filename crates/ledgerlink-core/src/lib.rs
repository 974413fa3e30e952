//! # Ledgerlink Core
//!
//! Pure primitives for the Ledgerlink client: canonical sign bytes,
//! operations, transactions and their validity checks.
//!
//! This crate contains no I/O and no networking. It is pure computation over
//! the ledger's wire data structures.
//!
//! ## Key Types
//!
//! - [`Msg`] - An opaque signable operation
//! - [`Codec`] - Explicit registry of operation wire names
//! - [`StdTx`] - A signed transaction ready for broadcast
//! - [`PubKey`] - Plain or threshold-multisig public key
//! - [`Signer`] - External signing capability
//!
//! ## Canonicalization
//!
//! Sign bytes are sorted, compact JSON. See [`canonical`] module.

pub mod canonical;
pub mod codec;
pub mod crypto;
pub mod error;
pub mod msg;
pub mod tx;
pub mod types;
pub mod validation;

pub use canonical::{canonical_json, sort_json};
pub use codec::Codec;
pub use crypto::{Ed25519PublicKey, Keypair, PubKey, Signer, ThresholdPubKey};
pub use error::{CoreError, Result, ValidationError};
pub use msg::{Msg, RawMsg};
pub use tx::{build_sign_bytes, collect_signers, StdFee, StdSignature, StdTx, TxEnvelope};
pub use types::{AccAddress, Coin, Coins};
pub use validation::{validate_tx, MAX_MEMO_CHARACTERS, TX_SIG_LIMIT};
