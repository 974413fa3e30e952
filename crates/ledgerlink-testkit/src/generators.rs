//! Proptest generators for property-based testing.

use std::sync::Arc;

use proptest::prelude::*;

use ledgerlink_core::{AccAddress, Coin, Coins, Keypair, Msg, StdFee};

use crate::fixtures::TestMsg;

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random address.
pub fn address() -> impl Strategy<Value = AccAddress> {
    any::<[u8; 20]>().prop_map(AccAddress::from_bytes)
}

/// Generate a lowercase denomination.
pub fn denom() -> impl Strategy<Value = String> {
    "[a-z]{3,8}"
}

/// Generate a non-negative coin.
pub fn coin() -> impl Strategy<Value = Coin> {
    (0i128..=1_000_000_000_000, denom()).prop_map(|(amount, denom)| Coin::new(amount, denom))
}

/// Generate up to `max` non-negative coins.
pub fn coins(max: usize) -> impl Strategy<Value = Coins> {
    prop::collection::vec(coin(), 0..=max).prop_map(Coins::new)
}

/// Generate a fee with non-negative amounts.
pub fn fee() -> impl Strategy<Value = StdFee> {
    (coins(3), any::<u64>()).prop_map(|(amount, gas)| StdFee::new(amount, gas))
}

/// Generate a memo of at most `max_chars` characters, including markup.
pub fn memo(max_chars: usize) -> impl Strategy<Value = String> {
    let ch = prop_oneof![Just('<'), Just('&'), Just('é'), any::<char>()];
    prop::collection::vec(ch, 0..=max_chars).prop_map(|chars| chars.into_iter().collect())
}

/// Generate 1 to `max` test operations, each with one signer.
pub fn msgs(max: usize) -> impl Strategy<Value = Vec<Arc<dyn Msg>>> {
    prop::collection::vec((address(), "[a-z<>&]{1,16}"), 1..=max).prop_map(|items| {
        items
            .into_iter()
            .map(|(signer, text)| Arc::new(TestMsg::new(signer, text)) as Arc<dyn Msg>)
            .collect()
    })
}

/// Inputs of one sign doc.
#[derive(Debug, Clone)]
pub struct SignDocParams {
    pub chain_id: String,
    pub account_number: u64,
    pub sequence: u64,
    pub fee: StdFee,
    pub msgs: Vec<Arc<dyn Msg>>,
    pub memo: String,
}

impl Arbitrary for SignDocParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            "[a-z0-9-]{1,20}",
            any::<u64>(),
            any::<u64>(),
            fee(),
            msgs(4),
            memo(100),
        )
            .prop_map(
                |(chain_id, account_number, sequence, fee, msgs, memo)| SignDocParams {
                    chain_id,
                    account_number,
                    sequence,
                    fee,
                    msgs,
                    memo,
                },
            )
            .boxed()
    }
}
