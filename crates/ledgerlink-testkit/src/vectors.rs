//! Golden sign-doc vectors.
//!
//! Each vector pins the exact canonical bytes a signer signs, so any change
//! in key order, integer rendering, escaping or fee layout is caught.

use std::sync::Arc;

use ledgerlink_core::{build_sign_bytes, AccAddress, Coin, Coins, Msg, StdFee};

use crate::fixtures::{test_codec, TestMsg};

/// A golden sign-doc vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub chain_id: &'static str,
    pub account_number: u64,
    pub sequence: u64,
    /// Fee coins as (amount, denom).
    pub fee_amount: &'static [(i128, &'static str)],
    pub gas: u64,
    /// Texts of the test operations, in order.
    pub msgs: &'static [&'static str],
    pub memo: &'static str,
    /// Expected sign bytes.
    pub expected: &'static str,
}

/// Get all golden vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "single operation",
            chain_id: "ledgerlink-test",
            account_number: 1,
            sequence: 0,
            fee_amount: &[(5000, "stake")],
            gas: 200_000,
            msgs: &["hello"],
            memo: "",
            expected: concat!(
                r#"{"account_number":"1","chain_id":"ledgerlink-test","#,
                r#""fee":{"amount":[{"amount":"5000","denom":"stake"}],"gas":"200000"},"#,
                r#""memo":"","msgs":[{"type":"test/TestMsg","value":{"text":"hello"}}],"#,
                r#""sequence":"0"}"#
            ),
        },
        GoldenVector {
            name: "empty fee and escaped markup",
            chain_id: "c",
            account_number: 42,
            sequence: 7,
            fee_amount: &[],
            gas: 0,
            msgs: &["<a&b>"],
            memo: "x>y",
            expected: concat!(
                r#"{"account_number":"42","chain_id":"c","#,
                r#""fee":{"amount":[],"gas":"0"},"#,
                r#""memo":"x\u003ey","#,
                r#""msgs":[{"type":"test/TestMsg","value":{"text":"\u003ca\u0026b\u003e"}}],"#,
                r#""sequence":"7"}"#
            ),
        },
        GoldenVector {
            name: "operations keep their order",
            chain_id: "ledgerlink-test",
            account_number: 18446744073709551615,
            sequence: 3,
            fee_amount: &[(1, "atom"), (2, "stake")],
            gas: 1,
            msgs: &["b", "a"],
            memo: "memo",
            expected: concat!(
                r#"{"account_number":"18446744073709551615","chain_id":"ledgerlink-test","#,
                r#""fee":{"amount":[{"amount":"1","denom":"atom"},{"amount":"2","denom":"stake"}],"#,
                r#""gas":"1"},"memo":"memo","#,
                r#""msgs":[{"type":"test/TestMsg","value":{"text":"b"}},"#,
                r#"{"type":"test/TestMsg","value":{"text":"a"}}],"#,
                r#""sequence":"3"}"#
            ),
        },
    ]
}

/// Signer of every vector operation. Signers do not appear in sign bytes.
pub fn vector_signer() -> AccAddress {
    AccAddress::from_bytes([0x01; 20])
}

/// Compute the sign bytes of a vector.
pub fn sign_bytes_from_vector(vector: &GoldenVector) -> Vec<u8> {
    let fee = StdFee::new(
        Coins::new(
            vector
                .fee_amount
                .iter()
                .map(|(amount, denom)| Coin::new(*amount, *denom))
                .collect(),
        ),
        vector.gas,
    );
    let msgs: Vec<Arc<dyn Msg>> = vector
        .msgs
        .iter()
        .map(|text| Arc::new(TestMsg::new(vector_signer(), *text)) as Arc<dyn Msg>)
        .collect();

    build_sign_bytes(
        &test_codec(),
        vector.chain_id,
        vector.account_number,
        vector.sequence,
        &fee,
        &msgs,
        vector.memo,
    )
    .unwrap_or_else(|e| panic!("vector {:?} failed to encode: {e}", vector.name))
}

/// Check every vector. Returns the names of the vectors that failed.
pub fn verify_all_vectors() -> Vec<&'static str> {
    all_vectors()
        .iter()
        .filter(|v| sign_bytes_from_vector(v) != v.expected.as_bytes())
        .map(|v| v.name)
        .collect()
}
