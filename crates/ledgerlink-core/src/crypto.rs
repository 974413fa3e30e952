//! Public keys and the signer capability.
//!
//! Key material is never generated or stored by the client pipeline itself;
//! it only talks to a [`Signer`]. [`Keypair`] is the in-process ed25519
//! implementation used by tests and simple deployments.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::canonical::canonical_json;
use crate::error::CoreError;
use crate::types::{as_string, AccAddress, ADDRESS_LEN};

/// A 32-byte Ed25519 public key.
///
/// Serialized as a base64 string.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ed25519PublicKey(pub [u8; 32]);

impl Ed25519PublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Verify a signature over a message.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), CoreError> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| CoreError::InvalidPublicKey)?;

        let sig = Signature::from_slice(signature).map_err(|_| CoreError::InvalidSignature)?;

        verifying_key
            .verify(message, &sig)
            .map_err(|_| CoreError::InvalidSignature)
    }
}

impl fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Pub({})", &self.to_hex()[..16])
    }
}

impl Serialize for Ed25519PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(self.0))
    }
}

impl<'de> Deserialize<'de> for Ed25519PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = BASE64.decode(&s).map_err(serde::de::Error::custom)?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| serde::de::Error::custom("ed25519 public key must be 32 bytes"))?;
        Ok(Self(arr))
    }
}

/// A public key as it appears in a transaction signature.
///
/// A threshold multisig key is recursive: its constituents may themselves
/// be multisig keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum PubKey {
    #[serde(rename = "tendermint/PubKeyEd25519")]
    Ed25519(Ed25519PublicKey),

    #[serde(rename = "tendermint/PubKeyMultisigThreshold")]
    MultisigThreshold(ThresholdPubKey),
}

/// The body of a threshold multisig key: `threshold` of `pubkeys` must sign.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThresholdPubKey {
    #[serde(with = "as_string")]
    pub threshold: u64,
    pub pubkeys: Vec<PubKey>,
}

impl PubKey {
    /// Build a threshold multisig key.
    pub fn multisig(threshold: u64, pubkeys: Vec<PubKey>) -> Self {
        PubKey::MultisigThreshold(ThresholdPubKey { threshold, pubkeys })
    }

    /// Number of leaf keys, expanding nested multisig keys fully.
    ///
    /// This is the weight a key contributes to a transaction's signature
    /// count.
    pub fn leaf_count(&self) -> usize {
        match self {
            PubKey::Ed25519(_) => 1,
            PubKey::MultisigThreshold(inner) => inner.pubkeys.iter().map(PubKey::leaf_count).sum(),
        }
    }

    /// Derive the account address controlled by this key.
    pub fn address(&self) -> AccAddress {
        let digest = match self {
            PubKey::Ed25519(pk) => blake3::hash(pk.as_bytes()),
            PubKey::MultisigThreshold(_) => blake3::hash(&canonical_json(self)),
        };
        let mut arr = [0u8; ADDRESS_LEN];
        arr.copy_from_slice(&digest.as_bytes()[..ADDRESS_LEN]);
        AccAddress(arr)
    }
}

impl From<Ed25519PublicKey> for PubKey {
    fn from(pk: Ed25519PublicKey) -> Self {
        PubKey::Ed25519(pk)
    }
}

/// The external signer capability.
///
/// Supplies a public key and signs canonical sign bytes.
pub trait Signer: Send + Sync {
    /// The public key whose signatures this signer produces.
    fn pub_key(&self) -> PubKey;

    /// The account address of this signer.
    fn address(&self) -> AccAddress {
        self.pub_key().address()
    }

    /// Sign a message.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CoreError>;
}

/// An ed25519 keypair.
///
/// This wraps ed25519-dalek's SigningKey.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let signing_key = SigningKey::generate(&mut rng);
        Self { signing_key }
    }

    /// Create from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        Self { signing_key }
    }

    /// Get the raw public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }
}

impl Signer for Keypair {
    fn pub_key(&self) -> PubKey {
        PubKey::Ed25519(self.public_key())
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CoreError> {
        Ok(self.signing_key.sign(message).to_bytes().to_vec())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({:?})", self.public_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(seed: u8) -> PubKey {
        Keypair::from_seed(&[seed; 32]).pub_key()
    }

    #[test]
    fn test_keypair_sign_verify() {
        let keypair = Keypair::generate();
        let message = b"hello world";
        let signature = keypair.sign(message).unwrap();

        keypair
            .public_key()
            .verify(message, &signature)
            .expect("valid signature should verify");

        assert!(keypair.public_key().verify(b"hello worlD", &signature).is_err());
    }

    #[test]
    fn test_keypair_deterministic_from_seed() {
        let kp1 = Keypair::from_seed(&[0x42; 32]);
        let kp2 = Keypair::from_seed(&[0x42; 32]);
        assert_eq!(kp1.public_key(), kp2.public_key());
        assert_eq!(Signer::address(&kp1), Signer::address(&kp2));
    }

    #[test]
    fn test_leaf_count_expands_nested_multisig() {
        let inner = PubKey::multisig(2, vec![leaf(1), leaf(2), leaf(3)]);
        let outer = PubKey::multisig(2, vec![inner, leaf(4), leaf(5)]);
        assert_eq!(leaf(9).leaf_count(), 1);
        assert_eq!(outer.leaf_count(), 5);
    }

    #[test]
    fn test_pubkey_json_shape() {
        let key = Keypair::from_seed(&[0x01; 32]).pub_key();
        let json = serde_json::to_value(&key).unwrap();
        assert_eq!(json["type"], "tendermint/PubKeyEd25519");
        assert!(json["value"].is_string());

        let multisig = PubKey::multisig(1, vec![key.clone()]);
        let json = serde_json::to_value(&multisig).unwrap();
        assert_eq!(json["type"], "tendermint/PubKeyMultisigThreshold");
        assert_eq!(json["value"]["threshold"], "1");

        let decoded: PubKey = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, multisig);
    }

    #[test]
    fn test_multisig_address_differs_from_members() {
        let a = leaf(1);
        let multisig = PubKey::multisig(1, vec![a.clone()]);
        assert_ne!(multisig.address(), a.address());
    }
}
