//! Posting-key handling and digest signing.
//!
//! # Security
//! - The posting key is loaded ONLY from environment variables
//! - Key material is never logged or serialized
//! - `Debug` output redacts the key

use secp256k1::ecdsa::RecoverableSignature;
use secp256k1::{Message, Secp256k1, SecretKey, SignOnly};
use sha2::{Digest, Sha256};

use crate::blockchain::types::{BlockchainError, BlockchainResult};

/// Environment variable holding the account name.
pub const ACCOUNT_NAME_ENV_VAR: &str = "STEEMIT_ACCOUNT_NAME";

/// Environment variable holding the WIF-encoded posting key.
pub const POSTING_KEY_ENV_VAR: &str = "STEEMIT_POSTING_KEY";

/// WIF version byte for graphene private keys.
const WIF_VERSION: u8 = 0x80;

/// A recoverable signature in the steem wire format: one recovery byte
/// (`31 + recovery_id`) followed by the 64-byte compact signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 65]);

impl Signature {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Account credentials: name plus posting key, with signing primitives.
#[derive(Clone)]
pub struct Wallet {
    account_name: String,
    secret: SecretKey,
    secp: Secp256k1<SignOnly>,
}

impl Wallet {
    /// Create a wallet from an account name and a WIF-encoded posting key.
    ///
    /// The WIF payload is base58 with a version byte and a 4-byte
    /// double-SHA256 checksum, both of which are verified.
    pub fn from_wif(account_name: &str, wif: &str) -> BlockchainResult<Self> {
        let data = bs58::decode(wif)
            .into_vec()
            .map_err(|e| BlockchainError::Wallet(format!("Invalid key encoding: {}", e)))?;

        if data.len() != 37 {
            return Err(BlockchainError::Wallet(
                "Invalid key length".to_string(),
            ));
        }
        if data[0] != WIF_VERSION {
            return Err(BlockchainError::Wallet(
                "Invalid key version byte".to_string(),
            ));
        }

        let checksum = Sha256::digest(Sha256::digest(&data[..33]));
        if checksum[..4] != data[33..] {
            return Err(BlockchainError::Wallet(
                "Key checksum mismatch".to_string(),
            ));
        }

        let secret = SecretKey::from_slice(&data[1..33])
            .map_err(|e| BlockchainError::Wallet(format!("Invalid key material: {}", e)))?;

        tracing::info!(account = %account_name, "Wallet initialized");

        Ok(Self {
            account_name: account_name.to_string(),
            secret,
            secp: Secp256k1::signing_only(),
        })
    }

    /// Load credentials from the environment.
    ///
    /// Reads `STEEMIT_ACCOUNT_NAME` and `STEEMIT_POSTING_KEY`.
    pub fn from_env() -> BlockchainResult<Self> {
        let account = std::env::var(ACCOUNT_NAME_ENV_VAR).map_err(|_| {
            BlockchainError::Wallet(format!("Environment variable {} not set", ACCOUNT_NAME_ENV_VAR))
        })?;
        let wif = std::env::var(POSTING_KEY_ENV_VAR).map_err(|_| {
            BlockchainError::Wallet(format!("Environment variable {} not set", POSTING_KEY_ENV_VAR))
        })?;

        Self::from_wif(&account, &wif)
    }

    /// The account this wallet signs for.
    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    /// Sign a 32-byte digest, producing a canonical recoverable signature.
    ///
    /// Steem nodes only accept canonical signatures; re-sign with fresh
    /// nonce data until the compact form passes the canonical test.
    pub fn sign_digest(&self, digest: [u8; 32]) -> BlockchainResult<Signature> {
        let message = Message::from_digest(digest);

        for attempt in 0u32..=255 {
            let sig = if attempt == 0 {
                self.secp.sign_ecdsa_recoverable(&message, &self.secret)
            } else {
                let mut noncedata = [0u8; 32];
                noncedata[..4].copy_from_slice(&attempt.to_le_bytes());
                self.secp
                    .sign_ecdsa_recoverable_with_noncedata(&message, &self.secret, &noncedata)
            };

            let (recovery_id, compact) = sig.serialize_compact();
            if is_canonical(&compact) {
                return Ok(encode_signature(recovery_id.to_i32(), &compact));
            }
        }

        Err(BlockchainError::Wallet(
            "Unable to produce a canonical signature".to_string(),
        ))
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("account_name", &self.account_name)
            .field("posting_key", &"<redacted>")
            .finish()
    }
}

fn encode_signature(recovery_id: i32, compact: &[u8; 64]) -> Signature {
    let mut bytes = [0u8; 65];
    bytes[0] = 31 + recovery_id as u8;
    bytes[1..].copy_from_slice(compact);
    Signature(bytes)
}

/// Canonical test on the 64-byte compact form, as enforced by steemd.
fn is_canonical(sig: &[u8; 64]) -> bool {
    (sig[0] & 0x80) == 0
        && !(sig[0] == 0 && (sig[1] & 0x80) == 0)
        && (sig[32] & 0x80) == 0
        && !(sig[32] == 0 && (sig[33] & 0x80) == 0)
}
