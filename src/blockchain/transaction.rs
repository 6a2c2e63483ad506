//! Transaction assembly, serialization, and signing.
//!
//! # Responsibilities
//! - Reference the chain head (TaPoS fields) from dynamic global properties
//! - Serialize operations in the graphene binary form
//! - Compute the chain-id-prefixed signing digest
//! - Produce the signed-transaction JSON for synchronous broadcast

use chrono::{Duration, NaiveDateTime};
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::blockchain::types::{
    BlockchainError, BlockchainResult, DynamicGlobalProperties, Operation,
};
use crate::blockchain::wallet::Wallet;

/// Time format used on the condenser wire.
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// How long past the chain head a transaction stays valid.
const EXPIRATION_SECS: i64 = 60;

/// An unsigned transaction referencing the current chain head.
#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    #[serde(serialize_with = "serialize_time")]
    pub expiration: NaiveDateTime,
    pub operations: Vec<Operation>,
    pub extensions: Vec<serde_json::Value>,
}

/// A transaction carrying its signatures, ready for broadcast.
#[derive(Debug, Clone, Serialize)]
pub struct SignedTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub signatures: Vec<String>,
}

impl Transaction {
    /// Assemble an unsigned transaction against the given chain head.
    pub fn prepare(
        props: &DynamicGlobalProperties,
        operations: Vec<Operation>,
    ) -> BlockchainResult<Self> {
        let block_id = hex::decode(&props.head_block_id).map_err(|e| {
            BlockchainError::Malformed(format!("invalid head_block_id: {}", e))
        })?;
        if block_id.len() < 8 {
            return Err(BlockchainError::Malformed(
                "head_block_id shorter than 8 bytes".to_string(),
            ));
        }

        let head_time = NaiveDateTime::parse_from_str(&props.time, TIME_FORMAT)
            .map_err(|e| BlockchainError::Malformed(format!("invalid head time: {}", e)))?;

        let mut prefix = [0u8; 4];
        prefix.copy_from_slice(&block_id[4..8]);

        Ok(Self {
            ref_block_num: (props.head_block_number & 0xffff) as u16,
            ref_block_prefix: u32::from_le_bytes(prefix),
            expiration: head_time + Duration::seconds(EXPIRATION_SECS),
            operations,
            extensions: Vec::new(),
        })
    }

    /// The digest signed for this transaction: SHA256(chain_id ∥ tx).
    pub fn signing_digest(&self, chain_id: &[u8; 32]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(chain_id);
        hasher.update(self.to_bytes());
        hasher.finalize().into()
    }

    /// Sign with the wallet's posting key.
    pub fn sign(self, wallet: &Wallet, chain_id: &[u8; 32]) -> BlockchainResult<SignedTransaction> {
        let signature = wallet.sign_digest(self.signing_digest(chain_id))?;
        Ok(SignedTransaction {
            transaction: self,
            signatures: vec![signature.to_hex()],
        })
    }

    /// Graphene binary serialization of the transaction body.
    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.ref_block_num.to_le_bytes());
        buf.extend_from_slice(&self.ref_block_prefix.to_le_bytes());
        buf.extend_from_slice(&(self.expiration.and_utc().timestamp() as u32).to_le_bytes());
        write_varint(&mut buf, self.operations.len() as u64);
        for op in &self.operations {
            write_operation(&mut buf, op);
        }
        write_varint(&mut buf, self.extensions.len() as u64);
        buf
    }
}

fn serialize_time<S: Serializer>(time: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&time.format(TIME_FORMAT).to_string())
}

/// Unsigned LEB128.
fn write_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

fn write_string(buf: &mut Vec<u8>, value: &str) {
    write_varint(buf, value.len() as u64);
    buf.extend_from_slice(value.as_bytes());
}

fn write_operation(buf: &mut Vec<u8>, op: &Operation) {
    write_varint(buf, op.wire_id());
    match op {
        Operation::Comment(comment) => {
            write_string(buf, &comment.parent_author);
            write_string(buf, &comment.parent_permlink);
            write_string(buf, &comment.author);
            write_string(buf, &comment.permlink);
            write_string(buf, &comment.title);
            write_string(buf, &comment.body);
            write_string(buf, &comment.json_metadata);
        }
        Operation::ClaimRewardBalance(claim) => {
            write_string(buf, &claim.account);
            claim.reward_steem.write_bytes(buf);
            claim.reward_sbd.write_bytes(buf);
            claim.reward_vests.write_bytes(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::types::CommentOperation;

    fn test_props() -> DynamicGlobalProperties {
        DynamicGlobalProperties {
            head_block_number: 0x00A1_0042,
            head_block_id: "0000000001020304aabbccddeeff00112233445566778899aabbccdd".to_string(),
            time: "2024-05-01T12:00:00".to_string(),
        }
    }

    fn test_comment() -> Operation {
        Operation::Comment(CommentOperation {
            parent_author: String::new(),
            parent_permlink: "intro".to_string(),
            author: "alice".to_string(),
            permlink: "hello-world".to_string(),
            title: "Hello World".to_string(),
            body: "body text".to_string(),
            json_metadata: r#"{"tags":["intro","test"],"app":"steemit-agent/0.1.0"}"#.to_string(),
        })
    }

    #[test]
    fn test_tapos_fields() {
        let tx = Transaction::prepare(&test_props(), vec![test_comment()]).unwrap();
        assert_eq!(tx.ref_block_num, 0x0042);
        // Bytes 4..8 of the block id, little-endian
        assert_eq!(tx.ref_block_prefix, 0x04030201);
        assert_eq!(
            tx.expiration.format(TIME_FORMAT).to_string(),
            "2024-05-01T12:01:00"
        );
    }

    #[test]
    fn test_rejects_short_block_id() {
        let mut props = test_props();
        props.head_block_id = "00112233".to_string();
        assert!(Transaction::prepare(&props, vec![test_comment()]).is_err());
    }

    #[test]
    fn test_rejects_bad_head_time() {
        let mut props = test_props();
        props.time = "yesterday".to_string();
        assert!(Transaction::prepare(&props, vec![test_comment()]).is_err());
    }

    #[test]
    fn test_varint_encoding() {
        let cases: [(u64, &[u8]); 4] = [
            (0, &[0x00]),
            (127, &[0x7f]),
            (128, &[0x80, 0x01]),
            (300, &[0xac, 0x02]),
        ];
        for (value, expected) in cases {
            let mut buf = Vec::new();
            write_varint(&mut buf, value);
            assert_eq!(buf, expected, "varint({})", value);
        }
    }

    #[test]
    fn test_digest_deterministic_and_content_addressed() {
        let chain_id = [0u8; 32];
        let tx = Transaction::prepare(&test_props(), vec![test_comment()]).unwrap();
        assert_eq!(tx.signing_digest(&chain_id), tx.signing_digest(&chain_id));

        let mut other = tx.clone();
        if let Operation::Comment(ref mut comment) = other.operations[0] {
            comment.title.push('!');
        }
        assert_ne!(tx.signing_digest(&chain_id), other.signing_digest(&chain_id));

        let mut other_chain = [0u8; 32];
        other_chain[0] = 1;
        assert_ne!(tx.signing_digest(&chain_id), tx.signing_digest(&other_chain));
    }

    #[test]
    fn test_signed_transaction_json() {
        let chain_id = [0u8; 32];
        let wallet = Wallet::from_wif(
            "alice",
            "5HueCGU8rMjxEXxiPuD5BDku4MkFqeZyd4dZ1jvhTVqvbTLvyTJ",
        )
        .unwrap();
        let tx = Transaction::prepare(&test_props(), vec![test_comment()]).unwrap();
        let signed = tx.sign(&wallet, &chain_id).unwrap();

        let json = serde_json::to_value(&signed).unwrap();
        assert_eq!(json["ref_block_num"], 0x0042);
        assert_eq!(json["expiration"], "2024-05-01T12:01:00");
        assert_eq!(json["operations"][0][0], "comment");
        assert_eq!(json["extensions"], serde_json::json!([]));
        assert_eq!(json["signatures"].as_array().unwrap().len(), 1);
        assert_eq!(json["signatures"][0].as_str().unwrap().len(), 130);
    }
}
