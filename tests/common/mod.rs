//! Shared utilities for integration testing: a scripted client boundary
//! and a mock image-host HTTP backend.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use steemit_agent::blockchain::client::SteemApi;
use steemit_agent::blockchain::types::{
    Account, BlockchainError, BlockchainResult, BroadcastResult, Discussion, DiscussionSort,
    DynamicGlobalProperties, Operation,
};
use steemit_agent::blockchain::Wallet;

/// Well-known uncompressed WIF test vector; publicly known, worthless.
pub const TEST_WIF: &str = "5HueCGU8rMjxEXxiPuD5BDku4MkFqeZyd4dZ1jvhTVqvbTLvyTJ";

pub fn test_wallet() -> Wallet {
    Wallet::from_wif("alice", TEST_WIF).expect("test wallet")
}

/// Scripted implementation of the client boundary.
///
/// Reads are served from in-memory fixtures; broadcasts are recorded so
/// tests can assert on what would have hit the chain.
#[derive(Default)]
pub struct MockApi {
    pub content: HashMap<(String, String), Discussion>,
    pub discussions: Vec<Discussion>,
    pub accounts: Vec<Account>,
    pub broadcasts: Arc<Mutex<Vec<Vec<Operation>>>>,
    /// When set, broadcasts fail with this remote message.
    pub broadcast_failure: Option<String>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(mut self, post: Discussion) -> Self {
        self.content
            .insert((post.author.clone(), post.permlink.clone()), post);
        self
    }

    pub fn with_discussions(mut self, posts: Vec<Discussion>) -> Self {
        self.discussions = posts;
        self
    }

    pub fn with_account(mut self, account: Account) -> Self {
        self.accounts.push(account);
        self
    }
}

impl SteemApi for MockApi {
    async fn get_content(&self, author: &str, permlink: &str) -> BlockchainResult<Discussion> {
        self.content
            .get(&(author.to_string(), permlink.to_string()))
            .cloned()
            .ok_or_else(|| BlockchainError::Remote("post not found".to_string()))
    }

    async fn get_discussions(
        &self,
        _sort: DiscussionSort,
        _tag: &str,
        limit: u32,
    ) -> BlockchainResult<Vec<Discussion>> {
        Ok(self
            .discussions
            .iter()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn get_accounts(&self, names: &[String]) -> BlockchainResult<Vec<Account>> {
        Ok(self
            .accounts
            .iter()
            .filter(|a| names.contains(&a.name))
            .cloned()
            .collect())
    }

    async fn get_dynamic_global_properties(&self) -> BlockchainResult<DynamicGlobalProperties> {
        Ok(DynamicGlobalProperties {
            head_block_number: 0x0042,
            head_block_id: "0000000001020304aabbccddeeff00112233445566778899".to_string(),
            time: "2024-05-01T12:00:00".to_string(),
        })
    }

    async fn broadcast(
        &self,
        operations: Vec<Operation>,
        _wallet: &Wallet,
    ) -> BlockchainResult<BroadcastResult> {
        if let Some(message) = &self.broadcast_failure {
            return Err(BlockchainError::Remote(message.clone()));
        }
        self.broadcasts.lock().unwrap().push(operations);
        Ok(BroadcastResult {
            id: "deadbeef01".to_string(),
            block_num: Some(4242),
        })
    }
}

/// Build an account fixture with the given reward balances.
pub fn account_fixture(name: &str, steem: &str, sbd: &str, vests: &str) -> Account {
    serde_json::from_value(serde_json::json!({
        "name": name,
        "created": "2020-01-01T00:00:00",
        "reputation": "123456789",
        "balance": "10.000 STEEM",
        "sbd_balance": "5.000 SBD",
        "vesting_shares": "1000.000000 VESTS",
        "post_count": 42,
        "json_metadata": "{\"profile\":{}}",
        "memo_key": "STM1111111111111111111111111111111114T1Anm",
        "reward_steem_balance": steem,
        "reward_sbd_balance": sbd,
        "reward_vesting_balance": vests,
        "reward_vesting_steem": "0.000 STEEM"
    }))
    .expect("account fixture")
}

/// Start a mock image host that answers every request with a fixed status
/// and body. Returns the bound address.
pub async fn start_image_host(status: &'static str, body: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        // Drain the request (headers + content-length body)
                        // before answering, or the client may see a reset.
                        let mut buf = Vec::new();
                        let mut chunk = [0u8; 4096];
                        loop {
                            match socket.read(&mut chunk).await {
                                Ok(0) => break,
                                Ok(n) => {
                                    buf.extend_from_slice(&chunk[..n]);
                                    if request_complete(&buf) {
                                        break;
                                    }
                                }
                                Err(_) => break,
                            }
                        }

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

fn request_complete(buf: &[u8]) -> bool {
    let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
        return false;
    };
    let headers = String::from_utf8_lossy(&buf[..header_end]);
    let content_length = headers
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);
    buf.len() >= header_end + 4 + content_length
}
