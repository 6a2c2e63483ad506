//! Operation handlers and the sequential batch runner.
//!
//! Each operation is handled by its own function taking the typed request
//! fields and returning `Result<OperationOutput, AgentError>`. The batch
//! runner processes items one at a time, one remote call in flight, and
//! either aborts on the first failure or captures failures as
//! `{"error": ...}` records, per the caller's [`ErrorPolicy`].

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::time::Duration;

use crate::agent::permlink::{self, PermlinkStrategy};
use crate::agent::types::{
    parse_tags, split_tags, AgentError, AgentResult, ClaimOutcome, ClaimedAmounts, ErrorPolicy,
    OperationOutput, OperationRequest, PostRecord, PostSummary, SearchBy,
};
use crate::agent::upload;
use crate::blockchain::client::SteemApi;
use crate::blockchain::types::{
    Account, Asset, BlockchainError, ClaimRewardBalanceOperation, CommentOperation,
    DiscussionSort, Operation,
};
use crate::blockchain::wallet::Wallet;
use crate::config::AgentConfig;

/// Discussion listings cap the page size server-side.
const MAX_SEARCH_LIMIT: u32 = 100;

/// The publish agent: executes typed operations against the client
/// boundary with the credentials it was constructed with.
pub struct PublishAgent<C> {
    client: C,
    wallet: Wallet,
    http: reqwest::Client,
    app_id: String,
    default_parent_permlink: String,
    permlink_strategy: PermlinkStrategy,
    image_endpoint: String,
}

impl<C: SteemApi> PublishAgent<C> {
    /// Create an agent from a client, credentials, and configuration.
    pub fn new(client: C, wallet: Wallet, config: &AgentConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.image_host.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            wallet,
            http,
            app_id: config.publish.app_id.clone(),
            default_parent_permlink: config.publish.default_parent_permlink.clone(),
            permlink_strategy: config.publish.permlink_strategy,
            image_endpoint: config.image_host.endpoint.clone(),
        }
    }

    /// Execute a batch of items sequentially.
    ///
    /// With [`ErrorPolicy::Abort`], the first failure propagates annotated
    /// with its item index. With [`ErrorPolicy::Continue`], each failure
    /// becomes an `{"error": <message>}` record in the output stream.
    pub async fn execute_all(
        &self,
        requests: Vec<OperationRequest>,
        policy: ErrorPolicy,
    ) -> AgentResult<Vec<serde_json::Value>> {
        let mut results = Vec::with_capacity(requests.len());

        for (index, request) in requests.into_iter().enumerate() {
            match self.execute(request).await {
                Ok(output) => {
                    let value = serde_json::to_value(&output).map_err(|e| {
                        AgentError::Validation(format!("unserializable output: {}", e))
                    })?;
                    results.push(value);
                }
                Err(error) => match policy {
                    ErrorPolicy::Continue => {
                        tracing::warn!(item = index, error = %error, "Item failed, continuing");
                        results.push(serde_json::json!({ "error": error.to_string() }));
                    }
                    ErrorPolicy::Abort => {
                        return Err(AgentError::Item {
                            index,
                            source: Box::new(error),
                        });
                    }
                },
            }
        }

        Ok(results)
    }

    /// Execute a single operation.
    pub async fn execute(&self, request: OperationRequest) -> AgentResult<OperationOutput> {
        match request {
            OperationRequest::Create { title, content, tags } => {
                self.create(title, content, tags).await
            }
            OperationRequest::Update { author, permlink, title, content, tags } => {
                self.update(author, permlink, title, content, tags).await
            }
            OperationRequest::Get { author, permlink } => self.get(author, permlink).await,
            OperationRequest::GetAccount { username } => self.get_account(username).await,
            OperationRequest::Search { search_by, search_term, limit } => {
                self.search(search_by, search_term, limit).await
            }
            OperationRequest::UploadImage { data, file_name } => {
                self.upload_image(data, file_name).await
            }
            OperationRequest::ClaimRewardBalance {
                claim_all_rewards,
                reward_steem,
                reward_sbd,
                reward_vests,
            } => {
                self.claim_reward_balance(claim_all_rewards, reward_steem, reward_sbd, reward_vests)
                    .await
            }
        }
    }

    /// Build the comment operation shared by create and update.
    fn build_comment(
        &self,
        author: String,
        permlink: String,
        title: String,
        content: String,
        tags: &[String],
    ) -> CommentOperation {
        let json_metadata = serde_json::json!({
            "tags": tags,
            "app": self.app_id,
        })
        .to_string();

        CommentOperation {
            parent_author: String::new(),
            parent_permlink: tags
                .first()
                .cloned()
                .unwrap_or_else(|| self.default_parent_permlink.clone()),
            author,
            permlink,
            title,
            body: content,
            json_metadata,
        }
    }

    async fn create(
        &self,
        title: String,
        content: String,
        tags: String,
    ) -> AgentResult<OperationOutput> {
        if title.is_empty() {
            return Err(AgentError::Validation("Title is required".to_string()));
        }

        let tags = split_tags(&tags);
        let permlink = permlink::derive(&title, self.permlink_strategy);
        let comment = self.build_comment(
            self.wallet.account_name().to_string(),
            permlink,
            title,
            content,
            &tags,
        );

        tracing::debug!(
            author = %comment.author,
            permlink = %comment.permlink,
            "Broadcasting post"
        );

        let response = self
            .client
            .broadcast(vec![Operation::Comment(comment.clone())], &self.wallet)
            .await?;

        Ok(OperationOutput::Post(PostRecord {
            id: Some(response.id),
            parent_author: comment.parent_author,
            parent_permlink: comment.parent_permlink,
            author: comment.author,
            permlink: comment.permlink,
            title: comment.title,
            content: comment.body,
            created: None,
            last_update: None,
            tags,
        }))
    }

    async fn update(
        &self,
        author: String,
        permlink: String,
        title: String,
        content: String,
        tags: String,
    ) -> AgentResult<OperationOutput> {
        if author.is_empty() || permlink.is_empty() {
            return Err(AgentError::Validation(
                "Author and permlink are required".to_string(),
            ));
        }

        let tags = split_tags(&tags);
        // Caller-supplied identity, never re-derived
        let comment = self.build_comment(author, permlink, title, content, &tags);

        let response = self
            .client
            .broadcast(vec![Operation::Comment(comment.clone())], &self.wallet)
            .await?;

        Ok(OperationOutput::Post(PostRecord {
            id: Some(response.id),
            parent_author: comment.parent_author,
            parent_permlink: comment.parent_permlink,
            author: comment.author,
            permlink: comment.permlink,
            title: comment.title,
            content: comment.body,
            created: None,
            last_update: None,
            tags,
        }))
    }

    async fn get(&self, author: String, permlink: String) -> AgentResult<OperationOutput> {
        if author.is_empty() || permlink.is_empty() {
            return Err(AgentError::Validation(
                "Author and permlink are required".to_string(),
            ));
        }

        let post = self.client.get_content(&author, &permlink).await?;
        let tags = parse_tags(&post.json_metadata);

        Ok(OperationOutput::Post(PostRecord {
            id: None,
            parent_author: post.parent_author,
            parent_permlink: post.parent_permlink,
            author: post.author,
            permlink: post.permlink,
            title: post.title,
            content: post.body,
            created: Some(post.created),
            last_update: Some(post.last_update),
            tags,
        }))
    }

    async fn search(
        &self,
        search_by: SearchBy,
        search_term: String,
        limit: u32,
    ) -> AgentResult<OperationOutput> {
        if search_term.is_empty() {
            return Err(AgentError::Validation("Search term is required".to_string()));
        }

        let sort = match search_by {
            SearchBy::Tag => DiscussionSort::Trending,
            SearchBy::Author => DiscussionSort::Blog,
        };
        let limit = limit.clamp(1, MAX_SEARCH_LIMIT);

        let posts = self.client.get_discussions(sort, &search_term, limit).await?;
        let posts = posts
            .into_iter()
            .map(|post| {
                let tags = parse_tags(&post.json_metadata);
                PostSummary {
                    parent_author: post.parent_author,
                    parent_permlink: post.parent_permlink,
                    author: post.author,
                    permlink: post.permlink,
                    title: post.title,
                    created: post.created,
                    tags,
                }
            })
            .collect();

        Ok(OperationOutput::Posts { posts })
    }

    async fn get_account(&self, username: Option<String>) -> AgentResult<OperationOutput> {
        let name = username
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| self.wallet.account_name().to_string());

        let account = self.fetch_account(&name).await?;
        Ok(OperationOutput::Account(Box::new(account.into())))
    }

    async fn upload_image(
        &self,
        data: String,
        file_name: Option<String>,
    ) -> AgentResult<OperationOutput> {
        let bytes = BASE64
            .decode(data.as_bytes())
            .map_err(|e| AgentError::Validation(format!("Invalid base64 image data: {}", e)))?;

        let outcome = upload::upload_image(
            &self.http,
            &self.image_endpoint,
            &self.wallet,
            &bytes,
            file_name,
        )
        .await?;

        Ok(OperationOutput::Upload(outcome))
    }

    async fn claim_reward_balance(
        &self,
        claim_all_rewards: bool,
        reward_steem: Option<String>,
        reward_sbd: Option<String>,
        reward_vests: Option<String>,
    ) -> AgentResult<OperationOutput> {
        let account_name = self.wallet.account_name().to_string();
        let account = self.fetch_account(&account_name).await?;

        check_vests_only_rule(&account)?;

        let (steem, sbd, vests) = if claim_all_rewards {
            (
                account.reward_steem_balance.clone(),
                account.reward_sbd_balance.clone(),
                account.reward_vesting_balance.clone(),
            )
        } else {
            (
                parse_amount(reward_steem.as_deref(), "0.000 STEEM")?,
                parse_amount(reward_sbd.as_deref(), "0.000 SBD")?,
                parse_amount(reward_vests.as_deref(), "0.000000 VESTS")?,
            )
        };

        tracing::info!(
            account = %account_name,
            steem = %steem,
            sbd = %sbd,
            vests = %vests,
            "Claiming reward balance"
        );

        let operation = Operation::ClaimRewardBalance(ClaimRewardBalanceOperation {
            account: account_name,
            reward_steem: steem.clone(),
            reward_sbd: sbd.clone(),
            reward_vests: vests.clone(),
        });

        let response = self.client.broadcast(vec![operation], &self.wallet).await?;

        Ok(OperationOutput::Claim(ClaimOutcome {
            success: true,
            transaction_id: response.id,
            block_num: response.block_num,
            claimed: ClaimedAmounts {
                steem,
                sbd,
                vests,
            },
        }))
    }

    async fn fetch_account(&self, name: &str) -> AgentResult<Account> {
        let accounts = self.client.get_accounts(&[name.to_string()]).await?;
        accounts
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Blockchain(BlockchainError::AccountNotFound(name.to_string())))
    }
}

/// VESTS cannot be claimed on their own: reject before any broadcast when
/// the liquid reward balances are zero while vesting rewards are not.
fn check_vests_only_rule(account: &Account) -> AgentResult<()> {
    if account.reward_steem_balance.is_zero()
        && account.reward_sbd_balance.is_zero()
        && !account.reward_vesting_balance.is_zero()
    {
        return Err(AgentError::Domain(
            "Cannot claim VESTS separately. To claim VESTS, you must claim all rewards \
             together. Please enable 'Claim All Available Rewards' or ensure STEEM/SBD \
             rewards are present"
                .to_string(),
        ));
    }
    Ok(())
}

fn parse_amount(value: Option<&str>, default: &str) -> AgentResult<Asset> {
    value
        .unwrap_or(default)
        .parse()
        .map_err(|e: BlockchainError| AgentError::Validation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account_with_rewards(steem: &str, sbd: &str, vests: &str) -> Account {
        Account {
            name: "alice".to_string(),
            created: String::new(),
            reputation: serde_json::Value::Null,
            balance: "0.000 STEEM".parse().unwrap(),
            sbd_balance: "0.000 SBD".parse().unwrap(),
            vesting_shares: "0.000000 VESTS".parse().unwrap(),
            post_count: 0,
            json_metadata: String::new(),
            last_account_update: String::new(),
            last_post: String::new(),
            last_vote_time: String::new(),
            recovery_account: String::new(),
            memo_key: String::new(),
            reward_steem_balance: steem.parse().unwrap(),
            reward_sbd_balance: sbd.parse().unwrap(),
            reward_vesting_balance: vests.parse().unwrap(),
            reward_vesting_steem: "0.000 STEEM".parse().unwrap(),
        }
    }

    #[test]
    fn test_vests_only_rule_rejects() {
        let account = account_with_rewards("0.000 STEEM", "0.000 SBD", "5.000000 VESTS");
        let err = check_vests_only_rule(&account).unwrap_err();
        assert!(err.to_string().contains("Cannot claim VESTS separately"));
    }

    #[test]
    fn test_vests_rule_allows_mixed_rewards() {
        let account = account_with_rewards("1.000 STEEM", "0.000 SBD", "5.000000 VESTS");
        assert!(check_vests_only_rule(&account).is_ok());
    }

    #[test]
    fn test_vests_rule_allows_nothing_pending() {
        let account = account_with_rewards("0.000 STEEM", "0.000 SBD", "0.000000 VESTS");
        assert!(check_vests_only_rule(&account).is_ok());
    }

    #[test]
    fn test_parse_amount_default_and_error() {
        assert_eq!(parse_amount(None, "0.000 SBD").unwrap().to_string(), "0.000 SBD");
        assert_eq!(parse_amount(Some("2.500 SBD"), "0.000 SBD").unwrap().amount(), 2500);
        assert!(matches!(
            parse_amount(Some("junk"), "0.000 SBD"),
            Err(AgentError::Validation(_))
        ));
    }
}
