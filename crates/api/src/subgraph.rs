//! Subgraph client for protocol account discovery.
//!
//! The protocol indexes two account collections (`makers` and `traders`),
//! ordered by id. The client walks both to exhaustion with cursor pagination
//! and merges them into the deduplicated account universe for a run.

use alloy::primitives::Address;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Hard page-size cap enforced by the subgraph backend.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Account category indexed by the subgraph.
///
/// Each category is a separate ordered collection; a single account id may
/// appear in both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountCategory {
    /// Liquidity-providing accounts.
    Maker,
    /// Position-taking accounts.
    Trader,
}

impl AccountCategory {
    /// Subgraph entity name for this category.
    pub fn entity(&self) -> &'static str {
        match self {
            Self::Maker => "makers",
            Self::Trader => "traders",
        }
    }

    /// Build the query for one page of this category.
    ///
    /// Requests ids strictly greater than `cursor`, ascending, so consecutive
    /// pages never overlap.
    pub fn query(&self, page_size: usize, cursor: &str) -> String {
        format!(
            "{{\n    {}(first: {}, where: {{id_gt: \"{}\"}}) {{\n        id\n    }}\n}}",
            self.entity(),
            page_size,
            cursor,
        )
    }

    /// Pull this category's item list out of a response envelope.
    fn extract(&self, response: &GraphResponse) -> Option<Vec<GraphAccount>> {
        let data = response.data.as_ref()?;
        match self {
            Self::Maker => data.makers.clone(),
            Self::Trader => data.traders.clone(),
        }
    }
}

impl fmt::Display for AccountCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entity())
    }
}

/// One account entry as returned by the subgraph.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphAccount {
    /// Account address, lower-case hex.
    pub id: String,
}

/// GraphQL response envelope: a data payload, an error list, or both.
#[derive(Debug, Deserialize)]
pub struct GraphResponse {
    #[serde(default)]
    pub data: Option<GraphData>,
    #[serde(default)]
    pub errors: Option<Vec<GraphError>>,
}

/// Data payload carrying whichever collection was selected.
#[derive(Debug, Default, Deserialize)]
pub struct GraphData {
    #[serde(default)]
    makers: Option<Vec<GraphAccount>>,
    #[serde(default)]
    traders: Option<Vec<GraphAccount>>,
}

/// Single GraphQL error entry.
#[derive(Debug, Deserialize)]
pub struct GraphError {
    #[serde(default)]
    pub message: String,
}

/// Transport executing one GraphQL query against the indexing service.
#[async_trait]
pub trait GraphTransport: Send + Sync {
    /// Execute a query and return the decoded envelope.
    ///
    /// An `Err` is a transport failure (network, non-JSON body). A response
    /// carrying an `errors` payload is returned as `Ok` and handled by the
    /// pagination loop.
    async fn execute(&self, query: &str) -> Result<GraphResponse>;
}

/// HTTP transport POSTing `{"query": ...}` bodies.
#[derive(Debug, Clone)]
pub struct HttpGraphTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpGraphTransport {
    /// Create a transport for the given endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Create a transport with a per-request timeout.
    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl GraphTransport for HttpGraphTransport {
    async fn execute(&self, query: &str) -> Result<GraphResponse> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await
            .context("subgraph request failed")?;

        response
            .json::<GraphResponse>()
            .await
            .context("subgraph response was not valid JSON")
    }
}

/// Subgraph client walking paginated collections to exhaustion.
#[derive(Debug, Clone)]
pub struct SubgraphClient<T = HttpGraphTransport> {
    transport: T,
    page_size: usize,
}

impl SubgraphClient<HttpGraphTransport> {
    /// Create a client for the given endpoint with the default page size.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_transport(HttpGraphTransport::new(endpoint))
    }
}

impl<T: GraphTransport> SubgraphClient<T> {
    /// Create a client over a custom transport.
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            page_size: MAX_PAGE_SIZE,
        }
    }

    /// Override the page size. Clamped to the backend cap.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// Fetch every item of one paginated collection.
    ///
    /// `build_query` produces the query for a page (page size, exclusive id
    /// lower bound); `extract` pulls the item list out of the envelope. An
    /// empty page ends pagination. A page carrying an error payload ends
    /// pagination early with the items collected so far: the cursor has only
    /// moved past ids already returned, so resuming from it cannot repeat
    /// them.
    pub async fn fetch_all<B, X>(&self, build_query: B, extract: X) -> Result<Vec<GraphAccount>>
    where
        B: Fn(usize, &str) -> String + Send + Sync,
        X: Fn(&GraphResponse) -> Option<Vec<GraphAccount>> + Send + Sync,
    {
        let mut results: Vec<GraphAccount> = Vec::new();
        let mut cursor = String::new();

        loop {
            let query = build_query(self.page_size, &cursor);
            let response = self.transport.execute(&query).await?;

            if let Some(errors) = &response.errors {
                let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
                warn!(
                    errors = ?messages,
                    fetched = results.len(),
                    "Subgraph returned an error payload, stopping pagination"
                );
                break;
            }

            let batch = extract(&response).unwrap_or_default();
            if batch.is_empty() {
                break;
            }

            if let Some(last) = batch.last() {
                cursor = last.id.clone();
            }
            debug!(page_len = batch.len(), cursor = %cursor, "Fetched subgraph page");
            results.extend(batch);
        }

        Ok(results)
    }

    /// Fetch all account ids in one category.
    #[instrument(skip(self))]
    pub async fn fetch_accounts(&self, category: AccountCategory) -> Result<Vec<String>> {
        let accounts = self
            .fetch_all(
                |page_size, cursor| category.query(page_size, cursor),
                |response| category.extract(response),
            )
            .await?;

        debug!(category = %category, count = accounts.len(), "Fetched account ids");
        Ok(accounts.into_iter().map(|account| account.id).collect())
    }

    /// Enumerate every account known to the protocol.
    ///
    /// Both categories are fetched concurrently; a transport failure in
    /// either discards the whole attempt, so a partial universe is never
    /// returned. Ids present in both categories appear once, in first-seen
    /// order. Ids that do not parse as addresses are logged and skipped.
    #[instrument(skip(self))]
    pub async fn list_all_accounts(&self) -> Result<Vec<Address>> {
        let (makers, traders) = tokio::try_join!(
            self.fetch_accounts(AccountCategory::Maker),
            self.fetch_accounts(AccountCategory::Trader),
        )?;

        let maker_count = makers.len();
        let trader_count = traders.len();

        let mut seen = HashSet::new();
        let mut accounts = Vec::with_capacity(maker_count + trader_count);
        for id in makers.into_iter().chain(traders) {
            if !seen.insert(id.clone()) {
                continue;
            }
            match id.parse::<Address>() {
                Ok(address) => accounts.push(address),
                Err(err) => warn!(id = %id, error = %err, "Skipping unparseable account id"),
            }
        }

        info!(
            makers = maker_count,
            traders = trader_count,
            unique = accounts.len(),
            "Enumerated protocol accounts"
        );
        Ok(accounts)
    }
}

/// Source of the full protocol account set.
///
/// Seam between enumeration and the run controller: retry policy and
/// orchestration do not care where accounts come from.
#[async_trait]
pub trait AccountSource: Send + Sync {
    /// Enumerate every account, failing as a unit on transport errors.
    async fn list_all_accounts(&self) -> Result<Vec<Address>>;
}

#[async_trait]
impl<T: GraphTransport> AccountSource for SubgraphClient<T> {
    async fn list_all_accounts(&self) -> Result<Vec<Address>> {
        SubgraphClient::list_all_accounts(self).await
    }
}
