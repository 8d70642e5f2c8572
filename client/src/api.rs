use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use simchain_common::{Balances, ChainResponse, Transaction, TransactionRequest};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Node rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Deserialize)]
pub struct SubmitReply {
    pub message: String,
    pub block_index: u64,
}

#[derive(Debug, Deserialize)]
pub struct WalletReply {
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct BalanceReply {
    pub address: String,
    pub balances: Balances,
    pub token_name: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterReply {
    pub message: String,
    #[serde(default)]
    pub added: Vec<String>,
    #[serde(default)]
    pub rejected: Vec<String>,
    pub total_nodes: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct PeersReply {
    pub nodes: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveReply {
    pub message: String,
    pub replaced: bool,
}

#[derive(Debug, Deserialize)]
pub struct PendingReply {
    pub transactions: Vec<Transaction>,
}

/// Thin wrapper over a node's JSON API
#[derive(Debug, Clone)]
pub struct NodeClient {
    base: String,
    http: Client,
}

impl NodeClient {
    pub fn new(node: &str) -> Self {
        let base = if node.contains("://") {
            node.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", node.trim_end_matches('/'))
        };
        Self {
            base,
            http: Client::new(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub async fn create_wallet(&self) -> ClientResult<String> {
        let reply: WalletReply = self.post("/wallet/new", &json!({})).await?;
        Ok(reply.address)
    }

    pub async fn create_transaction(&self, request: &TransactionRequest) -> ClientResult<SubmitReply> {
        self.post("/transactions/new", request).await
    }

    pub async fn get_balance(&self, address: &str) -> ClientResult<BalanceReply> {
        self.get(&format!("/balance/{address}")).await
    }

    pub async fn get_chain(&self) -> ClientResult<ChainResponse> {
        self.get("/chain").await
    }

    pub async fn pending(&self) -> ClientResult<PendingReply> {
        self.get("/transactions/pending").await
    }

    pub async fn register_nodes(&self, nodes: &[String]) -> ClientResult<RegisterReply> {
        self.post("/nodes/register", &json!({ "nodes": nodes })).await
    }

    pub async fn peers(&self) -> ClientResult<PeersReply> {
        self.get("/nodes/get").await
    }

    pub async fn resolve(&self) -> ClientResult<ResolveReply> {
        self.get("/resolve").await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let url = format!("{}{}", self.base, path);
        debug!(url = %url, "GET");
        let response = self.http.get(&url).send().await?;
        Self::decode(response).await
    }

    async fn post<B: serde::Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let url = format!("{}{}", self.base, path);
        debug!(url = %url, "POST");
        let response = self.http.post(&url).json(body).send().await?;
        Self::decode(response).await
    }

    /// Decode a success body, or surface the node's `message` on failure
    async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        if !status.is_success() {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Node returned {status}"));
            return Err(ClientError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_value(body).map_err(|e| ClientError::Decode(e.to_string()))
    }
}
