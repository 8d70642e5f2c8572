use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use simchain_common::{Block, ChainResponse, ValidationError};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum PeerError {
    #[error("Peer {peer} unreachable: {reason}")]
    Unreachable { peer: String, reason: String },

    #[error("Peer {peer} timed out")]
    Timeout { peer: String },

    #[error("Peer {peer} answered {status}: {message}")]
    Status {
        peer: String,
        status: u16,
        message: String,
    },

    #[error("Invalid response from {peer}: {reason}")]
    InvalidResponse { peer: String, reason: String },

    #[error("HTTP client error: {0}")]
    Client(String),
}

pub type PeerResult<T> = Result<T, PeerError>;

/// Transport used to talk to other nodes. The resolver and the forger only
/// depend on this trait so tests can swap in an in-memory network.
#[async_trait]
pub trait PeerClient: Send + Sync {
    /// Fetch a peer's full chain
    async fn fetch_chain(&self, peer: &str) -> PeerResult<ChainResponse>;

    /// Offer a freshly forged block to a peer
    async fn send_block(&self, peer: &str, block: &Block) -> PeerResult<()>;
}

/// `PeerClient` over the node's JSON HTTP surface
#[derive(Debug, Clone)]
pub struct HttpPeerClient {
    client: Client,
}

impl HttpPeerClient {
    pub fn new(timeout: Duration) -> PeerResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PeerError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    fn map_error(peer: &str, err: reqwest::Error) -> PeerError {
        if err.is_timeout() {
            PeerError::Timeout {
                peer: peer.to_string(),
            }
        } else {
            PeerError::Unreachable {
                peer: peer.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn fetch_chain(&self, peer: &str) -> PeerResult<ChainResponse> {
        let url = peer_url(peer, "/chain");
        debug!(peer = %peer, url = %url, "Fetching peer chain");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Self::map_error(peer, e))?;

        if response.status() != StatusCode::OK {
            return Err(PeerError::Status {
                peer: peer.to_string(),
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        response
            .json::<ChainResponse>()
            .await
            .map_err(|e| PeerError::InvalidResponse {
                peer: peer.to_string(),
                reason: e.to_string(),
            })
    }

    async fn send_block(&self, peer: &str, block: &Block) -> PeerResult<()> {
        let url = peer_url(peer, "/receive_block");
        let response = self
            .client
            .post(&url)
            .json(block)
            .send()
            .await
            .map_err(|e| Self::map_error(peer, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PeerError::Status {
                peer: peer.to_string(),
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

/// Reduce a registration entry to the `host:port` form used as the peer
/// identifier. Accepts full URLs or bare `host:port`.
pub fn normalize_peer_address(raw: &str) -> Result<String, ValidationError> {
    let raw = raw.trim();
    let invalid = || ValidationError::InvalidPeerAddress(raw.to_string());
    if raw.is_empty() {
        return Err(invalid());
    }

    if raw.contains("://") {
        let url = Url::parse(raw).map_err(|_| invalid())?;
        let host = url.host_str().ok_or_else(invalid)?;
        return Ok(match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        });
    }

    let (host, port) = raw.rsplit_once(':').ok_or_else(invalid)?;
    if host.is_empty() || host.contains('/') || port.parse::<u16>().is_err() {
        return Err(invalid());
    }
    Ok(format!("{host}:{port}"))
}

/// Absolute URL for `path` on a peer identified by `host:port`
pub fn peer_url(peer: &str, path: &str) -> String {
    if peer.contains("://") {
        format!("{}{}", peer.trim_end_matches('/'), path)
    } else {
        format!("http://{peer}{path}")
    }
}
