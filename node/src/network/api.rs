use serde::Deserialize;
use serde_json::json;
use simchain_common::{Block, LedgerError, TransactionRequest, TOKEN_NAME};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info};
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::reply::{Json, WithStatus};
use warp::Filter;

use crate::node::Node;

type ApiReply = WithStatus<Json>;

/// Peers to register, either as a list or a comma separated string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NodeList {
    Many(Vec<String>),
    Joined(String),
}

impl NodeList {
    pub fn into_entries(self) -> Vec<String> {
        match self {
            NodeList::Many(nodes) => nodes,
            NodeList::Joined(joined) => joined
                .split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub nodes: Option<NodeList>,
}

fn json_reply(status: StatusCode, body: serde_json::Value) -> ApiReply {
    warp::reply::with_status(warp::reply::json(&body), status)
}

fn message(status: StatusCode, text: impl Into<String>) -> ApiReply {
    json_reply(status, json!({ "message": text.into() }))
}

/// Every ledger rejection is the caller's fault
fn ledger_rejection(error: &LedgerError) -> ApiReply {
    message(StatusCode::BAD_REQUEST, error.to_string())
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &Bytes) -> Result<T, ApiReply> {
    serde_json::from_slice(body).map_err(|e| {
        message(
            StatusCode::BAD_REQUEST,
            format!("Invalid request body: {e}"),
        )
    })
}

/// Runs a handler that takes the write lock and writes the snapshot on the
/// blocking pool
async fn blocking<F>(handler: F) -> ApiReply
where
    F: FnOnce() -> ApiReply + Send + 'static,
{
    match tokio::task::spawn_blocking(handler).await {
        Ok(reply) => reply,
        Err(e) => {
            error!(error = %e, "Request handler failed");
            message(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

fn submit_reply(node: &Node, body: &Bytes) -> ApiReply {
    let request: TransactionRequest = match parse_body(body) {
        Ok(request) => request,
        Err(reply) => return reply,
    };
    match node.submit_transaction(request) {
        Ok(block_index) => json_reply(
            StatusCode::CREATED,
            json!({
                "message": format!("Transaction will be added to Block {block_index}"),
                "block_index": block_index,
            }),
        ),
        Err(e) => ledger_rejection(&e),
    }
}

fn receive_block_reply(node: &Node, body: &Bytes) -> ApiReply {
    let block: Block = match parse_body(body) {
        Ok(block) => block,
        Err(reply) => return reply,
    };
    let index = block.index;
    match node.receive_block(block) {
        Ok(()) => message(StatusCode::OK, format!("Block {index} accepted")),
        Err(e) => ledger_rejection(&e),
    }
}

fn register_reply(node: &Node, body: &Bytes) -> ApiReply {
    let request: RegisterRequest = match parse_body(body) {
        Ok(request) => request,
        Err(reply) => return reply,
    };
    let entries = match request.nodes {
        Some(nodes) => nodes.into_entries(),
        None => Vec::new(),
    };
    if entries.is_empty() {
        return message(
            StatusCode::BAD_REQUEST,
            "Error: Please supply a valid list of nodes",
        );
    }

    let report = node.register_peers(entries);
    let rejected: Vec<String> = report.rejected.iter().map(|e| e.to_string()).collect();
    json_reply(
        StatusCode::CREATED,
        json!({
            "message": "New nodes have been added",
            "added": report.added,
            "rejected": rejected,
            "total_nodes": node.get_peers(),
        }),
    )
}

fn with_node(node: Arc<Node>) -> impl Filter<Extract = (Arc<Node>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&node))
}

/// All HTTP routes of a node
pub fn routes(
    node: Arc<Node>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let chain = warp::path("chain")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_node(node.clone()))
        .map(|node: Arc<Node>| {
            let chain = node.get_chain();
            json_reply(StatusCode::OK, json!(chain))
        });

    let new_transaction = warp::path!("transactions" / "new")
        .and(warp::post())
        .and(warp::body::bytes())
        .and(with_node(node.clone()))
        .then(|body: Bytes, node: Arc<Node>| {
            blocking(move || submit_reply(&node, &body))
        });

    let pending = warp::path!("transactions" / "pending")
        .and(warp::get())
        .and(with_node(node.clone()))
        .map(|node: Arc<Node>| {
            let pending = node.pending_transactions();
            json_reply(
                StatusCode::OK,
                json!({ "length": pending.len(), "transactions": pending }),
            )
        });

    let receive_block = warp::path("receive_block")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::bytes())
        .and(with_node(node.clone()))
        .then(|body: Bytes, node: Arc<Node>| {
            blocking(move || receive_block_reply(&node, &body))
        });

    let register = warp::path!("nodes" / "register")
        .and(warp::post())
        .and(warp::body::bytes())
        .and(with_node(node.clone()))
        .then(|body: Bytes, node: Arc<Node>| {
            blocking(move || register_reply(&node, &body))
        });

    let peers = warp::path!("nodes" / "get")
        .and(warp::get())
        .and(with_node(node.clone()))
        .map(|node: Arc<Node>| json_reply(StatusCode::OK, json!({ "nodes": node.get_peers() })));

    let resolve = warp::path("resolve")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_node(node.clone()))
        .then(|node: Arc<Node>| async move {
            let replaced = node.resolve().await;
            let text = if replaced {
                "Our chain was replaced"
            } else {
                "Our chain is authoritative"
            };
            json_reply(
                StatusCode::OK,
                json!({
                    "message": text,
                    "replaced": replaced,
                    "chain": node.get_chain().chain,
                }),
            )
        });

    let new_wallet = warp::path!("wallet" / "new")
        .and(warp::post())
        .and(with_node(node.clone()))
        .then(|node: Arc<Node>| {
            blocking(move || {
                let address = node.new_wallet();
                json_reply(
                    StatusCode::CREATED,
                    json!({ "message": "New wallet created", "address": address }),
                )
            })
        });

    let balance = warp::path!("balance" / String)
        .and(warp::get())
        .and(with_node(node))
        .map(|address: String, node: Arc<Node>| {
            let balances = node.get_balance(&address);
            json_reply(
                StatusCode::OK,
                json!({
                    "address": address,
                    "balances": balances,
                    "token_name": TOKEN_NAME,
                }),
            )
        });

    chain
        .or(new_transaction)
        .unify()
        .or(pending)
        .unify()
        .or(receive_block)
        .unify()
        .or(register)
        .unify()
        .or(peers)
        .unify()
        .or(resolve)
        .unify()
        .or(new_wallet)
        .unify()
        .or(balance)
        .unify()
        .with(warp::log::custom(|info| {
            debug!(
                method = %info.method(),
                path = %info.path(),
                status = info.status().as_u16(),
                elapsed_ms = info.elapsed().as_millis() as u64,
                "HTTP request"
            );
        }))
}

/// Serve the node API until `shutdown` resolves
pub async fn serve(
    node: Arc<Node>,
    address: SocketAddr,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<(), warp::Error> {
    let (bound, server) =
        warp::serve(routes(node)).try_bind_with_graceful_shutdown(address, shutdown)?;
    info!(address = %bound, "HTTP API listening");
    server.await;
    Ok(())
}
