pub mod api;
pub mod peer;

pub use peer::{normalize_peer_address, HttpPeerClient, PeerClient, PeerError, PeerResult};
