//! umbra-p2p
//!
//! One long-lived WebSocket session per peer, JSON payloads with a `type`
//! discriminator. The server side hangs off the node's `/ws` endpoint and
//! greets every connection with the full chain; the client side dials the
//! configured bootstrap peers in their own reconnect loops. All state
//! mutation funnels through [`handler::handle_peer_message`], serialized by
//! the engine lock.

pub mod client;
pub mod handler;
pub mod hub;
pub mod message;
pub mod server;
pub mod state;

pub use client::run_peer_client;
pub use handler::handle_peer_message;
pub use hub::{PeerHub, PeerId};
pub use message::PeerMessage;
pub use server::ws_handler;
pub use state::NodeHandle;
