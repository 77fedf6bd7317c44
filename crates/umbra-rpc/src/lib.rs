//! umbra-rpc
//!
//! The node's management surface: chain info, wallet lifecycle, balances,
//! transaction submission and mining triggers, served as plain HTTP/JSON.
//! Client-caused rejections map to 400, engine/storage failures to 500.

pub mod server;
pub mod types;

pub use server::{router, ApiState};
