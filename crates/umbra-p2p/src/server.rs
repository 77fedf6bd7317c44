use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use umbra_core::constants::{PEER_PING_INTERVAL_SECS, PEER_PING_TIMEOUT_SECS};

use crate::handler::handle_raw_frame;
use crate::message::PeerMessage;
use crate::state::NodeHandle;

/// Upgrade handler for the `/ws` endpoint.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(node): State<NodeHandle>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| peer_session(socket, node))
}

/// Serve one inbound peer until it hangs up or goes quiet.
async fn peer_session(socket: WebSocket, node: NodeHandle) {
    let (peer_id, mut outbound) = node.hub.register();
    info!(peer = peer_id, "inbound peer connected");

    let (mut sink, mut stream) = socket.split();

    // Hello: the full chain, unprompted.
    let hello = {
        let bc = node.chain.read().expect("engine lock poisoned");
        PeerMessage::Blockchain { chain: bc.chain.clone() }.to_json()
    };
    if sink.send(Message::Text(hello.into())).await.is_err() {
        node.hub.unregister(peer_id);
        return;
    }

    let mut ping = tokio::time::interval(Duration::from_secs(PEER_PING_INTERVAL_SECS));
    ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let idle_limit = Duration::from_secs(PEER_PING_INTERVAL_SECS + PEER_PING_TIMEOUT_SECS);
    let mut last_seen = Instant::now();

    loop {
        tokio::select! {
            Some(json) = outbound.recv() => {
                if sink.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }

            inbound = stream.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        last_seen = Instant::now();
                        if let Some(reply) = handle_raw_frame(&node, peer_id, &text) {
                            if sink.send(Message::Text(reply.to_json().into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        last_seen = Instant::now();
                        if sink.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => last_seen = Instant::now(),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(peer = peer_id, error = %e, "peer socket error");
                        break;
                    }
                }
            }

            _ = ping.tick() => {
                if last_seen.elapsed() > idle_limit {
                    warn!(peer = peer_id, "peer timed out");
                    break;
                }
                if sink.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }

    node.hub.unregister(peer_id);
    info!(peer = peer_id, "inbound peer disconnected");
}
