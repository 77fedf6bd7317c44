use std::time::{Duration, Instant};

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use umbra_core::constants::{
    PEER_PING_INTERVAL_SECS, PEER_PING_TIMEOUT_SECS, PEER_RECONNECT_SECS,
};

use crate::handler::handle_raw_frame;
use crate::state::NodeHandle;

/// Dial `peer` forever: each broken session is retried after a fixed
/// back-off. Spawn one of these per configured bootstrap peer.
pub async fn run_peer_client(node: NodeHandle, peer: String) {
    let url = normalize_peer_url(&peer);
    loop {
        match connect_async(url.as_str()).await {
            Ok((socket, _)) => {
                info!(url = %url, "connected to peer");
                if let Err(e) = client_session(&node, socket).await {
                    debug!(url = %url, error = %e, "peer session ended");
                }
            }
            Err(e) => debug!(url = %url, error = %e, "peer connection failed"),
        }
        tokio::time::sleep(Duration::from_secs(PEER_RECONNECT_SECS)).await;
    }
}

/// `host:port` → `ws://host:port/ws`; explicit `ws://` URLs pass through.
fn normalize_peer_url(peer: &str) -> String {
    let with_scheme = if peer.starts_with("ws://") || peer.starts_with("wss://") {
        peer.to_string()
    } else {
        format!("ws://{peer}")
    };
    if with_scheme.ends_with("/ws") {
        with_scheme
    } else {
        format!("{}/ws", with_scheme.trim_end_matches('/'))
    }
}

async fn client_session(
    node: &NodeHandle,
    socket: tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let (peer_id, mut outbound) = node.hub.register();
    let (mut sink, mut stream) = socket.split();

    let mut ping = tokio::time::interval(Duration::from_secs(PEER_PING_INTERVAL_SECS));
    ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let idle_limit = Duration::from_secs(PEER_PING_INTERVAL_SECS + PEER_PING_TIMEOUT_SECS);
    let mut last_seen = Instant::now();

    let result = loop {
        tokio::select! {
            Some(json) = outbound.recv() => {
                if let Err(e) = sink.send(Message::Text(json)).await {
                    break Err(e);
                }
            }

            inbound = stream.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        last_seen = Instant::now();
                        if let Some(reply) = handle_raw_frame(node, peer_id, &text) {
                            if let Err(e) = sink.send(Message::Text(reply.to_json())).await {
                                break Err(e);
                            }
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        last_seen = Instant::now();
                        if let Err(e) = sink.send(Message::Pong(payload)).await {
                            break Err(e);
                        }
                    }
                    Some(Ok(Message::Pong(_))) => last_seen = Instant::now(),
                    Some(Ok(Message::Close(_))) | None => break Ok(()),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Err(e),
                }
            }

            _ = ping.tick() => {
                if last_seen.elapsed() > idle_limit {
                    warn!(peer = peer_id, "peer went quiet; dropping session");
                    break Ok(());
                }
                if let Err(e) = sink.send(Message::Ping(Vec::new())).await {
                    break Err(e);
                }
            }
        }
    };

    node.hub.unregister(peer_id);
    result
}
