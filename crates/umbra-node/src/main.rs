//! umbra-node — the Umbra full-node binary.
//!
//! Startup sequence:
//!   1. Load (or freshly initialise) the chain from `blockchain.json`
//!   2. Load the wallet registry and feed the key directory
//!   3. Dial the configured bootstrap peers (each in its own reconnect loop)
//!   4. Serve the HTTP management API plus the `/ws` peer endpoint
//!
//! All engine state sits behind one lock; peer and API submissions are
//! applied strictly in arrival order.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use axum::routing::get;
use axum::Router;
use clap::Parser;
use tracing::{info, warn};

use umbra_chain::{Blockchain, ChainStore};
use umbra_core::constants::DEFAULT_DIFFICULTY;
use umbra_crypto::ring::KeyDirectory;
use umbra_p2p::{run_peer_client, ws_handler, NodeHandle};
use umbra_rpc::ApiState;
use umbra_wallet::WalletStore;

#[derive(Parser, Debug)]
#[command(name = "umbra-node", version, about = "Umbra full node — privacy-augmented proof-of-work ledger")]
struct Args {
    /// Directory for blockchain.json and wallets.json.
    #[arg(long, default_value = "./umbra-data")]
    data_dir: PathBuf,

    /// HTTP listen address (management API and /ws peer endpoint).
    #[arg(long, default_value = "127.0.0.1:7432")]
    listen: SocketAddr,

    /// Bootstrap peers, `host:port` or full ws:// URLs (comma-separated).
    #[arg(long, value_delimiter = ',')]
    peers: Vec<String>,

    /// Proof-of-work difficulty (leading '0' hex chars). Fixed for the
    /// lifetime of the chain.
    #[arg(long, default_value_t = DEFAULT_DIFFICULTY)]
    difficulty: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,umbra=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    info!("umbra node starting");

    std::fs::create_dir_all(&args.data_dir)
        .with_context(|| format!("creating data dir {}", args.data_dir.display()))?;

    // ── Chain state ──────────────────────────────────────────────────────────
    let store = Arc::new(ChainStore::new(args.data_dir.join("blockchain.json")));
    let chain = match store.load().context("loading blockchain.json")? {
        Some(doc) => {
            info!(blocks = doc.chain.len(), "loaded chain from disk");
            if doc.difficulty != args.difficulty {
                warn!(
                    stored = doc.difficulty,
                    requested = args.difficulty,
                    "stored difficulty overrides --difficulty"
                );
            }
            Blockchain::from_parts(doc.chain, doc.pending_transactions, doc.difficulty)
                .context("rebuilding chain state")?
        }
        None => {
            info!(difficulty = args.difficulty, "fresh state — mining genesis");
            Blockchain::new(args.difficulty)
        }
    };

    // ── Wallet registry / key directory ──────────────────────────────────────
    let wallets =
        WalletStore::open(args.data_dir.join("wallets.json")).context("loading wallets.json")?;
    let mut directory = KeyDirectory::new();
    wallets.populate_directory(&mut directory);
    info!(wallets = directory.len(), "key directory populated");

    // ── Shared node state ────────────────────────────────────────────────────
    let node = NodeHandle::new(chain, directory).with_store(Arc::clone(&store));
    node.persist(&node.chain.read().expect("engine lock poisoned"));

    // ── Outbound peer sessions ───────────────────────────────────────────────
    for peer in &args.peers {
        info!(peer = %peer, "spawning peer session");
        tokio::spawn(run_peer_client(node.clone(), peer.clone()));
    }

    // ── HTTP server: management API + /ws peer endpoint ──────────────────────
    let api_state = ApiState { node: node.clone(), wallets: Arc::new(Mutex::new(wallets)) };
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .with_state(node)
        .merge(umbra_rpc::router(api_state));

    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("binding {}", args.listen))?;
    info!(addr = %args.listen, "node ready");
    axum::serve(listener, app).await.context("serving HTTP")?;

    Ok(())
}
