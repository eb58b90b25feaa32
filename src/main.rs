use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use log::{info, warn};
use tokio::time::sleep;

use quorumkv::config::Config;
use quorumkv::network::{send_command, MemoryNetwork, UdpTransport};
use quorumkv::raft::{NodeRole, Raft, RaftConfig};

fn init_logging() {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    // When QUORUMKV_LOG_FILE is set, log lines go to that file instead of
    // stderr.
    if let Ok(path) = std::env::var("QUORUMKV_LOG_FILE") {
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("Cannot open log file {path}: {e}, logging to stderr"),
        }
    }

    builder.init();
}

#[derive(Parser)]
#[command(name = "quorumkv")]
#[command(about = "A single-leader replicated key/value node")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one cluster member over UDP
    Node {
        /// JSON configuration file; flags below override its values
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Unique ID for this node
        #[arg(short, long)]
        id: Option<String>,

        /// UDP address to listen on
        #[arg(short, long)]
        address: Option<String>,

        /// Comma-separated list of cluster members (id=address)
        #[arg(short, long)]
        peers: Option<String>,

        /// Heartbeat interval in milliseconds
        #[arg(long)]
        heartbeat_ms: Option<u64>,

        /// Lower bound of the randomized election timeout in milliseconds
        #[arg(long)]
        election_min_ms: Option<u64>,

        /// Upper bound of the randomized election timeout in milliseconds
        #[arg(long)]
        election_max_ms: Option<u64>,

        /// Interval in seconds between status log lines
        #[arg(long, default_value_t = 5)]
        status_interval_secs: u64,
    },

    /// Send a key/value command to a node (only the leader applies it)
    Submit {
        /// UDP address of the target node, e.g. 127.0.0.1:8001
        #[arg(short, long)]
        node: String,

        key: String,

        value: String,
    },

    /// Run an in-process cluster, write a few keys and print every node's state
    Demo {
        /// Number of nodes in the cluster
        #[arg(short, long, default_value_t = 3)]
        nodes: usize,

        /// Seconds to wait for a leader before giving up
        #[arg(long, default_value_t = 10)]
        timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        Command::Node {
            config,
            id,
            address,
            peers,
            heartbeat_ms,
            election_min_ms,
            election_max_ms,
            status_interval_secs,
        } => {
            let mut cfg = match config {
                Some(path) => Config::from_file(&path)
                    .with_context(|| format!("loading config from {}", path.display()))?,
                None => Config::default(),
            };
            if let Some(id) = id {
                cfg.node_id = id;
            }
            if let Some(address) = address {
                cfg.address = address;
            }
            if let Some(peers) = peers {
                cfg.peers = Config::parse_peers(&peers)?;
            }
            if let Some(ms) = heartbeat_ms {
                cfg.heartbeat_interval_ms = ms;
            }
            if let Some(ms) = election_min_ms {
                cfg.election_timeout_min_ms = ms;
            }
            if let Some(ms) = election_max_ms {
                cfg.election_timeout_max_ms = ms;
            }

            run_node(cfg, Duration::from_secs(status_interval_secs.max(1))).await?;
        }
        Command::Submit { node, key, value } => {
            let target = node
                .parse::<SocketAddr>()
                .map_err(|_| anyhow!("invalid node address '{node}'"))?;
            send_command(target, &key, &value).await?;
            info!("Sent {key}={value} to {node}");
        }
        Command::Demo {
            nodes,
            timeout_secs,
        } => {
            run_demo(nodes, Duration::from_secs(timeout_secs)).await?;
        }
    }

    Ok(())
}

async fn run_node(cfg: Config, status_every: Duration) -> anyhow::Result<()> {
    let listen = cfg.listen_addr()?;
    let peers = cfg.peer_addresses()?;
    for (peer_id, addr) in &peers {
        info!("Added peer: {peer_id} at {addr}");
    }

    let (transport, inbound) = UdpTransport::bind(&cfg.node_id, listen, peers).await?;
    info!("Node {} listening on {}", cfg.node_id, transport.local_addr()?);

    let raft = Raft::start(cfg.raft_config(), Arc::new(transport), inbound)?;

    let mut status_timer = tokio::time::interval(status_every);
    loop {
        tokio::select! {
            _ = status_timer.tick() => match raft.status().await {
                Ok(status) => match serde_json::to_string(&status) {
                    Ok(line) => info!("status {line}"),
                    Err(e) => warn!("Cannot encode status: {e}"),
                },
                Err(e) => bail!("node stopped: {e}"),
            },
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("Shutting down node {}", cfg.node_id);
                raft.shutdown();
                return Ok(());
            }
        }
    }
}

async fn run_demo(size: usize, timeout: Duration) -> anyhow::Result<()> {
    if size == 0 {
        bail!("a cluster needs at least one node");
    }

    let network = MemoryNetwork::new();
    let ids: Vec<String> = (1..=size).map(|i| format!("node{i}")).collect();

    let mut nodes = Vec::with_capacity(size);
    for id in &ids {
        let (transport, inbound) = network.register(id, &ids);
        let config = RaftConfig::new(id).with_peers(&ids);
        nodes.push(Raft::start(config, Arc::new(transport), inbound)?);
    }

    let deadline = tokio::time::Instant::now() + timeout;
    let leader = loop {
        let mut found = None;
        for node in &nodes {
            if node.status().await?.role == NodeRole::Leader {
                found = Some(node);
                break;
            }
        }
        if let Some(leader) = found {
            break leader;
        }
        if tokio::time::Instant::now() >= deadline {
            bail!("no leader elected within {timeout:?}");
        }
        sleep(Duration::from_millis(50)).await;
    };

    let status = leader.status().await?;
    println!("Leader: {} (term {})", status.node_id, status.term);

    for (key, value) in [("user", "Alice"), ("score", "100")] {
        leader.submit_command(key, value).await?;
        sleep(Duration::from_millis(200)).await;
    }

    sleep(Duration::from_millis(500)).await;

    for node in &nodes {
        let status = node.status().await?;
        let state: BTreeMap<_, _> = node.get_state().await?.into_iter().collect();
        println!(
            "{} [{} term {}] state: {:?}",
            status.node_id, status.role, status.term, state
        );
    }

    for node in &nodes {
        node.shutdown();
    }

    Ok(())
}
