use std::sync::Arc;
use std::time::{Duration, Instant};

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use quorumkv::network::{codec, MemoryNetwork};
use quorumkv::raft::{ElectionTimer, Message, Raft, RaftConfig, RaftNode};

const PEERS: [&str; 5] = ["n1", "n2", "n3", "n4", "n5"];

fn follower(now: Instant) -> RaftNode {
    let config = RaftConfig::new("n1").with_peers(PEERS);
    RaftNode::new(config, ElectionTimer::seeded(150, 300, 7), now)
}

fn leader(now: Instant) -> RaftNode {
    let mut node = follower(now);
    node.start_candidacy(now).unwrap();
    node.handle_message(Message::vote_response(1, "n2", true), now);
    node.handle_message(Message::vote_response(1, "n3", true), now);
    assert!(node.is_leader());
    node.drain_outbox();
    node
}

fn benchmark_follower(c: &mut Criterion) {
    let mut group = c.benchmark_group("follower");

    group.bench_function("heartbeat", |b| {
        let now = Instant::now();
        let mut node = follower(now);
        node.handle_message(Message::heartbeat(1, "n2"), now);
        b.iter(|| {
            node.handle_message(black_box(Message::heartbeat(1, "n2")), now);
            black_box(node.drain_outbox());
        });
    });

    group.bench_function("replicate_entry", |b| {
        let now = Instant::now();
        let mut node = follower(now);
        node.handle_message(Message::heartbeat(1, "n2"), now);
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            let key = format!("key{}", i % 1000);
            node.handle_message(Message::replicate_entry(1, "n2", &key, "value"), now);
        });
    });

    group.finish();
}

fn benchmark_leader(c: &mut Criterion) {
    let mut group = c.benchmark_group("leader");

    group.bench_function("submit_command", |b| {
        let now = Instant::now();
        let mut node = leader(now);
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            let key = format!("key{}", i % 1000);
            black_box(node.submit_command(&key, "value").unwrap());
            black_box(node.drain_outbox());
        });
    });

    group.bench_function("heartbeat_tick", |b| {
        let start = Instant::now();
        let mut node = leader(start);
        let mut now = start;
        b.iter(|| {
            now += Duration::from_millis(50);
            node.on_tick(now);
            black_box(node.drain_outbox());
        });
    });

    group.finish();
}

fn benchmark_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    for size in [16, 1024] {
        let value = "x".repeat(size);
        let message = Message::replicate_entry(42, "n1", "sensor", &value);
        let bytes = codec::encode(&message).unwrap();

        group.bench_with_input(BenchmarkId::new("encode", size), &message, |b, message| {
            b.iter(|| black_box(codec::encode(message).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("decode", size), &bytes, |b, bytes| {
            b.iter(|| black_box(codec::decode(bytes).unwrap()));
        });
    }

    group.finish();
}

fn benchmark_election(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("election");
    group.sample_size(10);

    for size in [3, 5] {
        group.bench_with_input(BenchmarkId::new("memory_cluster", size), &size, |b, &size| {
            b.to_async(&runtime).iter(|| async move {
                let network = MemoryNetwork::new();
                let ids: Vec<String> = (1..=size).map(|i| format!("node{i}")).collect();
                let nodes: Vec<Raft> = ids
                    .iter()
                    .map(|id| {
                        let (transport, inbound) = network.register(id, &ids);
                        let config = RaftConfig::new(id).with_peers(&ids).with_timing(5, 20, 40);
                        Raft::start(config, Arc::new(transport), inbound).unwrap()
                    })
                    .collect();

                'wait: loop {
                    for node in &nodes {
                        if node.status().await.unwrap().role == quorumkv::NodeRole::Leader {
                            break 'wait;
                        }
                    }
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }

                black_box(nodes);
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_follower,
    benchmark_leader,
    benchmark_codec,
    benchmark_election
);
criterion_main!(benches);
