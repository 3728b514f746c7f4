//! Demo service entry point: runs every configured replica in this process
//! over the in-process consensus bus for a bounded number of rounds.

use std::env;
use std::fs;
use std::sync::{mpsc, Arc, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use turntable::{
    ConsoleExecutor, Replica, ReplicaCommand, ReplicaSnapshot, RoundMachine, ServiceConfig,
};
use turntable::sim::SimConsensus;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

fn main() {
    init_tracing();

    let mut config_path: Option<String> = None;
    let mut rounds: u64 = 5;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config_path = args.next(),
            "--rounds" => {
                rounds = args
                    .next()
                    .and_then(|v| v.parse().ok())
                    .expect("--rounds takes a positive integer");
            }
            _ => {
                eprintln!("unknown arg {}", arg);
                eprintln!("usage: turntable-node --config <path> [--rounds <n>]");
                std::process::exit(2);
            }
        }
    }

    let config_path = config_path.expect("missing --config");
    let raw = fs::read_to_string(&config_path).expect("read config file");
    let config = match ServiceConfig::from_json(&raw) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(%err, "invalid configuration, not entering round loop");
            std::process::exit(1);
        }
    };
    let registry = config.registry().expect("validated above");

    tracing::info!(
        service_id = %config.service_id,
        participants = registry.len(),
        rounds,
        "starting demo service"
    );

    let bus = SimConsensus::new(&registry);
    let mut handles = Vec::new();
    for participant in registry.canonical_order() {
        let machine = RoundMachine::new(
            registry.clone(),
            &participant.id,
            config.rounds.clone(),
            &config.service_id,
        )
        .expect("replica identity comes from the registry");
        let snapshot = Arc::new(RwLock::new(ReplicaSnapshot::new()));
        let (tx_cmd, rx_cmd) = mpsc::channel();
        let replica = Replica::new(
            machine,
            Box::new(bus.handle(participant.id.clone())),
            Box::new(ConsoleExecutor),
            Arc::clone(&snapshot),
        );
        let handle = thread::spawn(move || replica.run(rx_cmd));
        handles.push((participant.id.clone(), snapshot, tx_cmd, handle));
    }

    // Per-round budget on top of the configured timeout/retry envelope.
    let per_round = Duration::from_millis(
        config.rounds.round_timeout_ms * (config.rounds.retry_limit as u64 + 2)
            + config.rounds.reset_pause_ms
            + 500,
    );
    let deadline = Instant::now() + per_round * rounds as u32;
    loop {
        let mut done = true;
        let mut halted = false;
        for (id, snapshot, _, _) in &handles {
            let snap = snapshot.read().expect("snapshot lock");
            if let Some(reason) = &snap.halted {
                tracing::error!(replica = %id, %reason, "replica halted");
                halted = true;
            }
            if snap.outcomes.len() < rounds as usize {
                done = false;
            }
        }
        if done || halted {
            break;
        }
        if Instant::now() > deadline {
            tracing::error!("deadline passed before all replicas completed");
            break;
        }
        thread::sleep(Duration::from_millis(20));
    }

    for (_, _, tx_cmd, _) in &handles {
        let _ = tx_cmd.send(ReplicaCommand::Shutdown);
    }
    for (id, snapshot, _, handle) in handles {
        let _ = handle.join();
        let snap = snapshot.read().expect("snapshot lock");
        tracing::info!(
            replica = %id,
            applied = snap.outcomes.len(),
            history = %hex::encode(&snap.history_digest[..8]),
            "replica stopped"
        );
    }
}
