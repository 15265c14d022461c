//
// Copyright (c) The RipSim Core Contributors
//
// SPDX-License-Identifier: MIT
//

#![warn(rust_2018_idioms)]

mod config;

use std::path::Path;
use std::process;

use ripsim_rip::instance::{Instance, InstanceCfg};
use tracing::{Instrument, error, info, info_span};
use tracing_subscriber::EnvFilter;

// The topology file is read from the working directory.
const ROUTERS_FILE: &str = "routers.txt";

// Per-router snapshot logs.
const LOG_DIR: &str = "router_logs";

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive("ripsim=debug".parse().unwrap())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

// ===== main =====

fn main() {
    // Initialize tracing.
    init_tracing();

    // Read the topology file.
    let configs = match config::load(Path::new(ROUTERS_FILE)) {
        Ok(configs) => configs,
        Err(error) => {
            eprintln!("{}", error);
            process::exit(1);
        }
    };

    // Set panic handler to abort the process if any child task panics.
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        default_panic(info);
        std::process::exit(1);
    }));

    // We're ready to go!
    info!("starting up");

    // Main loop.
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to create async runtime")
        .block_on(async {
            run(configs).await;
        });
}

async fn run(configs: Vec<InstanceCfg>) {
    // Create the snapshot log directory.
    if let Err(error) = std::fs::create_dir_all(LOG_DIR) {
        eprintln!("{}: failed to create directory: {}", LOG_DIR, error);
        process::exit(1);
    }

    // Bind every router's sockets before any engine starts emitting. A
    // router that can't bind compromises the whole simulation.
    let mut instances = vec![];
    for config in configs {
        let id = config.id;
        match Instance::bind(config, Path::new(LOG_DIR)) {
            Ok(instance) => instances.push(instance),
            Err(error) => {
                error!(router = %id, %error, "failed to start router");
                process::exit(1);
            }
        }
    }

    // Run the routers to the end of their lifespans.
    let mut handles = vec![];
    for instance in instances {
        let span = info_span!("router", id = %instance.config.id);
        handles.push(tokio::spawn(
            async move {
                instance.run().await;
            }
            .instrument(span),
        ));
    }
    for handle in handles {
        let _ = handle.await;
    }

    info!("all routers finished");
}
