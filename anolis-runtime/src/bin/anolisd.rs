// Copyright 2026-Present Anolis Project.
// SPDX-License-Identifier: Apache-2.0

//! Runtime daemon: loads the config record, starts the kernel, and runs
//! until SIGINT/SIGTERM.
//!
//! Exit codes: 0 clean, 1 config error, 2 provider-start failure with no
//! retry policy.

use anolis_runtime::config::{FromEnv, RuntimeConfig};
use anolis_runtime::{shutdown, MachineRuntime};
use std::path::Path;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let filter = EnvFilter::try_new(FromEnv::log_level())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let Some(config_path) = std::env::args().nth(1) else {
        eprintln!("usage: anolisd <config.json>");
        return 1;
    };

    let config = match RuntimeConfig::from_json_file(Path::new(&config_path)) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return 1;
        }
    };

    if let Err(e) = shutdown::install_signal_handlers() {
        warn!(error = %e, "failed to install signal handlers");
    }

    let runtime = match MachineRuntime::start(config) {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "runtime failed to start");
            return e.exit_code();
        }
    };

    let workers = match runtime.spawn_threads() {
        Ok(workers) => workers,
        Err(e) => {
            error!(error = %e, "failed to spawn worker threads");
            runtime.shutdown();
            return 1;
        }
    };

    while !shutdown::shutdown_requested() {
        std::thread::sleep(Duration::from_millis(100));
    }

    info!("shutdown requested");
    runtime.shutdown();
    for worker in workers {
        let _ = worker.join();
    }
    0
}
