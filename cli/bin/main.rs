// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! `ippool` — an administrative CLI for a Redis-backed IP address lease pool (§6).

use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use ippool_cli::args::{self, Reserved};
use pool::cluster::RedisClusterExecutor;
use pool::operation::Action;
use pool::processors::{AddProcessor, ReleaseProcessor, RemoveProcessor, ShowProcessor};
use pool::report::OperationReport;
use pool::{ActionProcessor as _, Operation};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let cmd = args::command();

    let parsed = match args::parse(args) {
        Ok(parsed) => parsed,
        Err(err) => {
            if let ippool_cli::UsageError::Clap(clap_err) = &err {
                // clap already rendered a helpful message to this error's own writer.
                let _ = clap_err.print();
            } else {
                eprintln!("ippool: {err}");
            }
            #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
            return ExitCode::from(err.exit_code() as u8);
        }
    };

    if parsed.help {
        let mut cmd = cmd;
        let _ = cmd.print_help();
        println!();
        return ExitCode::SUCCESS;
    }

    if parsed.reserved.is_some() {
        eprintln!("NOT YET IMPLEMENTED");
        return ExitCode::FAILURE;
    }

    init_tracing(parsed.verbosity);

    let nodes = vec![parsed.server.clone()];
    let mut executor = match RedisClusterExecutor::connect(nodes) {
        Ok(executor) => executor,
        Err(err) => {
            eprintln!("ippool: could not connect to {}: {err}", parsed.server);
            return ExitCode::FAILURE;
        }
    };

    let now = current_unix_time();
    for operation in &parsed.operations {
        match run_operation(&mut executor, operation) {
            Ok(report) => {
                for line in report.render(now) {
                    println!("{line}");
                }
            }
            Err(err) => {
                eprintln!(
                    "ippool: operation '{}' on pool '{}' failed: {err}",
                    operation.original_text,
                    String::from_utf8_lossy(&operation.pool_id)
                );
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}

fn run_operation(
    executor: &mut RedisClusterExecutor,
    operation: &Operation,
) -> Result<OperationReport, pool::PoolError> {
    match operation.action {
        Action::Add => {
            let mut processor = AddProcessor::default();
            pool::drive(executor, operation, &mut processor)?;
            Ok(OperationReport::Count {
                action: Action::Add,
                count: processor.into_output(),
            })
        }
        Action::Remove => {
            let mut processor = RemoveProcessor::default();
            pool::drive(executor, operation, &mut processor)?;
            Ok(OperationReport::Count {
                action: Action::Remove,
                count: processor.into_output(),
            })
        }
        Action::Release => {
            let mut processor = ReleaseProcessor::default();
            pool::drive(executor, operation, &mut processor)?;
            Ok(OperationReport::Count {
                action: Action::Release,
                count: processor.into_output(),
            })
        }
        Action::Show => {
            let mut processor = ShowProcessor::default();
            pool::drive(executor, operation, &mut processor)?;
            Ok(OperationReport::Leases(processor.into_output()))
        }
    }
}

/// `-x` repeat count to `tracing` level (§4.11): 0 -> warn, 1 -> info, 2 -> debug, >=3 -> trace.
fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[allow(clippy::cast_possible_wrap)]
fn current_unix_time() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
