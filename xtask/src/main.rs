// Copyright 2025 the Voxelpart Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Developer-tooling entry point, invoked as `cargo xtask <task>` via the
//! `.cargo/config.toml` alias. Not published, not a library: a thin wrapper
//! around the `cargo` subcommands a contributor would otherwise have to
//! remember the flags for.

use std::env;
use std::process::{self, Command, ExitCode};

fn main() -> ExitCode {
    let mut args = env::args().skip(1);
    let Some(task) = args.next() else {
        print_usage();
        return ExitCode::FAILURE;
    };
    let rest: Vec<String> = args.collect();

    let status = match task.as_str() {
        "test" => run_cargo(&["test", "--workspace", "--all-features"], &rest),
        "property" => run_cargo(
            &["test", "--workspace", "--all-features", "--release", "--", "--ignored"],
            &rest,
        ),
        "bench" => run_cargo(&["bench", "--package", "voxelpart_benches"], &rest),
        "coverage" => run_cargo(
            &["llvm-cov", "--workspace", "--all-features", "--lcov", "--output-path", "lcov.info"],
            &rest,
        ),
        "lint" => run_cargo(&["clippy", "--workspace", "--all-targets", "--all-features"], &rest),
        other => {
            eprintln!("xtask: unknown task `{other}`\n");
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    match status {
        Ok(status) if status.success() => ExitCode::SUCCESS,
        Ok(status) => process_exit_code(status),
        Err(err) => {
            eprintln!("xtask: failed to launch cargo: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_cargo(fixed: &[&str], extra: &[String]) -> std::io::Result<process::ExitStatus> {
    let cargo = env::var("CARGO").unwrap_or_else(|_| "cargo".to_owned());
    Command::new(cargo).args(fixed).args(extra).status()
}

fn process_exit_code(status: process::ExitStatus) -> ExitCode {
    match status.code() {
        Some(code) => u8::try_from(code).map_or(ExitCode::FAILURE, ExitCode::from),
        None => ExitCode::FAILURE,
    }
}

fn print_usage() {
    eprintln!(
        "usage: cargo xtask <task> [-- extra cargo args]\n\n\
         tasks:\n  \
         test      run the workspace test suite\n  \
         property  run the ignored property/stress tests in release mode\n  \
         bench     run the criterion benchmarks\n  \
         coverage  run cargo-llvm-cov over the workspace\n  \
         lint      run clippy over every target"
    );
}
