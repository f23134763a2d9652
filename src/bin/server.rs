//! `FeelMate` support API server.
//! Run with: cargo run --bin feelmate-server

use std::process::ExitCode;

use feelmate::start_feelmate;

fn main() -> ExitCode {
    start_feelmate::run_server()
}
