//! Terminal client for the `FeelMate` support service.

use std::process::ExitCode;

use feelmate::start_feelmate;

fn main() -> ExitCode {
    start_feelmate::run_client()
}
